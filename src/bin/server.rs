use clap::Parser;
use hashkv::codec::DEFAULT_MAX_FRAME_SIZE;
use hashkv::server::{self, ServerConfig, DEFAULT_PORT};
use hashkv::Error;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// The address to bind to
    #[arg(long, env = "HASHKV_HOST", default_value = "127.0.0.1")]
    host: String,

    /// The port to listen on
    #[arg(short, long, env = "HASHKV_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Largest request, in bytes, a client may have buffered before it is disconnected
    #[arg(long, env = "MAX_FRAME_SIZE", default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    max_frame_size: usize,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            host: args.host,
            port: args.port,
            max_frame_size: args.max_frame_size,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    server::run(args.into()).await
}
