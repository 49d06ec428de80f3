use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, instrument, warn};

use crate::codec::DEFAULT_MAX_FRAME_SIZE;
use crate::commands;
use crate::connection::Connection;
use crate::store::Store;
use crate::Error;

pub const DEFAULT_PORT: u16 = 6379;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_frame_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

pub async fn run(config: ServerConfig) -> Result<(), Error> {
    let _ = tracing_subscriber::fmt()
        .try_init()
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));

    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    let store = Store::new();

    serve(listener, store, config.max_frame_size).await
}

/// Accepts clients on `listener` forever, serving each one from its own task against `store`.
pub async fn serve(
    listener: TcpListener,
    store: Store,
    max_frame_size: usize,
) -> Result<(), Error> {
    info!("Server listening on {}", listener.local_addr()?);

    loop {
        let (socket, client_address) = listener.accept().await?;
        let store = store.clone();
        info!("Accepted connection from {:?}", client_address);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, client_address, store, max_frame_size).await
            {
                error!("Connection from {} failed: {}", client_address, e);
            }
        });
    }
}

#[instrument(
    name = "connection",
    skip_all,
    fields(connection_id, client_address)
)]
async fn handle_connection(
    stream: TcpStream,
    client_address: SocketAddr,
    store: Store,
    max_frame_size: usize,
) -> Result<(), Error> {
    let mut conn = Connection::with_max_frame_size(stream, client_address, max_frame_size);

    tracing::Span::current()
        .record("connection_id", conn.id.to_string())
        .record("client_address", client_address.to_string());

    loop {
        let frame = match conn.read_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                warn!("Dropping connection after decode failure: {}", e);
                return Err(e);
            }
        };

        debug!("Received frame from client: {}", frame);
        let res = commands::dispatch(frame, store.clone());
        debug!("Sending response to client: {}", res);

        conn.write_frame(&res).await?;
    }

    info!("Connection closed");
    Ok(())
}
