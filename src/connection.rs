use futures::StreamExt;
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_util::codec::FramedRead;
use uuid::Uuid;

use crate::codec::{FrameCodec, DEFAULT_MAX_FRAME_SIZE};
use crate::frame::Frame;
use crate::Error;

pub struct Connection {
    pub id: Uuid,
    pub client_address: SocketAddr,
    // Data is read from the socket into the codec's buffer. When a frame is parsed, the
    // corresponding data is removed from the buffer.
    reader: FramedRead<OwnedReadHalf, FrameCodec>,
    writer: OwnedWriteHalf,
}

impl Connection {
    pub fn new(stream: TcpStream, client_address: SocketAddr) -> Connection {
        Self::with_max_frame_size(stream, client_address, DEFAULT_MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(
        stream: TcpStream,
        client_address: SocketAddr,
        max_frame_size: usize,
    ) -> Connection {
        let (reader, writer) = stream.into_split();

        Connection {
            id: Uuid::new_v4(),
            client_address,
            // Allocate the buffer with 4kb of capacity.
            reader: FramedRead::with_capacity(reader, FrameCodec::new(max_frame_size), 4096),
            writer,
        }
    }

    /// Reads the next frame sent by the client.
    ///
    /// Returns `None` once the client closes the connection cleanly. Closing it in the middle of a
    /// frame is an error, as is any malformed input.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, Error> {
        self.reader.next().await.transpose()
    }

    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), Error> {
        self.writer.write_all(&frame.serialize()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}
