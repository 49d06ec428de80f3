use bytes::{Buf, BytesMut};
use std::io::Cursor;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::frame::{self, Frame};
use crate::Error;

pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Decodes request frames out of the bytes read from a client socket.
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // A client that keeps sending without ever completing a frame would otherwise grow the
        // buffer without bound.
        if src.len() > self.max_frame_size {
            return Err(format!(
                "frame size exceeds limit of {} bytes",
                self.max_frame_size
            )
            .into());
        }

        let mut cursor = Cursor::new(&src[..]);
        let frame = match Frame::parse(&mut cursor) {
            Ok(frame) => frame,
            Err(frame::Error::Incomplete) => return Ok(None), // Not enough data to parse a frame.
            Err(err) => return Err(err.into()),
        };

        let position = cursor.position() as usize;
        trace!("Decoded frame of {} bytes", position);

        // Remove the parsed frame from the buffer.
        src.advance(position);

        Ok(Some(frame))
    }
}
