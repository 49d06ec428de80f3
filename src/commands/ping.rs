use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Returns PONG if no argument is provided, otherwise returns a copy of the first argument. Any
/// further arguments are ignored.
///
/// The echo is a simple string, as is the PONG reply, and is sent verbatim: a payload containing
/// CR or LF is not escaped and will break the framing of the reply.
///
/// Ref: <https://redis.io/docs/latest/commands/ping>
#[derive(Debug, PartialEq)]
pub struct Ping {
    pub payload: Option<Bytes>,
}

impl Executable for Ping {
    fn exec(self, _store: Store) -> Result<Frame, Error> {
        let res = self.payload.map_or(Frame::Simple("PONG".to_string()), |payload| {
            Frame::Simple(String::from_utf8_lossy(&payload).into_owned())
        });

        Ok(res)
    }
}

impl TryFrom<&mut CommandParser> for Ping {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let payload = match parser.next_bytes() {
            Ok(payload) => Some(payload),
            Err(CommandParserError::EndOfStream) => None,
            Err(e) => return Err(e),
        };

        Ok(Self { payload })
    }
}
