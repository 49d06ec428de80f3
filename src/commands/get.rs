use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Get the value of `key`. If the key does not exist the special value `nil` is returned.
///
/// Ref: <https://redis.io/docs/latest/commands/get/>
#[derive(Debug, PartialEq)]
pub struct Get {
    pub key: Bytes,
}

impl Executable for Get {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        let value = store.get(&self.key);

        match value {
            Some(value) => Ok(Frame::Bulk(value)),
            None => Ok(Frame::Null),
        }
    }
}

impl TryFrom<&mut CommandParser> for Get {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        parser.expect_arguments("get", 1)?;

        let key = parser.next_bytes()?;
        Ok(Self { key })
    }
}
