use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Set `key` to hold the string `value`. If `key` already holds a value, it is overwritten.
///
/// Ref: <https://redis.io/docs/latest/commands/set/>
#[derive(Debug, PartialEq)]
pub struct Set {
    pub key: Bytes,
    pub value: Bytes,
}

impl Executable for Set {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        store.set(self.key, self.value);

        let res = Frame::Simple("OK".to_string());
        Ok(res)
    }
}

impl TryFrom<&mut CommandParser> for Set {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        parser.expect_arguments("set", 2)?;

        let key = parser.next_bytes()?;
        let value = parser.next_bytes()?;

        Ok(Self { key, value })
    }
}
