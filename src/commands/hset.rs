use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Sets `field` in the hash stored at `key` to `value`. If `key` does not exist, a new hash is
/// created first. An existing field is overwritten.
///
/// Unlike Redis, a single field/value pair is accepted and the reply is `OK`.
///
/// Ref: <https://redis.io/docs/latest/commands/hset/>
#[derive(Debug, PartialEq)]
pub struct Hset {
    pub key: Bytes,
    pub field: Bytes,
    pub value: Bytes,
}

impl Executable for Hset {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        store.hset(self.key, self.field, self.value);

        Ok(Frame::Simple("OK".to_string()))
    }
}

impl TryFrom<&mut CommandParser> for Hset {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        parser.expect_arguments("hset", 3)?;

        let key = parser.next_bytes()?;
        let field = parser.next_bytes()?;
        let value = parser.next_bytes()?;

        Ok(Self { key, field, value })
    }
}
