use bytes::{BufMut, Bytes, BytesMut};

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

const SEPARATOR: &[u8] = b": ";

/// Returns all fields of the hash stored at `key`, one bulk string per field formatted as
/// `field: value`, or `nil` if the hash does not exist. Fields come back in no particular order.
///
/// This differs from Redis, which replies with a flat list alternating fields and values.
///
/// Ref: <https://redis.io/docs/latest/commands/hgetall/>
#[derive(Debug, PartialEq)]
pub struct Hgetall {
    pub key: Bytes,
}

impl Executable for Hgetall {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        let Some(pairs) = store.hgetall(&self.key) else {
            return Ok(Frame::Null);
        };

        let entries = pairs
            .into_iter()
            .map(|(field, value)| {
                let mut entry = BytesMut::with_capacity(field.len() + SEPARATOR.len() + value.len());
                entry.put(field);
                entry.put_slice(SEPARATOR);
                entry.put(value);
                Frame::Bulk(entry.freeze())
            })
            .collect();

        Ok(Frame::Array(entries))
    }
}

impl TryFrom<&mut CommandParser> for Hgetall {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        parser.expect_arguments("hgetall", 1)?;

        let key = parser.next_bytes()?;
        Ok(Self { key })
    }
}
