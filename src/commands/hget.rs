use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Returns the value associated with `field` in the hash stored at `key`, or `nil` when either
/// the hash or the field does not exist.
///
/// Ref: <https://redis.io/docs/latest/commands/hget/>
#[derive(Debug, PartialEq)]
pub struct Hget {
    pub key: Bytes,
    pub field: Bytes,
}

impl Executable for Hget {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        let res = store
            .hget(&self.key, &self.field)
            .map_or(Frame::Null, Frame::Bulk);

        Ok(res)
    }
}

impl TryFrom<&mut CommandParser> for Hget {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        parser.expect_arguments("hget", 2)?;

        let key = parser.next_bytes()?;
        let field = parser.next_bytes()?;

        Ok(Self { key, field })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;

    fn hget(store: &Store, key: &'static str, field: &'static str) -> Frame {
        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("HGET")),
            Frame::Bulk(Bytes::from(key)),
            Frame::Bulk(Bytes::from(field)),
        ]);
        let cmd = Command::try_from(frame).unwrap();

        assert_eq!(
            cmd,
            Command::Hget(Hget {
                key: Bytes::from(key),
                field: Bytes::from(field),
            })
        );

        cmd.exec(store.clone()).unwrap()
    }

    #[test]
    fn existing_field() {
        let store = Store::new();
        store.hset(Bytes::from("h"), Bytes::from("f"), Bytes::from("v1"));
        store.hset(Bytes::from("h"), Bytes::from("f"), Bytes::from("v2"));

        assert_eq!(hget(&store, "h", "f"), Frame::Bulk(Bytes::from("v2")));
    }

    #[test]
    fn missing_hash() {
        let store = Store::new();

        assert_eq!(hget(&store, "h", "f"), Frame::Null);
    }

    #[test]
    fn missing_field() {
        let store = Store::new();
        store.hset(Bytes::from("h"), Bytes::from("f"), Bytes::from("v"));

        assert_eq!(hget(&store, "h", "other"), Frame::Null);
    }

    #[test]
    fn string_key_is_not_a_hash() {
        let store = Store::new();
        store.set(Bytes::from("h"), Bytes::from("v"));

        assert_eq!(hget(&store, "h", "v"), Frame::Null);
    }
}
