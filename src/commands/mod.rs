pub mod executable;
pub mod get;
pub mod hget;
pub mod hgetall;
pub mod hset;
pub mod ping;
pub mod set;

use bytes::Bytes;
use std::vec;
use thiserror::Error as ThisError;
use tracing::debug;

use crate::commands::executable::Executable;
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

use get::Get;
use hget::Hget;
use hgetall::Hgetall;
use hset::Hset;
use ping::Ping;
use set::Set;

#[derive(Debug, PartialEq)]
pub enum Command {
    Get(Get),
    Hget(Hget),
    Hgetall(Hgetall),
    Hset(Hset),
    Ping(Ping),
    Set(Set),
}

impl Executable for Command {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        match self {
            Command::Get(cmd) => cmd.exec(store),
            Command::Hget(cmd) => cmd.exec(store),
            Command::Hgetall(cmd) => cmd.exec(store),
            Command::Hset(cmd) => cmd.exec(store),
            Command::Ping(cmd) => cmd.exec(store),
            Command::Set(cmd) => cmd.exec(store),
        }
    }
}

impl TryFrom<Frame> for Command {
    type Error = CommandParserError;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        // Clients send commands to the server as RESP arrays.
        let frames = match frame {
            Frame::Array(array) => array,
            frame => {
                return Err(CommandParserError::InvalidFrame {
                    expected: "array".to_string(),
                    actual: frame,
                })
            }
        };

        let parser = &mut CommandParser {
            parts: frames.into_iter(),
        };

        let command_name = parser.parse_command_name()?;

        // Names are matched exactly as registered: clients must send them in upper case.
        match &command_name[..] {
            "GET" => Get::try_from(parser).map(Command::Get),
            "HGET" => Hget::try_from(parser).map(Command::Hget),
            "HGETALL" => Hgetall::try_from(parser).map(Command::Hgetall),
            "HSET" => Hset::try_from(parser).map(Command::Hset),
            "PING" => Ping::try_from(parser).map(Command::Ping),
            "SET" => Set::try_from(parser).map(Command::Set),
            _ => Err(CommandParserError::UnknownCommand {
                command: command_name,
            }),
        }
    }
}

/// Runs a decoded request against `store` and returns the reply to send back.
///
/// Malformed requests, unknown commands and wrong arities are answered with an error frame, so
/// every request gets a reply and the connection can keep going.
pub fn dispatch(frame: Frame, store: Store) -> Frame {
    let res = Command::try_from(frame)
        .map_err(Error::from)
        .and_then(|cmd| cmd.exec(store));

    match res {
        Ok(frame) => frame,
        Err(err) => {
            debug!("Command failed: {}", err);
            // Messages may echo client bytes, and an error reply must stay on a single line.
            Frame::Error(err.to_string().replace(['\r', '\n'], " "))
        }
    }
}

pub struct CommandParser {
    parts: vec::IntoIter<Frame>,
}

impl CommandParser {
    fn parse_command_name(&mut self) -> Result<String, CommandParserError> {
        let command_name = self
            .parts
            .next()
            .ok_or(CommandParserError::EmptyCommand)?;

        match command_name {
            Frame::Simple(s) => Ok(s),
            Frame::Bulk(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            frame => Err(CommandParserError::InvalidFrame {
                expected: "simple or bulk string".to_string(),
                actual: frame,
            }),
        }
    }

    /// Fails unless exactly `count` arguments are left to read.
    fn expect_arguments(
        &self,
        command: &'static str,
        count: usize,
    ) -> Result<(), CommandParserError> {
        if self.parts.len() != count {
            return Err(CommandParserError::WrongNumberOfArguments { command });
        }
        Ok(())
    }

    fn next_bytes(&mut self) -> Result<Bytes, CommandParserError> {
        let frame = self.parts.next().ok_or(CommandParserError::EndOfStream)?;

        match frame {
            Frame::Simple(s) => Ok(Bytes::from(s)),
            Frame::Bulk(bytes) => Ok(bytes),
            frame => Err(CommandParserError::InvalidFrame {
                expected: "simple or bulk string".to_string(),
                actual: frame,
            }),
        }
    }
}

#[derive(Debug, ThisError, PartialEq)]
pub enum CommandParserError {
    #[error("ERR protocol error; invalid frame, expected {expected}, got {actual}")]
    InvalidFrame { expected: String, actual: Frame },
    #[error("ERR unknown command '{command}'")]
    UnknownCommand { command: String },
    #[error("ERR wrong number of arguments for '{command}' command")]
    WrongNumberOfArguments { command: &'static str },
    #[error("ERR empty command")]
    EmptyCommand,
    #[error("ERR protocol error; attempting to extract a value failed due to the frame being fully consumed")]
    EndOfStream,
}
