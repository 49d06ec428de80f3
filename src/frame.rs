// https://redis.io/docs/reference/protocol-spec

use std::fmt;

use bytes::Buf;
use bytes::Bytes;
use std::io::Cursor;
use thiserror::Error as ThisError;

static CRLF: &[u8; 2] = b"\r\n";

#[derive(Debug, ThisError, PartialEq)]
pub enum Error {
    #[error("not enough data is available to parse an entire frame")]
    Incomplete,
    #[error("protocol error; unsupported leading type byte: {0:#04x}")]
    UnsupportedDataType(u8),
    #[error("protocol error; invalid integer {0:?}")]
    InvalidInteger(String),
    #[error("protocol error; invalid length {0}")]
    InvalidLength(i64),
    #[error("protocol error; bulk payload is not followed by CRLF")]
    MissingTerminator,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    Null,
    Array(Vec<Frame>),
}

impl Frame {
    /// Parses one frame from `src`, leaving the cursor right after its last byte.
    ///
    /// Only arrays and bulk strings are read, which is all a client request is made of. When `src`
    /// holds a prefix of a valid frame `Error::Incomplete` is returned and the caller is expected
    /// to retry once more bytes have arrived.
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        // The first byte in an RESP-serialized payload always identifies its type.
        let first_byte = get_byte(src)?;
        let data_type = DataType::try_from(first_byte)?;

        match data_type {
            // *<number-of-elements>\r\n<element-1>...<element-n>
            DataType::Array => {
                let length = get_integer(src)?;
                if length < 0 {
                    return Err(Error::InvalidLength(length));
                }

                let mut frames = Vec::with_capacity(length.min(1024) as usize);
                for _ in 0..length {
                    let frame = Self::parse(src)?;
                    frames.push(frame);
                }

                Ok(Frame::Array(frames))
            }
            // $<length>\r\n<data>\r\n
            DataType::BulkString => {
                let length = get_integer(src)?;

                if length == -1 {
                    return Ok(Frame::Null);
                }
                if length < 0 {
                    return Err(Error::InvalidLength(length));
                }

                // The payload is binary safe, so it is read by length rather than by scanning for
                // the next CRLF.
                let length = length as usize;
                if src.remaining() < length + CRLF.len() {
                    return Err(Error::Incomplete);
                }

                let start = src.position() as usize;
                let data = Bytes::copy_from_slice(&src.get_ref()[start..start + length]);
                src.advance(length);

                if &src.chunk()[..CRLF.len()] != CRLF {
                    return Err(Error::MissingTerminator);
                }
                src.advance(CRLF.len());

                Ok(Frame::Bulk(data))
            }
            _ => Err(Error::UnsupportedDataType(first_byte)),
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Frame::Simple(s) => {
                let mut bytes = Vec::with_capacity(1 + s.len() + CRLF.len());
                bytes.push(u8::from(DataType::SimpleString));
                bytes.extend_from_slice(s.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Error(s) => {
                let mut bytes = Vec::with_capacity(1 + s.len() + CRLF.len());
                bytes.push(u8::from(DataType::SimpleError));
                bytes.extend_from_slice(s.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Integer(i) => {
                let digits = i.to_string();
                let mut bytes = Vec::with_capacity(1 + digits.len() + CRLF.len());
                bytes.push(u8::from(DataType::Integer));
                bytes.extend_from_slice(digits.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Bulk(bytes) => {
                let length_str = bytes.len().to_string();
                let mut result = Vec::with_capacity(
                    1 + length_str.len() + CRLF.len() + bytes.len() + CRLF.len(),
                );
                result.push(u8::from(DataType::BulkString));
                result.extend_from_slice(length_str.as_bytes());
                result.extend_from_slice(CRLF);
                result.extend_from_slice(bytes);
                result.extend_from_slice(CRLF);
                result
            }
            // RESP2 null bulk string.
            Frame::Null => b"$-1\r\n".to_vec(),
            Frame::Array(arr) => {
                let length_str = arr.len().to_string();
                let mut bytes = Vec::with_capacity(1 + length_str.len() + CRLF.len());
                bytes.push(u8::from(DataType::Array));
                bytes.extend_from_slice(length_str.as_bytes());
                bytes.extend_from_slice(CRLF);
                for frame in arr {
                    bytes.extend(frame.serialize());
                }
                bytes
            }
        }
    }
}

impl From<Frame> for Vec<u8> {
    fn from(frame: Frame) -> Self {
        frame.serialize()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Simple(s) => write!(f, "+{}", s),
            Frame::Error(s) => write!(f, "-{}", s),
            Frame::Integer(i) => write!(f, ":{}", i),
            Frame::Bulk(bytes) => write!(f, "${}", String::from_utf8_lossy(bytes)),
            Frame::Null => write!(f, "$-1"),
            Frame::Array(arr) => {
                write!(f, "*{}", arr.len())?;
                for frame in arr {
                    write!(f, " {}", frame)?;
                }
                Ok(())
            }
        }
    }
}

/// Returns the bytes up to the next CRLF and moves the cursor past the terminator.
fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], Error> {
    let start = src.position() as usize;
    let buf: &'a [u8] = *src.get_ref();

    let line_end = buf[start..]
        .windows(2)
        .position(|window| window == CRLF)
        .map(|index| start + index)
        .ok_or(Error::Incomplete)?;

    src.set_position((line_end + CRLF.len()) as u64);

    Ok(&buf[start..line_end])
}

fn get_integer(src: &mut Cursor<&[u8]>) -> Result<i64, Error> {
    let line = get_line(src)?;
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| Error::InvalidInteger(String::from_utf8_lossy(line).into_owned()))
}

fn get_byte(src: &mut Cursor<&[u8]>) -> Result<u8, Error> {
    if !src.has_remaining() {
        return Err(Error::Incomplete);
    }
    Ok(src.get_u8())
}

#[derive(Debug)]
enum DataType {
    SimpleString, // '+'
    SimpleError,  // '-'
    Integer,      // ':'
    BulkString,   // '$'
    Array,        // '*'
}

impl TryFrom<u8> for DataType {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            b'+' => Ok(Self::SimpleString),
            b'-' => Ok(Self::SimpleError),
            b':' => Ok(Self::Integer),
            b'$' => Ok(Self::BulkString),
            b'*' => Ok(Self::Array),
            _ => Err(Error::UnsupportedDataType(byte)),
        }
    }
}

impl From<DataType> for u8 {
    fn from(value: DataType) -> Self {
        match value {
            DataType::SimpleString => b'+',
            DataType::SimpleError => b'-',
            DataType::Integer => b':',
            DataType::BulkString => b'$',
            DataType::Array => b'*',
        }
    }
}
