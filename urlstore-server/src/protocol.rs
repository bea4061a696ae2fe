//! Binary request/response framing
//!
//! Request: 16-byte header (opcode u8, 3 reserved, seq u32, key_len u32,
//! val_len u32) followed by key bytes then value bytes.
//! Response: 12-byte header (status u8, 3 reserved, seq u32, payload_len u32)
//! followed by the payload. All integers are little-endian.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

pub const REQUEST_HEADER_LEN: usize = 16;
pub const RESPONSE_HEADER_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    Ping = 0x01,
    /// Resolve a key
    Get = 0x02,
    /// Insert an explicit key if absent
    Set = 0x03,
    /// Insert under a generated key
    Put = 0x04,
    Stats = 0x05,
}

impl TryFrom<u8> for OpCode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(OpCode::Ping),
            0x02 => Ok(OpCode::Get),
            0x03 => Ok(OpCode::Set),
            0x04 => Ok(OpCode::Put),
            0x05 => Ok(OpCode::Stats),
            other => Err(ProtocolError::UnknownOpcode(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    Conflict = 0x02,
    Exhausted = 0x03,
    BadRequest = 0x04,
}

impl TryFrom<u8> for Status {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Status::Ok),
            0x01 => Ok(Status::NotFound),
            0x02 => Ok(Status::Conflict),
            0x03 => Ok(Status::Exhausted),
            0x04 => Ok(Status::BadRequest),
            other => Err(ProtocolError::UnknownStatus(other)),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("unknown opcode 0x{0:02x}")]
    UnknownOpcode(u8),

    #[error("unknown status 0x{0:02x}")]
    UnknownStatus(u8),

    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(&'static str),

    #[error("frame of {len} bytes exceeds limit of {max}")]
    FrameTooLarge { len: usize, max: usize },
}

/// Decoded request header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    pub opcode: u8,
    pub seq: u32,
    pub key_len: u32,
    pub val_len: u32,
}

impl RequestHeader {
    pub fn decode(header: &[u8; REQUEST_HEADER_LEN]) -> Self {
        let mut buf = &header[..];
        let opcode = buf.get_u8();
        buf.advance(3);
        Self {
            opcode,
            seq: buf.get_u32_le(),
            key_len: buf.get_u32_le(),
            val_len: buf.get_u32_le(),
        }
    }

    /// Total body length following the header
    pub fn body_len(&self) -> usize {
        self.key_len as usize + self.val_len as usize
    }
}

/// A client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub opcode: OpCode,
    pub seq: u32,
    pub key: Bytes,
    pub value: Bytes,
}

impl Request {
    pub fn ping(seq: u32) -> Self {
        Self::new(OpCode::Ping, seq, Bytes::new(), Bytes::new())
    }

    pub fn get(seq: u32, key: impl Into<Bytes>) -> Self {
        Self::new(OpCode::Get, seq, key.into(), Bytes::new())
    }

    pub fn set(seq: u32, key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self::new(OpCode::Set, seq, key.into(), value.into())
    }

    pub fn put(seq: u32, value: impl Into<Bytes>) -> Self {
        Self::new(OpCode::Put, seq, Bytes::new(), value.into())
    }

    pub fn stats(seq: u32) -> Self {
        Self::new(OpCode::Stats, seq, Bytes::new(), Bytes::new())
    }

    fn new(opcode: OpCode, seq: u32, key: Bytes, value: Bytes) -> Self {
        Self {
            opcode,
            seq,
            key,
            value,
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(REQUEST_HEADER_LEN + self.key.len() + self.value.len());
        buf.put_u8(self.opcode as u8);
        buf.put_bytes(0, 3);
        buf.put_u32_le(self.seq);
        buf.put_u32_le(self.key.len() as u32);
        buf.put_u32_le(self.value.len() as u32);
        buf.put_slice(&self.key);
        buf.put_slice(&self.value);
        buf.freeze()
    }

    pub fn key_str(&self) -> Result<&str, ProtocolError> {
        std::str::from_utf8(&self.key).map_err(|_| ProtocolError::InvalidUtf8("key"))
    }

    pub fn value_str(&self) -> Result<&str, ProtocolError> {
        std::str::from_utf8(&self.value).map_err(|_| ProtocolError::InvalidUtf8("value"))
    }
}

/// A server response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub seq: u32,
    pub payload: Bytes,
}

impl Response {
    pub fn new(status: Status, seq: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            status,
            seq,
            payload: payload.into(),
        }
    }

    pub fn empty(status: Status, seq: u32) -> Self {
        Self::new(status, seq, Bytes::new())
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(RESPONSE_HEADER_LEN + self.payload.len());
        buf.put_u8(self.status as u8);
        buf.put_bytes(0, 3);
        buf.put_u32_le(self.seq);
        buf.put_u32_le(self.payload.len() as u32);
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    /// Decode the fixed header, returning (status, seq, payload_len)
    pub fn decode_header(
        header: &[u8; RESPONSE_HEADER_LEN],
    ) -> Result<(Status, u32, usize), ProtocolError> {
        let mut buf = &header[..];
        let status = Status::try_from(buf.get_u8())?;
        buf.advance(3);
        let seq = buf.get_u32_le();
        let payload_len = buf.get_u32_le() as usize;
        Ok((status, seq, payload_len))
    }

    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}
