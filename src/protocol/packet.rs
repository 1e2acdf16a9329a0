//! Packet encoding and decoding
// (c) 2026 tftpd contributors

use std::fmt::Display;

use super::{BLOCK_SIZE, ErrorCode, HEADER_SIZE, Request, RequestKind};

/// The two-byte packet type identifier
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, strum::Display, strum::FromRepr)]
#[repr(u16)]
pub enum Opcode {
    /// Read request
    #[strum(to_string = "RRQ")]
    ReadRequest = 1,
    /// Write request
    #[strum(to_string = "WRQ")]
    WriteRequest = 2,
    /// Data block
    #[strum(to_string = "DATA")]
    Data = 3,
    /// Acknowledgement
    #[strum(to_string = "ACK")]
    Ack = 4,
    /// Error report
    #[strum(to_string = "ERROR")]
    Error = 5,
}

impl From<RequestKind> for Opcode {
    fn from(kind: RequestKind) -> Self {
        match kind {
            RequestKind::Read => Opcode::ReadRequest,
            RequestKind::Write => Opcode::WriteRequest,
        }
    }
}

/// Reasons an inbound datagram could not be decoded
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PacketError {
    /// Too short to contain the fixed fields for its type
    #[error("packet truncated ({0} bytes)")]
    Truncated(usize),
    /// The opcode is not one we know
    #[error("unknown opcode {0}")]
    UnknownOpcode(u16),
    /// A string field ran to the end of the datagram without a NUL terminator
    #[error("{0} is not NUL-terminated")]
    Unterminated(&'static str),
    /// A string field was not valid UTF-8
    #[error("{0} is not valid text")]
    Encoding(&'static str),
    /// The request named no file
    #[error("empty filename")]
    EmptyFilename,
    /// A DATA payload longer than a block
    #[error("data payload of {0} bytes exceeds the block size")]
    Oversized(usize),
}

/// A decoded TFTP packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// Read or write request
    Request(Request),
    /// A block of file content
    Data {
        /// Block number
        block: u16,
        /// Content, at most [`BLOCK_SIZE`] bytes
        payload: Vec<u8>,
    },
    /// Acknowledgement of a block
    Ack {
        /// Block number being acknowledged
        block: u16,
    },
    /// Error report. The code is kept raw as peers may send values we don't know.
    Error {
        /// Error code
        code: u16,
        /// Human-readable message
        message: String,
    },
}

impl Display for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Packet::Request(r) => write!(f, "{r}"),
            Packet::Data { block, payload } => {
                write!(f, "DATA block {block} ({} bytes)", payload.len())
            }
            Packet::Ack { block } => write!(f, "ACK block {block}"),
            Packet::Error { code, message } => write!(f, "ERROR {code} \"{message}\""),
        }
    }
}

fn read_u16(buf: &[u8], at: usize) -> Option<u16> {
    let bytes = buf.get(at..at + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

impl Opcode {
    /// Reads the opcode of a datagram without looking at the rest of it
    pub fn of(datagram: &[u8]) -> Result<Self, PacketError> {
        let raw = read_u16(datagram, 0).ok_or(PacketError::Truncated(datagram.len()))?;
        Opcode::from_repr(raw).ok_or(PacketError::UnknownOpcode(raw))
    }
}

impl Packet {
    /// The opcode of this packet
    #[must_use]
    pub fn opcode(&self) -> Opcode {
        match self {
            Packet::Request(r) => r.kind.into(),
            Packet::Data { .. } => Opcode::Data,
            Packet::Ack { .. } => Opcode::Ack,
            Packet::Error { .. } => Opcode::Error,
        }
    }

    /// Decodes a datagram. Every read is bounded by the length of `buf`.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        let opcode = Opcode::of(buf)?;
        let body = &buf[2..];
        match opcode {
            Opcode::ReadRequest => Request::parse(RequestKind::Read, body).map(Packet::Request),
            Opcode::WriteRequest => Request::parse(RequestKind::Write, body).map(Packet::Request),
            Opcode::Data => {
                let block = read_u16(buf, 2).ok_or(PacketError::Truncated(buf.len()))?;
                let payload = &buf[HEADER_SIZE..];
                if payload.len() > BLOCK_SIZE {
                    return Err(PacketError::Oversized(payload.len()));
                }
                Ok(Packet::Data {
                    block,
                    payload: payload.to_vec(),
                })
            }
            Opcode::Ack => {
                let block = read_u16(buf, 2).ok_or(PacketError::Truncated(buf.len()))?;
                Ok(Packet::Ack { block })
            }
            Opcode::Error => {
                let code = read_u16(buf, 2).ok_or(PacketError::Truncated(buf.len()))?;
                // Be lenient with peers that forget the terminator
                let text = &buf[HEADER_SIZE..];
                let end = text.iter().position(|&b| b == 0).unwrap_or(text.len());
                Ok(Packet::Error {
                    code,
                    message: String::from_utf8_lossy(&text[..end]).into_owned(),
                })
            }
        }
    }

    /// Encodes this packet for the wire
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Packet::Request(r) => r.encode(),
            Packet::Data { block, payload } => Self::encode_data(*block, payload),
            Packet::Ack { block } => Self::encode_ack(*block),
            Packet::Error { code, message } => Self::encode_error(*code, message),
        }
    }

    /// Builds a DATA datagram without an intermediate `Packet`
    #[must_use]
    pub fn encode_data(block: u16, payload: &[u8]) -> Vec<u8> {
        let mut v = Vec::with_capacity(HEADER_SIZE + payload.len());
        v.extend_from_slice(&(Opcode::Data as u16).to_be_bytes());
        v.extend_from_slice(&block.to_be_bytes());
        v.extend_from_slice(payload);
        v
    }

    /// Builds an ACK datagram
    #[must_use]
    pub fn encode_ack(block: u16) -> Vec<u8> {
        let mut v = Vec::with_capacity(HEADER_SIZE);
        v.extend_from_slice(&(Opcode::Ack as u16).to_be_bytes());
        v.extend_from_slice(&block.to_be_bytes());
        v
    }

    /// Builds an ERROR datagram. The message should be ASCII; any NUL in it is dropped.
    #[must_use]
    pub fn encode_error(code: u16, message: &str) -> Vec<u8> {
        let mut v = Vec::with_capacity(HEADER_SIZE + message.len() + 1);
        v.extend_from_slice(&(Opcode::Error as u16).to_be_bytes());
        v.extend_from_slice(&code.to_be_bytes());
        v.extend(message.bytes().filter(|&b| b != 0));
        v.push(0);
        v
    }

    /// Convenience constructor for an error packet with a known code
    #[must_use]
    pub fn error(code: ErrorCode, message: &str) -> Self {
        Packet::Error {
            code: code.as_u16(),
            message: message.to_string(),
        }
    }
}
