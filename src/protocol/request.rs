//! Read and write requests
// (c) 2026 tftpd contributors

use std::fmt::Display;
use std::str::FromStr as _;

use super::{Opcode, PacketError};

/// Direction of a requested transfer
#[allow(clippy::module_name_repetitions)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, strum::Display)]
pub enum RequestKind {
    /// The client wants to read a file from us
    #[strum(to_string = "read")]
    Read,
    /// The client wants to write a file to us
    #[strum(to_string = "write")]
    Write,
}

/// Transfer modes defined by RFC 1350.
///
/// Only [`TransferMode::Octet`] is supported by this server.
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TransferMode {
    /// Text with network newline conversion
    Netascii,
    /// Raw bytes
    Octet,
    /// Obsolete mail delivery mode
    Mail,
}

impl TransferMode {
    /// Whether we can serve a transfer in this mode
    #[must_use]
    pub fn is_supported(self) -> bool {
        self == TransferMode::Octet
    }
}

/// A decoded RRQ or WRQ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Read or write
    pub kind: RequestKind,
    /// Requested file, relative to the served directory
    pub filename: String,
    /// Transfer mode string, case-folded to lower case
    pub mode: String,
}

impl Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} \"{}\" mode {}",
            Opcode::from(self.kind),
            self.filename,
            self.mode
        )
    }
}

/// Splits a NUL-terminated string off the front of `buf`.
/// The scan never goes past the end of `buf`.
fn take_cstr<'a>(buf: &'a [u8], what: &'static str) -> Result<(&'a str, &'a [u8]), PacketError> {
    let end = buf
        .iter()
        .position(|&b| b == 0)
        .ok_or(PacketError::Unterminated(what))?;
    let s = std::str::from_utf8(&buf[..end]).map_err(|_| PacketError::Encoding(what))?;
    Ok((s, &buf[end + 1..]))
}

impl Request {
    /// Constructor
    #[must_use]
    pub fn new(kind: RequestKind, filename: &str, mode: &str) -> Self {
        Self {
            kind,
            filename: filename.to_string(),
            mode: mode.to_ascii_lowercase(),
        }
    }

    /// Parses the body of a request (everything after the opcode).
    ///
    /// Anything following the mode string (RFC 2347 options) is ignored.
    pub fn parse(kind: RequestKind, body: &[u8]) -> Result<Self, PacketError> {
        let (filename, rest) = take_cstr(body, "filename")?;
        let (mode, _options) = take_cstr(rest, "mode")?;
        if filename.is_empty() {
            return Err(PacketError::EmptyFilename);
        }
        Ok(Self::new(kind, filename, mode))
    }

    /// The transfer mode, if it is one RFC 1350 defines
    #[must_use]
    pub fn transfer_mode(&self) -> Option<TransferMode> {
        TransferMode::from_str(&self.mode).ok()
    }

    /// Encodes this request for the wire
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut v = Vec::with_capacity(4 + self.filename.len() + self.mode.len());
        v.extend_from_slice(&(Opcode::from(self.kind) as u16).to_be_bytes());
        v.extend_from_slice(self.filename.as_bytes());
        v.push(0);
        v.extend_from_slice(self.mode.as_bytes());
        v.push(0);
        v
    }
}
