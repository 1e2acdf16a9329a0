//! Transfer failure taxonomy
// (c) 2026 tftpd contributors

use std::io;

use crate::{guard::GuardError, protocol::ErrorCode};

/// Why a transfer did not complete.
///
/// [`TransferError::reply`] says what, if anything, the peer is told.
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// The peer sent us an ERROR packet
    #[error("peer aborted the transfer with error {code}: {message}")]
    PeerAborted {
        /// Code the peer sent
        code: u16,
        /// Message the peer sent
        message: String,
    },
    /// The peer stopped responding
    #[error("gave up on block {block} after the maximum number of retransmissions")]
    RetriesExhausted {
        /// The block we were trying to exchange
        block: u16,
    },
    /// Read of a file that isn't there
    #[error("file not found")]
    FileNotFound,
    /// Path escapes its root, or the file may not be opened
    #[error("access violation: {0}")]
    AccessViolation(String),
    /// Storing the file would exceed the write quota
    #[error("{size} bytes would exceed the write quota of {limit} bytes")]
    DiskFull {
        /// Bytes the write directory would hold
        size: u64,
        /// Configured budget
        limit: u64,
    },
    /// Write to a file that is already there
    #[error("file already exists")]
    FileExists,
    /// Write target failed the creation probe
    #[error("cannot create target: {0}")]
    NotCreatable(#[source] io::Error),
    /// I/O failure while storing a fully received file
    #[error("failed to store received file: {0}")]
    Commit(#[source] io::Error),
    /// Transfer mode other than octet
    #[error("unsupported transfer mode {0:?}")]
    UnsupportedMode(String),
    /// Anything else
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl TransferError {
    /// The ERROR packet to send the peer, or `None` if we should stay silent.
    #[must_use]
    pub fn reply(&self) -> Option<(ErrorCode, String)> {
        use ErrorCode as C;
        let (code, message) = match self {
            TransferError::PeerAborted { .. } => return None,
            TransferError::RetriesExhausted { .. } => (
                C::NotDefined,
                "Maximum number of retransmissions reached.".to_string(),
            ),
            TransferError::FileNotFound => (C::FileNotFound, C::FileNotFound.default_message()),
            TransferError::AccessViolation(_) | TransferError::NotCreatable(_) => {
                (C::AccessViolation, C::AccessViolation.default_message())
            }
            TransferError::DiskFull { .. } => (C::DiskFull, C::DiskFull.default_message()),
            TransferError::FileExists => {
                (C::FileAlreadyExists, C::FileAlreadyExists.default_message())
            }
            TransferError::Commit(_) => (C::NoSuchUser, C::NoSuchUser.default_message()),
            TransferError::UnsupportedMode(mode) => (
                C::NotDefined,
                format!("Transfer mode \"{mode}\" is not supported; use octet."),
            ),
            TransferError::Io(_) => (C::NotDefined, C::NotDefined.default_message()),
        };
        Some((code, message))
    }
}

impl From<GuardError> for TransferError {
    fn from(e: GuardError) -> Self {
        match e {
            GuardError::Escapes(name) => TransferError::AccessViolation(name),
            GuardError::QuotaExceeded { size, used, limit } => TransferError::DiskFull {
                size: used.saturating_add(size),
                limit,
            },
            GuardError::AlreadyExists => TransferError::FileExists,
            GuardError::Io(e) => TransferError::Io(e),
        }
    }
}
