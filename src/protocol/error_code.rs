//! TFTP error codes
// (c) 2026 tftpd contributors

/// Machine-readable error codes carried in an ERROR packet.
///
/// The `Display` form of each code is its canonical default message.
#[allow(clippy::module_name_repetitions)]
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, strum::Display, strum::FromRepr, strum::EnumIter,
)]
#[repr(u16)]
pub enum ErrorCode {
    /// Not defined; see the accompanying message
    #[strum(to_string = "Not defined.")]
    NotDefined = 0,
    /// The requested source file does not exist
    #[strum(to_string = "File not found.")]
    FileNotFound = 1,
    /// The path escapes the served directory, or the target cannot be created
    #[strum(to_string = "Access violation.")]
    AccessViolation = 2,
    /// The write would take the write directory over its storage budget
    #[strum(to_string = "Disk full or allocation exceeded.")]
    DiskFull = 3,
    /// The packet is not a request we understand
    #[strum(to_string = "Illegal TFTP operation.")]
    IllegalOperation = 4,
    /// The packet does not belong to any transfer
    #[strum(to_string = "Unknown transfer ID.")]
    UnknownTransferId = 5,
    /// The write target already exists
    #[strum(to_string = "File already exists.")]
    FileAlreadyExists = 6,
    /// Used by tftpd for an I/O failure while committing a received file
    #[strum(to_string = "No such user.")]
    NoSuchUser = 7,
}

impl ErrorCode {
    /// The value that goes on the wire
    #[must_use]
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Looks up a wire value. Codes outside 0..=7 are not ours.
    #[must_use]
    pub fn from_wire(value: u16) -> Option<Self> {
        Self::from_repr(value)
    }

    /// The canonical message for this code
    #[must_use]
    pub fn default_message(self) -> String {
        self.to_string()
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.as_u16()
    }
}
