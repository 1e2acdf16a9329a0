// (c) 2026 tftpd contributors

//! # 📖 Wire protocol
//!
//! tftpd speaks the Trivial File Transfer Protocol as described in [RFC 1350].
//!
//! All multi-byte integers are big-endian. Every packet starts with a two-byte [`Opcode`].
//!
//! | Packet | Layout |
//! |---|---|
//! | Read/Write request | `opcode (1 = RRQ, 2 = WRQ)`, `filename`, `0x00`, `mode`, `0x00` |
//! | Data | `opcode (3)`, `block (2 bytes)`, `payload (0..=512 bytes)` |
//! | Ack | `opcode (4)`, `block (2 bytes)` |
//! | Error | `opcode (5)`, `code (2 bytes)`, `message`, `0x00` |
//!
//! ## Transfer identifiers
//!
//! Requests arrive at the well-known port. The server answers each accepted request from a
//! freshly bound ephemeral port, and the client must address every further packet of that
//! transfer to it. The pair of (address, port) on either side is the transfer identifier (TID);
//! there is no session id field on the wire.
//!
//! ## Lock step
//!
//! Exactly one block is outstanding at any time. Block numbers start at 1 for data
//! (the acknowledgement of a write request carries block 0) and wrap at 65536.
//! A data payload shorter than [`BLOCK_SIZE`] ends the transfer; a file whose length is an
//! exact multiple of [`BLOCK_SIZE`] is therefore followed by an empty block.
//!
//! Only the binary `octet` transfer mode is supported.
//!
//! [RFC 1350]: https://datatracker.ietf.org/doc/html/rfc1350

mod error_code;
pub use error_code::ErrorCode;

mod packet;
pub use packet::{Opcode, Packet, PacketError};

mod request;
pub use request::{Request, RequestKind, TransferMode};

/// Size of a full data block. A shorter block terminates a transfer.
pub const BLOCK_SIZE: usize = 512;

/// Size of the DATA/ACK/ERROR header (opcode plus block number or error code)
pub const HEADER_SIZE: usize = 4;

/// Largest datagram we expect to handle
pub const MAX_DATAGRAM: usize = HEADER_SIZE + BLOCK_SIZE;
