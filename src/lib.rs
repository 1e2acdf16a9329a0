// (c) 2026 tftpd contributors

//! `tftpd` is a server for the Trivial File Transfer Protocol ([RFC 1350]) over UDP.
//!
//! ## Overview
//! - Concurrent read and write transfers, each on its own ephemeral port
//! - Lock-step DATA/ACK exchange with timeout-driven retransmission
//! - Separate directories for reads and writes; requests cannot reach outside them
//! - A storage quota on the write directory, enforced before anything is stored
//! - Octet (binary) mode only
//!
//! ## Getting started
//!
//! ```text
//! mkdir -p TFTP/read TFTP/write
//! tftpd --port 6969
//! ```
//!
//! Then from another shell: `tftp -m binary localhost 6969 -c get somefile`.
//!
//! See [config] for the available options and how they are layered, and
//! [protocol] for the wire format.
//!
//! ## Embedding
//!
//! ```no_run
//! # async fn demo() -> anyhow::Result<()> {
//! let mut config = tftpd::Configuration::system_default().clone();
//! config.port = 6969;
//! let server = tftpd::Server::bind(&config).await?;
//! server.run().await
//! # }
//! ```
//!
//! [RFC 1350]: https://datatracker.ietf.org/doc/html/rfc1350

pub mod config;
pub mod guard;
pub mod protocol;
pub mod server;
pub mod util;

mod cli;
pub use cli::cli as main;

pub use config::Configuration;
pub use server::{Server, TransferError, TransferStats};
