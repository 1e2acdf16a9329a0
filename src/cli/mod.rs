//! Command Line Interface for tftpd
// (c) 2026 tftpd contributors
mod args;
mod cli_main;
pub use cli_main::cli;
