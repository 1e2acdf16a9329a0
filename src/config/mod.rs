// (c) 2026 tftpd contributors

//! # Configuration management
//!
//! tftpd obtains run-time configuration from the following sources, in order of priority:
//!
//! 1. Command-line options
//! 2. Environment variables prefixed `TFTPD_` (e.g. `TFTPD_PORT=6969`)
//! 3. A TOML configuration file, if one was named with `--config`
//! 4. Hard-wired defaults ([`Configuration::system_default()`])
//!
//! Each option may appear in multiple places; the highest priority source wins.
//!
//! ## Configuration file format
//!
//! The file is plain TOML, using the field names of [`Configuration`]:
//!
//! ```toml
//! port = 6969
//! read_root = "/srv/tftp/read"
//! write_root = "/srv/tftp/incoming"
//! write_quota = 52428800
//! timeout_ms = 500
//! ```
//!
//! Run `tftpd --show-config` to see the result of merging all sources.

mod manager;
mod overrides;
mod structure;
mod sysdefault;

pub use manager::{ENV_PREFIX, Manager};
pub use overrides::ConfigOverrides;
pub use structure::{Configuration, DEFAULT_PORT};
use sysdefault::SystemDefault;
