//! Command-line argument definitions
// (c) 2026 tftpd contributors

use std::path::PathBuf;

use clap::Parser;

use crate::config::ConfigOverrides;

/// A TFTP (RFC 1350) server for octet-mode transfers
#[derive(Debug, Parser, Clone, PartialEq, Eq, Default)]
#[command(
    author,
    version,
    about,
    long_about = "A TFTP (RFC 1350) server.\n\nServes files from one directory to read requests and stores files from write requests in another, subject to a storage quota. Only octet (binary) mode is supported.",
    infer_long_args(true)
)]
pub(crate) struct CliArgs {
    /// Enable detailed debug output
    ///
    /// This has the same effect as setting `RUST_LOG=tftpd=debug` in the environment.
    /// If present, `RUST_LOG` overrides this option.
    #[arg(short, long, action, help_heading("Output"), conflicts_with("quiet"))]
    pub debug: bool,

    /// Quiet mode: only log errors
    #[arg(short, long, action, help_heading("Output"))]
    pub quiet: bool,

    /// Log to a file as well as the console
    ///
    /// The file is truncated on start.
    #[arg(short('l'), long, action, value_name("FILE"), help_heading("Output"))]
    pub log_file: Option<String>,

    /// Read configuration from this TOML file
    #[arg(short, long("config"), value_name("FILE"), help_heading("Configuration"))]
    pub config_file: Option<PathBuf>,

    /// Print the merged configuration, then exit
    #[arg(long, help_heading("Configuration"))]
    pub show_config: bool,

    #[command(flatten)]
    pub config: ConfigOverrides,
}
