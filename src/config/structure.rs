//! Configuration structure
// (c) 2026 tftpd contributors

use std::{
    fmt::Display,
    net::{IpAddr, Ipv4Addr},
    path::PathBuf,
    sync::LazyLock,
    time::Duration,
};

use anyhow::Result;
use human_repr::{HumanCount as _, HumanDuration as _};
use serde::{Deserialize, Serialize};

use crate::util::TimeFormat;

/// The well-known port on which we listen for requests
pub const DEFAULT_PORT: u16 = 4970;

/// The set of configurable options supported by tftpd.
///
/// There is no `default()`.
/// The hard-wired defaults are available through [`Configuration::system_default()`];
/// see [the module documentation](crate::config) for how sources are layered.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Configuration {
    /// Local address to listen on
    pub address: IpAddr,
    /// Well-known UDP port for incoming requests. 0 picks any free port.
    pub port: u16,
    /// Directory served to read requests
    pub read_root: PathBuf,
    /// Directory receiving write requests
    pub write_root: PathBuf,
    /// Storage budget for the write directory, in bytes
    pub write_quota: u64,
    /// How long to wait for each reply before retransmitting, in milliseconds
    pub timeout_ms: u64,
    /// Consecutive unanswered attempts after which a transfer is abandoned
    pub max_retries: u32,
    /// Concurrent transfer limit. 0 means no limit.
    pub max_sessions: u32,
    /// Time format for log messages
    pub time_format: TimeFormat,
}

static SYSTEM_DEFAULT_CONFIG: LazyLock<Configuration> = LazyLock::new(|| Configuration {
    address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
    port: DEFAULT_PORT,
    read_root: PathBuf::from("TFTP/read"),
    write_root: PathBuf::from("TFTP/write"),
    write_quota: 10 * 1024 * 1024,
    timeout_ms: 200,
    max_retries: 10,
    max_sessions: 64,
    time_format: TimeFormat::Local,
});

impl Configuration {
    /// Hard-wired configuration defaults
    #[must_use]
    pub fn system_default() -> &'static Self {
        &SYSTEM_DEFAULT_CONFIG
    }

    /// The retransmission timeout as a [`Duration`]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Checks the configuration for values that cannot work.
    pub fn try_validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            anyhow::bail!("The retransmission timeout (timeout_ms) must be greater than zero");
        }
        if self.max_retries == 0 {
            anyhow::bail!("max_retries must be at least 1");
        }
        if self.read_root.as_os_str().is_empty() {
            anyhow::bail!("read_root must not be empty");
        }
        if self.write_root.as_os_str().is_empty() {
            anyhow::bail!("write_root must not be empty");
        }
        Ok(())
    }

    /// Validates and returns self
    pub fn validate(self) -> Result<Self> {
        self.try_validate()?;
        Ok(self)
    }
}

impl Display for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sessions = if self.max_sessions == 0 {
            "unlimited".to_string()
        } else {
            self.max_sessions.to_string()
        };
        writeln!(f, "address:      {}", self.address)?;
        writeln!(f, "port:         {}", self.port)?;
        writeln!(f, "read_root:    {}", self.read_root.display())?;
        writeln!(f, "write_root:   {}", self.write_root.display())?;
        writeln!(
            f,
            "write_quota:  {} ({})",
            self.write_quota,
            self.write_quota.human_count_bytes()
        )?;
        writeln!(
            f,
            "timeout_ms:   {} ({})",
            self.timeout_ms,
            self.timeout().human_duration()
        )?;
        writeln!(f, "max_retries:  {}", self.max_retries)?;
        writeln!(f, "max_sessions: {sessions}")?;
        write!(f, "time_format:  {}", self.time_format)
    }
}
