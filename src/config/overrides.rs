//! Command-line configuration overrides
// (c) 2026 tftpd contributors

use std::{net::IpAddr, path::PathBuf};

use figment::{
    Metadata, Profile, Provider,
    value::{Dict, Map, Value},
};
use serde::Serialize;

use crate::util::TimeFormat;

/// Every [`Configuration`](crate::Configuration) field as an optional command-line option.
///
/// Only the options the user actually gave are fed into the merge, so anything
/// left out falls through to lower priority sources.
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Clone, Default, PartialEq, Eq, clap::Args)]
pub struct ConfigOverrides {
    /// Local address to listen on [default: 0.0.0.0]
    #[arg(short = 'a', long, value_name("ip"), help_heading("Network"))]
    pub address: Option<IpAddr>,

    /// Well-known UDP port for requests [default: 4970]
    #[arg(short, long, help_heading("Network"))]
    pub port: Option<u16>,

    /// Directory served to read requests [default: TFTP/read]
    #[arg(long, value_name("dir"), help_heading("Storage"))]
    pub read_root: Option<PathBuf>,

    /// Directory receiving write requests [default: TFTP/write]
    #[arg(long, value_name("dir"), help_heading("Storage"))]
    pub write_root: Option<PathBuf>,

    /// Storage budget for the write directory [bytes; default 10485760]
    #[arg(long, value_name("bytes"), help_heading("Storage"))]
    pub write_quota: Option<u64>,

    /// Retransmission timeout [milliseconds; default 200]
    #[arg(short, long, value_name("ms"), help_heading("Transfer"))]
    pub timeout_ms: Option<u64>,

    /// Unanswered attempts before a transfer is abandoned [default: 10]
    #[arg(short = 'r', long, help_heading("Transfer"))]
    pub max_retries: Option<u32>,

    /// Maximum concurrent transfers, 0 for no limit [default: 64]
    #[arg(long, help_heading("Transfer"))]
    pub max_sessions: Option<u32>,

    /// Time format for log messages [default: local]
    #[arg(long, value_name("format"), help_heading("Output"))]
    pub time_format: Option<TimeFormat>,
}

fn insert<T: Serialize>(
    dict: &mut Dict,
    key: &str,
    value: Option<&T>,
) -> Result<(), figment::Error> {
    if let Some(inner) = value {
        let _ = dict.insert(key.to_string(), Value::serialize(inner)?);
    }
    Ok(())
}

impl Provider for ConfigOverrides {
    fn metadata(&self) -> Metadata {
        Metadata::named("command-line").interpolater(|_profile, path| {
            let key = path
                .last()
                .map_or("<unknown>".to_string(), |s| s.replace('_', "-"));
            format!("--{key}")
        })
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        let mut dict = Dict::new();
        insert(&mut dict, "address", self.address.as_ref())?;
        insert(&mut dict, "port", self.port.as_ref())?;
        insert(&mut dict, "read_root", self.read_root.as_ref())?;
        insert(&mut dict, "write_root", self.write_root.as_ref())?;
        insert(&mut dict, "write_quota", self.write_quota.as_ref())?;
        insert(&mut dict, "timeout_ms", self.timeout_ms.as_ref())?;
        insert(&mut dict, "max_retries", self.max_retries.as_ref())?;
        insert(&mut dict, "max_sessions", self.max_sessions.as_ref())?;
        insert(&mut dict, "time_format", self.time_format.as_ref())?;

        let mut profile_map = Map::new();
        let _ = profile_map.insert(Profile::Global, dict);
        Ok(profile_map)
    }
}
