//! Tracing helpers
// (c) 2026 tftpd contributors

use std::{
    fs::File,
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
};

use anyhow::Context as _;
use serde::{Deserialize, Serialize, de};
use strum::VariantNames as _;
use tracing_subscriber::{
    EnvFilter,
    fmt::{
        MakeWriter,
        time::{ChronoLocal, ChronoUtc},
    },
    prelude::*,
};

static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

const FRIENDLY_FORMAT_LOCAL: &str = "%Y-%m-%d %H:%M:%SL";
const FRIENDLY_FORMAT_UTC: &str = "%Y-%m-%d %H:%M:%SZ";

/// Environment variable that controls what gets logged
const STANDARD_ENV_VAR: &str = "RUST_LOG";

/// Selects the format of time stamps in log messages
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
    clap::ValueEnum,
    Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "kebab-case")]
pub enum TimeFormat {
    /// Local time, as "year-month-day HH:MM:SS"
    #[default]
    Local,
    /// UTC time, as "year-month-day HH:MM:SS"
    Utc,
    /// UTC time, in the format described in [RFC 3339](https://datatracker.ietf.org/doc/html/rfc3339).
    Rfc3339,
}

impl<'de> Deserialize<'de> for TimeFormat {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let lower = s.to_ascii_lowercase();
        std::str::FromStr::from_str(&lower)
            .map_err(|_| de::Error::unknown_variant(&s, TimeFormat::VARIANTS))
    }
}

/// Result type for `filter_for()`
struct FilterResult {
    filter: EnvFilter,
    used_env: bool,
}

/// Uses `RUST_LOG` if set; otherwise logs only our own events at the given level.
fn filter_for(trace_level: &str) -> anyhow::Result<FilterResult> {
    EnvFilter::try_from_env(STANDARD_ENV_VAR)
        .map(|filter| FilterResult {
            filter,
            used_env: true,
        })
        .or_else(|e| {
            if std::env::var(STANDARD_ENV_VAR).is_ok() {
                anyhow::bail!("{STANDARD_ENV_VAR} (set in environment) was not understood: {e}");
            }
            Ok(FilterResult {
                filter: EnvFilter::try_new(format!("tftpd={trace_level}"))?,
                used_env: false,
            })
        })
}

fn make_tracing_layer<S, W, F>(
    writer: W,
    filter: F,
    time_format: TimeFormat,
    show_target: bool,
    ansi: bool,
) -> Box<dyn tracing_subscriber::Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    W: for<'writer> MakeWriter<'writer> + 'static + Sync + Send,
    F: tracing_subscriber::layer::Filter<S> + 'static + Sync + Send,
{
    let layer = tracing_subscriber::fmt::layer::<S>()
        .compact()
        .with_target(show_target)
        .with_ansi(ansi);

    // The timer has to be added before the writer and filter, hence the repetition
    match time_format {
        TimeFormat::Local => layer
            .with_timer(ChronoLocal::new(FRIENDLY_FORMAT_LOCAL.into()))
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
        TimeFormat::Utc => layer
            .with_timer(ChronoUtc::new(FRIENDLY_FORMAT_UTC.into()))
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
        TimeFormat::Rfc3339 => layer
            .with_timer(ChronoUtc::rfc_3339())
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
    }
}

/// Sets up tracing to stderr and optionally to a file.
///
/// By default we log only tftpd events at `trace_level`; `RUST_LOG` overrides this.
///
/// **NOTE:** This only takes effect once per process. Later calls are ignored with a warning.
pub fn setup(
    trace_level: &str,
    log_file: Option<&String>,
    time_format: TimeFormat,
) -> anyhow::Result<()> {
    if is_initialized() {
        tracing::warn!("tracing::setup called a second time (ignoring)");
        return Ok(());
    }
    TRACING_INITIALIZED.store(true, Ordering::Relaxed);

    let layers = setup_inner(trace_level, log_file, time_format)?;
    tracing_subscriber::registry().with(layers).init();
    Ok(())
}

pub(crate) fn setup_inner(
    trace_level: &str,
    log_file: Option<&String>,
    time_format: TimeFormat,
) -> anyhow::Result<
    Vec<Box<dyn tracing_subscriber::Layer<tracing_subscriber::Registry> + Send + Sync>>,
> {
    let filter = filter_for(trace_level)?;
    let mut layers = vec![make_tracing_layer(
        std::io::stderr,
        filter.filter,
        time_format,
        filter.used_env,
        std::io::IsTerminal::is_terminal(&std::io::stderr()),
    )];

    if let Some(filename) = log_file {
        let out_file = Arc::new(File::create(filename).context("Failed to open log file")?);
        let filter = filter_for(trace_level)?;
        layers.push(make_tracing_layer(
            out_file,
            filter.filter,
            time_format,
            filter.used_env,
            false,
        ));
    }

    Ok(layers)
}

/// Returns whether tracing has been initialized
#[must_use]
pub fn is_initialized() -> bool {
    TRACING_INITIALIZED.load(Ordering::Relaxed)
}
