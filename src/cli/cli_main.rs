//! Main CLI for tftpd
// (c) 2026 tftpd contributors

use std::{ffi::OsString, process::ExitCode};

use anyhow::{Context as _, Result};
use clap::Parser as _;
use tracing::info;

use super::args::CliArgs;
use crate::{
    Configuration, Server,
    config::Manager,
    util::{setup_tracing, tracing_is_initialised},
};

/// Computes the trace level for a given set of [`CliArgs`]
fn trace_level(args: &CliArgs) -> &'static str {
    if args.debug {
        "debug"
    } else if args.quiet {
        "error"
    } else {
        "info"
    }
}

/// Main CLI entrypoint
///
/// Call this from `main`, passing the arguments to use.
/// Normally you will call `cli(std::env::args_os())` but you can pass in alternate arguments for CLI testing.
///
/// This function starts a tokio runtime and runs the server in it until Ctrl-C.
#[must_use]
pub fn cli<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    cli_inner(args)
        .inspect_err(|e| {
            if tracing_is_initialised() {
                tracing::error!("{e:#}");
            } else {
                eprintln!("Error: {e:#}");
            }
        })
        .map_or(ExitCode::FAILURE, |()| ExitCode::SUCCESS)
}

fn cli_inner<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    use clap::error::ErrorKind::{DisplayHelp, DisplayVersion};
    let args = match CliArgs::try_parse_from(args) {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), DisplayHelp | DisplayVersion) => {
            e.print()?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let mut manager = Manager::standard(args.config_file.as_deref())?;
    manager.merge_provider(args.config.clone());
    let config = manager.configuration()?;

    if args.show_config {
        println!("{config}");
        return Ok(());
    }

    setup_tracing(trace_level(&args), args.log_file.as_ref(), config.time_format)?;
    run_server(&config)
}

#[tokio::main]
async fn run_server(config: &Configuration) -> Result<()> {
    let server = Server::bind(config).await?;
    tokio::select! {
        result = server.run() => result,
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            info!("shutting down");
            Ok(())
        }
    }
}
