//! Configuration source wrangling
// (c) 2026 tftpd contributors

use std::path::Path;

use anyhow::{Context as _, Result};
use figment::{
    Figment, Provider,
    providers::{Env, Format as _, Toml},
};
use serde::Deserialize;
use tracing::debug;

use super::{Configuration, SystemDefault};

/// Prefix for environment variables that set configuration fields
pub const ENV_PREFIX: &str = "TFTPD_";

/// Processes and merges all possible configuration sources.
#[derive(Debug, Default)]
pub struct Manager {
    /// Configuration data
    pub(super) data: Figment,
}

impl Manager {
    /// Constructor. The result holds no data at all until providers are merged in.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// General constructor for production use.
    ///
    /// Layers, lowest priority first: system defaults, the configuration file
    /// (if given), then environment variables prefixed `TFTPD_`.
    /// Command-line options are merged on top by the caller.
    pub fn standard(config_file: Option<&Path>) -> Result<Self> {
        let mut new1 = Self::new();
        new1.apply_system_default();
        if let Some(path) = config_file {
            new1.merge_file(path)?;
        }
        new1.merge_provider(Env::prefixed(ENV_PREFIX));
        Ok(new1)
    }

    /// Merges in a TOML configuration file, which must exist.
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            anyhow::bail!("configuration file {} not found", path.display());
        }
        debug!("reading configuration from {}", path.display());
        self.merge_provider(Toml::file(path));
        Ok(())
    }

    /// Merges in a data set, which is some sort of [figment::Provider](https://docs.rs/figment/latest/figment/trait.Provider.html).
    /// This uses figment's `merge` operation, which prefers to _replace_ existing items.
    pub fn merge_provider<T>(&mut self, provider: T)
    where
        T: Provider,
    {
        let f = std::mem::take(&mut self.data);
        self.data = f.merge(provider); // in the error case, this leaves the provider in a fused state
    }

    /// Applies the system default settings, at a lower priority than everything else
    pub fn apply_system_default(&mut self) {
        let f = std::mem::take(&mut self.data);
        self.data = f.join(SystemDefault {});
    }

    /// Attempts to extract a particular struct from the data.
    ///
    /// Within tftpd, `T` is usually [Configuration], but it isn't intrinsically required to be.
    pub fn get<'de, T>(&self) -> Result<T>
    where
        T: Deserialize<'de>,
    {
        Ok(self.data.extract::<T>()?)
    }

    /// Extracts and validates the merged [Configuration].
    pub fn configuration(&self) -> Result<Configuration> {
        self.get::<Configuration>()
            .context("failed to process configuration")?
            .validate()
    }
}
