//! Configuration file handling.
//!
//! Settings come from `<config dir>/skuctl/config.toml` (or `--config`), with
//! command-line flags taking precedence. A missing file means defaults.

use std::path::{Path, PathBuf};

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use serde::Deserialize;
use url::Url;

use crate::cli::args::Args;
use crate::constants;
use crate::core::sku::UnmappedSkuPolicy;

/// Effective settings for one run.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Tenant id or domain used for sign-in.
    pub tenant: String,
    /// Public client application id used for device login.
    pub client_id: String,
    /// Identity platform authority.
    pub authority: String,
    /// Directory API base URL.
    pub graph_url: String,
    /// Path of the license reference table.
    pub reference_table: PathBuf,
    /// Delegated scopes requested for every session.
    pub scopes: Vec<String>,
    /// Handling of pools missing from the reference table.
    pub unmapped_skus: UnmappedSkuPolicy,
    /// Open the device login page in a browser.
    pub open_browser: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tenant: constants::DEFAULT_TENANT.to_string(),
            client_id: constants::DEFAULT_CLIENT_ID.to_string(),
            authority: constants::DEFAULT_AUTHORITY.to_string(),
            graph_url: constants::DEFAULT_GRAPH_URL.to_string(),
            reference_table: PathBuf::from(constants::DEFAULT_REFERENCE_TABLE),
            scopes: constants::DEFAULT_SCOPES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            unmapped_skus: UnmappedSkuPolicy::default(),
            open_browser: true,
        }
    }
}

/// Where the configuration was read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl AppConfig {
    /// Default configuration file location.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(constants::APP_NAME).join(constants::CONFIG_FILE_NAME))
    }

    /// Loads the configuration and applies command-line overrides.
    ///
    /// An explicit `--config` path must exist; the default path may be absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or a URL is invalid.
    pub fn load(args: &Args) -> Result<(Self, ConfigSource)> {
        let (mut config, source) = match &args.config {
            Some(path) => (Self::from_file(path)?, ConfigSource::File(path.clone())),
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => (Self::from_file(&path)?, ConfigSource::File(path)),
                None => (Self::default(), ConfigSource::Defaults),
            },
        };
        config.apply_args(args);
        config.validate()?;
        Ok((config, source))
    }

    /// Parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&content).wrap_err_with(|| format!("Invalid config {}", path.display()))
    }

    fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_args(&mut self, args: &Args) {
        if let Some(tenant) = &args.tenant {
            self.tenant.clone_from(tenant);
        }
        if let Some(client_id) = &args.client_id {
            self.client_id.clone_from(client_id);
        }
        if let Some(table) = &args.reference_table {
            self.reference_table.clone_from(table);
        }
        if args.skip_unmapped {
            self.unmapped_skus = UnmappedSkuPolicy::Skip;
        }
        if args.no_browser {
            self.open_browser = false;
        }
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [("graph_url", &self.graph_url), ("authority", &self.authority)] {
            Url::parse(value).wrap_err_with(|| format!("Invalid {name}: {value}"))?;
        }
        if self.scopes.is_empty() {
            return Err(eyre!("At least one scope must be configured"));
        }
        Ok(())
    }
}
