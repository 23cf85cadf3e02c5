//! Run configuration loaded from a JSON file.
//!
//! Keys are snake_case; the upper-case names older config files use
//! (`BASE_URL`, `DOWNLOAD_DIR`, `DATA_FILE`, ...) are accepted as aliases.
//! Unknown keys are ignored.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::download::{CONNECT_TIMEOUT_SECS, MAX_TIMEOUT_SECS, READ_TIMEOUT_SECS, Timeouts};
use crate::index::{BuildSettings, StaticDecisions};

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Errors loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON or misses a required key.
    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A value is out of range or malformed.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Everything a run needs to know.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PortalConfig {
    /// Portal root, e.g. `https://canvas.example.edu`.
    #[serde(alias = "BASE_URL")]
    pub base_url: String,
    /// Root of the local mirror.
    #[serde(alias = "DOWNLOAD_DIR")]
    pub download_dir: PathBuf,
    /// Persisted index file.
    #[serde(alias = "DATA_FILE")]
    pub index_file: PathBuf,
    /// Standalone download ledger.
    #[serde(alias = "DOWNLOAD_LOG_FILE")]
    pub ledger_file: PathBuf,
    /// JSON cookie export used for the session.
    #[serde(alias = "COOKIES_FILE")]
    pub cookies_file: PathBuf,
    /// Optional run log; nothing is written to disk when absent.
    #[serde(default, alias = "SCRIPT_LOG_FILE")]
    pub log_file: Option<PathBuf>,
    /// Answer every question from the flags below instead of prompting.
    #[serde(default)]
    pub static_settings: bool,
    #[serde(default)]
    pub always_reindex: bool,
    #[serde(default)]
    pub always_redownload: bool,
    /// Write Markdown notes for "page" items.
    #[serde(default = "default_true")]
    pub save_pages: bool,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_connect_timeout() -> u64 {
    CONNECT_TIMEOUT_SECS
}

fn default_request_timeout() -> u64 {
    READ_TIMEOUT_SECS
}

/// Mode switches given on the command line. Each can only turn a mode on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeOverrides {
    pub static_settings: bool,
    pub reindex: bool,
    pub redownload: bool,
}

impl PortalConfig {
    /// Reads, parses and validates the config at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is missing, malformed or invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        debug!(path = %path.display(), base_url = %config.base_url, "loaded config");
        Ok(config)
    }

    /// Parses config JSON and normalizes the base URL. Does not validate.
    ///
    /// # Errors
    ///
    /// Returns the parser error for malformed JSON or missing keys.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let mut config: Self = serde_json::from_str(text)?;
        config.base_url = config.base_url.trim().trim_end_matches('/').to_string();
        Ok(config)
    }

    /// Checks values against runtime constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match url::Url::parse(&self.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {}
            _ => {
                return Err(ConfigError::invalid(
                    "base_url",
                    format!("expected an http(s) URL, got '{}'", self.base_url),
                ));
            }
        }

        for (field, path) in [
            ("download_dir", &self.download_dir),
            ("index_file", &self.index_file),
            ("ledger_file", &self.ledger_file),
            ("cookies_file", &self.cookies_file),
        ] {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::invalid(field, "path must not be empty"));
            }
        }
        if self
            .log_file
            .as_ref()
            .is_some_and(|path| path.as_os_str().is_empty())
        {
            return Err(ConfigError::invalid("log_file", "path must not be empty"));
        }

        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("request_timeout_secs", self.request_timeout_secs)?;
        Ok(())
    }

    /// Applies command-line mode switches over the file values.
    pub fn apply_overrides(&mut self, overrides: ModeOverrides) {
        self.static_settings |= overrides.static_settings;
        self.always_reindex |= overrides.reindex;
        self.always_redownload |= overrides.redownload;
    }

    /// Client timeouts.
    #[must_use]
    pub fn timeouts(&self) -> Timeouts {
        Timeouts::from_secs(self.connect_timeout_secs, self.request_timeout_secs)
    }

    /// Settings for the index builder.
    #[must_use]
    pub fn build_settings(&self) -> BuildSettings {
        BuildSettings {
            base_url: self.base_url.clone(),
            download_dir: self.download_dir.clone(),
            save_pages: self.save_pages,
        }
    }

    /// Unattended answers from the mode flags.
    #[must_use]
    pub fn static_decisions(&self) -> StaticDecisions {
        StaticDecisions {
            always_reindex: self.always_reindex,
            always_redownload: self.always_redownload,
        }
    }
}

fn validate_timeout_secs(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if !(1..=MAX_TIMEOUT_SECS).contains(&value) {
        return Err(ConfigError::invalid(
            field,
            format!("{value}. Expected range: 1..={MAX_TIMEOUT_SECS}"),
        ));
    }
    Ok(())
}
