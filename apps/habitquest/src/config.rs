//! # Configuration
//!
//! Settings come from three layers, later layers winning:
//!
//! 1. `habitquest.toml` (explicit `--config` path, or the working directory)
//! 2. `HABITQUEST_*` environment variables
//! 3. Command-line flags
//!
//! ```toml
//! database = "~/habitquest.redb"
//! seed = 42
//! log_filter = "habitquest=debug"
//! utc_offset_minutes = 120
//! ```

use chrono::FixedOffset;
use habitquest_core::ProgressionError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "habitquest.toml";

/// Database used when no layer names one.
pub const DEFAULT_DATABASE: &str = "habitquest.redb";

/// Default tracing filter.
pub const DEFAULT_LOG_FILTER: &str = "habitquest=info,habitquest_core=warn";

/// Filter used with `--verbose`.
pub const VERBOSE_LOG_FILTER: &str = "habitquest=debug,habitquest_core=debug";

/// Maximum config file size (64 KB).
const MAX_CONFIG_FILE_SIZE: u64 = 64 * 1024;

/// Largest accepted UTC offset, in minutes.
const MAX_OFFSET_MINUTES: i32 = 18 * 60;

// =============================================================================
// CONFIG
// =============================================================================

/// Merged settings before command-line flags are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Path to the redb database.
    pub database: Option<PathBuf>,
    /// Seed for gate generation. Entropy when absent.
    pub seed: Option<u64>,
    /// Tracing filter directive.
    pub log_filter: Option<String>,
    /// Offset of the local calendar. Host offset when absent.
    pub utc_offset_minutes: Option<i32>,
}

impl Config {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ProgressionError> {
        let config: Config = toml::from_str(text)
            .map_err(|e| ProgressionError::SerializationError(format!("config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file layer and apply the process environment.
    ///
    /// An explicit path must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ProgressionError> {
        let file = match path {
            Some(path) => Self::read_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::read_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        file.with_env(|key| std::env::var(key).ok())
    }

    fn read_file(path: &Path) -> Result<Self, ProgressionError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            ProgressionError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ProgressionError::InvalidInput(format!(
                "Config size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            ProgressionError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "config file loaded");
        Self::from_toml_str(&text)
    }

    /// Apply `HABITQUEST_*` overrides read through `lookup`.
    ///
    /// Recognized keys: `HABITQUEST_DATABASE`, `HABITQUEST_SEED`, `HABITQUEST_LOG`,
    /// `HABITQUEST_UTC_OFFSET_MINUTES`. Empty values are ignored.
    pub fn with_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ProgressionError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(database) = get("HABITQUEST_DATABASE") {
            self.database = Some(PathBuf::from(database));
        }
        if let Some(seed) = get("HABITQUEST_SEED") {
            self.seed = Some(seed.trim().parse().map_err(|_| {
                ProgressionError::InvalidInput(format!("HABITQUEST_SEED '{}' is not a u64", seed))
            })?);
        }
        if let Some(filter) = get("HABITQUEST_LOG") {
            self.log_filter = Some(filter);
        }
        if let Some(offset) = get("HABITQUEST_UTC_OFFSET_MINUTES") {
            self.utc_offset_minutes = Some(offset.trim().parse().map_err(|_| {
                ProgressionError::InvalidInput(format!(
                    "HABITQUEST_UTC_OFFSET_MINUTES '{}' is not an integer",
                    offset
                ))
            })?);
        }

        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ProgressionError> {
        if let Some(minutes) = self.utc_offset_minutes
            && minutes.abs() > MAX_OFFSET_MINUTES
        {
            return Err(ProgressionError::InvalidInput(format!(
                "utc_offset_minutes {} is outside +/-{}",
                minutes, MAX_OFFSET_MINUTES
            )));
        }
        Ok(())
    }

    /// Database path, falling back to [`DEFAULT_DATABASE`].
    #[must_use]
    pub fn database_or_default(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE))
    }

    /// Configured calendar offset, if any.
    pub fn utc_offset(&self) -> Result<Option<FixedOffset>, ProgressionError> {
        self.utc_offset_minutes
            .map(|minutes| {
                FixedOffset::east_opt(minutes.saturating_mul(60)).ok_or_else(|| {
                    ProgressionError::InvalidInput(format!("invalid utc offset {}", minutes))
                })
            })
            .transpose()
    }

    /// Tracing filter for this run.
    #[must_use]
    pub fn log_filter_or_default(&self, verbose: bool) -> String {
        match (&self.log_filter, verbose) {
            (_, true) => VERBOSE_LOG_FILTER.to_string(),
            (Some(filter), false) => filter.clone(),
            (None, false) => DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
