//! User configuration (`<home>/config.toml`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::io::postflight::DEFAULT_TIMEOUT;
use crate::paths;
use crate::resolver::PlaceholderPolicy;

/// Errors raised while reading the config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Neither `CASK_HOME` nor a home directory is available.
    #[error("Could not determine home directory. Set CASK_HOME to override.")]
    NoHome,

    /// The file exists but cannot be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        /// Config path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid config TOML.
    #[error("Invalid config {}: {source}", .path.display())]
    Parse {
        /// Config path.
        path: PathBuf,
        /// Deserializer error.
        #[source]
        source: toml::de::Error,
    },
}

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Applications directory.
    pub appdir: Option<PathBuf>,
    /// Catalog directory.
    pub catalog: Option<PathBuf>,
    /// Refuse placeholder checksums.
    pub strict_checksums: Option<bool>,
    /// Postflight command timeout in seconds.
    pub postflight_timeout_secs: Option<u64>,
    /// Download attempts.
    pub retries: Option<u32>,
}

impl ConfigFile {
    /// Read `path`; a missing file is an empty config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Effective settings after defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Root of cask state (`CASK_HOME`).
    pub home: PathBuf,
    /// Applications directory.
    pub appdir: PathBuf,
    /// Catalog directory.
    pub catalog: PathBuf,
    /// Download cache.
    pub cache_dir: PathBuf,
    /// Placeholder checksum handling.
    pub policy: PlaceholderPolicy,
    /// Postflight command timeout.
    pub postflight_timeout: Duration,
    /// Download attempts, including the first.
    pub retries: u32,
}

impl Config {
    /// Resolve the home directory and read its config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHome`] or a file error.
    pub fn load() -> Result<Self, ConfigError> {
        let home = paths::cask_home().ok_or(ConfigError::NoHome)?;
        Self::load_from(&home)
    }

    /// Read `<home>/config.toml` and fill in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load_from(home: &Path) -> Result<Self, ConfigError> {
        let file = ConfigFile::load(&paths::config_path(home))?;
        Ok(Self::from_file(home, file))
    }

    /// Apply defaults to a parsed file.
    pub fn from_file(home: &Path, file: ConfigFile) -> Self {
        Self {
            home: home.to_path_buf(),
            appdir: file.appdir.unwrap_or_else(paths::default_appdir),
            catalog: file
                .catalog
                .unwrap_or_else(|| paths::default_catalog(home)),
            cache_dir: paths::cache_path(home),
            policy: PlaceholderPolicy::from_strict(file.strict_checksums.unwrap_or(false)),
            postflight_timeout: file
                .postflight_timeout_secs
                .map_or(DEFAULT_TIMEOUT, Duration::from_secs),
            retries: file.retries.unwrap_or(3).max(1),
        }
    }
}
