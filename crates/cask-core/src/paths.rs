//! Filesystem layout under the cask home.

use dirs::home_dir;
use std::path::{Path, PathBuf};

/// Returns the cask home directory (`$CASK_HOME`, else `~/.cask`), or None if
/// the user's home cannot be resolved.
pub fn cask_home() -> Option<PathBuf> {
    if let Some(val) = std::env::var_os("CASK_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".cask"))
}

/// Config file: <home>/config.toml
pub fn config_path(home: &Path) -> PathBuf {
    home.join("config.toml")
}

/// Download cache: <home>/cache
pub fn cache_path(home: &Path) -> PathBuf {
    home.join("cache")
}

/// Default catalog of cask files: <home>/Casks
pub fn default_catalog(home: &Path) -> PathBuf {
    home.join("Casks")
}

/// Where bundles go unless configured otherwise.
pub fn default_appdir() -> PathBuf {
    PathBuf::from("/Applications")
}

/// Extract the filename from a URL, ignoring any query string or fragment.
pub fn filename_from_url(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.split('/').next_back().unwrap_or("")
}
