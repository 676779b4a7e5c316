//! The machine a cask is being resolved for.

use std::process::Command;

use thiserror::Error;
use tracing::debug;

use cask_schema::{Arch, MacOsError, MacOsVersion};

/// Env var overriding the detected architecture.
pub const ARCH_ENV: &str = "CASK_ARCH";
/// Env var overriding the detected macOS version.
pub const MACOS_ENV: &str = "CASK_MACOS";

/// Errors raised while working out the host.
#[derive(Error, Debug)]
pub enum HostError {
    /// `CASK_ARCH` or `--arch` names no known architecture.
    #[error("{0}")]
    Arch(String),

    /// `CASK_MACOS`, `--macos` or `sw_vers` gave an unparseable version.
    #[error("Invalid macOS version '{value}': {source}")]
    MacOs {
        /// Offending text.
        value: String,
        /// Parse error.
        #[source]
        source: MacOsError,
    },

    /// No override was given and `sw_vers` is unavailable.
    #[error("Cannot detect the macOS version ({0}); pass --macos or set CASK_MACOS")]
    Undetectable(String),
}

/// Architecture and macOS version of the target machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Host {
    /// CPU architecture.
    pub arch: Arch,
    /// macOS version.
    pub macos: MacOsVersion,
}

impl Host {
    /// Detect the target machine. Explicit values take precedence over
    /// `CASK_ARCH` / `CASK_MACOS`, which take precedence over probing.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] if an override does not parse, or if the macOS
    /// version has to be probed and `sw_vers` is missing or fails.
    pub fn detect_with(arch: Option<&str>, macos: Option<&str>) -> Result<Self, HostError> {
        let arch = match arch.map(str::to_string).or_else(|| env(ARCH_ENV)) {
            Some(a) => a.parse().map_err(HostError::Arch)?,
            None => Arch::current(),
        };

        let macos = match macos.map(str::to_string).or_else(|| env(MACOS_ENV)) {
            Some(v) => parse_macos(&v)?,
            None => parse_macos(&sw_vers()?)?,
        };

        debug!(%arch, %macos, "host");
        Ok(Self { arch, macos })
    }
}

fn env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_macos(value: &str) -> Result<MacOsVersion, HostError> {
    MacOsVersion::parse(value).map_err(|source| HostError::MacOs {
        value: value.to_string(),
        source,
    })
}

fn sw_vers() -> Result<String, HostError> {
    let path = which::which("sw_vers").map_err(|e| HostError::Undetectable(e.to_string()))?;
    let output = Command::new(path)
        .arg("-productVersion")
        .output()
        .map_err(|e| HostError::Undetectable(e.to_string()))?;
    if !output.status.success() {
        return Err(HostError::Undetectable(format!(
            "sw_vers exited with {}",
            output.status
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_values_win() {
        let host = Host::detect_with(Some("intel"), Some("sonoma")).unwrap();
        assert_eq!(host.arch, Arch::Intel);
        assert_eq!(host.macos, MacOsVersion::new(14, 0, 0));

        let host = Host::detect_with(Some("aarch64"), Some("14.2.1")).unwrap();
        assert_eq!(host.arch, Arch::Arm);
        assert_eq!(host.macos, MacOsVersion::new(14, 2, 1));
    }

    #[test]
    fn bad_values_are_errors() {
        assert!(matches!(
            Host::detect_with(Some("sparc"), Some("14")),
            Err(HostError::Arch(_))
        ));
        assert!(matches!(
            Host::detect_with(Some("arm"), Some("windows")),
            Err(HostError::MacOs { .. })
        ));
    }
}
