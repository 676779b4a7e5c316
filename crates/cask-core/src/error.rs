//! Domain-specific errors for resolution and installation

use cask_schema::{Arch, CaskName, MacOsVersion};
use thiserror::Error;

use crate::io::download::FetchError;
use crate::io::install::InstallError;
use crate::io::verify::ChecksumMismatch;
use crate::loader::LoadError;

/// Failures raised by [`resolve`](crate::resolver::resolve) before anything touches the network.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The running macOS is older than the manifest's floor.
    #[error("{name} requires macOS {required} or newer (running {actual})")]
    UnsupportedOs {
        /// Cask token.
        name: CaskName,
        /// Declared floor.
        required: MacOsVersion,
        /// Running version.
        actual: MacOsVersion,
    },

    /// The running architecture is not declared by the manifest.
    #[error("{name} has no artifact for architecture '{arch}' (available: {})", list(.supported))]
    UnsupportedArchitecture {
        /// Cask token.
        name: CaskName,
        /// Requested architecture.
        arch: Arch,
        /// Declared architectures.
        supported: Vec<Arch>,
    },

    /// The checksum is a placeholder and the strict policy is in force.
    #[error("{name} has a placeholder checksum for '{arch}' and strict checksums are enabled")]
    UnverifiedChecksum {
        /// Cask token.
        name: CaskName,
        /// Architecture whose checksum is missing.
        arch: Arch,
    },
}

fn list(arches: &[Arch]) -> String {
    arches
        .iter()
        .map(Arch::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Any failure of the install pipeline.
///
/// Postflight failures are not here: they are warnings carried in
/// [`InstallOutcome`](crate::pipeline::InstallOutcome).
#[derive(Error, Debug)]
pub enum CaskError {
    /// The manifest could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The manifest does not apply to this machine.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Download failed.
    #[error("Network failure: {0}")]
    Network(#[from] FetchError),

    /// The download does not match the manifest.
    #[error(transparent)]
    ChecksumMismatch(#[from] ChecksumMismatch),

    /// The bundle could not be placed.
    #[error("Installation failed: {0}")]
    Installation(#[from] InstallError),

    /// Filesystem error outside a collaborator (cache directory, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
