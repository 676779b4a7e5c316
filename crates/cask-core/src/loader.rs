//! Reading manifests from disk.
//!
//! `.rb` files go through the cask DSL parser, `.toml` files through serde.
//! Both produce a [`ManifestDef`] that is then validated into a [`Manifest`].

use std::path::{Path, PathBuf};

use cask_schema::{Manifest, ManifestDef, ManifestError};
use thiserror::Error;

use crate::dsl::{self, DslError};

/// Errors raised while loading a manifest file.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The file could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Cask DSL syntax error.
    #[error("{}: {source}", .path.display())]
    Dsl {
        /// File path.
        path: PathBuf,
        /// Parser error, with line.
        #[source]
        source: DslError,
    },

    /// TOML syntax or shape error.
    #[error("{}: {source}", .path.display())]
    Toml {
        /// File path.
        path: PathBuf,
        /// Deserializer error.
        #[source]
        source: toml::de::Error,
    },

    /// The manifest parsed but is invalid.
    #[error("{}: {source}", .path.display())]
    Invalid {
        /// File path.
        path: PathBuf,
        /// Validation error.
        #[source]
        source: ManifestError,
    },

    /// The extension is neither `.rb` nor `.toml`.
    #[error("Unsupported manifest file {} (expected .rb or .toml)", .0.display())]
    UnsupportedFormat(PathBuf),
}

/// Manifest file syntaxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    /// Cask DSL (`.rb`).
    Dsl,
    /// TOML (`.toml`).
    Toml,
}

impl ManifestFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "rb" => Some(Self::Dsl),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Parse manifest source text.
///
/// `origin` only labels errors.
///
/// # Errors
///
/// Returns [`LoadError::Dsl`], [`LoadError::Toml`] or [`LoadError::Invalid`].
pub fn parse_manifest(source: &str, format: ManifestFormat, origin: &Path) -> Result<Manifest, LoadError> {
    let def: ManifestDef = match format {
        ManifestFormat::Dsl => dsl::parse(source).map_err(|source| LoadError::Dsl {
            path: origin.to_path_buf(),
            source,
        })?,
        ManifestFormat::Toml => toml::from_str(source).map_err(|source| LoadError::Toml {
            path: origin.to_path_buf(),
            source,
        })?,
    };
    Manifest::try_from(def).map_err(|source| LoadError::Invalid {
        path: origin.to_path_buf(),
        source,
    })
}

/// Load and validate a manifest file.
///
/// # Errors
///
/// Returns a [`LoadError`] if the file cannot be read, parsed or validated.
pub fn load_manifest(path: &Path) -> Result<Manifest, LoadError> {
    let format =
        ManifestFormat::from_path(path).ok_or_else(|| LoadError::UnsupportedFormat(path.to_path_buf()))?;
    let source = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_manifest(&source, format, path)
}

/// Render a manifest as TOML.
///
/// # Errors
///
/// Returns the serializer error; none is expected for a validated manifest.
pub fn to_toml(manifest: &Manifest) -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(&ManifestDef::from(manifest.clone()))
}
