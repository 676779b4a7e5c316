use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::PLACEHOLDER;

/// Errors produced when validating a checksum string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DigestError {
    /// The hex portion is not exactly 64 characters long.
    #[error("Invalid SHA256 digest: expected 64 hex characters, got {len} in '{input}'")]
    Length {
        /// Length of the hex portion.
        len: usize,
        /// The offending input.
        input: String,
    },

    /// The input contains characters outside `[0-9a-fA-F]`.
    #[error("Invalid SHA256 digest: contains non-hex characters in '{0}'")]
    NonHex(String),
}

/// A validated SHA256 digest (64 hex characters)
///
/// This newtype ensures that all digests in the system are validated at deserialization time,
/// preventing invalid hex strings from propagating through the codebase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Create a new `Sha256Digest`, validating the input.
    ///
    /// Accepts strings with or without a `sha256:` prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the hex portion is not exactly 64 ASCII hex characters.
    pub fn new(s: impl Into<String>) -> Result<Self, DigestError> {
        let s = s.into();
        let hex = s.strip_prefix("sha256:").unwrap_or(&s);

        if hex.len() != 64 {
            return Err(DigestError::Length {
                len: hex.len(),
                input: s.clone(),
            });
        }

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DigestError::NonHex(s.clone()));
        }

        Ok(Self(hex.to_lowercase()))
    }

    /// Get the digest as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against a hex string from elsewhere.
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.strip_prefix("sha256:").unwrap_or(other))
    }
}

impl<'de> Deserialize<'de> for Sha256Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Sha256Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A checksum as declared in a manifest: either a real digest or the
/// [`PLACEHOLDER`] sentinel for a release whose digest is not known yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Checksum {
    /// Enforced SHA256 digest.
    Sha256(Sha256Digest),
    /// Placeholder: verification is skipped.
    Placeholder,
}

impl Checksum {
    /// Parse a manifest checksum value.
    ///
    /// `PLACEHOLDER` and `no_check` (the DSL's `:no_check`) both map to
    /// [`Checksum::Placeholder`]; everything else must be a valid digest.
    ///
    /// # Errors
    ///
    /// Returns a [`DigestError`] for strings that are neither the sentinel
    /// nor 64 hex characters.
    pub fn parse(s: &str) -> Result<Self, DigestError> {
        match s {
            PLACEHOLDER | "no_check" => Ok(Self::Placeholder),
            _ => Sha256Digest::new(s).map(Self::Sha256),
        }
    }

    /// True for the placeholder sentinel.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder)
    }

    /// The digest, if one is declared.
    pub fn digest(&self) -> Option<&Sha256Digest> {
        match self {
            Self::Sha256(d) => Some(d),
            Self::Placeholder => None,
        }
    }
}

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sha256(d) => write!(f, "{d}"),
            Self::Placeholder => f.write_str(PLACEHOLDER),
        }
    }
}

impl std::str::FromStr for Checksum {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Checksum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Checksum {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
