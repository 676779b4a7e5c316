//! Checksum verification of fetched artifacts.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};
use thiserror::Error;

use cask_schema::Sha256Digest;

use crate::resolver::ExpectedChecksum;

/// The artifact's digest differs from the manifest's.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Checksum mismatch: expected {expected}, got {actual}")]
pub struct ChecksumMismatch {
    /// Digest the manifest requires.
    pub expected: Sha256Digest,
    /// Digest of the bytes actually fetched.
    pub actual: String,
}

/// Outcome of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The digest matched.
    Matched(Sha256Digest),
    /// The manifest carries the placeholder; nothing was compared.
    Skipped,
}

impl Verification {
    /// True if no comparison happened.
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }
}

/// Compare an already-computed hex digest against the expectation.
///
/// # Errors
///
/// Returns [`ChecksumMismatch`] when an enforced digest differs.
pub fn verify(actual_hex: &str, expected: &ExpectedChecksum) -> Result<Verification, ChecksumMismatch> {
    match expected {
        ExpectedChecksum::Unverified => Ok(Verification::Skipped),
        ExpectedChecksum::Sha256(digest) if digest.matches(actual_hex) => {
            Ok(Verification::Matched(digest.clone()))
        }
        ExpectedChecksum::Sha256(digest) => Err(ChecksumMismatch {
            expected: digest.clone(),
            actual: actual_hex.to_ascii_lowercase(),
        }),
    }
}

/// Stream a file through SHA256 and return the lowercase hex digest.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
