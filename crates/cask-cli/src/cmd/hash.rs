//! Hash command

use anyhow::{Context, Result};
use cask_core::io::verify::sha256_file;
use std::path::PathBuf;

/// Print the SHA256 of each file, for filling in `sha256` stanzas
pub fn hash(files: &[PathBuf]) -> Result<()> {
    for file in files {
        let hash =
            sha256_file(file).with_context(|| format!("Failed to hash {}", file.display()))?;
        println!("{} {}", hash, file.display());
    }
    Ok(())
}
