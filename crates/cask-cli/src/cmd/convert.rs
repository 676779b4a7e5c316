//! Convert command

use std::path::Path;

use anyhow::{Context, Result};
use cask_core::loader::{self, ManifestFormat};
use cask_core::{dsl, load_manifest};

/// Rewrite a cask DSL file as TOML, or a TOML manifest as cask DSL
pub fn convert(path: &Path, output: Option<&Path>) -> Result<()> {
    let manifest = load_manifest(path)?;
    let rendered = match ManifestFormat::from_path(path) {
        Some(ManifestFormat::Toml) => dsl::render(&manifest),
        _ => loader::to_toml(&manifest).context("Failed to serialize manifest")?,
    };

    match output {
        Some(out) => std::fs::write(out, rendered)
            .with_context(|| format!("Failed to write {}", out.display()))?,
        None => print!("{rendered}"),
    }
    Ok(())
}
