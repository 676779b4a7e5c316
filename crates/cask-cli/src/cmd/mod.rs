//! Command modules - one file per CLI command

pub mod audit;
pub mod completions;
pub mod convert;
pub mod hash;
pub mod info;
pub mod install;
pub mod list;
pub mod resolve;
pub mod search;

use anyhow::{Context, Result, anyhow};
use cask_core::loader::ManifestFormat;
use cask_core::{Catalog, CatalogEntry, Config, load_manifest};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Effective configuration shared by the catalog-backed commands.
#[derive(Debug, Clone)]
pub struct Session {
    pub config: Config,
    pub dry_run: bool,
}

impl Session {
    /// Load `config.toml` and apply command-line overrides.
    pub fn load(catalog: Option<PathBuf>, appdir: Option<PathBuf>, dry_run: bool) -> Result<Self> {
        let mut config = Config::load().context("Failed to load configuration")?;
        if let Some(catalog) = catalog {
            config.catalog = catalog;
        }
        if let Some(appdir) = appdir {
            config.appdir = appdir;
        }
        debug!(
            catalog = %config.catalog.display(),
            appdir = %config.appdir.display(),
            "configuration loaded"
        );
        Ok(Self { config, dry_run })
    }

    pub fn catalog(&self) -> Result<Catalog> {
        Catalog::load(&self.config.catalog)
            .with_context(|| format!("Failed to load catalog {}", self.config.catalog.display()))
    }

    /// A cask token from the catalog, or a path to a manifest file.
    pub fn manifest(&self, spec: &str) -> Result<CatalogEntry> {
        let path = Path::new(spec);
        if ManifestFormat::from_path(path).is_some() && path.is_file() {
            let manifest = load_manifest(path)?;
            return Ok(CatalogEntry {
                manifest,
                path: path.to_path_buf(),
            });
        }

        let catalog = self.catalog()?;
        catalog.get(spec).cloned().ok_or_else(|| {
            anyhow!(
                "No cask named '{spec}' in {}",
                self.config.catalog.display()
            )
        })
    }
}
