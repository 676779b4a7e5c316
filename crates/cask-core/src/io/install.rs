//! Placing the application bundle into the applications directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::extract::{self, ExtractError};

/// Errors raised while installing a bundle.
#[derive(Error, Debug)]
pub enum InstallError {
    /// The artifact could not be unpacked.
    #[error("Failed to extract artifact: {0}")]
    Extract(#[from] ExtractError),

    /// The artifact does not contain the declared bundle.
    #[error("No '{app}' found in artifact {}", .artifact.display())]
    BundleNotFound {
        /// Declared bundle file name.
        app: String,
        /// Artifact that was searched.
        artifact: PathBuf,
    },

    /// The target already exists and `force` was not given.
    #[error("{} already exists (use --force to replace it)", .0.display())]
    Conflict(PathBuf),

    /// Filesystem failure at a specific path.
    #[error("{context}: {source}")]
    Io {
        /// What was being done.
        context: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The blocking install task panicked or was cancelled.
    #[error("Install task failed: {0}")]
    Task(String),
}

impl InstallError {
    /// Attach a description to an IO error.
    pub fn context(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Where and how to install.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Applications directory, normally `/Applications`.
    pub appdir: PathBuf,
    /// Replace an existing bundle of the same name.
    pub force: bool,
}

/// A bundle now living in the applications directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledApp {
    /// Full path of the installed bundle.
    pub path: PathBuf,
    /// Total size of the bundle on disk.
    pub size_bytes: u64,
    /// Whether an existing bundle was replaced.
    pub replaced: bool,
}

/// Unpacks a verified artifact and places the named bundle.
#[async_trait]
pub trait Installer: Send + Sync {
    /// Install `app` from `artifact`.
    async fn install(
        &self,
        artifact: &Path,
        app: &str,
        opts: &InstallOptions,
    ) -> Result<InstalledApp, InstallError>;
}

/// Installs `.app` bundles from zip/tar artifacts into a directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppDirInstaller;

#[async_trait]
impl Installer for AppDirInstaller {
    async fn install(
        &self,
        artifact: &Path,
        app: &str,
        opts: &InstallOptions,
    ) -> Result<InstalledApp, InstallError> {
        let artifact = artifact.to_path_buf();
        let app = app.to_string();
        let opts = opts.clone();
        tokio::task::spawn_blocking(move || install_bundle(&artifact, &app, &opts))
            .await
            .map_err(|e| InstallError::Task(e.to_string()))?
    }
}

/// Synchronous body of [`AppDirInstaller`].
///
/// The artifact is unpacked into a staging directory inside `appdir` so the
/// final move is a rename on the same filesystem; nothing touches the target
/// until the bundle has been found.
pub fn install_bundle(
    artifact: &Path,
    app: &str,
    opts: &InstallOptions,
) -> Result<InstalledApp, InstallError> {
    let target = opts.appdir.join(app);
    let exists = target.symlink_metadata().is_ok();
    if exists && !opts.force {
        return Err(InstallError::Conflict(target));
    }

    std::fs::create_dir_all(&opts.appdir).map_err(|e| {
        InstallError::context(format!("Failed to create {}", opts.appdir.display()), e)
    })?;

    let staging = tempfile::Builder::new()
        .prefix(".cask-staging-")
        .tempdir_in(&opts.appdir)
        .map_err(|e| InstallError::context("Failed to create staging directory", e))?;

    let entries = extract::extract_auto(artifact, staging.path())?;
    debug!(entries, staging = %staging.path().display(), "extracted artifact");

    let bundle = find_bundle(staging.path(), app).ok_or_else(|| InstallError::BundleNotFound {
        app: app.to_string(),
        artifact: artifact.to_path_buf(),
    })?;

    if exists {
        info!(target = %target.display(), "replacing existing bundle");
        remove_path(&target)
            .map_err(|e| InstallError::context(format!("Failed to remove {}", target.display()), e))?;
    }

    std::fs::rename(&bundle, &target).map_err(|e| {
        InstallError::context(format!("Failed to move bundle to {}", target.display()), e)
    })?;

    Ok(InstalledApp {
        size_bytes: dir_size(&target),
        path: target,
        replaced: exists,
    })
}

/// Locate `app` within an extracted tree.
///
/// Looks at most three levels deep and skips hidden entries below `root`.
pub fn find_bundle(root: &Path, app: &str) -> Option<PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .max_depth(3)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        .flatten()
        .find(|e| e.file_name() == app)
        .map(|e| e.path().to_path_buf())
}

fn remove_path(path: &Path) -> std::io::Result<()> {
    let meta = path.symlink_metadata()?;
    if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}

fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .flatten()
        .filter_map(|e| e.metadata().ok())
        .filter(std::fs::Metadata::is_file)
        .map(|m| m.len())
        .sum()
}
