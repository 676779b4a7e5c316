//! The install pipeline: resolve, fetch, verify, install, postflight.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use cask_schema::Manifest;

use crate::Reporter;
use crate::error::CaskError;
use crate::host::Host;
use crate::io::download::{FetchRequest, Fetcher};
use crate::io::install::{InstallOptions, InstalledApp, Installer};
use crate::io::postflight::CommandRunner;
use crate::io::verify::{self, Verification};
use crate::resolver::{self, ExpectedChecksum, PlaceholderPolicy, ResolvedInstall};

/// Knobs for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Applications directory.
    pub appdir: PathBuf,
    /// Download cache directory.
    pub cache_dir: PathBuf,
    /// Replace an existing bundle.
    pub force: bool,
    /// Stop after resolution.
    pub dry_run: bool,
    /// Run the manifest's postflight command.
    pub run_postflight: bool,
    /// Placeholder checksum handling.
    pub policy: PlaceholderPolicy,
}

/// What a pipeline run did.
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    /// The resolution the run acted on.
    pub resolved: ResolvedInstall,
    /// Checksum result; `None` on a dry run.
    pub verification: Option<Verification>,
    /// The installed bundle; `None` on a dry run.
    pub installed: Option<InstalledApp>,
    /// Non-fatal problems: skipped verification, postflight failures.
    pub warnings: Vec<String>,
}

/// Composes the collaborators into `install`.
pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    installer: Arc<dyn Installer>,
    runner: Arc<dyn CommandRunner>,
    reporter: Arc<dyn Reporter>,
    opts: PipelineOptions,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("opts", &self.opts)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Assemble a pipeline.
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        installer: Arc<dyn Installer>,
        runner: Arc<dyn CommandRunner>,
        reporter: Arc<dyn Reporter>,
        opts: PipelineOptions,
    ) -> Self {
        Self {
            fetcher,
            installer,
            runner,
            reporter,
            opts,
        }
    }

    /// Cache file for a resolution: `<cache>/<name>--<version>--<file>`.
    pub fn cache_path(&self, resolved: &ResolvedInstall) -> PathBuf {
        let file = match resolved.filename() {
            "" => "download",
            f => f,
        };
        self.opts
            .cache_dir
            .join(format!("{}--{}--{}", resolved.name, resolved.version, file))
    }

    /// Install one cask on `host`.
    ///
    /// # Errors
    ///
    /// Returns [`CaskError::Resolve`] before any side effect if the cask does
    /// not apply to `host` (or its checksum is a placeholder under
    /// [`PlaceholderPolicy::Deny`]), [`CaskError::Network`] if the download
    /// fails, [`CaskError::ChecksumMismatch`] if it does not verify (the file
    /// is deleted), and [`CaskError::Installation`] if the bundle cannot be
    /// placed. Postflight failures are returned as warnings, not errors.
    pub async fn install(&self, manifest: &Manifest, host: Host) -> Result<InstallOutcome, CaskError> {
        let resolved = resolver::resolve(manifest, host.arch, host.macos)?;
        self.opts.policy.check(&resolved)?;
        debug!(cask = %resolved.name, url = %resolved.url, "resolved");

        let mut outcome = InstallOutcome {
            resolved,
            verification: None,
            installed: None,
            warnings: Vec::new(),
        };
        if self.opts.dry_run {
            return Ok(outcome);
        }

        let r = &outcome.resolved;
        let artifact = self.cache_path(r);
        tokio::fs::create_dir_all(&self.opts.cache_dir).await?;

        let verification = match self.cached(&artifact, &r.checksum).await {
            Some(v) => {
                debug!(path = %artifact.display(), "using cached download");
                v
            }
            None => self.fetch_and_verify(r, &artifact).await?,
        };
        if verification.is_skipped() {
            let msg = format!("{} {}: checksum not verified", r.name, r.version);
            self.reporter.warning(&msg);
            outcome.warnings.push(msg);
        }

        self.reporter.installing(&r.name, &r.version);
        let install_opts = InstallOptions {
            appdir: self.opts.appdir.clone(),
            force: self.opts.force,
        };
        let installed = match self.installer.install(&artifact, &r.app, &install_opts).await {
            Ok(i) => i,
            Err(e) => {
                self.reporter.failed(&r.name, &r.version, &e.to_string());
                return Err(e.into());
            }
        };
        info!(cask = %r.name, path = %installed.path.display(), "installed");

        // Unverified downloads are never reused.
        if verification.is_skipped() {
            tokio::fs::remove_file(&artifact).await.ok();
        }

        if self.opts.run_postflight {
            if let Some(cmd) = r.postflight.clone() {
                if let Err(msg) = self.postflight(cmd, &installed.path).await {
                    warn!(cask = %r.name, "postflight failed: {msg}");
                    self.reporter.warning(&format!("{}: postflight failed: {msg}", r.name));
                    outcome.warnings.push(format!("postflight failed: {msg}"));
                }
            }
        }

        let detail = if installed.replaced { "replaced" } else { "installed" };
        self.reporter
            .done(&r.name, &r.version, detail, Some(installed.size_bytes));

        outcome.verification = Some(verification);
        outcome.installed = Some(installed);
        Ok(outcome)
    }

    /// A cached file counts only if it matches an enforced digest.
    async fn cached(&self, path: &Path, expected: &ExpectedChecksum) -> Option<Verification> {
        if expected.is_unverified() || !path.is_file() {
            return None;
        }
        let p = path.to_path_buf();
        let actual = tokio::task::spawn_blocking(move || verify::sha256_file(&p))
            .await
            .ok()?
            .ok()?;
        verify::verify(&actual, expected).ok()
    }

    /// Downloads into a private partial file, moved onto `artifact` only once
    /// it verifies, so concurrent runs never share a half-written file.
    async fn fetch_and_verify(
        &self,
        r: &ResolvedInstall,
        artifact: &Path,
    ) -> Result<Verification, CaskError> {
        let partial = tempfile::Builder::new()
            .prefix(".partial-")
            .tempfile_in(&self.opts.cache_dir)?
            .into_temp_path();

        let fetched = match self
            .fetcher
            .fetch(FetchRequest {
                name: &r.name,
                version: &r.version,
                url: &r.url,
                dest: &partial,
                reporter: &*self.reporter,
            })
            .await
        {
            Ok(f) => f,
            Err(e) => {
                self.reporter.failed(&r.name, &r.version, &e.to_string());
                return Err(e.into());
            }
        };

        self.reporter.verifying(&r.name, &r.version);
        match verify::verify(&fetched.sha256, &r.checksum) {
            Ok(v) => {
                partial.persist(artifact).map_err(|e| e.error)?;
                Ok(v)
            }
            // Dropping `partial` deletes the download.
            Err(mismatch) => {
                self.reporter
                    .failed(&r.name, &r.version, &mismatch.to_string());
                Err(mismatch.into())
            }
        }
    }

    async fn postflight(
        &self,
        cmd: cask_schema::PostflightCommand,
        app: &Path,
    ) -> Result<(), String> {
        let runner = Arc::clone(&self.runner);
        let appdir = self.opts.appdir.clone();
        let app = app.to_path_buf();
        tokio::task::spawn_blocking(move || runner.run(&cmd, &appdir, &app))
            .await
            .map_err(|e| e.to_string())?
            .map_err(|e| e.to_string())
    }
}
