//! Install command

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Result, bail};
use cask_core::io::download::{HttpFetcher, RetryConfig};
use cask_core::io::install::AppDirInstaller;
use cask_core::io::postflight::ProcessRunner;
use cask_core::{CatalogEntry, Host, Pipeline, PipelineOptions, PlaceholderPolicy, Reporter};
use tokio::task::JoinSet;
use tracing::debug;

use super::Session;
use crate::ui::Output;

/// Flags for `cask install`.
#[derive(Debug, Clone, Default)]
pub struct InstallArgs {
    pub force: bool,
    pub postflight: bool,
    pub strict: bool,
    pub arch: Option<String>,
    pub macos: Option<String>,
}

/// Install casks concurrently; fails if any of them failed
pub async fn install(session: &Session, specs: &[String], args: &InstallArgs) -> Result<()> {
    let start = Instant::now();
    let config = &session.config;
    let host = Host::detect_with(args.arch.as_deref(), args.macos.as_deref())?;

    // Load everything up front so a typo fails before any download starts.
    let entries = specs
        .iter()
        .map(|s| session.manifest(s))
        .collect::<Result<Vec<_>>>()?;
    let entries = unique_by_name(entries);

    let output = Arc::new(Output::new());
    let policy = if args.strict {
        PlaceholderPolicy::Deny
    } else {
        config.policy
    };
    let fetcher = HttpFetcher::new()?.with_retry(RetryConfig::default().with_attempts(config.retries));
    let pipeline = Arc::new(Pipeline::new(
        Arc::new(fetcher),
        Arc::new(AppDirInstaller),
        Arc::new(ProcessRunner::new(config.postflight_timeout)),
        output.clone(),
        PipelineOptions {
            appdir: config.appdir.clone(),
            cache_dir: config.cache_dir.clone(),
            force: args.force,
            dry_run: session.dry_run,
            run_postflight: args.postflight,
            policy,
        },
    ));

    output.section(if session.dry_run { "Dry run" } else { "Installing" });

    let mut set = JoinSet::new();
    for entry in entries {
        let pipeline = Arc::clone(&pipeline);
        set.spawn(async move {
            let result = pipeline.install(&entry.manifest, host).await;
            (entry.manifest.name().clone(), result)
        });
    }

    let mut installed = 0;
    let mut failed = 0;
    while let Some(joined) = set.join_next().await {
        let (name, result) = joined?;
        match result {
            Ok(outcome) if session.dry_run => {
                let r = &outcome.resolved;
                output.info(&format!("{name} {} -> {} ({})", r.version, r.url, r.checksum));
                installed += 1;
            }
            // Warnings were already reported by the pipeline.
            Ok(_) => installed += 1,
            Err(e) => {
                output.error(&format!("{name}: {e}"));
                failed += 1;
            }
        }
    }

    let action = if session.dry_run { "resolved" } else { "installed" };
    output.summary(installed, action, start.elapsed().as_secs_f64());
    if failed > 0 {
        bail!("{failed} of {} casks failed", installed + failed);
    }
    Ok(())
}

/// One pipeline per cask: a token and a path to the same manifest collapse.
fn unique_by_name(entries: Vec<CatalogEntry>) -> Vec<CatalogEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|e| {
            let first = seen.insert(e.manifest.name().clone());
            if !first {
                debug!(cask = %e.manifest.name(), "duplicate request skipped");
            }
            first
        })
        .collect()
}
