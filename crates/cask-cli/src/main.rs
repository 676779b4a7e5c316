//! cask CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cask_cli::cmd::{self, Session};
use cask_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so `resolve --json` stays parseable.
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    let filter = cask_cli::log_filter(&rust_log, cli.verbose)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Commands that never touch the catalog or config skip loading them.
    let session = || Session::load(cli.catalog.clone(), cli.appdir.clone(), cli.dry_run);

    match cli.command {
        Commands::Resolve {
            cask,
            arch,
            macos,
            json,
            strict,
        } => cmd::resolve::resolve(
            &session()?,
            &cask,
            arch.as_deref(),
            macos.as_deref(),
            json,
            strict,
        ),
        Commands::Install {
            casks,
            force,
            no_postflight,
            strict,
            arch,
            macos,
        } => {
            let args = cmd::install::InstallArgs {
                force,
                postflight: !no_postflight,
                strict,
                arch,
                macos,
            };
            cmd::install::install(&session()?, &casks, &args).await
        }
        Commands::Info { cask } => cmd::info::info(&session()?, &cask),
        Commands::List => cmd::list::list(&session()?),
        Commands::Search { query } => cmd::search::search(&session()?, &query),
        Commands::Audit { strict } => cmd::audit::audit(&session()?, strict),
        Commands::Convert { path, output } => cmd::convert::convert(&path, output.as_deref()),
        Commands::Hash { files } => cmd::hash::hash(&files),
        Commands::Completions { shell } => {
            cmd::completions::completions(shell);
            Ok(())
        }
    }
}
