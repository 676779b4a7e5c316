//! cask - install macOS apps from cask manifests
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
//!
//! Reads Homebrew-style cask files (`.rb`) or their TOML equivalent, resolves
//! them for the running Mac and installs the `.app` bundle they describe.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.cask/            # or $CASK_HOME
//! ├── Casks/          # default catalog of manifests
//! ├── cache/          # verified downloads
//! └── config.toml     # optional settings
//! ```

pub mod cmd;
pub mod ui;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::{Directive, LevelFilter};

/// Log filter from a `RUST_LOG` value; `verbose` adds debug output for cask
/// itself without dropping the caller's directives.
pub fn log_filter(rust_log: &str, verbose: bool) -> anyhow::Result<EnvFilter> {
    let mut filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::ERROR.into())
        .parse_lossy(rust_log);
    if verbose {
        for directive in ["cask_core=debug", "cask_cli=debug"] {
            filter = filter.add_directive(directive.parse::<Directive>()?);
        }
    }
    Ok(filter)
}

#[derive(Debug, Parser)]
#[command(name = "cask")]
#[command(author, version, about = "cask - install macOS apps from cask manifests")]
pub struct Cli {
    /// Show what would happen without making changes
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory of cask manifests
    #[arg(long, global = true, env = "CASK_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Where .app bundles are installed
    #[arg(long, global = true, env = "CASK_APPDIR")]
    pub appdir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve a cask to its download URL and checksum
    Resolve {
        /// Cask token or path to a .rb/.toml file
        cask: String,
        /// Target architecture (arm, intel)
        #[arg(long)]
        arch: Option<String>,
        /// Target macOS version (14.2, sonoma)
        #[arg(long)]
        macos: Option<String>,
        /// Print the resolution as JSON
        #[arg(long)]
        json: bool,
        /// Refuse placeholder checksums
        #[arg(long)]
        strict: bool,
    },
    /// Download, verify and install casks
    Install {
        /// Cask tokens or paths to .rb/.toml files
        #[arg(required = true)]
        casks: Vec<String>,
        /// Replace an existing bundle
        #[arg(short, long)]
        force: bool,
        /// Skip the postflight command
        #[arg(long)]
        no_postflight: bool,
        /// Refuse placeholder checksums
        #[arg(long)]
        strict: bool,
        /// Target architecture (arm, intel)
        #[arg(long)]
        arch: Option<String>,
        /// Target macOS version (14.2, sonoma)
        #[arg(long)]
        macos: Option<String>,
    },
    /// Show cask details
    Info {
        /// Cask token or path to a .rb/.toml file
        cask: String,
    },
    /// List casks in the catalog
    List,
    /// Search the catalog
    Search {
        /// Search query
        query: String,
    },
    /// Check every manifest in the catalog
    Audit {
        /// Treat placeholder checksums as errors
        #[arg(long)]
        strict: bool,
    },
    /// Convert a manifest between cask DSL (.rb) and TOML
    Convert {
        /// Manifest to convert
        path: PathBuf,
        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compute SHA256 hash of a file (for cask authoring)
    Hash {
        /// Files to hash
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}
