//! Core of cask: manifest loading, resolution and the install pipeline.
//!
//! [`resolve`] is the pure heart of the crate. Everything with side effects
//! sits behind a trait in [`io`] so the [`Pipeline`] can be driven with fakes.

pub mod catalog;
pub mod config;
pub mod dsl;
pub mod error;
pub mod host;
pub mod io;
pub mod loader;
pub mod paths;
pub mod pipeline;
pub mod reporter;
pub mod resolver;

pub use catalog::{Catalog, CatalogEntry, CatalogError, Finding, Severity};
pub use config::{Config, ConfigError};
pub use error::{CaskError, ResolveError};
pub use host::{Host, HostError};
pub use loader::{LoadError, load_manifest};
pub use pipeline::{InstallOutcome, Pipeline, PipelineOptions};
pub use reporter::{NullReporter, Reporter};
pub use resolver::{ExpectedChecksum, PlaceholderPolicy, ResolvedInstall, resolve};

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("cask-core/", env!("CARGO_PKG_VERSION"));
