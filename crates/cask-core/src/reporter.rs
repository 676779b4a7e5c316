//! Reporter trait for dependency injection
//!
//! This trait allows the install pipeline to report progress and status without
//! being coupled to a specific terminal UI.

use cask_schema::{CaskName, Version};

/// Sink for pipeline progress and user-facing messages.
pub trait Reporter: Send + Sync {
    /// Indicates a new section or phase has started (e.g. "Fetching", "Installing").
    fn section(&self, title: &str);

    /// Updates the progress of a download.
    fn downloading(&self, name: &CaskName, version: &Version, current: u64, total: Option<u64>);

    /// Marks a cask as being verified against its expected checksum.
    fn verifying(&self, name: &CaskName, version: &Version);

    /// Updates the state of a cask to 'installing'.
    fn installing(&self, name: &CaskName, version: &Version);

    /// Marks a cask operation as successfully completed.
    fn done(&self, name: &CaskName, version: &Version, detail: &str, size: Option<u64>);

    /// Marks a cask operation as failed with a specific reason.
    fn failed(&self, name: &CaskName, version: &Version, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a success message.
    fn success(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);

    /// Display a final summary of multiple operations.
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn downloading(&self, name: &CaskName, version: &Version, current: u64, total: Option<u64>) {
        (**self).downloading(name, version, current, total);
    }
    fn verifying(&self, name: &CaskName, version: &Version) {
        (**self).verifying(name, version);
    }
    fn installing(&self, name: &CaskName, version: &Version) {
        (**self).installing(name, version);
    }
    fn done(&self, name: &CaskName, version: &Version, detail: &str, size: Option<u64>) {
        (**self).done(name, version, detail, size);
    }
    fn failed(&self, name: &CaskName, version: &Version, reason: &str) {
        (**self).failed(name, version, reason);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn success(&self, msg: &str) {
        (**self).success(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn error(&self, msg: &str) {
        (**self).error(msg);
    }
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        (**self).summary(count, action, elapsed_secs);
    }
}

/// A no-op reporter for silent operations (e.g., verification, testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn downloading(&self, _: &CaskName, _: &Version, _: u64, _: Option<u64>) {}
    fn verifying(&self, _: &CaskName, _: &Version) {}
    fn installing(&self, _: &CaskName, _: &Version) {}
    fn done(&self, _: &CaskName, _: &Version, _: &str, _: Option<u64>) {}
    fn failed(&self, _: &CaskName, _: &Version, _: &str) {}
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
    fn summary(&self, _: usize, _: &str, _: f64) {}
}
