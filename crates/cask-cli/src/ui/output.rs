//! Terminal implementation of [`Reporter`].
//!
//! One line per state change. Status rows go to stdout, warnings and errors
//! to stderr.

use std::collections::HashSet;
use std::sync::Mutex;

use cask_core::Reporter;
use cask_schema::{CaskName, Version};
use crossterm::style::{Color, Stylize};

use super::theme::{Theme, format_size};

/// Prints pipeline progress for any number of concurrent installs.
#[derive(Debug, Default)]
pub struct Output {
    theme: Theme,
    downloading: Mutex<HashSet<CaskName>>,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    fn row(&self, icon: &str, color: Color, name: &CaskName, version: &Version, detail: &str) {
        let layout = &self.theme.layout;
        let name = format!("{: <width$}", name.as_str(), width = layout.name_width);
        let version = format!("{: <width$}", version.as_str(), width = layout.version_width);
        println!(
            "  {} {} {} {}",
            icon.with(color),
            name.with(self.theme.colors.name),
            version.with(self.theme.colors.version),
            detail.with(self.theme.colors.secondary)
        );
    }
}

impl Reporter for Output {
    fn section(&self, title: &str) {
        println!();
        println!("{}", title.to_uppercase().dark_grey());
    }

    fn downloading(&self, name: &CaskName, version: &Version, _current: u64, total: Option<u64>) {
        // Progress arrives per chunk; only the first one gets a row.
        let first = self
            .downloading
            .lock()
            .map(|mut seen| seen.insert(name.clone()))
            .unwrap_or(false);
        if first {
            let detail = match total {
                Some(t) => format!("downloading {}", format_size(t)),
                None => "downloading".to_string(),
            };
            self.row(self.theme.icons.active, self.theme.colors.active, name, version, &detail);
        }
    }

    fn verifying(&self, name: &CaskName, version: &Version) {
        self.row(self.theme.icons.active, self.theme.colors.active, name, version, "verifying");
    }

    fn installing(&self, name: &CaskName, version: &Version) {
        self.row(self.theme.icons.active, self.theme.colors.active, name, version, "installing");
    }

    fn done(&self, name: &CaskName, version: &Version, detail: &str, size: Option<u64>) {
        let detail = match size {
            Some(s) => format!("{detail} ({})", format_size(s)),
            None => detail.to_string(),
        };
        self.row(self.theme.icons.success, self.theme.colors.success, name, version, &detail);
    }

    fn failed(&self, name: &CaskName, version: &Version, reason: &str) {
        self.row(self.theme.icons.error, self.theme.colors.error, name, version, reason);
    }

    fn info(&self, msg: &str) {
        println!("  {} {msg}", self.theme.icons.info.blue());
    }

    fn success(&self, msg: &str) {
        println!("  {} {msg}", self.theme.icons.success.with(self.theme.colors.success));
    }

    fn warning(&self, msg: &str) {
        eprintln!("  {} {msg}", self.theme.icons.warning.with(self.theme.colors.warning));
    }

    fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", self.theme.icons.error.with(self.theme.colors.error));
    }

    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        println!();
        println!("{} {count}, elapsed {elapsed_secs:.2}s", action.to_uppercase());
    }
}
