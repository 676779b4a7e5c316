//! A directory of cask manifests, keyed by token.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use cask_schema::{CaskName, Manifest};

use crate::loader::{self, LoadError, ManifestFormat};
use crate::resolver::PlaceholderPolicy;

/// Errors raised while building a catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The catalog directory does not exist.
    #[error("Catalog directory {} does not exist", .0.display())]
    NotFound(PathBuf),

    /// Walking the directory failed.
    #[error("Failed to scan catalog: {0}")]
    Walk(#[from] walkdir::Error),

    /// A manifest in the catalog is broken.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Two files declare the same token.
    #[error("Duplicate cask '{name}' in {} and {}", .first.display(), .second.display())]
    Duplicate {
        /// Token.
        name: CaskName,
        /// File loaded first.
        first: PathBuf,
        /// File that collided.
        second: PathBuf,
    },
}

/// A manifest and the file it came from.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// The validated manifest.
    pub manifest: Manifest,
    /// Source file.
    pub path: PathBuf,
}

/// Every manifest under one directory.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<CaskName, CatalogEntry>,
}

impl Catalog {
    /// Load every `.rb` and `.toml` file under `dir`, recursively.
    ///
    /// # Errors
    ///
    /// Fails on the first unreadable or invalid manifest, or on a duplicate token.
    pub fn load(dir: &Path) -> Result<Self, CatalogError> {
        if !dir.is_dir() {
            return Err(CatalogError::NotFound(dir.to_path_buf()));
        }

        let mut catalog = Self::default();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() || ManifestFormat::from_path(entry.path()).is_none() {
                continue;
            }
            let manifest = loader::load_manifest(entry.path())?;
            catalog.insert(manifest, entry.path().to_path_buf())?;
        }
        debug!(dir = %dir.display(), casks = catalog.len(), "loaded catalog");
        Ok(catalog)
    }

    /// Add a manifest.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Duplicate`] if the token is taken.
    pub fn insert(&mut self, manifest: Manifest, path: PathBuf) -> Result<(), CatalogError> {
        if let Some(existing) = self.entries.get(manifest.name()) {
            return Err(CatalogError::Duplicate {
                name: manifest.name().clone(),
                first: existing.path.clone(),
                second: path,
            });
        }
        self.entries
            .insert(manifest.name().clone(), CatalogEntry { manifest, path });
        Ok(())
    }

    /// Look up a cask by token (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name.trim().to_lowercase().as_str())
    }

    /// Entries in token order.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    /// Number of casks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the catalog holds no casks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Casks matching `query`, best first.
    ///
    /// Substring hits on the token or description rank above fuzzy hits on the
    /// token; ties keep token order.
    pub fn search(&self, query: &str) -> Vec<&CatalogEntry> {
        let query = query.trim().to_lowercase();
        let matcher = SkimMatcherV2::default();

        let mut scored: Vec<(i64, &CatalogEntry)> = self
            .iter()
            .filter_map(|e| {
                let m = &e.manifest;
                if m.name().contains(&query) || m.description().to_lowercase().contains(&query) {
                    return Some((i64::MAX, e));
                }
                matcher.fuzzy_match(m.name(), &query).map(|score| (score, e))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().map(|(_, e)| e).collect()
    }

    /// Check every manifest for publishing problems.
    pub fn audit(&self, policy: PlaceholderPolicy) -> Vec<Finding> {
        self.iter().flat_map(|e| audit_entry(e, policy)).collect()
    }
}

/// How serious an audit finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Worth fixing; does not fail the audit.
    Warning,
    /// Fails the audit.
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// One audit result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// Cask token.
    pub name: CaskName,
    /// Severity.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
}

fn audit_entry(entry: &CatalogEntry, policy: PlaceholderPolicy) -> Vec<Finding> {
    let m = &entry.manifest;
    let mut findings = Vec::new();
    let mut push = |severity, message: String| {
        findings.push(Finding {
            name: m.name().clone(),
            severity,
            message,
        });
    };

    let placeholders: Vec<&str> = m
        .checksum_map()
        .iter()
        .filter(|(_, c)| c.is_placeholder())
        .map(|(a, _)| a.as_str())
        .collect();
    if !placeholders.is_empty() {
        let severity = match policy {
            PlaceholderPolicy::Warn => Severity::Warning,
            PlaceholderPolicy::Deny => Severity::Error,
        };
        push(
            severity,
            format!("placeholder checksum for {}", placeholders.join(", ")),
        );
    }

    if !m.url_template().as_str().starts_with("https://") {
        push(Severity::Error, "url is not https".to_string());
    }

    if let Some(stem) = entry.path.file_stem().and_then(|s| s.to_str()) {
        if stem != m.name().as_str() {
            push(
                Severity::Warning,
                format!("file name '{stem}' does not match token"),
            );
        }
    }

    if m.description().is_empty() {
        push(Severity::Warning, "missing desc".to_string());
    }
    if m.homepage().is_empty() {
        push(Severity::Warning, "missing homepage".to_string());
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn cask(token: &str, desc: &str, sha: &str, url: &str) -> String {
        format!(
            r#"cask "{token}" do
  version "1.0"
  sha256 "{sha}"
  url "{url}"
  desc "{desc}"
  homepage "https://example.com/{token}"
  app "{token}.app"
end
"#
        )
    }

    const SHA: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    fn fixture() -> (tempfile::TempDir, Catalog) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("mdiew.rb"),
            cask("mdiew", "Markdown viewer", "PLACEHOLDER", "https://x.test/mdiew.zip"),
        )
        .unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(
            dir.path().join("nested/firefox.rb"),
            cask("firefox", "Web browser", SHA, "https://x.test/ff.zip"),
        )
        .unwrap();
        fs::write(dir.path().join("README.md"), "not a cask").unwrap();
        let catalog = Catalog::load(dir.path()).unwrap();
        (dir, catalog)
    }

    #[test]
    fn loads_recursively() {
        let (_dir, catalog) = fixture();
        assert_eq!(catalog.len(), 2);
        let names: Vec<_> = catalog.iter().map(|e| e.manifest.name().to_string()).collect();
        assert_eq!(names, ["firefox", "mdiew"]);
        assert!(catalog.get("MDIEW").is_some());
        assert!(catalog.get("chrome").is_none());
    }

    #[test]
    fn duplicate_tokens_fail() {
        let (dir, _) = fixture();
        fs::write(
            dir.path().join("other.rb"),
            cask("mdiew", "again", SHA, "https://x.test/a.zip"),
        )
        .unwrap();
        assert!(matches!(
            Catalog::load(dir.path()),
            Err(CatalogError::Duplicate { .. })
        ));
    }

    #[test]
    fn search_ranks_substring_first() {
        let (_dir, catalog) = fixture();
        let hits = catalog.search("markdown");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].manifest.name(), "mdiew");

        let fuzzy = catalog.search("frfx");
        assert_eq!(fuzzy[0].manifest.name(), "firefox");
    }

    #[test]
    fn audit_respects_policy() {
        let (dir, mut catalog) = fixture();
        let lenient = catalog.audit(PlaceholderPolicy::Warn);
        assert!(lenient.iter().all(|f| f.severity == Severity::Warning));
        assert_eq!(lenient.len(), 1);

        let strict = catalog.audit(PlaceholderPolicy::Deny);
        assert_eq!(strict[0].severity, Severity::Error);

        let path = dir.path().join("Plain.rb");
        fs::write(&path, cask("plain", "", SHA, "http://x.test/p.zip")).unwrap();
        catalog
            .insert(loader::load_manifest(&path).unwrap(), path)
            .unwrap();
        let messages: Vec<_> = catalog
            .audit(PlaceholderPolicy::Warn)
            .into_iter()
            .filter(|f| f.name == "plain")
            .map(|f| f.message)
            .collect();
        assert!(messages.contains(&"url is not https".to_string()));
        assert!(messages.contains(&"missing desc".to_string()));
        assert!(messages.iter().any(|m| m.contains("does not match token")));
    }

    #[test]
    fn missing_dir() {
        assert!(matches!(
            Catalog::load(Path::new("/nonexistent/casks")),
            Err(CatalogError::NotFound(_))
        ));
    }
}
