use std::path::PathBuf;

use cask_core::{Catalog, PlaceholderPolicy, ResolveError, Severity, resolve};
use cask_schema::{Arch, MacOsVersion};

fn bundled_casks() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../Casks")
}

#[test]
fn bundled_catalog_loads_and_resolves() {
    let catalog = Catalog::load(&bundled_casks()).unwrap();
    assert_eq!(catalog.len(), 2);

    let mdview = &catalog.get("mdview").unwrap().manifest;
    let r = resolve(mdview, Arch::Intel, MacOsVersion::new(12, 0, 0)).unwrap();
    assert_eq!(
        r.url,
        "https://github.com/SeungheonOh/mdview/releases/download/v0.1.0/mdview-x86_64-apple-darwin.app.zip"
    );
    assert_eq!(r.app, "mdview.app");
    assert!(r.checksum.is_unverified());

    let err = resolve(mdview, Arch::Arm, MacOsVersion::new(11, 7, 0)).unwrap_err();
    assert!(matches!(err, ResolveError::UnsupportedOs { .. }));
}

#[test]
fn bundled_catalog_audit() {
    let catalog = Catalog::load(&bundled_casks()).unwrap();

    let lenient = catalog.audit(PlaceholderPolicy::Warn);
    assert_eq!(lenient.len(), 2);
    assert!(lenient.iter().all(|f| f.severity == Severity::Warning));

    let strict = catalog.audit(PlaceholderPolicy::Deny);
    assert!(strict.iter().all(|f| f.severity == Severity::Error));
    assert_eq!(
        strict.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
        ["mdiew", "mdview"]
    );
}

#[test]
fn search_finds_both_viewers() {
    let catalog = Catalog::load(&bundled_casks()).unwrap();
    let hits: Vec<_> = catalog
        .search("markdown")
        .into_iter()
        .map(|e| e.manifest.name().to_string())
        .collect();
    assert_eq!(hits, ["mdiew", "mdview"]);
}
