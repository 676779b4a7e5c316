//! Manifest resolution.
//!
//! [`resolve`] turns a [`Manifest`] plus the running machine's architecture
//! and macOS version into the concrete download URL and expected checksum.
//! It performs no I/O; fetching, verification, extraction and the
//! postflight command are downstream of it.

use serde::Serialize;
use tracing::warn;

use cask_schema::{Arch, CaskName, Checksum, MacOsVersion, Manifest, PostflightCommand, Sha256Digest, Version};

use crate::error::ResolveError;

/// What the fetched artifact must hash to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedChecksum {
    /// Enforced digest.
    Sha256(Sha256Digest),
    /// The manifest carries the placeholder; verification is skipped.
    Unverified,
}

impl ExpectedChecksum {
    /// True when verification will be skipped.
    pub fn is_unverified(&self) -> bool {
        matches!(self, Self::Unverified)
    }
}

impl std::fmt::Display for ExpectedChecksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sha256(d) => write!(f, "{d}"),
            Self::Unverified => f.write_str("unverified"),
        }
    }
}

/// Everything the downstream steps need to install one cask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedInstall {
    /// Cask token.
    pub name: CaskName,
    /// Release version.
    pub version: Version,
    /// Architecture the artifact was selected for.
    pub arch: Arch,
    /// Concrete download URL.
    pub url: String,
    /// Expected checksum, or the unverified marker.
    pub checksum: ExpectedChecksum,
    /// Bundle file name to install.
    pub app: String,
    /// Command to run after install.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postflight: Option<PostflightCommand>,
}

impl ResolvedInstall {
    /// Final path segment of the URL, used to name the cached download.
    pub fn filename(&self) -> &str {
        crate::paths::filename_from_url(&self.url)
    }
}

/// Resolve a manifest for the given architecture and macOS version.
///
/// The OS floor is checked before the architecture, so a machine that is
/// too old always gets [`ResolveError::UnsupportedOs`].
///
/// # Errors
///
/// Returns [`ResolveError::UnsupportedOs`] if `macos` is below the manifest's
/// floor, or [`ResolveError::UnsupportedArchitecture`] if `arch` is not declared.
pub fn resolve(
    manifest: &Manifest,
    arch: Arch,
    macos: MacOsVersion,
) -> Result<ResolvedInstall, ResolveError> {
    if let Some(required) = manifest.minimum_macos() {
        if macos < required {
            return Err(ResolveError::UnsupportedOs {
                name: manifest.name().clone(),
                required,
                actual: macos,
            });
        }
    }

    let token = manifest
        .arch_map()
        .get(&arch)
        .ok_or_else(|| ResolveError::UnsupportedArchitecture {
            name: manifest.name().clone(),
            arch,
            supported: manifest.architectures().collect(),
        })?;

    let url = manifest.url_template().render(token, manifest.version());

    // The key sets of arch_map and checksum_map are equal for every Manifest.
    let checksum = match manifest.checksum_map().get(&arch) {
        Some(Checksum::Sha256(digest)) => ExpectedChecksum::Sha256(digest.clone()),
        Some(Checksum::Placeholder) | None => {
            warn!(
                cask = %manifest.name(),
                version = %manifest.version(),
                %arch,
                "checksum is a placeholder; download will not be verified"
            );
            ExpectedChecksum::Unverified
        }
    };

    Ok(ResolvedInstall {
        name: manifest.name().clone(),
        version: manifest.version().clone(),
        arch,
        url,
        checksum,
        app: manifest.app().to_string(),
        postflight: manifest.postflight().cloned(),
    })
}

/// What to do with a manifest whose checksum is the placeholder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaceholderPolicy {
    /// Skip verification and log a warning.
    #[default]
    Warn,
    /// Refuse to install or publish it.
    Deny,
}

impl PlaceholderPolicy {
    /// Pick the policy from a `strict` flag.
    pub fn from_strict(strict: bool) -> Self {
        if strict { Self::Deny } else { Self::Warn }
    }

    /// Apply the policy to a resolution.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnverifiedChecksum`] under [`PlaceholderPolicy::Deny`]
    /// when the checksum is unverified.
    pub fn check(self, resolved: &ResolvedInstall) -> Result<(), ResolveError> {
        if self == Self::Deny && resolved.checksum.is_unverified() {
            return Err(ResolveError::UnverifiedChecksum {
                name: resolved.name.clone(),
                arch: resolved.arch,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cask_schema::{CaskMeta, ChecksumDef, ManifestDef};
    use std::collections::BTreeMap;

    const ARM_SHA: &str = "b9422d0e0b1b16154919729c19137c9d8895121c5adf8522664b109b16332a7b";

    fn mdiew(intel: Checksum) -> Manifest {
        Manifest::try_from(ManifestDef {
            sha256: ChecksumDef::PerArch(BTreeMap::from([
                (Arch::Arm, Checksum::parse(ARM_SHA).unwrap()),
                (Arch::Intel, intel),
            ])),
            cask: CaskMeta {
                name: CaskName::new("mdiew"),
                version: Version::from("0.1.10"),
                desc: "A fast, native macOS markdown viewer".to_string(),
                homepage: "https://github.com/SeungheonOh/mdiew".to_string(),
                names: vec![],
                url: "https://github.com/SeungheonOh/mdiew/releases/download/v#{version}/mdiew-#{arch}-apple-darwin.app.zip".to_string(),
                app: "mdiew.app".to_string(),
                macos: Some(">= :monterey".to_string()),
            },
            arch: BTreeMap::from([
                (Arch::Arm, "aarch64".to_string()),
                (Arch::Intel, "x86_64".to_string()),
            ]),
            postflight: None,
            livecheck: None,
        })
        .unwrap()
    }

    fn sonoma() -> MacOsVersion {
        MacOsVersion::new(14, 2, 1)
    }

    #[test]
    fn resolves_sample_for_arm() {
        let r = resolve(&mdiew(Checksum::Placeholder), Arch::Arm, sonoma()).unwrap();
        assert_eq!(
            r.url,
            "https://github.com/SeungheonOh/mdiew/releases/download/v0.1.10/mdiew-aarch64-apple-darwin.app.zip"
        );
        assert_eq!(r.checksum.to_string(), ARM_SHA);
        assert_eq!(r.app, "mdiew.app");
        assert_eq!(r.filename(), "mdiew-aarch64-apple-darwin.app.zip");
    }

    #[test]
    fn placeholder_is_unverified() {
        let r = resolve(&mdiew(Checksum::Placeholder), Arch::Intel, sonoma()).unwrap();
        assert_eq!(r.checksum, ExpectedChecksum::Unverified);
        assert!(r.url.contains("mdiew-x86_64-apple-darwin"));
    }

    #[test]
    fn old_os_fails_first() {
        let m = mdiew(Checksum::Placeholder);
        let err = resolve(&m, Arch::Arm, MacOsVersion::new(11, 7, 0)).unwrap_err();
        assert!(matches!(err, ResolveError::UnsupportedOs { .. }));

        // Exactly the floor is fine.
        assert!(resolve(&m, Arch::Arm, MacOsVersion::new(12, 0, 0)).is_ok());
    }

    #[test]
    fn old_os_wins_over_unknown_arch() {
        let mut def = ManifestDef::from(mdiew(Checksum::Placeholder));
        def.arch.remove(&Arch::Intel);
        if let ChecksumDef::PerArch(map) = &mut def.sha256 {
            map.remove(&Arch::Intel);
        }
        let arm_only = Manifest::try_from(def).unwrap();

        let err = resolve(&arm_only, Arch::Intel, MacOsVersion::new(10, 15, 0)).unwrap_err();
        assert!(matches!(err, ResolveError::UnsupportedOs { .. }));

        let err = resolve(&arm_only, Arch::Intel, sonoma()).unwrap_err();
        assert_eq!(
            err,
            ResolveError::UnsupportedArchitecture {
                name: CaskName::new("mdiew"),
                arch: Arch::Intel,
                supported: vec![Arch::Arm],
            }
        );
    }

    #[test]
    fn resolution_is_idempotent() {
        let m = mdiew(Checksum::Placeholder);
        let a = resolve(&m, Arch::Arm, sonoma()).unwrap();
        let b = resolve(&m, Arch::Arm, sonoma()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn deny_policy_rejects_placeholder() {
        let m = mdiew(Checksum::Placeholder);
        let intel = resolve(&m, Arch::Intel, sonoma()).unwrap();
        let arm = resolve(&m, Arch::Arm, sonoma()).unwrap();

        assert!(PlaceholderPolicy::Warn.check(&intel).is_ok());
        assert!(matches!(
            PlaceholderPolicy::Deny.check(&intel),
            Err(ResolveError::UnverifiedChecksum { .. })
        ));
        assert!(PlaceholderPolicy::Deny.check(&arm).is_ok());
    }
}
