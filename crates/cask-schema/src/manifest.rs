//! The cask manifest model.
//!
//! [`ManifestDef`] is the loose, serde-friendly shape that loaders (TOML, the
//! cask DSL) produce. [`Manifest`] is the validated, immutable value every
//! other part of the system consumes; the only way to obtain one is
//! `Manifest::try_from(def)`, which enforces the architecture/checksum
//! invariant and checks the URL template against the version.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::arch::Arch;
use crate::hash::Checksum;
use crate::macos::{MacOsError, MacOsVersion};
use crate::template::{TemplateError, UrlTemplate};
use crate::types::{CaskName, Version};

/// Errors raised when a [`ManifestDef`] cannot become a [`Manifest`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    /// A required field is empty.
    #[error("Empty field: {0}")]
    EmptyField(&'static str),

    /// `arch` and `sha256` declare different architecture sets.
    #[error(
        "Architectures in 'arch' and 'sha256' differ: missing checksum for [{}], missing arch token for [{}]",
        join(.missing_checksums),
        join(.missing_tokens)
    )]
    ArchChecksumMismatch {
        /// Architectures with a token but no checksum.
        missing_checksums: Vec<Arch>,
        /// Architectures with a checksum but no token.
        missing_tokens: Vec<Arch>,
    },

    /// Per-architecture checksums were given without an `arch` stanza.
    #[error("Per-architecture sha256 requires an 'arch' stanza")]
    ChecksumsWithoutArch,

    /// The URL substitutes `#{arch}` but the cask declares no architectures.
    #[error("URL template uses the arch placeholder but no 'arch' stanza is declared")]
    ArchPlaceholderWithoutArch,

    /// The URL template is malformed or does not fit the version.
    #[error("Invalid url: {0}")]
    Template(#[from] TemplateError),

    /// The macOS requirement cannot be parsed.
    #[error("Invalid depends_on macos: {0}")]
    MacOs(#[from] MacOsError),
}

fn join(arches: &[Arch]) -> String {
    arches
        .iter()
        .map(Arch::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Command executed once after the bundle is in place.
///
/// Arguments may reference `#{appdir}` (the applications directory) and
/// `#{app}` (the installed bundle's full path); `{{appdir}}` / `{{app}}`
/// work too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostflightCommand {
    /// Absolute path of the executable; no shell is involved.
    pub executable: PathBuf,
    /// Argument list.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Update-check hint. Display and audit only; nothing polls it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Livecheck {
    /// URL to check; `None` means the cask's own download URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Strategy name, e.g. `github_latest`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

/// The `[cask]` table of a TOML manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaskMeta {
    /// Unique token.
    pub name: CaskName,
    /// Release version substituted into the URL.
    pub version: Version,
    /// One-line description.
    #[serde(default)]
    pub desc: String,
    /// Project homepage.
    #[serde(default)]
    pub homepage: String,
    /// Display names (`name "..."` in the DSL).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
    /// Download URL template.
    pub url: String,
    /// Installed bundle file name.
    pub app: String,
    /// `depends_on macos:` requirement, e.g. `">= :monterey"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macos: Option<String>,
}

/// Checksums as written: one for every architecture, or one per architecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChecksumDef {
    /// A single checksum shared by every declared architecture.
    Single(Checksum),
    /// One checksum per architecture tag.
    PerArch(BTreeMap<Arch, Checksum>),
}

/// Unvalidated manifest, the serde shape of a TOML cask file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestDef {
    /// Checksums.
    pub sha256: ChecksumDef,
    /// Identity, URL and bundle.
    pub cask: CaskMeta,
    /// Architecture tag to URL token. Empty for single-artifact casks.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub arch: BTreeMap<Arch, String>,
    /// Optional postflight command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postflight: Option<PostflightCommand>,
    /// Optional livecheck hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub livecheck: Option<Livecheck>,
}

/// A validated, immutable cask manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ManifestDef", into = "ManifestDef")]
pub struct Manifest {
    name: CaskName,
    version: Version,
    description: String,
    homepage: String,
    display_names: Vec<String>,
    arch_map: BTreeMap<Arch, String>,
    checksum_map: BTreeMap<Arch, Checksum>,
    url: UrlTemplate,
    minimum_macos: Option<MacOsVersion>,
    macos_requirement: Option<String>,
    app: String,
    postflight: Option<PostflightCommand>,
    livecheck: Option<Livecheck>,
    single_artifact: bool,
}

impl TryFrom<ManifestDef> for Manifest {
    type Error = ManifestError;

    fn try_from(def: ManifestDef) -> Result<Self, Self::Error> {
        let ManifestDef {
            sha256,
            cask,
            arch,
            postflight,
            livecheck,
        } = def;

        if cask.name.is_empty() {
            return Err(ManifestError::EmptyField("name"));
        }
        if cask.version.is_empty() {
            return Err(ManifestError::EmptyField("version"));
        }
        if cask.url.trim().is_empty() {
            return Err(ManifestError::EmptyField("url"));
        }
        if cask.app.trim().is_empty() {
            return Err(ManifestError::EmptyField("app"));
        }

        let url = UrlTemplate::parse(cask.url.trim())?;
        url.check(&cask.version)?;

        // Without an `arch` stanza the single artifact serves every architecture.
        let single_artifact = arch.is_empty();
        let arch_map: BTreeMap<Arch, String> = if single_artifact {
            if url.uses_arch() {
                return Err(ManifestError::ArchPlaceholderWithoutArch);
            }
            Arch::ALL.iter().map(|a| (*a, String::new())).collect()
        } else {
            arch
        };

        let checksum_map = match sha256 {
            ChecksumDef::Single(c) => arch_map.keys().map(|a| (*a, c.clone())).collect(),
            ChecksumDef::PerArch(_) if single_artifact => {
                return Err(ManifestError::ChecksumsWithoutArch);
            }
            ChecksumDef::PerArch(map) => map,
        };

        let token_keys: BTreeSet<Arch> = arch_map.keys().copied().collect();
        let checksum_keys: BTreeSet<Arch> = checksum_map.keys().copied().collect();
        if token_keys != checksum_keys {
            return Err(ManifestError::ArchChecksumMismatch {
                missing_checksums: token_keys.difference(&checksum_keys).copied().collect(),
                missing_tokens: checksum_keys.difference(&token_keys).copied().collect(),
            });
        }

        let minimum_macos = cask
            .macos
            .as_deref()
            .map(MacOsVersion::parse_floor)
            .transpose()?;

        Ok(Self {
            name: cask.name,
            version: cask.version,
            description: cask.desc,
            homepage: cask.homepage,
            display_names: cask.names,
            arch_map,
            checksum_map,
            url,
            minimum_macos,
            macos_requirement: cask.macos,
            app: cask.app.trim().to_string(),
            postflight,
            livecheck,
            single_artifact,
        })
    }
}

impl From<Manifest> for ManifestDef {
    fn from(m: Manifest) -> Self {
        let shared = if m.single_artifact {
            m.checksum_map.values().next().cloned()
        } else {
            None
        };
        let sha256 = match shared {
            Some(c) => ChecksumDef::Single(c),
            None => ChecksumDef::PerArch(m.checksum_map),
        };

        Self {
            sha256,
            cask: CaskMeta {
                name: m.name,
                version: m.version,
                desc: m.description,
                homepage: m.homepage,
                names: m.display_names,
                url: m.url.as_str().to_string(),
                app: m.app,
                macos: m.macos_requirement,
            },
            arch: if m.single_artifact {
                BTreeMap::new()
            } else {
                m.arch_map
            },
            postflight: m.postflight,
            livecheck: m.livecheck,
        }
    }
}

impl Manifest {
    /// Unique token.
    pub fn name(&self) -> &CaskName {
        &self.name
    }

    /// Release version.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// One-line description (may be empty).
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Homepage URL (may be empty).
    pub fn homepage(&self) -> &str {
        &self.homepage
    }

    /// Display names.
    pub fn display_names(&self) -> &[String] {
        &self.display_names
    }

    /// Architecture tag to URL token.
    pub fn arch_map(&self) -> &BTreeMap<Arch, String> {
        &self.arch_map
    }

    /// Architecture tag to checksum. Same key set as [`arch_map`](Self::arch_map).
    pub fn checksum_map(&self) -> &BTreeMap<Arch, Checksum> {
        &self.checksum_map
    }

    /// Declared architectures, in tag order.
    pub fn architectures(&self) -> impl Iterator<Item = Arch> + '_ {
        self.arch_map.keys().copied()
    }

    /// Download URL template.
    pub fn url_template(&self) -> &UrlTemplate {
        &self.url
    }

    /// Minimum macOS version, if the cask declares one.
    pub fn minimum_macos(&self) -> Option<MacOsVersion> {
        self.minimum_macos
    }

    /// The macOS requirement as written, e.g. `>= :monterey`.
    pub fn macos_requirement(&self) -> Option<&str> {
        self.macos_requirement.as_deref()
    }

    /// Installed bundle file name.
    pub fn app(&self) -> &str {
        &self.app
    }

    /// Postflight command, if any.
    pub fn postflight(&self) -> Option<&PostflightCommand> {
        self.postflight.as_ref()
    }

    /// Livecheck hint, if any.
    pub fn livecheck(&self) -> Option<&Livecheck> {
        self.livecheck.as_ref()
    }

    /// True when the cask has no `arch` stanza.
    pub fn is_single_artifact(&self) -> bool {
        self.single_artifact
    }

    /// True if any declared architecture still carries the placeholder.
    pub fn has_placeholder_checksums(&self) -> bool {
        self.checksum_map.values().any(Checksum::is_placeholder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str = "b9422d0e0b1b16154919729c19137c9d8895121c5adf8522664b109b16332a7b";

    fn def() -> ManifestDef {
        ManifestDef {
            sha256: ChecksumDef::PerArch(BTreeMap::from([
                (Arch::Arm, Checksum::parse(DIGEST).unwrap()),
                (Arch::Intel, Checksum::Placeholder),
            ])),
            cask: CaskMeta {
                name: CaskName::new("mdiew"),
                version: Version::from("0.1.10"),
                desc: "A fast, native macOS markdown viewer".to_string(),
                homepage: "https://github.com/SeungheonOh/mdiew".to_string(),
                names: vec!["mdiew".to_string()],
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
        }
    }

    #[test]
    fn valid_manifest() {
        let m = Manifest::try_from(def()).unwrap();
        assert_eq!(m.name(), "mdiew");
        assert_eq!(m.minimum_macos(), Some(MacOsVersion::new(12, 0, 0)));
        assert!(m.has_placeholder_checksums());
        assert_eq!(m.architectures().collect::<Vec<_>>(), vec![Arch::Arm, Arch::Intel]);
        let tokens: Vec<_> = m.arch_map().keys().collect();
        let sums: Vec<_> = m.checksum_map().keys().collect();
        assert_eq!(tokens, sums);
    }

    #[test]
    fn missing_checksum_is_rejected() {
        let mut d = def();
        d.sha256 = ChecksumDef::PerArch(BTreeMap::from([(Arch::Arm, Checksum::Placeholder)]));
        assert_eq!(
            Manifest::try_from(d),
            Err(ManifestError::ArchChecksumMismatch {
                missing_checksums: vec![Arch::Intel],
                missing_tokens: vec![],
            })
        );
    }

    #[test]
    fn missing_token_is_rejected() {
        let mut d = def();
        d.arch.remove(&Arch::Intel);
        let err = Manifest::try_from(d).unwrap_err();
        assert_eq!(
            err,
            ManifestError::ArchChecksumMismatch {
                missing_checksums: vec![],
                missing_tokens: vec![Arch::Intel],
            }
        );
        assert!(err.to_string().contains("missing arch token for [intel]"));
    }

    #[test]
    fn single_checksum_covers_every_arch() {
        let mut d = def();
        d.sha256 = ChecksumDef::Single(Checksum::Placeholder);
        let m = Manifest::try_from(d).unwrap();
        assert_eq!(m.checksum_map().len(), 2);
    }

    #[test]
    fn single_artifact_cask() {
        let mut d = def();
        d.arch.clear();
        d.sha256 = ChecksumDef::Single(Checksum::parse(DIGEST).unwrap());
        d.cask.url = "https://example.com/app-#{version}.zip".to_string();
        let m = Manifest::try_from(d).unwrap();
        assert!(m.is_single_artifact());
        assert_eq!(m.arch_map().len(), 2);
        assert_eq!(m.checksum_map().len(), 2);

        let back = ManifestDef::from(m);
        assert!(back.arch.is_empty());
        assert!(matches!(back.sha256, ChecksumDef::Single(_)));
    }

    #[test]
    fn arch_placeholder_needs_arch_stanza() {
        let mut d = def();
        d.arch.clear();
        d.sha256 = ChecksumDef::Single(Checksum::Placeholder);
        assert_eq!(
            Manifest::try_from(d),
            Err(ManifestError::ArchPlaceholderWithoutArch)
        );
    }

    #[test]
    fn empty_fields_are_rejected() {
        let mut d = def();
        d.cask.app = "  ".to_string();
        assert_eq!(Manifest::try_from(d), Err(ManifestError::EmptyField("app")));
    }

    #[test]
    fn toml_shape() {
        let src = r#"
sha256 = "PLACEHOLDER"

[cask]
name = "Example"
version = "1.2.0"
url = "https://example.com/{{version}}/example-{{arch}}.zip"
app = "Example.app"
macos = ">= :ventura"

[arch]
arm = "arm64"
intel = "x86_64"

[postflight]
executable = "/usr/bin/xattr"
args = ["-cr", "{{app}}"]
"#;
        let m: Manifest = toml::from_str(src).unwrap();
        assert_eq!(m.name(), "example");
        assert_eq!(m.minimum_macos(), Some(MacOsVersion::new(13, 0, 0)));
        assert_eq!(m.postflight().unwrap().args, vec!["-cr", "{{app}}"]);

        let bad = src.replace("intel = \"x86_64\"\n", "");
        let bad = bad.replace("sha256 = \"PLACEHOLDER\"", "sha256 = { arm = \"PLACEHOLDER\", intel = \"PLACEHOLDER\" }");
        assert!(toml::from_str::<Manifest>(&bad).is_err());
    }
}
