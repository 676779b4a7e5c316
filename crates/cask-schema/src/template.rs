//! Download URL templates.
//!
//! Two spellings are accepted for every substitution point: the cask DSL's
//! Ruby interpolation (`#{version}`) and the `{{version}}` form used in TOML
//! manifests. Templates are validated when parsed, so rendering never fails.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::types::Version;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#\{\s*([^{}]*?)\s*\}|\{\{\s*([^{}]*?)\s*\}\}").expect("static regex is valid")
});

/// Errors raised while parsing or checking a URL template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A `#{...}` / `{{...}}` names something the template engine cannot supply.
    #[error("Unknown placeholder '{0}' in URL template")]
    UnknownPlaceholder(String),

    /// An opening `#{` or `{{` has no matching close.
    #[error("Unterminated placeholder in URL template '{0}'")]
    Unterminated(String),

    /// The version has no component for an accessor such as `version.minor`.
    #[error("Version '{version}' has no component for '{placeholder}'")]
    MissingComponent {
        /// The version being substituted.
        version: String,
        /// The accessor that could not be satisfied.
        placeholder: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    Arch,
    Version,
    Major,
    Minor,
    Patch,
    MajorMinor,
    BeforeComma,
    AfterComma,
    CsvFirst,
    CsvSecond,
    NoDots,
}

impl Placeholder {
    fn parse(key: &str) -> Option<Self> {
        Some(match key {
            "arch" => Self::Arch,
            "version" => Self::Version,
            "version.major" => Self::Major,
            "version.minor" => Self::Minor,
            "version.patch" => Self::Patch,
            "version.major_minor" => Self::MajorMinor,
            "version.before_comma" => Self::BeforeComma,
            "version.after_comma" => Self::AfterComma,
            "version.csv.first" => Self::CsvFirst,
            "version.csv.second" => Self::CsvSecond,
            "version.no_dots" => Self::NoDots,
            _ => return None,
        })
    }

    fn value(self, arch: &str, version: &Version) -> Option<String> {
        match self {
            Self::Arch => Some(arch.to_string()),
            Self::Version => Some(version.to_string()),
            Self::Major => version.dot(0).map(str::to_string),
            Self::Minor => version.dot(1).map(str::to_string),
            Self::Patch => version.dot(2).map(str::to_string),
            Self::MajorMinor => version.major_minor(),
            Self::BeforeComma => Some(version.before_comma().to_string()),
            Self::AfterComma => version.after_comma().map(str::to_string),
            Self::CsvFirst => version.csv(0).map(str::to_string),
            Self::CsvSecond => version.csv(1).map(str::to_string),
            Self::NoDots => Some(version.no_dots()),
        }
    }
}

fn key_of<'a>(caps: &'a Captures<'_>) -> &'a str {
    caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str())
}

/// A validated URL template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UrlTemplate(String);

impl UrlTemplate {
    /// Parse and validate a template.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::UnknownPlaceholder`] or
    /// [`TemplateError::Unterminated`].
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        for caps in PLACEHOLDER_RE.captures_iter(raw) {
            let key = key_of(&caps);
            if Placeholder::parse(key).is_none() {
                return Err(TemplateError::UnknownPlaceholder(key.to_string()));
            }
        }

        let stripped = PLACEHOLDER_RE.replace_all(raw, "");
        if stripped.contains("#{") || stripped.contains("{{") {
            return Err(TemplateError::Unterminated(raw.to_string()));
        }

        Ok(Self(raw.to_string()))
    }

    /// The raw template text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the template substitutes the architecture token.
    pub fn uses_arch(&self) -> bool {
        PLACEHOLDER_RE
            .captures_iter(&self.0)
            .any(|caps| Placeholder::parse(key_of(&caps)) == Some(Placeholder::Arch))
    }

    /// Confirm every version accessor in the template has a value for `version`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::MissingComponent`] naming the first accessor
    /// the version cannot satisfy.
    pub fn check(&self, version: &Version) -> Result<(), TemplateError> {
        for caps in PLACEHOLDER_RE.captures_iter(&self.0) {
            let key = key_of(&caps);
            let placeholder =
                Placeholder::parse(key).ok_or_else(|| TemplateError::UnknownPlaceholder(key.to_string()))?;
            if placeholder.value("", version).is_none() {
                return Err(TemplateError::MissingComponent {
                    version: version.to_string(),
                    placeholder: key.to_string(),
                });
            }
        }
        Ok(())
    }

    /// The template with every placeholder spelled `#{...}`.
    pub fn to_interpolated(&self) -> String {
        PLACEHOLDER_RE
            .replace_all(&self.0, |caps: &Captures<'_>| format!("#{{{}}}", key_of(caps)))
            .into_owned()
    }

    /// Substitute the architecture token and version.
    ///
    /// Accessors the version cannot satisfy render as empty strings;
    /// [`check`](Self::check) rules that out for templates owned by a
    /// validated manifest.
    pub fn render(&self, arch: &str, version: &Version) -> String {
        PLACEHOLDER_RE
            .replace_all(&self.0, |caps: &Captures<'_>| {
                Placeholder::parse(key_of(caps))
                    .and_then(|p| p.value(arch, version))
                    .unwrap_or_default()
            })
            .into_owned()
    }
}

impl std::fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for UrlTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for UrlTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for UrlTemplate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
