use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// A normalized cask token (`mdiew`, `visual-studio-code`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct CaskName(String);

impl CaskName {
    /// Create a new cask name, normalizing the input to lowercase.
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_lowercase())
    }

    /// Return the normalized name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for CaskName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for CaskName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for CaskName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.to_lowercase()
    }
}

impl PartialEq<&str> for CaskName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.to_lowercase()
    }
}

impl Borrow<str> for CaskName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CaskName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CaskName {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

/// A cask version string.
///
/// Stored verbatim; cask versions are not always semver (`1.2.3,4567` is a
/// common shape), so the helpers below split on `.` and `,` the way the cask
/// DSL's `version.major` / `version.csv.first` accessors do.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// Create a new version from the given string (stored as-is).
    pub fn new(v: &str) -> Self {
        Self(v.to_string())
    }

    /// Return the version string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part before the first comma (`1.2.3` in `1.2.3,4567`).
    pub fn before_comma(&self) -> &str {
        self.0.split(',').next().unwrap_or_default()
    }

    /// The part after the first comma, if any.
    pub fn after_comma(&self) -> Option<&str> {
        self.0.split_once(',').map(|(_, rest)| rest)
    }

    /// The `n`th comma-separated field.
    pub fn csv(&self, n: usize) -> Option<&str> {
        self.0.split(',').nth(n)
    }

    /// The `n`th dot-separated component of [`before_comma`](Self::before_comma).
    pub fn dot(&self, n: usize) -> Option<&str> {
        self.before_comma().split('.').nth(n)
    }

    /// `major.minor`, if the version has both.
    pub fn major_minor(&self) -> Option<String> {
        Some(format!("{}.{}", self.dot(0)?, self.dot(1)?))
    }

    /// The version with every `.` removed (`1.2.3` -> `123`).
    pub fn no_dots(&self) -> String {
        self.0.replace('.', "")
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for Version {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Version {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<str> for Version {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Version {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_normalized() {
        assert_eq!(CaskName::new(" Mdiew "), "mdiew");
        assert_eq!(CaskName::from("MDIEW").as_str(), "mdiew");
    }

    #[test]
    fn version_components() {
        let v = Version::from("1.2.3,4567");
        assert_eq!(v.before_comma(), "1.2.3");
        assert_eq!(v.after_comma(), Some("4567"));
        assert_eq!(v.csv(0), Some("1.2.3"));
        assert_eq!(v.csv(1), Some("4567"));
        assert_eq!(v.dot(0), Some("1"));
        assert_eq!(v.dot(2), Some("3"));
        assert_eq!(v.dot(3), None);
        assert_eq!(v.major_minor().as_deref(), Some("1.2"));
        assert_eq!(Version::from("0.1.10").no_dots(), "0110");
    }
}
