//! macOS release versions and `depends_on macos:` floors.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Marketing names accepted in place of a version number, newest first.
const NAMED_RELEASES: &[(&str, MacOsVersion)] = &[
    ("tahoe", MacOsVersion::new(26, 0, 0)),
    ("sequoia", MacOsVersion::new(15, 0, 0)),
    ("sonoma", MacOsVersion::new(14, 0, 0)),
    ("ventura", MacOsVersion::new(13, 0, 0)),
    ("monterey", MacOsVersion::new(12, 0, 0)),
    ("big_sur", MacOsVersion::new(11, 0, 0)),
    ("catalina", MacOsVersion::new(10, 15, 0)),
    ("mojave", MacOsVersion::new(10, 14, 0)),
    ("high_sierra", MacOsVersion::new(10, 13, 0)),
    ("sierra", MacOsVersion::new(10, 12, 0)),
    ("el_capitan", MacOsVersion::new(10, 11, 0)),
];

/// Errors from parsing a macOS version or requirement.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MacOsError {
    /// Neither a dotted version nor a known release name.
    #[error("Unknown macOS version: '{0}'")]
    Unknown(String),

    /// A requirement used an operator other than `>=`.
    #[error("Unsupported macOS requirement '{0}': only '>=' floors are supported")]
    UnsupportedOperator(String),
}

/// An ordered macOS version (`major.minor.patch`).
///
/// Ordering is numeric per component, so `10.15 < 11.0 < 14.2.1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacOsVersion {
    /// Major release (`14` for Sonoma, `10` for Catalina and older).
    pub major: u32,
    /// Minor release.
    pub minor: u32,
    /// Patch release.
    pub patch: u32,
}

impl MacOsVersion {
    /// Construct a version from its components.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse `"14"`, `"14.2"`, `"14.2.1"`, `"monterey"` or `":monterey"`.
    ///
    /// # Errors
    ///
    /// Returns [`MacOsError::Unknown`] for anything else.
    pub fn parse(s: &str) -> Result<Self, MacOsError> {
        let s = s.trim();
        let name = s.strip_prefix(':').unwrap_or(s).to_lowercase();

        if let Some((_, v)) = NAMED_RELEASES.iter().find(|(n, _)| *n == name) {
            return Ok(*v);
        }

        let mut parts = s.split('.');
        let mut next = |required: bool| -> Result<u32, MacOsError> {
            match parts.next() {
                Some(p) => p.parse().map_err(|_| MacOsError::Unknown(s.to_string())),
                None if required => Err(MacOsError::Unknown(s.to_string())),
                None => Ok(0),
            }
        };
        let major = next(true)?;
        let minor = next(false)?;
        let patch = next(false)?;
        if parts.next().is_some() {
            return Err(MacOsError::Unknown(s.to_string()));
        }
        Ok(Self::new(major, minor, patch))
    }

    /// Parse a `depends_on macos:` requirement into its floor.
    ///
    /// Accepts `">= :monterey"`, `">= 12"`, and a bare version or name,
    /// which Homebrew treats as a floor as well.
    ///
    /// # Errors
    ///
    /// Returns [`MacOsError::UnsupportedOperator`] for `<`, `<=`, `>` and `==`
    /// requirements, or [`MacOsError::Unknown`] if the version is unknown.
    pub fn parse_floor(requirement: &str) -> Result<Self, MacOsError> {
        let req = requirement.trim();
        if let Some(rest) = req.strip_prefix(">=") {
            return Self::parse(rest);
        }
        if req.starts_with(['<', '>', '=']) {
            return Err(MacOsError::UnsupportedOperator(req.to_string()));
        }
        Self::parse(req)
    }

    /// Marketing name for major releases that have one.
    pub fn name(&self) -> Option<&'static str> {
        NAMED_RELEASES
            .iter()
            .find(|(_, v)| v.major == self.major && (self.major > 10 || v.minor == self.minor))
            .map(|(n, _)| *n)
    }
}

impl std::fmt::Display for MacOsVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.patch == 0 {
            write!(f, "{}.{}", self.major, self.minor)
        } else {
            write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
        }
    }
}

impl std::str::FromStr for MacOsVersion {
    type Err = MacOsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for MacOsVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacOsVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse_floor(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_and_names() {
        assert_eq!(MacOsVersion::parse("14.2.1").unwrap(), MacOsVersion::new(14, 2, 1));
        assert_eq!(MacOsVersion::parse("12").unwrap(), MacOsVersion::new(12, 0, 0));
        assert_eq!(MacOsVersion::parse(":monterey").unwrap(), MacOsVersion::new(12, 0, 0));
        assert_eq!(MacOsVersion::parse("big_sur").unwrap(), MacOsVersion::new(11, 0, 0));
        assert!(MacOsVersion::parse("leopard").is_err());
        assert!(MacOsVersion::parse("14.1.2.3").is_err());
    }

    #[test]
    fn ordering_is_numeric() {
        let catalina = MacOsVersion::parse("catalina").unwrap();
        let big_sur = MacOsVersion::parse("11.0").unwrap();
        let point = MacOsVersion::parse("10.9").unwrap();
        assert!(point < catalina);
        assert!(catalina < big_sur);
        assert!(MacOsVersion::parse("12.7.6").unwrap() < MacOsVersion::parse("13").unwrap());
    }

    #[test]
    fn floors() {
        assert_eq!(
            MacOsVersion::parse_floor(">= :monterey").unwrap(),
            MacOsVersion::new(12, 0, 0)
        );
        assert_eq!(
            MacOsVersion::parse_floor(">= 10.15").unwrap(),
            MacOsVersion::new(10, 15, 0)
        );
        assert!(matches!(
            MacOsVersion::parse_floor("<= :ventura"),
            Err(MacOsError::UnsupportedOperator(_))
        ));
    }

    #[test]
    fn names_and_display() {
        assert_eq!(MacOsVersion::new(12, 6, 0).name(), Some("monterey"));
        assert_eq!(MacOsVersion::new(10, 15, 7).name(), Some("catalina"));
        assert_eq!(MacOsVersion::new(10, 15, 7).to_string(), "10.15.7");
        assert_eq!(MacOsVersion::new(12, 0, 0).to_string(), "12.0");
    }
}
