/// CPU architecture tag used as the key of a cask's `arch` and `sha256` stanzas.
///
/// Casks ship separate artifacts for Apple Silicon and Intel Macs. The tag is
/// logical; the string that ends up in the download URL (`aarch64`,
/// `x86_64`, `arm64`, ...) is whatever the manifest maps the tag to.
///
/// # Example
///
/// ```
/// use cask_schema::Arch;
///
/// let current = Arch::current();
/// println!("Running on: {}", current);
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    serde::Serialize,
    serde::Deserialize,
    Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// Apple Silicon (M1, M2, M3, etc.)
    #[default]
    Arm,
    /// Intel Macs
    Intel,
}

impl Arch {
    /// Every architecture a cask can declare, in manifest order.
    pub const ALL: [Self; 2] = [Self::Arm, Self::Intel];

    /// Get the architecture this binary was compiled for.
    pub fn current() -> Self {
        #[cfg(target_arch = "aarch64")]
        {
            Self::Arm
        }
        #[cfg(not(target_arch = "aarch64"))]
        {
            Self::Intel
        }
    }

    /// Tag as written in cask files (`arm` / `intel`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arm => "arm",
            Self::Intel => "intel",
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arm" | "arm64" | "aarch64" | "apple-silicon" => Ok(Self::Arm),
            "intel" | "x86_64" | "x86-64" | "amd64" => Ok(Self::Intel),
            _ => Err(format!("Unknown architecture: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_platform_aliases() {
        assert_eq!("aarch64".parse::<Arch>().unwrap(), Arch::Arm);
        assert_eq!("ARM64".parse::<Arch>().unwrap(), Arch::Arm);
        assert_eq!("x86_64".parse::<Arch>().unwrap(), Arch::Intel);
        assert_eq!("intel".parse::<Arch>().unwrap(), Arch::Intel);
        assert!("riscv64".parse::<Arch>().is_err());
    }

    #[test]
    fn display_matches_cask_tag() {
        assert_eq!(Arch::Arm.to_string(), "arm");
        assert_eq!(Arch::Intel.to_string(), "intel");
    }
}
