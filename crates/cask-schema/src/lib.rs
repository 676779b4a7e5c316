//! Shared types for cask manifests.
//!
//! Everything in this crate is plain data: architecture tags, checksums,
//! macOS version floors, URL templates and the validated [`Manifest`].
//! No I/O happens here.

pub mod arch;
pub mod hash;
pub mod macos;
pub mod manifest;
pub mod template;
pub mod types;

// Re-exports
pub use arch::*;
pub use hash::*;
pub use macos::{MacOsError, MacOsVersion};
pub use manifest::{
    CaskMeta, ChecksumDef, Livecheck, Manifest, ManifestDef, ManifestError, PostflightCommand,
};
pub use template::{TemplateError, UrlTemplate};
pub use types::*;

/// Sentinel checksum meaning "not yet computed, do not enforce".
pub const PLACEHOLDER: &str = "PLACEHOLDER";
