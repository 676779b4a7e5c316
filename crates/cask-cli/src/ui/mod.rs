//! Terminal output.
//!
//! - [`theme`] - Colors, icons and column widths
//! - [`output`] - [`Output`], the terminal [`cask_core::Reporter`]
//! - [`list`] - Rows for search results and catalog tables

pub mod list;
pub mod output;
pub mod theme;

pub use output::Output;
pub use theme::Theme;
