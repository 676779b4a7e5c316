//! Catalog rows and tables

use comfy_table::{ContentArrangement, Table, presets};
use crossterm::style::Stylize;

use super::theme::Theme;
use cask_core::CatalogEntry;

/// Print one `name  version  description` row.
pub fn print_list_row(name: &str, version: &str, description: &str) {
    let theme = Theme::default();
    let name_part = format!("{: <width$}", name, width = theme.layout.name_width);
    let version_part = format!("{: <width$}", version, width = theme.layout.version_width);
    println!(
        "  {} {} {}",
        name_part.with(theme.colors.name),
        version_part.with(theme.colors.version),
        description.with(theme.colors.secondary)
    );
}

/// Table of catalog entries: token, version, architectures, macOS floor, description.
pub fn catalog_table<'a>(entries: impl IntoIterator<Item = &'a CatalogEntry>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["CASK", "VERSION", "ARCH", "MACOS", "DESCRIPTION"]);

    for entry in entries {
        let m = &entry.manifest;
        let arch = if m.is_single_artifact() {
            "any".to_string()
        } else {
            m.architectures()
                .map(|a| a.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        table.add_row(vec![
            m.name().to_string(),
            m.version().to_string(),
            arch,
            m.macos_requirement().unwrap_or("-").to_string(),
            m.description().to_string(),
        ]);
    }
    table
}
