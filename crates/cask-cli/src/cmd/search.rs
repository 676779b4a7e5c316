//! Search command

use anyhow::Result;
use crossterm::style::Stylize;

use super::Session;
use crate::ui::Theme;
use crate::ui::list::print_list_row;

/// Search the catalog by token and description
pub fn search(session: &Session, query: &str) -> Result<()> {
    let start = std::time::Instant::now();
    let catalog = session.catalog()?;
    let results = catalog.search(query);

    if results.is_empty() {
        let theme = Theme::default();
        println!();
        println!(
            "  {} No casks found matching '{}'",
            theme.icons.info.blue(),
            query.white()
        );
        println!();
        return Ok(());
    }

    println!();
    for entry in &results {
        let m = &entry.manifest;
        print_list_row(m.name().as_str(), m.version().as_str(), m.description());
    }

    println!();
    println!(
        "SEARCH COMPLETE {}, elapsed {:.2}s",
        results.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
