//! List command

use anyhow::Result;

use super::Session;
use crate::ui::list::catalog_table;

/// List every cask in the catalog
pub fn list(session: &Session) -> Result<()> {
    let catalog = session.catalog()?;
    if catalog.is_empty() {
        println!(
            "No casks in {}. Add .rb or .toml manifests there to get started.",
            session.config.catalog.display()
        );
        return Ok(());
    }

    println!("{}", catalog_table(catalog.iter()));
    Ok(())
}
