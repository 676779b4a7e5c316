//! Audit command

use anyhow::{Result, bail};
use cask_core::{PlaceholderPolicy, Reporter, Severity};

use super::Session;
use crate::ui::Output;

/// Check every manifest in the catalog; errors fail the command
pub fn audit(session: &Session, strict: bool) -> Result<()> {
    let catalog = session.catalog()?;
    let policy = if strict {
        PlaceholderPolicy::Deny
    } else {
        session.config.policy
    };
    let findings = catalog.audit(policy);
    let output = Output::new();

    for f in &findings {
        let msg = format!("{}: {}", f.name, f.message);
        match f.severity {
            Severity::Warning => output.warning(&msg),
            Severity::Error => output.error(&msg),
        }
    }

    let errors = findings
        .iter()
        .filter(|f| f.severity == Severity::Error)
        .count();
    if errors > 0 {
        bail!("audit failed: {errors} error(s) in {} casks", catalog.len());
    }
    output.success(&format!(
        "{} casks audited, {} warning(s)",
        catalog.len(),
        findings.len()
    ));
    Ok(())
}
