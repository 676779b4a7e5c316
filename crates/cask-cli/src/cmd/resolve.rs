//! Resolve command

use anyhow::Result;
use cask_core::{ExpectedChecksum, Host, PlaceholderPolicy, Reporter};
use crossterm::style::Stylize;

use super::Session;
use crate::ui::Output;

/// Print the URL and checksum a cask resolves to on the target machine
pub fn resolve(
    session: &Session,
    spec: &str,
    arch: Option<&str>,
    macos: Option<&str>,
    json: bool,
    strict: bool,
) -> Result<()> {
    let entry = session.manifest(spec)?;
    let host = Host::detect_with(arch, macos)?;
    let resolved = cask_core::resolve(&entry.manifest, host.arch, host.macos)?;

    let policy = if strict {
        PlaceholderPolicy::Deny
    } else {
        session.config.policy
    };
    policy.check(&resolved)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&resolved)?);
        return Ok(());
    }

    let lw = 10;
    println!();
    println!(
        "  {} {}",
        resolved.name.as_str().white().bold(),
        resolved.version.as_str().dark_grey()
    );
    println!();
    println!("  {:<lw$}{}", "arch", resolved.arch);
    match host.macos.name() {
        Some(release) => println!("  {:<lw$}{} ({release})", "macos", host.macos),
        None => println!("  {:<lw$}{}", "macos", host.macos),
    }
    println!("  {:<lw$}{}", "url", resolved.url);
    println!("  {:<lw$}{}", "sha256", resolved.checksum);
    println!("  {:<lw$}{}", "app", resolved.app);
    if let Some(cmd) = &resolved.postflight {
        println!(
            "  {:<lw$}{} {}",
            "postflight",
            cmd.executable.display(),
            cmd.args.join(" ")
        );
    }

    if resolved.checksum == ExpectedChecksum::Unverified {
        Output::new().warning("checksum is a placeholder; the download will not be verified");
    }
    Ok(())
}
