//! Info command

use anyhow::Result;
use cask_schema::Checksum;
use crossterm::style::Stylize;

use super::Session;

/// Show everything a manifest declares
pub fn info(session: &Session, spec: &str) -> Result<()> {
    let entry = session.manifest(spec)?;
    let m = &entry.manifest;
    let lw = 12;

    println!();
    println!(
        "  {} {}",
        m.name().as_str().white().bold(),
        m.version().as_str().dark_grey()
    );
    if !m.description().is_empty() {
        println!("  {}", m.description());
    }
    println!();

    if !m.display_names().is_empty() {
        println!("  {:<lw$}{}", "names", m.display_names().join(", "));
    }
    if !m.homepage().is_empty() {
        println!("  {:<lw$}{}", "homepage", m.homepage());
    }
    println!("  {:<lw$}{}", "url", m.url_template());
    let digest = |c: &Checksum| match c {
        Checksum::Sha256(d) => d.to_string(),
        Checksum::Placeholder => "placeholder".yellow().to_string(),
    };
    if m.is_single_artifact() {
        if let Some(c) = m.checksum_map().values().next() {
            println!("  {:<lw$}{}", "sha256", digest(c));
        }
    } else {
        for (arch, checksum) in m.checksum_map() {
            let token = m.arch_map().get(arch).map_or("", String::as_str);
            println!("  {:<lw$}{token} {}", arch.as_str(), digest(checksum));
        }
    }
    if let Some(req) = m.macos_requirement() {
        match m.minimum_macos().and_then(|v| v.name()) {
            Some(release) => println!("  {:<lw$}{req} ({release} or later)", "macos"),
            None => println!("  {:<lw$}{req}", "macos"),
        }
    }
    println!("  {:<lw$}{}", "app", m.app());
    if let Some(cmd) = m.postflight() {
        println!(
            "  {:<lw$}{} {}",
            "postflight",
            cmd.executable.display(),
            cmd.args.join(" ")
        );
    }
    if let Some(lc) = m.livecheck() {
        let strategy = lc.strategy.as_deref().unwrap_or("default");
        let url = lc.url.as_deref().unwrap_or("download url");
        println!("  {:<lw$}{url} ({strategy})", "livecheck");
    }
    println!("  {:<lw$}{}", "source", entry.path.display());

    Ok(())
}
