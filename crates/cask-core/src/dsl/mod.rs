//! The cask DSL: the declarative Ruby subset `Casks/*.rb` files are written in.
//!
//! ```text
//! cask "mdiew" do
//!   arch arm: "aarch64", intel: "x86_64"
//!   version "0.1.10"
//!   sha256 arm:   "PLACEHOLDER",
//!          intel: "PLACEHOLDER"
//!   url "https://github.com/.../v#{version}/mdiew-#{arch}-apple-darwin.app.zip"
//!   depends_on macos: ">= :monterey"
//!   app "mdiew.app"
//! end
//! ```
//!
//! Parsing yields a [`ManifestDef`]; validation into a
//! [`Manifest`](cask_schema::Manifest) happens in the loader.

mod lexer;
mod parser;

use std::fmt::Write as _;

use cask_schema::{Checksum, Manifest, ManifestDef};
use thiserror::Error;

/// Syntax errors in a cask file. Every variant that can point at a line does.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DslError {
    /// A character that starts no token.
    #[error("line {line}: unexpected character '{ch}'")]
    UnexpectedChar {
        /// 1-based line.
        line: usize,
        /// The character.
        ch: char,
    },

    /// A string literal runs to end of file.
    #[error("line {line}: unterminated string")]
    UnterminatedString {
        /// Line the string starts on.
        line: usize,
    },

    /// The grammar expected something else.
    #[error("line {line}: expected {expected}, found {found}")]
    Unexpected {
        /// 1-based line.
        line: usize,
        /// What would have been valid.
        expected: String,
        /// What was there.
        found: String,
    },

    /// A stanza this parser does not support.
    #[error("line {line}: unknown stanza '{stanza}'")]
    UnknownStanza {
        /// 1-based line.
        line: usize,
        /// Stanza name.
        stanza: String,
    },

    /// A stanza that may appear once appeared again.
    #[error("line {line}: duplicate '{stanza}'")]
    Duplicate {
        /// Line of the second occurrence.
        line: usize,
        /// Stanza name.
        stanza: String,
    },

    /// A stanza has the wrong arguments.
    #[error("line {line}: {message}")]
    Invalid {
        /// 1-based line.
        line: usize,
        /// Description.
        message: String,
    },

    /// A `do` block was never closed.
    #[error("missing 'end'")]
    MissingEnd,

    /// A required stanza is absent.
    #[error("missing required stanza '{0}'")]
    Missing(&'static str),
}

/// Parse cask DSL source.
///
/// # Errors
///
/// Returns a [`DslError`] describing the first syntax problem.
pub fn parse(source: &str) -> Result<ManifestDef, DslError> {
    let tokens = lexer::tokenize(source)?;
    parser::Parser::new(tokens).parse_cask()
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn checksum_literal(c: &Checksum) -> String {
    match c {
        Checksum::Sha256(d) => quote(d.as_str()),
        Checksum::Placeholder => quote(cask_schema::PLACEHOLDER),
    }
}

/// Render a manifest as a cask file that [`parse`] reads back to the same value.
pub fn render(m: &Manifest) -> String {
    let mut out = format!("cask {} do\n", quote(m.name()));

    if !m.is_single_artifact() {
        let tokens: Vec<String> = m
            .arch_map()
            .iter()
            .map(|(a, t)| format!("{a}: {}", quote(t)))
            .collect();
        let _ = writeln!(out, "  arch {}", tokens.join(", "));
    }
    let _ = writeln!(out, "  version {}", quote(m.version()));

    if m.is_single_artifact() {
        if let Some(c) = m.checksum_map().values().next() {
            let _ = writeln!(out, "  sha256 {}", checksum_literal(c));
        }
    } else {
        let sums: Vec<String> = m
            .checksum_map()
            .iter()
            .map(|(a, c)| format!("{a}: {}", checksum_literal(c)))
            .collect();
        let _ = writeln!(out, "  sha256 {}", sums.join(",\n         "));
    }

    out.push('\n');
    let _ = writeln!(out, "  url {}", quote(&m.url_template().to_interpolated()));
    for n in m.display_names() {
        let _ = writeln!(out, "  name {}", quote(n));
    }
    if !m.description().is_empty() {
        let _ = writeln!(out, "  desc {}", quote(m.description()));
    }
    if !m.homepage().is_empty() {
        let _ = writeln!(out, "  homepage {}", quote(m.homepage()));
    }

    if let Some(lc) = m.livecheck() {
        out.push_str("\n  livecheck do\n");
        match &lc.url {
            Some(u) => {
                let _ = writeln!(out, "    url {}", quote(u));
            }
            None => out.push_str("    url :url\n"),
        }
        if let Some(s) = &lc.strategy {
            let _ = writeln!(out, "    strategy :{s}");
        }
        out.push_str("  end\n");
    }

    if let Some(req) = m.macos_requirement() {
        let _ = write!(out, "\n  depends_on macos: {}\n", quote(req));
    }

    let _ = write!(out, "\n  app {}\n", quote(m.app()));

    if let Some(pf) = m.postflight() {
        let args: Vec<String> = pf.args.iter().map(|a| quote(a)).collect();
        let _ = write!(
            out,
            "\n  postflight do\n    system_command {},\n                   args: [{}]\n  end\n",
            quote(&pf.executable.to_string_lossy()),
            args.join(", ")
        );
    }

    out.push_str("end\n");
    out
}
