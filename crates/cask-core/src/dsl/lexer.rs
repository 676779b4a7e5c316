//! Tokenizer for cask files.

use std::iter::Peekable;
use std::str::Chars;

use super::DslError;

/// Token kinds produced by [`tokenize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Tok {
    /// Bare identifier: `cask`, `do`, `end`, `true`, ...
    Ident(String),
    /// Hash-style key: `arm:` in `arch arm: "aarch64"`.
    Key(String),
    /// Symbol literal: `:url`, `:no_check`.
    Symbol(String),
    /// String literal with escapes resolved and `#{...}` kept verbatim.
    Str(String),
    Comma,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Newline,
}

impl Tok {
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Ident(s) => format!("'{s}'"),
            Self::Key(s) => format!("'{s}:'"),
            Self::Symbol(s) => format!("':{s}'"),
            Self::Str(s) => format!("\"{s}\""),
            Self::Comma => "','".to_string(),
            Self::LBracket => "'['".to_string(),
            Self::RBracket => "']'".to_string(),
            Self::LParen => "'('".to_string(),
            Self::RParen => "')'".to_string(),
            Self::Newline => "end of line".to_string(),
        }
    }
}

/// A token and the 1-based line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Spanned {
    pub(crate) tok: Tok,
    pub(crate) line: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '?' || c == '!'
}

fn take_ident(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut out = String::new();
    while let Some(&c) = chars.peek() {
        if !is_ident_char(c) {
            break;
        }
        out.push(c);
        chars.next();
    }
    out
}

fn take_string(chars: &mut Peekable<Chars<'_>>, quote: char, line: &mut usize) -> Result<String, DslError> {
    let start = *line;
    let mut out = String::new();
    loop {
        let Some(c) = chars.next() else {
            return Err(DslError::UnterminatedString { line: start });
        };
        match c {
            c if c == quote => return Ok(out),
            '\\' => match chars.next() {
                Some('n') if quote == '"' => out.push('\n'),
                Some('t') if quote == '"' => out.push('\t'),
                Some(e @ ('"' | '\'' | '\\')) => out.push(e),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => return Err(DslError::UnterminatedString { line: start }),
            },
            '\n' => {
                *line += 1;
                out.push('\n');
            }
            c => out.push(c),
        }
    }
}

/// Split cask source into tokens.
///
/// Consecutive newlines collapse into one [`Tok::Newline`]; comments run from
/// `#` to end of line.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Spanned>, DslError> {
    let mut chars = source.chars().peekable();
    let mut tokens: Vec<Spanned> = Vec::new();
    let mut line = 1;

    while let Some(&c) = chars.peek() {
        let at = line;
        let tok = match c {
            '\n' => {
                chars.next();
                line += 1;
                if matches!(tokens.last(), Some(Spanned { tok: Tok::Newline, .. }) | None) {
                    continue;
                }
                Tok::Newline
            }
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '#' => {
                while chars.peek().is_some_and(|&c| c != '\n') {
                    chars.next();
                }
                continue;
            }
            '"' | '\'' => {
                chars.next();
                Tok::Str(take_string(&mut chars, c, &mut line)?)
            }
            ':' => {
                chars.next();
                match chars.peek() {
                    Some(&c) if is_ident_start(c) => Tok::Symbol(take_ident(&mut chars)),
                    Some('"') => {
                        chars.next();
                        Tok::Symbol(take_string(&mut chars, '"', &mut line)?)
                    }
                    _ => return Err(DslError::UnexpectedChar { line, ch: ':' }),
                }
            }
            ',' => {
                chars.next();
                Tok::Comma
            }
            '[' => {
                chars.next();
                Tok::LBracket
            }
            ']' => {
                chars.next();
                Tok::RBracket
            }
            '(' => {
                chars.next();
                Tok::LParen
            }
            ')' => {
                chars.next();
                Tok::RParen
            }
            c if is_ident_start(c) => {
                let ident = take_ident(&mut chars);
                // `key:` but not `key::` and not `key :sym`
                if chars.peek() == Some(&':') {
                    let mut ahead = chars.clone();
                    ahead.next();
                    if ahead.peek() != Some(&':') {
                        chars.next();
                        tokens.push(Spanned { tok: Tok::Key(ident), line: at });
                        continue;
                    }
                }
                Tok::Ident(ident)
            }
            other => return Err(DslError::UnexpectedChar { line, ch: other }),
        };
        tokens.push(Spanned { tok, line: at });
    }

    Ok(tokens)
}
