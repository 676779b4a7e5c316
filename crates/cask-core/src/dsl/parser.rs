//! Stanza parser producing a [`ManifestDef`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use cask_schema::{Arch, CaskMeta, CaskName, Checksum, ChecksumDef, Livecheck, ManifestDef, PostflightCommand, Version};

use super::DslError;
use super::lexer::{Spanned, Tok};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Str(String),
    Symbol(String),
    Bool(bool),
    Array(Vec<Value>),
}

impl Value {
    fn describe(&self) -> String {
        match self {
            Self::Str(s) => format!("\"{s}\""),
            Self::Symbol(s) => format!(":{s}"),
            Self::Bool(b) => b.to_string(),
            Self::Array(_) => "array".to_string(),
        }
    }
}

/// Arguments of one stanza: `name "a", key: "b"`.
#[derive(Debug, Default)]
struct Args {
    positional: Vec<Value>,
    named: Vec<(String, Value)>,
}

#[derive(Debug, Default)]
struct Builder {
    token: String,
    version: Option<Version>,
    sha256: Option<ChecksumDef>,
    arch: BTreeMap<Arch, String>,
    url: Option<String>,
    names: Vec<String>,
    desc: Option<String>,
    homepage: Option<String>,
    macos: Option<String>,
    app: Option<String>,
    livecheck: Option<Livecheck>,
    postflight: Option<PostflightCommand>,
}

pub(crate) struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    last_line: usize,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Spanned>) -> Self {
        let last_line = tokens.last().map_or(1, |t| t.line);
        Self {
            tokens,
            pos: 0,
            last_line,
        }
    }

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|s| &s.tok)
    }

    fn line(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.last_line, |s| s.line)
    }

    fn bump(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).map(|s| s.tok.clone());
        self.pos += 1;
        tok
    }

    fn unexpected(&self, expected: &str) -> DslError {
        DslError::Unexpected {
            line: self.line(),
            expected: expected.to_string(),
            found: self
                .peek()
                .map_or_else(|| "end of file".to_string(), Tok::describe),
        }
    }

    fn skip_newlines(&mut self) {
        while self.peek() == Some(&Tok::Newline) {
            self.pos += 1;
        }
    }

    fn expect_ident(&mut self, word: &str) -> Result<(), DslError> {
        match self.peek() {
            Some(Tok::Ident(w)) if w == word => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.unexpected(&format!("'{word}'"))),
        }
    }

    fn expect_end_of_statement(&mut self) -> Result<(), DslError> {
        match self.peek() {
            None => Ok(()),
            Some(Tok::Newline) => {
                self.pos += 1;
                Ok(())
            }
            Some(_) => Err(self.unexpected("end of line")),
        }
    }

    /// Parse a whole file: `cask "token" do ... end`.
    pub(crate) fn parse_cask(mut self) -> Result<ManifestDef, DslError> {
        self.skip_newlines();
        self.expect_ident("cask")?;
        let token = match self.bump() {
            Some(Tok::Str(s)) => s,
            _ => {
                self.pos -= 1;
                return Err(self.unexpected("cask token string"));
            }
        };
        self.expect_ident("do")?;
        self.expect_end_of_statement()?;

        let mut b = Builder {
            token,
            ..Builder::default()
        };

        loop {
            self.skip_newlines();
            let line = self.line();
            match self.bump() {
                Some(Tok::Ident(w)) if w == "end" => break,
                Some(Tok::Ident(stanza)) => self.stanza(&mut b, &stanza, line)?,
                Some(_) => {
                    self.pos -= 1;
                    return Err(self.unexpected("stanza"));
                }
                None => return Err(DslError::MissingEnd),
            }
        }

        self.skip_newlines();
        if self.peek().is_some() {
            return Err(self.unexpected("end of file"));
        }

        b.finish()
    }

    fn stanza(&mut self, b: &mut Builder, stanza: &str, line: usize) -> Result<(), DslError> {
        match stanza {
            "livecheck" => {
                let lc = self.livecheck_block()?;
                set_once(&mut b.livecheck, lc, "livecheck", line)
            }
            "postflight" => {
                let cmd = self.postflight_block()?;
                set_once(&mut b.postflight, cmd, "postflight", line)
            }
            _ => {
                let args = self.args()?;
                self.expect_end_of_statement()?;
                apply(b, stanza, args, line)
            }
        }
    }

    /// Arguments up to end of line; newlines after `,` or inside brackets continue.
    fn args(&mut self) -> Result<Args, DslError> {
        let mut args = Args::default();
        let parens = self.peek() == Some(&Tok::LParen);
        if parens {
            self.pos += 1;
            self.skip_newlines();
        }

        let at_end = |p: &Self| match p.peek() {
            None | Some(Tok::Newline) => true,
            Some(Tok::RParen) => parens,
            Some(Tok::Ident(w)) => w == "do",
            _ => false,
        };

        while !at_end(self) {
            if let Some(Tok::Key(k)) = self.peek() {
                let k = k.clone();
                self.pos += 1;
                let v = self.value()?;
                args.named.push((k, v));
            } else {
                let v = self.value()?;
                if !args.named.is_empty() {
                    return Err(DslError::Invalid {
                        line: self.line(),
                        message: "positional argument after keyword arguments".to_string(),
                    });
                }
                args.positional.push(v);
            }

            if self.peek() == Some(&Tok::Comma) {
                self.pos += 1;
                self.skip_newlines();
            } else {
                break;
            }
        }

        if parens {
            self.skip_newlines();
            if self.bump() != Some(Tok::RParen) {
                self.pos -= 1;
                return Err(self.unexpected("')'"));
            }
        }
        Ok(args)
    }

    fn value(&mut self) -> Result<Value, DslError> {
        match self.bump() {
            Some(Tok::Str(s)) => Ok(Value::Str(s)),
            Some(Tok::Symbol(s)) => Ok(Value::Symbol(s)),
            Some(Tok::Ident(w)) if w == "true" => Ok(Value::Bool(true)),
            Some(Tok::Ident(w)) if w == "false" => Ok(Value::Bool(false)),
            Some(Tok::LBracket) => {
                let mut items = Vec::new();
                loop {
                    self.skip_newlines();
                    if self.peek() == Some(&Tok::RBracket) {
                        self.pos += 1;
                        break;
                    }
                    items.push(self.value()?);
                    self.skip_newlines();
                    match self.bump() {
                        Some(Tok::Comma) => {}
                        Some(Tok::RBracket) => break,
                        _ => {
                            self.pos -= 1;
                            return Err(self.unexpected("',' or ']'"));
                        }
                    }
                }
                Ok(Value::Array(items))
            }
            _ => {
                self.pos -= 1;
                Err(self.unexpected("a value"))
            }
        }
    }

    fn block_start(&mut self) -> Result<(), DslError> {
        self.expect_ident("do")?;
        self.expect_end_of_statement()
    }

    /// Statements of a `do ... end` block, handed to `each` one by one.
    fn block_body(
        &mut self,
        mut each: impl FnMut(&str, Args, usize) -> Result<(), DslError>,
    ) -> Result<(), DslError> {
        loop {
            self.skip_newlines();
            let line = self.line();
            match self.bump() {
                Some(Tok::Ident(w)) if w == "end" => return self.expect_end_of_statement(),
                Some(Tok::Ident(w)) => {
                    let args = self.args()?;
                    self.expect_end_of_statement()?;
                    each(&w, args, line)?;
                }
                Some(_) => {
                    self.pos -= 1;
                    return Err(self.unexpected("statement or 'end'"));
                }
                None => return Err(DslError::MissingEnd),
            }
        }
    }

    fn livecheck_block(&mut self) -> Result<Livecheck, DslError> {
        self.block_start()?;
        let mut lc = Livecheck::default();
        self.block_body(|stmt, args, line| {
            let v = single(args, stmt, line)?;
            match (stmt, v) {
                ("url", Value::Symbol(s)) if s == "url" => lc.url = None,
                ("url", Value::Str(s)) => lc.url = Some(s),
                ("strategy", Value::Symbol(s)) => lc.strategy = Some(s),
                ("url" | "strategy", other) => {
                    return Err(DslError::Invalid {
                        line,
                        message: format!("unsupported livecheck {stmt} {}", other.describe()),
                    });
                }
                _ => {
                    return Err(DslError::UnknownStanza {
                        line,
                        stanza: format!("livecheck.{stmt}"),
                    });
                }
            }
            Ok(())
        })?;
        Ok(lc)
    }

    fn postflight_block(&mut self) -> Result<PostflightCommand, DslError> {
        self.block_start()?;
        let mut cmd: Option<PostflightCommand> = None;
        self.block_body(|stmt, args, line| {
            if stmt != "system_command" {
                return Err(DslError::UnknownStanza {
                    line,
                    stanza: format!("postflight.{stmt}"),
                });
            }
            let parsed = system_command(args, line)?;
            set_once(&mut cmd, parsed, "system_command", line)
        })?;
        cmd.ok_or(DslError::Invalid {
            line: self.line(),
            message: "postflight block has no system_command".to_string(),
        })
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, stanza: &str, line: usize) -> Result<(), DslError> {
    if slot.is_some() {
        return Err(DslError::Duplicate {
            line,
            stanza: stanza.to_string(),
        });
    }
    *slot = Some(value);
    Ok(())
}

fn single(args: Args, stanza: &str, line: usize) -> Result<Value, DslError> {
    let Args { mut positional, named } = args;
    if !named.is_empty() || positional.len() != 1 {
        return Err(DslError::Invalid {
            line,
            message: format!("'{stanza}' takes exactly one argument"),
        });
    }
    Ok(positional.remove(0))
}

fn string(args: Args, stanza: &str, line: usize) -> Result<String, DslError> {
    match single(args, stanza, line)? {
        Value::Str(s) => Ok(s),
        other => Err(DslError::Invalid {
            line,
            message: format!("'{stanza}' expects a string, got {}", other.describe()),
        }),
    }
}

fn arch_tag(key: &str, line: usize) -> Result<Arch, DslError> {
    key.parse().map_err(|message| DslError::Invalid { line, message })
}

fn checksum(v: Value, line: usize) -> Result<Checksum, DslError> {
    let raw = match v {
        Value::Str(s) => s,
        Value::Symbol(s) if s == "no_check" => return Ok(Checksum::Placeholder),
        other => {
            return Err(DslError::Invalid {
                line,
                message: format!("invalid sha256 {}", other.describe()),
            });
        }
    };
    Checksum::parse(&raw).map_err(|e| DslError::Invalid {
        line,
        message: e.to_string(),
    })
}

fn apply(b: &mut Builder, stanza: &str, args: Args, line: usize) -> Result<(), DslError> {
    match stanza {
        "version" => {
            let v = string(args, stanza, line)?;
            set_once(&mut b.version, Version::from(v), stanza, line)
        }
        "arch" => {
            if !b.arch.is_empty() {
                return Err(DslError::Duplicate {
                    line,
                    stanza: stanza.to_string(),
                });
            }
            if !args.positional.is_empty() || args.named.is_empty() {
                return Err(DslError::Invalid {
                    line,
                    message: "'arch' expects arm: and/or intel: tokens".to_string(),
                });
            }
            for (key, v) in args.named {
                let Value::Str(token) = v else {
                    return Err(DslError::Invalid {
                        line,
                        message: format!("arch token for '{key}' must be a string"),
                    });
                };
                if b.arch.insert(arch_tag(&key, line)?, token).is_some() {
                    return Err(DslError::Duplicate {
                        line,
                        stanza: format!("arch {key}:"),
                    });
                }
            }
            Ok(())
        }
        "sha256" => {
            let def = if args.named.is_empty() {
                ChecksumDef::Single(checksum(single(args, stanza, line)?, line)?)
            } else if !args.positional.is_empty() {
                return Err(DslError::Invalid {
                    line,
                    message: "'sha256' takes a checksum or arch: checksum pairs, not both".to_string(),
                });
            } else {
                let mut map = BTreeMap::new();
                for (key, v) in args.named {
                    if map.insert(arch_tag(&key, line)?, checksum(v, line)?).is_some() {
                        return Err(DslError::Duplicate {
                            line,
                            stanza: format!("sha256 {key}:"),
                        });
                    }
                }
                ChecksumDef::PerArch(map)
            };
            set_once(&mut b.sha256, def, stanza, line)
        }
        "url" => {
            let Args { positional, named } = args;
            if let Some((key, _)) = named.iter().find(|(k, _)| k != "verified") {
                return Err(DslError::Invalid {
                    line,
                    message: format!("unsupported url option '{key}'"),
                });
            }
            let url = string(
                Args {
                    positional,
                    named: Vec::new(),
                },
                stanza,
                line,
            )?;
            set_once(&mut b.url, url, stanza, line)
        }
        "name" => {
            let n = string(args, stanza, line)?;
            b.names.push(n);
            Ok(())
        }
        "desc" => {
            let d = string(args, stanza, line)?;
            set_once(&mut b.desc, d, stanza, line)
        }
        "homepage" => {
            let h = string(args, stanza, line)?;
            set_once(&mut b.homepage, h, stanza, line)
        }
        "app" => {
            let a = string(args, stanza, line)?;
            set_once(&mut b.app, a, stanza, line)
        }
        "depends_on" => {
            if !args.positional.is_empty() {
                return Err(DslError::Invalid {
                    line,
                    message: "'depends_on' expects keyword arguments".to_string(),
                });
            }
            for (key, v) in args.named {
                if key != "macos" {
                    return Err(DslError::UnknownStanza {
                        line,
                        stanza: format!("depends_on {key}:"),
                    });
                }
                let req = match v {
                    Value::Str(s) => s,
                    Value::Symbol(s) => format!(">= :{s}"),
                    other => {
                        return Err(DslError::Invalid {
                            line,
                            message: format!("invalid macos requirement {}", other.describe()),
                        });
                    }
                };
                set_once(&mut b.macos, req, "depends_on macos", line)?;
            }
            Ok(())
        }
        _ => Err(DslError::UnknownStanza {
            line,
            stanza: stanza.to_string(),
        }),
    }
}

fn system_command(args: Args, line: usize) -> Result<PostflightCommand, DslError> {
    let Args { positional, named } = args;
    let executable = match positional.as_slice() {
        [Value::Str(s)] => PathBuf::from(s),
        _ => {
            return Err(DslError::Invalid {
                line,
                message: "system_command expects an executable path".to_string(),
            });
        }
    };

    let mut out = PostflightCommand {
        executable,
        args: Vec::new(),
    };
    for (key, v) in named {
        match (key.as_str(), v) {
            ("args", Value::Array(items)) => {
                for item in items {
                    let Value::Str(s) = item else {
                        return Err(DslError::Invalid {
                            line,
                            message: format!("system_command arg {} is not a string", item.describe()),
                        });
                    };
                    out.args.push(s);
                }
            }
            ("sudo", Value::Bool(false)) => {}
            (key, v) => {
                return Err(DslError::Invalid {
                    line,
                    message: format!("unsupported system_command option {key}: {}", v.describe()),
                });
            }
        }
    }
    Ok(out)
}

impl Builder {
    fn finish(self) -> Result<ManifestDef, DslError> {
        Ok(ManifestDef {
            sha256: self.sha256.ok_or(DslError::Missing("sha256"))?,
            cask: CaskMeta {
                name: CaskName::new(&self.token),
                version: self.version.ok_or(DslError::Missing("version"))?,
                desc: self.desc.unwrap_or_default(),
                homepage: self.homepage.unwrap_or_default(),
                names: self.names,
                url: self.url.ok_or(DslError::Missing("url"))?,
                app: self.app.ok_or(DslError::Missing("app"))?,
                macos: self.macos,
            },
            arch: self.arch,
            postflight: self.postflight,
            livecheck: self.livecheck,
        })
    }
}
