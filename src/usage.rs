//! Usage section grammar
//!
//! `usage: prog [-abc] (--file=F | <input>)... [options] [--] [-]`
//!
//! Tokenization and parsing are separate passes over explicit tokens, each
//! token keeping its byte offset into the scanned usage block so errors can
//! point at a position. A physical line whose first word is the program
//! name opens a new usage alternative, any other line continues the
//! previous one; `|` opens an alternative within a line.

use crate::error::Error;
use crate::layout::{Layout, OptArg, UsageArg};

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    LParen,
    RParen,
    LBracket,
    RBracket,
    Pipe,
    Ellipsis,
    /// `--name`, `--name=ARG`, `--name[=ARG]`
    Long { name: String, arg: Option<OptArg> },
    /// `-abc`, `-f=ARG`, `-f[=ARG]`
    Stack { chars: Vec<char>, arg: Option<OptArg> },
    /// `<name>`, stored in written form
    Angle(String),
    Word(String),
    Eoa,
    Stdin,
}

#[derive(Debug, Clone, PartialEq)]
struct Positioned {
    tok: Tok,
    pos: usize,
}

fn err(message: impl Into<String>, position: usize) -> Error {
    Error::SpecParse {
        message: message.into(),
        position,
    }
}

/// Characters that always terminate a bare word
fn is_boundary(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | ']' | '|' | ',')
}

/// Read one word starting at `chars[ix]`; returns the index one past its
/// end. `[` only breaks the word unless it opens an attached `[=ARG]`
/// group; `<..>` runs are kept whole so placeholders may contain anything.
fn read_word(chars: &[(usize, char)], mut ix: usize) -> usize {
    while ix < chars.len() {
        let c = chars[ix].1;
        if is_boundary(c) {
            break;
        }
        if c == '.' && matches!(chars.get(ix + 1), Some((_, '.'))) {
            break;
        }
        if c == '[' {
            if matches!(chars.get(ix + 1), Some((_, '='))) {
                while ix < chars.len() && chars[ix].1 != ']' {
                    ix += 1;
                }
                ix += 1; // past the closing bracket
                continue;
            }
            break;
        }
        if c == '<' {
            while ix < chars.len() && chars[ix].1 != '>' {
                ix += 1;
            }
        }
        ix += 1;
    }
    ix
}

/// Split an attached argument off an option word: `=ARG` or `[=ARG]`
fn split_opt_arg(word: &str, pos: usize) -> Result<(String, Option<OptArg>), Error> {
    if let Some(at) = word.find("[=") {
        let arg = &word[at + 2..];
        let arg = arg
            .strip_suffix(']')
            .ok_or_else(|| err(format!("unterminated [= in {:?}", word), pos))?;
        if arg.is_empty() {
            return Err(err(format!("empty argument placeholder in {:?}", word), pos));
        }
        Ok((
            word[..at].to_string(),
            Some(OptArg {
                name: arg.to_string(),
                optional: true,
            }),
        ))
    } else if let Some((name, arg)) = word.split_once('=') {
        if arg.is_empty() {
            return Err(err(format!("empty argument placeholder in {:?}", word), pos));
        }
        Ok((name.to_string(), Some(OptArg::new(arg))))
    } else {
        Ok((word.to_string(), None))
    }
}

fn classify_word(word: &str, pos: usize) -> Result<Tok, Error> {
    if word == "--" {
        return Ok(Tok::Eoa);
    }
    if word == "-" {
        return Ok(Tok::Stdin);
    }
    if let Some(rest) = word.strip_prefix("--") {
        let (name, arg) = split_opt_arg(rest, pos)?;
        if name.is_empty() {
            return Err(err(format!("malformed long option {:?}", word), pos));
        }
        return Ok(Tok::Long { name, arg });
    }
    if let Some(rest) = word.strip_prefix('-') {
        let (head, arg) = split_opt_arg(rest, pos)?;
        let chars = head.chars().collect::<Vec<_>>();
        if chars.is_empty() {
            return Err(err(format!("malformed short option {:?}", word), pos));
        }
        return Ok(Tok::Stack { chars, arg });
    }
    Ok(Tok::Word(word.to_string()))
}

fn lex_line(line: &str, base: usize, out: &mut Vec<Positioned>) -> Result<(), Error> {
    let chars = line.char_indices().collect::<Vec<_>>();
    let mut ix = 0;
    while ix < chars.len() {
        let (off, c) = chars[ix];
        let pos = base + off;
        match c {
            c if c.is_whitespace() || c == ',' => ix += 1,
            '(' => {
                out.push(Positioned { tok: Tok::LParen, pos });
                ix += 1;
            }
            ')' => {
                out.push(Positioned { tok: Tok::RParen, pos });
                ix += 1;
            }
            '[' => {
                out.push(Positioned { tok: Tok::LBracket, pos });
                ix += 1;
            }
            ']' => {
                out.push(Positioned { tok: Tok::RBracket, pos });
                ix += 1;
            }
            '|' => {
                out.push(Positioned { tok: Tok::Pipe, pos });
                ix += 1;
            }
            '.' => {
                if matches!(chars.get(ix + 1), Some((_, '.')))
                    && matches!(chars.get(ix + 2), Some((_, '.')))
                {
                    out.push(Positioned { tok: Tok::Ellipsis, pos });
                    ix += 3;
                } else {
                    let end = read_word(&chars, ix);
                    let word = &line[off..chars.get(end).map_or(line.len(), |c| c.0)];
                    out.push(Positioned {
                        tok: classify_word(word, pos)?,
                        pos,
                    });
                    ix = end;
                }
            }
            '<' => {
                let end = read_word(&chars, ix);
                let word = &line[off..chars.get(end).map_or(line.len(), |c| c.0)];
                if !word.ends_with('>') {
                    return Err(err(format!("unterminated placeholder {:?}", word), pos));
                }
                out.push(Positioned {
                    tok: Tok::Angle(word.to_string()),
                    pos,
                });
                ix = end;
            }
            _ => {
                let end = read_word(&chars, ix);
                let word = &line[off..chars.get(end).map_or(line.len(), |c| c.0)];
                out.push(Positioned {
                    tok: classify_word(word, pos)?,
                    pos,
                });
                ix = end;
            }
        }
    }
    Ok(())
}

/// `ALLCAPS` words act as positionals, everything else is a command
fn is_caps_positional(word: &str) -> bool {
    word.chars().any(|c| c.is_ascii_uppercase())
        && word
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

/// `[options]` or `[advanced-options]` style section references
fn reference_name(word: &str) -> Option<String> {
    let lower = word.to_ascii_lowercase();
    if lower == "options" || lower.ends_with("-options") {
        Some(crate::scan::normalize_section_name(&lower))
    } else {
        None
    }
}

struct Parser<'a> {
    toks: &'a [Positioned],
    ix: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.ix).map(|p| &p.tok)
    }

    fn pos(&self) -> usize {
        self.toks
            .get(self.ix)
            .or_else(|| self.toks.last())
            .map_or(0, |p| p.pos)
    }

    fn bump(&mut self) -> Option<Tok> {
        let tok = self.toks.get(self.ix).map(|p| p.tok.clone());
        if tok.is_some() {
            self.ix += 1;
        }
        tok
    }

    fn eat_ellipsis(&mut self) -> bool {
        if self.peek() == Some(&Tok::Ellipsis) {
            self.ix += 1;
            true
        } else {
            false
        }
    }

    /// sequences separated by `|`
    fn alt(&mut self) -> Result<Vec<Vec<Layout<UsageArg>>>, Error> {
        let mut branches = vec![self.seq()?];
        while self.peek() == Some(&Tok::Pipe) {
            self.ix += 1;
            branches.push(self.seq()?);
        }
        Ok(branches)
    }

    fn seq(&mut self) -> Result<Vec<Layout<UsageArg>>, Error> {
        let mut out = Vec::new();
        while let Some(tok) = self.peek() {
            match tok {
                Tok::Pipe | Tok::RParen | Tok::RBracket => break,
                _ => out.push(self.atom()?),
            }
        }
        Ok(out)
    }

    fn group(&mut self, optional: bool, closing: Tok) -> Result<Layout<UsageArg>, Error> {
        let branches = self.alt()?;
        match self.bump() {
            Some(tok) if tok == closing => {}
            _ => {
                return Err(err(
                    if optional { "expected `]`" } else { "expected `)`" },
                    self.pos(),
                ))
            }
        }
        Ok(Layout::Group {
            optional,
            repeatable: self.eat_ellipsis(),
            branches,
        })
    }

    fn atom(&mut self) -> Result<Layout<UsageArg>, Error> {
        let pos = self.pos();
        let tok = self.bump().ok_or_else(|| err("expected an argument", pos))?;
        let layout = match tok {
            Tok::LParen => self.group(false, Tok::RParen)?,
            Tok::LBracket => {
                // a bracket holding a single section name is a reference,
                // not an optional group
                if let (Some(Tok::Word(w)), Some(Positioned { tok: Tok::RBracket, .. })) =
                    (self.peek(), self.toks.get(self.ix + 1))
                {
                    if let Some(name) = reference_name(w) {
                        self.ix += 2;
                        let elem = Layout::Elem(UsageArg::Reference(name));
                        if self.eat_ellipsis() {
                            Layout::Group {
                                optional: false,
                                repeatable: true,
                                branches: vec![vec![elem]],
                            }
                        } else {
                            elem
                        }
                    } else {
                        self.group(true, Tok::RBracket)?
                    }
                } else {
                    self.group(true, Tok::RBracket)?
                }
            }
            Tok::Long { name, arg } => Layout::Elem(UsageArg::Long {
                name,
                arg,
                repeatable: self.eat_ellipsis(),
            }),
            Tok::Stack { chars, arg } => Layout::Elem(UsageArg::Stack {
                chars,
                arg,
                repeatable: self.eat_ellipsis(),
            }),
            Tok::Angle(name) => Layout::Elem(UsageArg::Positional {
                name,
                repeatable: self.eat_ellipsis(),
            }),
            Tok::Word(word) => {
                let repeatable = self.eat_ellipsis();
                if is_caps_positional(&word) {
                    Layout::Elem(UsageArg::Positional {
                        name: word,
                        repeatable,
                    })
                } else {
                    Layout::Elem(UsageArg::Command {
                        name: word,
                        repeatable,
                    })
                }
            }
            Tok::Eoa => {
                self.eat_ellipsis();
                Layout::Elem(UsageArg::Eoa)
            }
            Tok::Stdin => {
                self.eat_ellipsis();
                Layout::Elem(UsageArg::Stdin)
            }
            Tok::Ellipsis => return Err(err("`...` must follow an argument", pos)),
            Tok::Pipe | Tok::RParen | Tok::RBracket => {
                return Err(err("unexpected token", pos))
            }
        };
        Ok(layout)
    }
}

/// Group physical lines into logical usage alternatives
///
/// A line whose first word is the program name (after an optional `or:`
/// prefix) starts a new alternative; any other line continues the previous
/// one. The very first line must name the program.
fn logical_lines(block: &str, program: &str) -> Result<Vec<Vec<Positioned>>, Error> {
    let mut lines: Vec<Vec<Positioned>> = Vec::new();
    let mut offset = 0;
    for line in block.split('\n') {
        let base = offset;
        offset += line.len() + 1;

        let trimmed = line.trim_start();
        let shift = line.len() - trimmed.len();
        let lower = trimmed.to_ascii_lowercase();
        let (body, body_shift) = if lower.starts_with("or:") {
            (&trimmed["or:".len()..], shift + "or:".len())
        } else {
            (trimmed, shift)
        };
        if body.trim().is_empty() {
            continue;
        }

        let mut toks = Vec::new();
        lex_line(body, base + body_shift, &mut toks)?;

        let starts_new = matches!(toks.first(), Some(Positioned { tok: Tok::Word(w), .. }) if w == program);
        if starts_new {
            lines.push(toks.into_iter().skip(1).collect());
        } else if let Some(prev) = lines.last_mut() {
            prev.extend(toks);
        } else {
            return Err(err(
                format!("usage line must start with the program name {:?}", program),
                base + body_shift,
            ));
        }
    }
    Ok(lines)
}

/// Parse a scanned usage block into the top level disjunction
pub(crate) fn parse_usage(
    block: &str,
    program: &str,
) -> Result<Vec<Vec<Layout<UsageArg>>>, Error> {
    let mut usage = Vec::new();
    for toks in logical_lines(block, program)? {
        let mut parser = Parser { toks: &toks, ix: 0 };
        let branches = parser.alt()?;
        if parser.ix != toks.len() {
            return Err(err("unexpected token", parser.pos()));
        }
        usage.extend(branches);
    }
    if usage.is_empty() {
        return Err(err("usage section declares no patterns", 0));
    }
    Ok(usage)
}
