//! Description section grammar
//!
//! ```text
//! Options:
//!   -h, --host <H>  host to bind [default: "localhost"] [env: HOST]
//!   -v, --verbose   more output, may be given twice
//! ```
//!
//! Rows are detected first (a line whose first character after indent is a
//! dash), then the spec column is parsed word by word; the first word that
//! is neither an alias, a placeholder nor `...` ends the spec column and
//! starts the free-form description where `[default: ..]` and `[env: ..]`
//! tags are picked up.

use crate::error::Error;
use crate::layout::{placeholder_eq, Alias, Description, OptArg};
use crate::value::Value;

fn err(message: impl Into<String>) -> Error {
    Error::SpecParse {
        message: message.into(),
        position: 0,
    }
}

/// One word of the spec column
enum SpecWord {
    Alias(Alias, Option<OptArg>),
    Placeholder(String),
    Ellipsis,
    /// Not part of the spec column
    Text,
}

fn is_placeholder(word: &str) -> bool {
    if word.starts_with('<') && word.ends_with('>') && word.len() > 2 {
        return true;
    }
    word.chars().any(|c| c.is_ascii_uppercase())
        && word
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

/// `=ARG` / `[=ARG]` attached to an alias
fn split_attached(rest: &str) -> Result<(String, Option<OptArg>), Error> {
    if let Some(at) = rest.find("[=") {
        let arg = rest[at + 2..]
            .strip_suffix(']')
            .ok_or_else(|| err(format!("unterminated [= in {:?}", rest)))?;
        Ok((
            rest[..at].to_string(),
            Some(OptArg {
                name: arg.to_string(),
                optional: true,
            }),
        ))
    } else if let Some((name, arg)) = rest.split_once('=') {
        Ok((name.to_string(), Some(OptArg::new(arg))))
    } else {
        Ok((rest.to_string(), None))
    }
}

fn spec_word(word: &str) -> Result<SpecWord, Error> {
    let trimmed = word.trim_matches(',');
    if trimmed.is_empty() {
        return Ok(SpecWord::Text);
    }
    if trimmed == "..." {
        return Ok(SpecWord::Ellipsis);
    }
    if let Some(rest) = trimmed.strip_prefix("--") {
        let (name, arg) = split_attached(rest)?;
        if name.is_empty() {
            return Err(err(format!("malformed long option {:?}", trimmed)));
        }
        return Ok(SpecWord::Alias(Alias::Long(name), arg));
    }
    if let Some(rest) = trimmed.strip_prefix('-') {
        if rest.is_empty() {
            return Ok(SpecWord::Text);
        }
        let (head, mut arg) = split_attached(rest)?;
        let mut chars = head.chars();
        let c = chars.next().ok_or_else(|| err("malformed short option"))?;
        let attached = chars.as_str();
        if !attached.is_empty() {
            // `-fFILE`: the rest of the word is the placeholder
            if arg.is_some() {
                return Err(err(format!("malformed short option {:?}", trimmed)));
            }
            arg = Some(OptArg::new(attached));
        }
        return Ok(SpecWord::Alias(Alias::Short(c), arg));
    }
    if is_placeholder(trimmed) {
        return Ok(SpecWord::Placeholder(trimmed.to_string()));
    }
    Ok(SpecWord::Text)
}

/// Extract a `[tag: value]` from free-form description text
fn tag(text: &str, name: &str) -> Option<String> {
    let lower = text.to_ascii_lowercase();
    let marker = format!("[{}:", name);
    let at = lower.find(&marker)?;
    let rest = &text[at + marker.len()..];
    let end = rest.find(']')?;
    Some(rest[..end].trim().to_string())
}

fn unquote(s: &str) -> &str {
    let s = s.trim();
    if s.len() >= 2 {
        let stripped = s
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .or_else(|| s.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')));
        if let Some(inner) = stripped {
            return inner;
        }
    }
    s
}

struct Row {
    spec: String,
    text: String,
}

/// Cut the block into rows: dash-led lines start a record, anything else
/// continues the previous record's description text
fn rows(block: &str) -> Vec<Row> {
    let mut out: Vec<Row> = Vec::new();
    for line in block.lines() {
        let trimmed = line.trim();
        let looks_like_option = trimmed.starts_with('-')
            && trimmed
                .chars()
                .nth(1)
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '-');
        if looks_like_option {
            // the spec column ends at a run of two spaces when present
            let (spec, text) = match trimmed.find("  ") {
                Some(at) => (&trimmed[..at], trimmed[at..].trim()),
                None => (trimmed, ""),
            };
            out.push(Row {
                spec: spec.to_string(),
                text: text.to_string(),
            });
        } else if let Some(prev) = out.last_mut() {
            if !prev.text.is_empty() {
                prev.text.push(' ');
            }
            prev.text.push_str(trimmed);
        }
    }
    out
}

fn parse_row(row: &Row) -> Result<Description, Error> {
    let mut aliases = Vec::new();
    let mut arg: Option<OptArg> = None;
    let mut repeatable = false;
    let mut tail = String::new();

    let mut in_spec = true;
    for raw in row.spec.split_whitespace() {
        if !in_spec {
            tail.push(' ');
            tail.push_str(raw);
            continue;
        }
        // `--verbose...` carries the repetition mark attached to the word
        let word = match raw.strip_suffix("...") {
            Some(head) if !head.is_empty() => {
                repeatable = true;
                head
            }
            _ => raw,
        };
        match spec_word(word)? {
            SpecWord::Alias(alias, attached) => {
                aliases.push(alias);
                if let Some(attached) = attached {
                    merge_arg(&mut arg, attached, &row.spec)?;
                }
            }
            SpecWord::Placeholder(name) => {
                if aliases.is_empty() {
                    in_spec = false;
                    tail.push_str(raw);
                } else {
                    merge_arg(&mut arg, OptArg::new(name), &row.spec)?;
                }
            }
            SpecWord::Ellipsis => repeatable = true,
            SpecWord::Text => {
                in_spec = false;
                tail.push_str(raw);
            }
        }
    }

    if aliases.is_empty() {
        return Err(err(format!("description row without an option: {:?}", row.spec)));
    }

    let text = if tail.is_empty() {
        row.text.clone()
    } else {
        format!("{} {}", tail.trim(), row.text)
    };

    let default = tag(&text, "default").map(|v| Value::Str(unquote(&v).to_string()));
    let env = tag(&text, "env");

    Ok(Description {
        aliases,
        repeatable,
        arg,
        default,
        env,
    })
}

/// Placeholders may be written after several aliases; they must agree
fn merge_arg(slot: &mut Option<OptArg>, incoming: OptArg, row: &str) -> Result<(), Error> {
    match slot {
        None => {
            *slot = Some(incoming);
            Ok(())
        }
        Some(existing) => {
            if !placeholder_eq(&existing.name, &incoming.name) {
                return Err(err(format!(
                    "placeholders {:?} and {:?} disagree in {:?}",
                    existing.name, incoming.name, row
                )));
            }
            existing.optional |= incoming.optional;
            Ok(())
        }
    }
}

/// Parse one scanned description block
pub(crate) fn parse_descriptions(block: &str) -> Result<Vec<Description>, Error> {
    rows(block).iter().map(parse_row).collect()
}
