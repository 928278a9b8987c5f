//! Splitting a raw help text into its blocks
//!
//! The scanner stays deliberately dumb: it finds the `usage:` anchor, cuts
//! the usage block out, and collects every options-style section with its
//! heading. Actual grammar lives in [`crate::usage`] and [`crate::descr`].

use crate::error::Error;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Scanned {
    /// First token of the first usage line
    pub(crate) program: String,
    /// Usage block with the `usage:` heading stripped
    pub(crate) usage: String,
    /// `(normalized heading, block text)` per description section
    pub(crate) sections: Vec<(String, String)>,
    /// The usage fragment as written, heading included
    pub(crate) short_usage: String,
}

/// Remove ANSI escape sequences so decorated help texts still scan
fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\u{1b}' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'[') {
            chars.next();
            // parameter and intermediate bytes run until the final byte
            for c in chars.by_ref() {
                if ('\u{40}'..='\u{7e}').contains(&c) {
                    break;
                }
            }
        }
    }
    out
}

fn usage_anchor(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("usage:") {
        Some(&trimmed["usage:".len()..])
    } else {
        None
    }
}

/// A heading of a description block: `Options:`, `Advanced options:`
fn section_heading(line: &str) -> Option<String> {
    let trimmed = line.trim();
    let name = trimmed.strip_suffix(':')?;
    if name.is_empty() || !name.to_ascii_lowercase().contains("options") {
        return None;
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-')
    {
        return None;
    }
    Some(normalize_section_name(name))
}

pub(crate) fn normalize_section_name(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace('-', " ")
}

pub(crate) fn scan(help: &str) -> Result<Scanned, Error> {
    let clean = strip_ansi(help);
    let lines = clean.lines().collect::<Vec<_>>();

    let start = lines
        .iter()
        .position(|l| usage_anchor(l).is_some())
        .ok_or_else(|| Error::Scan("help text contains no usage section".to_string()))?;

    // the usage block runs until a blank line or a section heading
    let mut usage = String::new();
    let mut original = Vec::new();
    let mut end = lines.len();
    for (ix, &line) in lines.iter().enumerate().skip(start) {
        let body = if ix == start {
            usage_anchor(line).unwrap_or(line)
        } else if line.trim().is_empty() || section_heading(line).is_some() {
            end = ix;
            break;
        } else {
            line
        };
        original.push(line);
        if !usage.is_empty() {
            usage.push('\n');
        }
        usage.push_str(body);
    }

    let program = usage
        .split_whitespace()
        .next()
        .ok_or_else(|| Error::Scan("usage section names no program".to_string()))?
        .to_string();

    let mut sections: Vec<(String, String)> = Vec::new();
    for &line in lines.iter().skip(end) {
        if let Some(name) = section_heading(line) {
            sections.push((name, String::new()));
        } else if let Some((_, body)) = sections.last_mut() {
            if !body.is_empty() {
                body.push('\n');
            }
            body.push_str(line);
        }
    }

    tracing::debug!(
        program = %program,
        sections = sections.len(),
        "scanned help text"
    );

    Ok(Scanned {
        program,
        usage,
        sections,
        short_usage: original.join("\n"),
    })
}
