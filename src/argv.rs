//! Argv tokenization
//!
//! Splits the raw argument vector into positioned tokens. `-abc` stays one
//! token carrying a head and a tail of stacked characters: whether the tail
//! is more flags or an attached argument depends on the option being
//! matched, so the decision belongs to the matcher, not the lexer. Every
//! token keeps its source string verbatim so terminating arguments can
//! reproduce the remaining command line exactly.

use crate::error::Error;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// `--name` or `--name=value`
    LOpt { name: String, arg: Option<String> },
    /// `-a`, `-abc`, `-abc=value`
    SOpt {
        head: char,
        tail: Vec<char>,
        arg: Option<String>,
    },
    /// plain word: command, positional, or an option argument
    Lit(String),
    /// `--` with everything that followed it, verbatim
    Eoa(Vec<String>),
    /// `-` alone
    Stdin,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PosToken {
    pub(crate) token: Token,
    /// original command line string this token came from
    pub(crate) source: String,
    pub(crate) id: usize,
}

pub(crate) fn lex(argv: &[String]) -> Result<Vec<PosToken>, Error> {
    let mut out = Vec::new();
    let mut items = argv.iter().enumerate();
    while let Some((id, item)) = items.next() {
        let token = if item == "--" {
            let rest = items.map(|(_, s)| s.clone()).collect();
            out.push(PosToken {
                token: Token::Eoa(rest),
                source: item.clone(),
                id,
            });
            break;
        } else if item == "-" {
            Token::Stdin
        } else if let Some(body) = item.strip_prefix("--") {
            let (name, arg) = match body.split_once('=') {
                Some((name, arg)) => (name, Some(arg.to_string())),
                None => (body, None),
            };
            if name.is_empty() {
                return Err(Error::ArgvLex(format!("malformed input {:?}", item)));
            }
            Token::LOpt {
                name: name.to_string(),
                arg,
            }
        } else if let Some(body) = item.strip_prefix('-') {
            let (stack, arg) = match body.split_once('=') {
                Some((stack, arg)) => (stack, Some(arg.to_string())),
                None => (body, None),
            };
            let mut chars = stack.chars();
            let head = match chars.next() {
                Some(c) => c,
                None => return Err(Error::ArgvLex(format!("malformed input {:?}", item))),
            };
            Token::SOpt {
                head,
                tail: chars.collect(),
                arg,
            }
        } else {
            Token::Lit(item.clone())
        };
        out.push(PosToken {
            token,
            source: item.clone(),
            id,
        });
    }
    Ok(out)
}

/// The remaining input rendered back into command line strings; used by
/// terminating leaves that capture the rest of argv verbatim
pub(crate) fn remainder_strings(tokens: &[PosToken]) -> Vec<String> {
    let mut out = Vec::new();
    for tok in tokens {
        match &tok.token {
            Token::Eoa(rest) => {
                out.push(tok.source.clone());
                out.extend(rest.iter().cloned());
            }
            _ => out.push(tok.source.clone()),
        }
    }
    out
}
