#![doc = include_str!("../README.md")]

use std::collections::BTreeMap;

mod argv;
mod descr;
mod error;
mod layout;
mod matcher;
mod reduce;
mod scan;
mod solve;
mod usage;
mod value;

#[cfg(test)]
mod tests;

pub use crate::error::{Error, MatchError};
pub use crate::layout::{
    Alias, Description, Key, Layout, OptArg, Section, SolvedArg, Spec, UsageArg,
};
pub use crate::value::{Origin, RichValue, Value};

use crate::argv::Token;
use crate::matcher::MatchConfig;

/// Everything `run` accepts besides the help text
///
/// Plain data with chainable setters; `Default` gives the stock docopt
/// behavior with `--help` and `--version` interception.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// input strings; taken from the process arguments when absent
    pub argv: Option<Vec<String>>,
    /// environment for `[env: VAR]` fallbacks; process environment when
    /// absent
    pub env: Option<BTreeMap<String, String>>,
    /// the trailing positional consumes the rest of argv as an array
    pub options_first: bool,
    /// let the solver bind an adjacent positional as an option argument
    pub smart_options: bool,
    /// flags in usage are required instead of implicitly optional
    pub require_flags: bool,
    /// options in a fixed group may float around their siblings
    pub lax_placement: bool,
    /// every option repeats regardless of `...` marks
    pub repeatable_options: bool,
    /// collect unknown options under `?` instead of rejecting them
    pub allow_unknown: bool,
    /// aliases that terminate parsing and swallow the remainder
    pub stop_at: Vec<String>,
    pub help_flags: Vec<String>,
    pub version_flags: Vec<String>,
    /// text reported when a version flag fires
    pub version: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            argv: None,
            env: None,
            options_first: false,
            smart_options: false,
            require_flags: false,
            lax_placement: false,
            repeatable_options: false,
            allow_unknown: false,
            stop_at: Vec::new(),
            help_flags: vec!["--help".to_string()],
            version_flags: vec!["--version".to_string()],
            version: None,
        }
    }
}

impl RunOptions {
    #[must_use]
    pub fn argv(mut self, argv: Vec<String>) -> Self {
        self.argv = Some(argv);
        self
    }

    #[must_use]
    pub fn env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    #[must_use]
    pub fn options_first(mut self, on: bool) -> Self {
        self.options_first = on;
        self
    }

    #[must_use]
    pub fn smart_options(mut self, on: bool) -> Self {
        self.smart_options = on;
        self
    }

    #[must_use]
    pub fn require_flags(mut self, on: bool) -> Self {
        self.require_flags = on;
        self
    }

    #[must_use]
    pub fn lax_placement(mut self, on: bool) -> Self {
        self.lax_placement = on;
        self
    }

    #[must_use]
    pub fn repeatable_options(mut self, on: bool) -> Self {
        self.repeatable_options = on;
        self
    }

    #[must_use]
    pub fn allow_unknown(mut self, on: bool) -> Self {
        self.allow_unknown = on;
        self
    }

    #[must_use]
    pub fn stop_at<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop_at = aliases.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn help_flags(mut self, aliases: Vec<String>) -> Self {
        self.help_flags = aliases;
        self
    }

    #[must_use]
    pub fn version_flags(mut self, aliases: Vec<String>) -> Self {
        self.version_flags = aliases;
        self
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    fn match_config(&self) -> MatchConfig {
        MatchConfig {
            options_first: self.options_first,
            require_flags: self.require_flags,
            lax_placement: self.lax_placement,
            repeatable_options: self.repeatable_options,
            allow_unknown: self.allow_unknown,
            stop_at: self.stop_at.clone(),
        }
    }
}

/// Successful outcome of [`run`]
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// argv matched; one entry per alias of every bound argument
    Parsed(BTreeMap<String, Value>),
    /// a help flag fired; the full help text
    Help(String),
    /// a version flag fired
    Version(String),
}

impl Output {
    /// Returns the parsed map - for unit tests
    ///
    /// # Panics
    ///
    /// Panics if help or version fired instead
    #[track_caller]
    pub fn unwrap_parsed(self) -> BTreeMap<String, Value> {
        match self {
            Output::Parsed(map) => map,
            Output::Help(_) | Output::Version(_) => panic!("not a parse result: {:?}", self),
        }
    }
}

/// Compile a help text into an unsolved spec
pub fn parse(help: &str) -> Result<Spec<UsageArg>, Error> {
    let scanned = scan::scan(help)?;
    let usage = usage::parse_usage(&scanned.usage, &scanned.program)?;
    let sections = scanned
        .sections
        .iter()
        .map(|(name, block)| {
            Ok(Section {
                name: name.clone(),
                descriptions: descr::parse_descriptions(block)?,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;
    Ok(Spec {
        program: scanned.program,
        usage,
        sections,
        help_text: help.to_string(),
        short_usage: scanned.short_usage,
    })
}

/// Normalize a parsed spec: expand option stacks, bind option arguments,
/// inline references, prune dissolved branches
pub fn solve(spec: Spec<UsageArg>, options: &RunOptions) -> Result<Spec<SolvedArg>, Error> {
    solve::solve_spec(spec, options.smart_options)
}

/// scan the lexed tokens for one of the configured trigger aliases
fn flag_fired(tokens: &[argv::PosToken], aliases: &[String]) -> bool {
    let matches_alias = |rendered: String| aliases.iter().any(|a| *a == rendered);
    tokens.iter().any(|tok| match &tok.token {
        Token::LOpt { name, .. } => matches_alias(format!("--{}", name)),
        Token::SOpt { head, tail, .. } => {
            matches_alias(format!("-{}", head))
                || tail.iter().any(|c| matches_alias(format!("-{}", c)))
        }
        _ => false,
    })
}

/// Match argv against an already solved spec
pub fn run_spec(spec: &Spec<SolvedArg>, options: &RunOptions) -> Result<Output, Error> {
    let argv = match &options.argv {
        Some(argv) => argv.clone(),
        None => std::env::args().skip(1).collect(),
    };
    let env = match &options.env {
        Some(env) => env.clone(),
        None => std::env::vars().collect(),
    };

    let tokens = argv::lex(&argv)?;

    if flag_fired(&tokens, &options.help_flags) {
        return Ok(Output::Help(spec.help_text.clone()));
    }
    if flag_fired(&tokens, &options.version_flags) {
        return match &options.version {
            Some(version) => Ok(Output::Version(version.clone())),
            None => Err(Error::VersionMissing),
        };
    }

    let prepared = matcher::prepare(spec, &env, options.match_config());
    let outcome = matcher::match_argv(&prepared, &tokens)?;
    let map = reduce::reduce(&prepared.branches[outcome.branch], outcome.kvs);
    Ok(Output::Parsed(map))
}

/// Compile, solve and match in one call
pub fn run(help: &str, options: &RunOptions) -> Result<Output, Error> {
    let spec = parse(help)?;
    let solved = solve(spec, options)?;
    run_spec(&solved, options)
}
