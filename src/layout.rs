//! Layout trees and the shared specification container
//!
//! A usage section parses into a tree of groups and leaves. The same tree
//! shape is used twice with different leaf types: [`UsageArg`] straight out
//! of the parser and [`SolvedArg`] after the solver expanded option stacks,
//! bound option arguments and inlined section references. Keeping the leaf
//! types distinct makes it a type error to feed an unsolved spec to the
//! matcher.

use crate::value::Value;

/// A name an option is known under, `-f` or `--file`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Alias {
    Short(char),
    Long(String),
}

impl Alias {
    /// Parse an alias as written on a command line, `-f` or `--file`
    pub fn parse(s: &str) -> Option<Alias> {
        if let Some(long) = s.strip_prefix("--") {
            if long.is_empty() {
                return None;
            }
            Some(Alias::Long(long.to_string()))
        } else if let Some(short) = s.strip_prefix('-') {
            let mut chars = short.chars();
            let c = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            Some(Alias::Short(c))
        } else {
            None
        }
    }
}

impl std::fmt::Display for Alias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Alias::Short(c) => write!(f, "-{}", c),
            Alias::Long(l) => write!(f, "--{}", l),
        }
    }
}

/// Placeholder for an option argument, `FILE` in `--input=FILE`
///
/// `optional` is set for the `[=FILE]` form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptArg {
    pub name: String,
    pub optional: bool,
}

impl OptArg {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        OptArg {
            name: name.into(),
            optional: false,
        }
    }

    /// Placeholder comparison used throughout solving: case-insensitive and
    /// blind to the `<>` decoration
    pub(crate) fn agrees_with(&self, other: &str) -> bool {
        placeholder_eq(&self.name, other)
    }
}

pub(crate) fn strip_angles(name: &str) -> &str {
    name.strip_prefix('<')
        .and_then(|n| n.strip_suffix('>'))
        .unwrap_or(name)
}

pub(crate) fn placeholder_eq(a: &str, b: &str) -> bool {
    strip_angles(a).eq_ignore_ascii_case(strip_angles(b))
}

/// One record of an options section
///
/// `-h, --host <H>  description text [default: localhost] [env: HOST]`
#[derive(Debug, Clone, PartialEq)]
pub struct Description {
    pub aliases: Vec<Alias>,
    pub repeatable: bool,
    pub arg: Option<OptArg>,
    pub default: Option<Value>,
    pub env: Option<String>,
}

impl Description {
    pub(crate) fn matches(&self, alias: &Alias) -> bool {
        self.aliases.contains(alias)
    }

    pub(crate) fn matches_short(&self, c: char) -> bool {
        self.aliases.iter().any(|a| matches!(a, Alias::Short(s) if *s == c))
    }

    pub(crate) fn matches_long(&self, name: &str) -> bool {
        self.aliases.iter().any(|a| matches!(a, Alias::Long(l) if l == name))
    }
}

/// Recursive usage shape, generic over the leaf type
#[derive(Debug, Clone, PartialEq)]
pub enum Layout<A> {
    Elem(A),
    Group {
        optional: bool,
        repeatable: bool,
        /// Alternatives; each branch is an ordered sequence
        branches: Vec<Vec<Layout<A>>>,
    },
}

impl<A> Layout<A> {
    pub(crate) fn optional(branch: Vec<Layout<A>>) -> Self {
        Layout::Group {
            optional: true,
            repeatable: false,
            branches: vec![branch],
        }
    }
}

/// Leaves as they come out of the usage parser
#[derive(Debug, Clone, PartialEq)]
pub enum UsageArg {
    Command {
        name: String,
        repeatable: bool,
    },
    Positional {
        /// Written form, `<file>` or `FILE`
        name: String,
        repeatable: bool,
    },
    /// `--long` or `--long=ARG`
    Long {
        name: String,
        arg: Option<OptArg>,
        repeatable: bool,
    },
    /// `-abc`: one short option or several stacked ones, possibly with the
    /// trailing characters spelling an argument. The solver decides.
    Stack {
        chars: Vec<char>,
        arg: Option<OptArg>,
        repeatable: bool,
    },
    /// `--` (end of arguments)
    Eoa,
    /// `-` (stdin)
    Stdin,
    /// `[options]` style pointer at a description section
    Reference(String),
}

/// Leaves after solving: no stacks, no references
#[derive(Debug, Clone, PartialEq)]
pub enum SolvedArg {
    Command {
        name: String,
        repeatable: bool,
    },
    Positional {
        name: String,
        repeatable: bool,
    },
    Option {
        alias: Alias,
        arg: Option<OptArg>,
        repeatable: bool,
    },
    Eoa,
    Stdin,
}

impl std::fmt::Display for SolvedArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolvedArg::Command { name, repeatable } => {
                write!(f, "{}{}", name, if *repeatable { "..." } else { "" })
            }
            SolvedArg::Positional { name, repeatable } => {
                write!(f, "{}{}", name, if *repeatable { "..." } else { "" })
            }
            SolvedArg::Option {
                alias,
                arg,
                repeatable,
            } => {
                write!(f, "{}", alias)?;
                if let Some(arg) = arg {
                    if arg.optional {
                        write!(f, "[={}]", arg.name)?;
                    } else {
                        write!(f, "={}", arg.name)?;
                    }
                }
                if *repeatable {
                    f.write_str("...")?;
                }
                Ok(())
            }
            SolvedArg::Eoa => f.write_str("--"),
            SolvedArg::Stdin => f.write_str("-"),
        }
    }
}

impl std::fmt::Display for Layout<SolvedArg> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layout::Elem(a) => a.fmt(f),
            Layout::Group {
                optional,
                repeatable,
                branches,
            } => {
                f.write_str(if *optional { "[" } else { "(" })?;
                for (bx, branch) in branches.iter().enumerate() {
                    if bx != 0 {
                        f.write_str(" | ")?;
                    }
                    for (ix, layout) in branch.iter().enumerate() {
                        if ix != 0 {
                            f.write_str(" ")?;
                        }
                        layout.fmt(f)?;
                    }
                }
                f.write_str(if *optional { "]" } else { ")" })?;
                if *repeatable {
                    f.write_str("...")?;
                }
                Ok(())
            }
        }
    }
}

/// One options section: normalized heading plus its records
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Lowercased heading with the trailing colon removed, e.g. `options`
    /// or `advanced options`
    pub name: String,
    pub descriptions: Vec<Description>,
}

/// A compiled help text, parameterized by the layout stage
#[derive(Debug, Clone, PartialEq)]
pub struct Spec<A> {
    /// First token of the first usage line
    pub program: String,
    /// Top level disjunction: one entry per usage alternative
    pub usage: Vec<Vec<Layout<A>>>,
    pub sections: Vec<Section>,
    /// Full help text as given
    pub help_text: String,
    /// The original usage fragment, verbatim
    pub short_usage: String,
}

impl<A> Spec<A> {
    pub(crate) fn descriptions(&self) -> impl Iterator<Item = &Description> {
        self.sections.iter().flat_map(|s| s.descriptions.iter())
    }
}

/// Canonical identity of an argument across all its spellings
///
/// `-f` and `--file` collapse into a single `Key::Option`; two leaves
/// collide in the reducer iff their keys are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    /// Sorted, deduplicated alias set
    Option(Vec<Alias>),
    Command(String),
    Positional(String),
    Eoa,
    Stdin,
    /// Synthetic key collecting unknown options when they are allowed
    Unknown,
}

impl Key {
    /// Key for a solved leaf; the alias set of an option is recovered from
    /// its description when one exists
    pub(crate) fn of(arg: &SolvedArg, descr: Option<&Description>) -> Key {
        match arg {
            SolvedArg::Command { name, .. } => Key::Command(name.clone()),
            SolvedArg::Positional { name, .. } => Key::Positional(name.clone()),
            SolvedArg::Eoa => Key::Eoa,
            SolvedArg::Stdin => Key::Stdin,
            SolvedArg::Option { alias, .. } => {
                let mut aliases = match descr {
                    Some(d) => d.aliases.clone(),
                    None => vec![alias.clone()],
                };
                aliases.sort();
                aliases.dedup();
                Key::Option(aliases)
            }
        }
    }

    /// Every output map entry this key expands to
    pub(crate) fn output_names(&self) -> Vec<String> {
        match self {
            Key::Option(aliases) => aliases.iter().map(|a| a.to_string()).collect(),
            Key::Command(name) | Key::Positional(name) => vec![name.clone()],
            Key::Eoa => vec!["--".to_string()],
            Key::Stdin => vec!["-".to_string()],
            Key::Unknown => vec!["?".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_parsing() {
        assert_eq!(Alias::parse("-f"), Some(Alias::Short('f')));
        assert_eq!(Alias::parse("--file"), Some(Alias::Long("file".into())));
        assert_eq!(Alias::parse("-fx"), None);
        assert_eq!(Alias::parse("file"), None);
        assert_eq!(Alias::parse("--"), None);
    }

    #[test]
    fn placeholder_comparison() {
        assert!(placeholder_eq("<file>", "FILE"));
        assert!(placeholder_eq("FILE", "file"));
        assert!(!placeholder_eq("<file>", "dir"));
    }

    #[test]
    fn option_keys_collapse_aliases() {
        let descr = Description {
            aliases: vec![Alias::Short('f'), Alias::Long("file".into())],
            repeatable: false,
            arg: None,
            default: None,
            env: None,
        };
        let by_short = Key::of(
            &SolvedArg::Option {
                alias: Alias::Short('f'),
                arg: None,
                repeatable: false,
            },
            Some(&descr),
        );
        let by_long = Key::of(
            &SolvedArg::Option {
                alias: Alias::Long("file".into()),
                arg: None,
                repeatable: false,
            },
            Some(&descr),
        );
        assert_eq!(by_short, by_long);
        assert_eq!(by_short.output_names(), vec!["-f", "--file"]);
    }

    #[test]
    fn solved_layouts_render_as_usage() {
        let group = Layout::Group {
            optional: false,
            repeatable: true,
            branches: vec![
                vec![Layout::Elem(SolvedArg::Option {
                    alias: Alias::Short('a'),
                    arg: None,
                    repeatable: false,
                })],
                vec![Layout::Elem(SolvedArg::Option {
                    alias: Alias::Short('b'),
                    arg: None,
                    repeatable: false,
                })],
            ],
        };
        assert_eq!(group.to_string(), "(-a | -b)...");
    }
}
