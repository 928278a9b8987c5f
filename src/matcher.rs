//! The argument matcher
//!
//! A backtracking pattern matcher over positioned argv tokens. Each solved
//! branch compiles into a list of patterns; groups holding only options
//! match in any order, groups holding a positional, command, `--` or `-`
//! match left to right. Alternation is pure: every attempt works on its own
//! copy of the token list and failures are values ranked by how far they
//! got, never exceptions.

use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use crate::argv::{remainder_strings, PosToken, Token};
use crate::error::{Failure, MatchError};
use crate::layout::{Alias, Description, Key, Layout, OptArg, SolvedArg, Spec};
use crate::value::{RichValue, Value};

/// Matcher knobs, a subset of [`crate::RunOptions`]
#[derive(Debug, Clone, Default)]
pub(crate) struct MatchConfig {
    pub(crate) options_first: bool,
    pub(crate) require_flags: bool,
    pub(crate) lax_placement: bool,
    pub(crate) repeatable_options: bool,
    pub(crate) allow_unknown: bool,
    pub(crate) stop_at: Vec<String>,
}

/// A leaf with everything the matcher needs precomputed
#[derive(Debug)]
pub(crate) struct Arg {
    pub(crate) id: usize,
    pub(crate) inner: SolvedArg,
    pub(crate) key: Key,
    /// matching this leaf consumes the rest of the input
    pub(crate) can_term: bool,
    pub(crate) descr: Option<Description>,
    /// default value or environment value, origin recorded
    pub(crate) fallback: Option<RichValue>,
}

impl Arg {
    /// How the leaf reads in complaints: `-f FILE` for an option with a
    /// mandatory argument, the bare alias otherwise
    pub(crate) fn display_name(&self) -> String {
        match &self.inner {
            SolvedArg::Option { alias, arg, .. } => {
                let arg = arg
                    .as_ref()
                    .or_else(|| self.descr.as_ref().and_then(|d| d.arg.as_ref()));
                match arg {
                    Some(a) if !a.optional => format!("{} {}", alias, a.name),
                    _ => alias.to_string(),
                }
            }
            SolvedArg::Command { name, .. } | SolvedArg::Positional { name, .. } => name.clone(),
            SolvedArg::Eoa => "--".to_string(),
            SolvedArg::Stdin => "-".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Pattern {
    Leaf {
        optional: bool,
        repeatable: bool,
        arg: Rc<Arg>,
    },
    Choice {
        optional: bool,
        repeatable: bool,
        /// holds a non-option somewhere, so its branches match in order
        fixed: bool,
        branches: Vec<Vec<Pattern>>,
    },
}

impl Pattern {
    fn repeatable(&self) -> bool {
        match self {
            Pattern::Leaf { repeatable, .. } | Pattern::Choice { repeatable, .. } => *repeatable,
        }
    }

    /// leftmost leaf, the name used in missing-argument complaints
    fn leftmost(&self) -> String {
        match self {
            Pattern::Leaf { arg, .. } => arg.display_name(),
            Pattern::Choice { branches, .. } => branches
                .iter()
                .flatten()
                .next()
                .map_or_else(|| "?".to_string(), Pattern::leftmost),
        }
    }

    /// a subtree of options only may float freely
    fn is_option_subtree(&self) -> bool {
        match self {
            Pattern::Leaf { arg, .. } => matches!(arg.inner, SolvedArg::Option { .. }),
            Pattern::Choice { fixed, .. } => !fixed,
        }
    }
}

/// Aliases the spec knows about, memoized once per parse
#[derive(Debug, Default)]
pub(crate) struct Known {
    shorts: HashSet<char>,
    longs: HashSet<String>,
}

impl Known {
    fn insert(&mut self, alias: &Alias) {
        match alias {
            Alias::Short(c) => {
                self.shorts.insert(*c);
            }
            Alias::Long(l) => {
                self.longs.insert(l.clone());
            }
        }
    }

    fn is_known(&self, token: &Token) -> bool {
        match token {
            Token::LOpt { name, .. } => self.longs.contains(name),
            Token::SOpt { head, .. } => self.shorts.contains(head),
            Token::Lit(_) | Token::Eoa(_) | Token::Stdin => true,
        }
    }

    /// a long prefix abbreviation is only honored when exactly one known
    /// long matches it
    fn ambiguous_abbreviation(&self, name: &str, given: &str) -> bool {
        self.longs
            .iter()
            .any(|l| l != name && given.starts_with(l.as_str()))
    }
}

/// The compiled matcher: one pattern list per top level branch
#[derive(Debug)]
pub(crate) struct Prepared {
    pub(crate) branches: Vec<Vec<Pattern>>,
    known: Known,
    cfg: MatchConfig,
}

fn layout_has_non_option(layout: &Layout<SolvedArg>) -> bool {
    match layout {
        Layout::Elem(SolvedArg::Option { .. }) => false,
        Layout::Elem(_) => true,
        Layout::Group { branches, .. } => branches.iter().flatten().any(layout_has_non_option),
    }
}

fn fallback_of(descr: &Description, env: &BTreeMap<String, String>) -> Option<RichValue> {
    if let Some(var) = &descr.env {
        if let Some(value) = env.get(var) {
            return Some(RichValue::env(Value::Str(value.clone())));
        }
    }
    descr
        .default
        .as_ref()
        .map(|v| RichValue::default(v.clone()))
}

struct Prep<'a> {
    env: &'a BTreeMap<String, String>,
    descrs: Vec<Description>,
    cfg: &'a MatchConfig,
    next_id: usize,
}

impl Prep<'_> {
    /// `tail_positional` marks the trailing positional of a branch, which
    /// under `options_first` swallows the rest of the command line
    fn make_arg(&mut self, inner: &SolvedArg, tail_positional: bool) -> Rc<Arg> {
        let descr = match inner {
            SolvedArg::Option { alias, .. } => {
                self.descrs.iter().find(|d| d.matches(alias)).cloned()
            }
            _ => None,
        };
        let key = Key::of(inner, descr.as_ref());
        let fallback = descr.as_ref().and_then(|d| fallback_of(d, self.env));
        let can_term = match inner {
            SolvedArg::Eoa => true,
            SolvedArg::Positional { .. } => tail_positional && self.cfg.options_first,
            SolvedArg::Option { .. } => match &key {
                Key::Option(aliases) => aliases
                    .iter()
                    .any(|a| self.cfg.stop_at.iter().any(|s| *s == a.to_string())),
                _ => false,
            },
            _ => false,
        };
        let id = self.next_id;
        self.next_id += 1;
        Rc::new(Arg {
            id,
            inner: inner.clone(),
            key,
            can_term,
            descr,
            fallback,
        })
    }

    fn pattern(&mut self, layout: &Layout<SolvedArg>, tail: bool) -> Pattern {
        match layout {
            Layout::Elem(inner) => {
                let (optional, repeatable) = match inner {
                    SolvedArg::Option {
                        arg: opt_arg,
                        repeatable,
                        ..
                    } => (
                        // bare flags are implicitly optional
                        opt_arg.is_none() && !self.cfg.require_flags,
                        *repeatable || self.cfg.repeatable_options,
                    ),
                    SolvedArg::Command { repeatable, .. }
                    | SolvedArg::Positional { repeatable, .. } => (false, *repeatable),
                    SolvedArg::Eoa | SolvedArg::Stdin => (false, false),
                };
                Pattern::Leaf {
                    optional,
                    repeatable,
                    arg: self.make_arg(inner, tail),
                }
            }
            Layout::Group {
                optional,
                repeatable,
                branches,
            } => Pattern::Choice {
                optional: *optional,
                repeatable: *repeatable,
                fixed: layout_has_non_option(layout),
                branches: branches.iter().map(|b| self.seq(b, tail)).collect(),
            },
        }
    }

    fn seq(&mut self, layouts: &[Layout<SolvedArg>], tail: bool) -> Vec<Pattern> {
        let last = layouts.len().saturating_sub(1);
        layouts
            .iter()
            .enumerate()
            .map(|(ix, l)| self.pattern(l, tail && ix == last))
            .collect()
    }
}

pub(crate) fn prepare(
    spec: &Spec<SolvedArg>,
    env: &BTreeMap<String, String>,
    cfg: MatchConfig,
) -> Prepared {
    fn walk(layout: &Layout<SolvedArg>, known: &mut Known) {
        match layout {
            Layout::Elem(SolvedArg::Option { alias, .. }) => known.insert(alias),
            Layout::Elem(_) => {}
            Layout::Group { branches, .. } => {
                branches.iter().flatten().for_each(|l| walk(l, known));
            }
        }
    }

    let mut known = Known::default();
    for d in spec.descriptions() {
        for alias in &d.aliases {
            known.insert(alias);
        }
    }
    for layout in spec.usage.iter().flatten() {
        walk(layout, &mut known);
    }

    let mut prep = Prep {
        env,
        descrs: spec.descriptions().cloned().collect(),
        cfg: &cfg,
        next_id: 0,
    };
    let branches = spec.usage.iter().map(|b| prep.seq(b, true)).collect();

    Prepared {
        branches,
        known,
        cfg,
    }
}

/// One matched binding
#[derive(Debug, Clone)]
pub(crate) struct KeyValue {
    pub(crate) key: Key,
    pub(crate) value: RichValue,
}

#[derive(Debug, Clone)]
struct State {
    input: Vec<PosToken>,
    initial_weight: usize,
    omissions: usize,
    kvs: Vec<KeyValue>,
    /// a terminating leaf fired; remaining patterns are not consulted
    ended: bool,
}

/// Stacked short options count one unit per character so peeling a flag
/// off a stack still registers as progress
fn token_weight(tok: &PosToken) -> usize {
    match &tok.token {
        Token::SOpt { tail, .. } => 1 + tail.len(),
        Token::Eoa(rest) => 1 + rest.len(),
        _ => 1,
    }
}

impl State {
    fn new(input: Vec<PosToken>) -> Self {
        let initial_weight = input.iter().map(token_weight).sum();
        State {
            input,
            initial_weight,
            omissions: 0,
            kvs: Vec::new(),
            ended: false,
        }
    }

    fn weight(&self) -> usize {
        self.input.iter().map(token_weight).sum()
    }

    /// how much of the input is gone, the score alternation maximizes
    fn consumed(&self) -> usize {
        self.initial_weight - self.weight()
    }

    /// most input consumed wins, fewer omissions breaks ties, whoever came
    /// first breaks the rest
    fn better_than(&self, other: &State) -> bool {
        self.consumed() > other.consumed()
            || (self.consumed() == other.consumed() && self.omissions < other.omissions)
    }

    fn head(&self) -> Option<&Token> {
        self.input.first().map(|t| &t.token)
    }

    fn pop(&mut self) -> PosToken {
        self.input.remove(0)
    }

    fn emit(&mut self, arg: &Arg, value: RichValue) {
        tracing::trace!(id = arg.id, key = ?arg.key, origin = ?value.origin, "emit");
        self.kvs.push(KeyValue {
            key: arg.key.clone(),
            value,
        });
    }

    /// collect the rest of the input verbatim and end the branch
    fn terminate(&mut self, arg: &Arg, first: Option<String>) {
        let mut rest: Vec<Value> = first.into_iter().map(Value::Str).collect();
        rest.extend(remainder_strings(&self.input).into_iter().map(Value::Str));
        self.input.clear();
        self.ended = true;
        self.emit(arg, RichValue::argv(Value::Array(rest)));
    }
}

struct Ctx<'a> {
    known: &'a Known,
    cfg: &'a MatchConfig,
}

fn no_match(state: &State) -> Failure {
    let message = match state.input.first() {
        Some(tok) => format!("unexpected {}", tok.source),
        None => "unexpected end of input".to_string(),
    };
    Failure::fail(MatchError::Generic(message), state.consumed())
}

/// Try one application of a leaf pattern against the head of the input
fn match_leaf(arg: &Rc<Arg>, repeatable: bool, state: &State, ctx: &Ctx) -> Result<State, Failure> {
    let mut next = state.clone();
    match &arg.inner {
        SolvedArg::Command { name, .. } => match next.head() {
            Some(Token::Lit(word)) if word == name => {
                next.pop();
                if arg.can_term {
                    next.terminate(arg, None);
                } else {
                    next.emit(arg, RichValue::argv(Value::Bool(true)));
                }
                Ok(next)
            }
            _ => Err(no_match(state)),
        },
        SolvedArg::Positional { .. } => match next.head() {
            Some(Token::Lit(_)) => {
                let word = match next.pop().token {
                    Token::Lit(w) => w,
                    _ => unreachable!("head was a literal"),
                };
                if arg.can_term {
                    next.terminate(arg, Some(word));
                } else {
                    next.emit(arg, RichValue::argv(Value::Str(word)));
                }
                Ok(next)
            }
            _ => Err(no_match(state)),
        },
        SolvedArg::Eoa => match next.head() {
            Some(Token::Eoa(_)) => {
                let rest = match next.pop().token {
                    Token::Eoa(rest) => rest,
                    _ => unreachable!("head was --"),
                };
                next.ended = true;
                next.emit(
                    arg,
                    RichValue::argv(Value::Array(rest.into_iter().map(Value::Str).collect())),
                );
                Ok(next)
            }
            _ => Err(no_match(state)),
        },
        SolvedArg::Stdin => match next.head() {
            Some(Token::Stdin) => {
                next.pop();
                next.emit(arg, RichValue::argv(Value::Bool(true)));
                Ok(next)
            }
            _ => Err(no_match(state)),
        },
        SolvedArg::Option { arg: opt_arg, .. } => {
            // the leaf names one alias but answers to every spelling the
            // description lists
            let aliases = match &arg.key {
                Key::Option(aliases) => aliases,
                _ => unreachable!("option leaves have option keys"),
            };
            let mut failure: Option<Failure> = None;
            for alias in aliases {
                match match_option(arg, alias, opt_arg.as_ref(), repeatable, state, ctx) {
                    Ok(next) => return Ok(next),
                    Err(f) if f.fatal => return Err(f),
                    Err(f) => {
                        failure = Some(match failure.take() {
                            None => f,
                            Some(prev) => prev.combine_with(f),
                        });
                    }
                }
            }
            Err(failure.unwrap_or_else(|| no_match(state)))
        }
    }
}

/// consume a run of literals as the option's value
fn take_lit_values(next: &mut State, repeatable: bool) -> Option<Value> {
    let mut values = Vec::new();
    while let Some(Token::Lit(_)) = next.head() {
        if let Token::Lit(w) = next.pop().token {
            values.push(Value::Str(w));
        }
        if !repeatable {
            break;
        }
    }
    match values.len() {
        0 => None,
        1 => Some(values.remove(0)),
        _ => Some(Value::Array(values)),
    }
}

fn match_option(
    arg: &Rc<Arg>,
    alias: &Alias,
    opt_arg: Option<&OptArg>,
    repeatable: bool,
    state: &State,
    ctx: &Ctx,
) -> Result<State, Failure> {
    let mut next = state.clone();
    let value = match (alias, state.head()) {
        (
            Alias::Long(name),
            Some(Token::LOpt {
                name: given,
                arg: explicit,
            }),
        ) => {
            if given == name {
                match (opt_arg, explicit) {
                    (None, Some(_)) => {
                        return Err(Failure::fatal(
                            MatchError::NoArgumentExpected(alias.to_string()),
                            state.consumed(),
                        ))
                    }
                    (None, None) => {
                        next.pop();
                        Value::Bool(true)
                    }
                    (Some(_), Some(v)) => {
                        let v = v.clone();
                        next.pop();
                        Value::Str(v)
                    }
                    (Some(oa), None) => {
                        next.pop();
                        match take_lit_values(&mut next, repeatable) {
                            Some(v) => v,
                            None if oa.optional => Value::Bool(true),
                            None => {
                                return Err(Failure::fatal(
                                    MatchError::RequiresArgument(alias.to_string()),
                                    next.consumed(),
                                ))
                            }
                        }
                    }
                }
            } else if opt_arg.is_some()
                && explicit.is_none()
                && given.starts_with(name.as_str())
                && !ctx.known.ambiguous_abbreviation(name, given)
            {
                // --input=x may be spelled --inputx
                let suffix = given[name.len()..].to_string();
                next.pop();
                Value::Str(suffix)
            } else {
                return Err(no_match(state));
            }
        }
        (
            Alias::Short(c),
            Some(Token::SOpt {
                head,
                tail,
                arg: explicit,
            }),
        ) if head == c => match opt_arg {
            None => {
                if tail.is_empty() {
                    if explicit.is_some() {
                        return Err(Failure::fatal(
                            MatchError::NoArgumentExpected(alias.to_string()),
                            state.consumed(),
                        ));
                    }
                    next.pop();
                    Value::Bool(true)
                } else {
                    // peel one flag off the stack, the rest goes back
                    let rest_head = tail[0];
                    let rest_tail = tail[1..].to_vec();
                    let explicit = explicit.clone();
                    let tok = next.pop();
                    next.input.insert(
                        0,
                        PosToken {
                            token: Token::SOpt {
                                head: rest_head,
                                tail: rest_tail,
                                arg: explicit,
                            },
                            source: tok.source,
                            id: tok.id,
                        },
                    );
                    Value::Bool(true)
                }
            }
            Some(oa) => {
                if tail.is_empty() {
                    match explicit {
                        Some(v) => {
                            let v = v.clone();
                            next.pop();
                            Value::Str(v)
                        }
                        None => {
                            next.pop();
                            match take_lit_values(&mut next, repeatable) {
                                Some(v) => v,
                                None if oa.optional => Value::Bool(true),
                                None => {
                                    return Err(Failure::fatal(
                                        MatchError::RequiresArgument(alias.to_string()),
                                        next.consumed(),
                                    ))
                                }
                            }
                        }
                    }
                } else {
                    // the stacked tail is the attached value
                    let mut value: String = tail.iter().collect();
                    if let Some(v) = explicit {
                        value.push('=');
                        value.push_str(v);
                    }
                    next.pop();
                    Value::Str(value)
                }
            }
        },
        _ => return Err(no_match(state)),
    };

    if arg.can_term {
        next.terminate(arg, None);
    } else {
        next.emit(arg, RichValue::argv(value));
    }
    Ok(next)
}

/// Apply a pattern once: a leaf consumes at most one option or literal run,
/// a choice runs each branch on its own copy and keeps the best outcome
fn match_once(pattern: &Pattern, state: &State, ctx: &Ctx) -> Result<State, Failure> {
    match pattern {
        Pattern::Leaf {
            repeatable, arg, ..
        } => match_leaf(arg, *repeatable, state, ctx),
        Pattern::Choice {
            fixed, branches, ..
        } => {
            let mut best: Option<State> = None;
            let mut failure: Option<Failure> = None;
            for branch in branches {
                match match_seq(branch, state.clone(), *fixed, ctx) {
                    Ok(outcome) => {
                        if best.as_ref().map_or(true, |b| outcome.better_than(b)) {
                            best = Some(outcome);
                        }
                    }
                    Err(f) if f.fatal => return Err(f),
                    Err(f) => {
                        failure = Some(match failure.take() {
                            None => f,
                            Some(prev) => prev.combine_with(f),
                        });
                    }
                }
            }
            best.ok_or_else(|| failure.unwrap_or_else(|| no_match(state)))
        }
    }
}

/// Apply a pattern greedily honoring repetition
fn match_pattern(pattern: &Pattern, state: &State, ctx: &Ctx) -> Result<State, Failure> {
    let mut current = match_once(pattern, state, ctx)?;
    if pattern.repeatable() {
        while !current.ended {
            let before = current.weight();
            match match_once(pattern, &current, ctx) {
                Ok(next) if next.weight() < before => current = next,
                Ok(_) => break,
                Err(f) if f.fatal => return Err(f),
                Err(_) => break,
            }
        }
    }
    Ok(current)
}

/// Skipping a pattern: optional leaves go silently, leaves with a fallback
/// emit it, an optional group may still surface fallbacks of its leaves.
/// Required patterns without a fallback cannot be skipped.
fn skip_pattern(pattern: &Pattern, state: &State, ctx: &Ctx) -> Option<State> {
    match pattern {
        Pattern::Leaf { optional, arg, .. } => {
            if let Some(fb) = &arg.fallback {
                let mut next = state.clone();
                next.emit(arg, fb.clone());
                if !optional {
                    next.omissions += 1;
                }
                Some(next)
            } else if *optional {
                Some(state.clone())
            } else {
                None
            }
        }
        Pattern::Choice { optional, .. } => {
            if !*optional {
                return None;
            }
            match match_once(pattern, state, ctx) {
                Ok(next) if next.weight() == state.weight() => Some(next),
                _ => Some(state.clone()),
            }
        }
    }
}

/// Strict left-to-right matching with backtracking over skips
fn match_fixed(patterns: &[Pattern], state: State, ctx: &Ctx) -> Result<State, Failure> {
    if state.ended || patterns.is_empty() {
        return Ok(state);
    }
    let (p, rest) = patterns.split_first().expect("patterns are non-empty");

    let attempt = match match_pattern(p, &state, ctx) {
        Ok(next) => match match_fixed(rest, next, ctx) {
            Ok(done) => Ok(done),
            Err(f) if f.fatal => return Err(f),
            Err(f) => Err(f),
        },
        Err(f) if f.fatal => return Err(f),
        Err(f) => Err(f),
    };

    let skipped = skip_pattern(p, &state, ctx).map(|s| match_fixed(rest, s, ctx));

    let failure = match (attempt, skipped) {
        (Ok(a), Some(Ok(b))) => return Ok(if b.better_than(&a) { b } else { a }),
        (Ok(a), _) => return Ok(a),
        (Err(_), Some(Ok(b))) => return Ok(b),
        (Err(f), Some(Err(f2))) => f.combine_with(f2),
        (Err(f), None) => {
            // the branch complaint names the unmatched required pattern; a
            // deeper inner failure still takes over
            let missing = Failure::fail(MatchError::Missing(p.leftmost()), state.consumed());
            missing.combine_with(f)
        }
    };

    // last resort: fold an unknown head out of the way and try again
    if ctx.cfg.allow_unknown {
        let unknown = matches!(
            state.head(),
            Some(tok @ (Token::LOpt { .. } | Token::SOpt { .. })) if !ctx.known.is_known(tok)
        );
        if unknown {
            let mut folded = state.clone();
            let tok = folded.pop();
            folded.kvs.push(KeyValue {
                key: Key::Unknown,
                value: RichValue::argv(Value::Str(tok.source)),
            });
            return match_fixed(patterns, folded, ctx).map_err(|f| failure.clone().combine_with(f));
        }
    }
    Err(failure)
}

/// Free-order matching: at every step the first pattern that accepts the
/// head of the input wins; non-options keep their relative order, unknown
/// options are folded in when allowed
fn match_free(patterns: &[Pattern], state: State, ctx: &Ctx) -> Result<State, Failure> {
    struct Slot<'p> {
        pattern: &'p Pattern,
        matched: usize,
        done: bool,
    }
    let mut slots: Vec<Slot> = patterns
        .iter()
        .map(|pattern| Slot {
            pattern,
            matched: 0,
            done: false,
        })
        .collect();

    let mut state = state;
    'outer: loop {
        if state.ended || state.input.is_empty() {
            break;
        }
        let before = state.weight();
        let next_in_line = slots
            .iter()
            .position(|s| !s.done && !s.pattern.is_option_subtree());
        for ix in 0..slots.len() {
            if slots[ix].done {
                continue;
            }
            if !slots[ix].pattern.is_option_subtree() && Some(ix) != next_in_line {
                continue;
            }
            match match_pattern(slots[ix].pattern, &state, ctx) {
                Ok(next) if next.weight() < before || next.ended => {
                    state = next;
                    slots[ix].matched += 1;
                    if !slots[ix].pattern.repeatable() {
                        slots[ix].done = true;
                    }
                    continue 'outer;
                }
                Ok(_) => {}
                Err(f) if f.fatal => return Err(f),
                Err(_) => {}
            }
        }
        // nothing wanted the head; it may be an unknown option
        if ctx.cfg.allow_unknown {
            let unknown = matches!(
                state.head(),
                Some(tok @ (Token::LOpt { .. } | Token::SOpt { .. })) if !ctx.known.is_known(tok)
            );
            if unknown {
                let tok = state.pop();
                state.kvs.push(KeyValue {
                    key: Key::Unknown,
                    value: RichValue::argv(Value::Str(tok.source)),
                });
                continue;
            }
        }
        break;
    }

    // leftovers: fallbacks for everything that never matched
    for slot in &slots {
        if slot.matched > 0 || state.ended {
            continue;
        }
        match slot.pattern {
            Pattern::Leaf { optional, arg, .. } => {
                if let Some(fb) = &arg.fallback {
                    state.emit(arg, fb.clone());
                    if !optional {
                        state.omissions += 1;
                    }
                } else if !optional {
                    return Err(Failure::fail(
                        MatchError::Missing(slot.pattern.leftmost()),
                        state.consumed(),
                    ));
                }
            }
            Pattern::Choice { optional, .. } => {
                // a fallback-only application surfaces defaults hidden in
                // the group without consuming anything
                match match_once(slot.pattern, &state, ctx) {
                    Ok(next) if next.weight() == state.weight() => state = next,
                    _ if *optional => {}
                    Ok(next) => state = next,
                    Err(f) => {
                        let missing = Failure::fail(
                            MatchError::Missing(slot.pattern.leftmost()),
                            state.consumed(),
                        );
                        return Err(missing.combine_with(f));
                    }
                }
            }
        }
    }
    Ok(state)
}

fn match_seq(patterns: &[Pattern], state: State, fixed: bool, ctx: &Ctx) -> Result<State, Failure> {
    if fixed && !ctx.cfg.lax_placement {
        match_fixed(patterns, state, ctx)
    } else {
        match_free(patterns, state, ctx)
    }
}

/// Result of matching: the winning branch index and its emissions
#[derive(Debug)]
pub(crate) struct MatchOutcome {
    pub(crate) branch: usize,
    pub(crate) kvs: Vec<KeyValue>,
}

enum Trailing {
    Unknown,
    UnknownEoa,
    Reject,
}

pub(crate) fn match_argv(
    prepared: &Prepared,
    tokens: &[PosToken],
) -> Result<MatchOutcome, MatchError> {
    let ctx = Ctx {
        known: &prepared.known,
        cfg: &prepared.cfg,
    };

    let mut best: Option<(State, usize)> = None;
    let mut failure: Option<Failure> = None;
    for (ix, branch) in prepared.branches.iter().enumerate() {
        let fixed = branch.iter().any(|p| !p.is_option_subtree());
        match match_seq(branch, State::new(tokens.to_vec()), fixed, &ctx) {
            Ok(outcome) => {
                if best.as_ref().map_or(true, |(b, _)| outcome.better_than(b)) {
                    best = Some((outcome, ix));
                }
            }
            Err(f) if f.fatal => return Err(f.error),
            Err(f) => {
                failure = Some(match failure.take() {
                    None => f,
                    Some(prev) => prev.combine_with(f),
                });
            }
        }
    }

    let (mut state, branch) = match best {
        Some(found) => found,
        None => {
            let failure = failure.expect("at least one branch was tried");
            return Err(failure.error);
        }
    };

    // whatever is left over must pass the unknown-token policy
    loop {
        let decision = match state.head() {
            None => break,
            Some(tok @ (Token::LOpt { .. } | Token::SOpt { .. }))
                if ctx.cfg.allow_unknown && !ctx.known.is_known(tok) =>
            {
                Trailing::Unknown
            }
            Some(Token::Eoa(_)) if ctx.cfg.allow_unknown => Trailing::UnknownEoa,
            Some(_) => Trailing::Reject,
        };
        match decision {
            Trailing::Unknown => {
                let tok = state.pop();
                state.kvs.push(KeyValue {
                    key: Key::Unknown,
                    value: RichValue::argv(Value::Str(tok.source)),
                });
            }
            Trailing::UnknownEoa => {
                if let Token::Eoa(rest) = state.pop().token {
                    state.kvs.push(KeyValue {
                        key: Key::Eoa,
                        value: RichValue::argv(Value::Array(
                            rest.into_iter().map(Value::Str).collect(),
                        )),
                    });
                }
            }
            Trailing::Reject => {
                return Err(MatchError::Unexpected(state.input[0].source.clone()));
            }
        }
    }

    tracing::debug!(branch, emissions = state.kvs.len(), "matched argv");

    Ok(MatchOutcome {
        branch,
        kvs: state.kvs,
    })
}
