//! Folding matcher emissions into the canonical output map
//!
//! The matched branch contributes shape (which keys exist, whether they
//! repeat, what kind of leaf they were), the emissions contribute values.
//! Values group by key, origins decide precedence, repeated keys collect
//! into arrays, and flag-like values coerce into counts. Every key expands
//! into all of its aliases so `-f` and `--file` end up as separate entries
//! holding equal values.

use std::collections::BTreeMap;

use crate::layout::{Key, SolvedArg};
use crate::matcher::{KeyValue, Pattern};
use crate::value::{Origin, RichValue, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeafKind {
    /// option without an argument
    Flag,
    /// option carrying an argument
    Argument,
    Command,
    Positional,
    Eoa,
    Stdin,
}

impl LeafKind {
    fn of(arg: &SolvedArg) -> Self {
        match arg {
            SolvedArg::Option { arg: None, .. } => LeafKind::Flag,
            SolvedArg::Option { arg: Some(_), .. } => LeafKind::Argument,
            SolvedArg::Command { .. } => LeafKind::Command,
            SolvedArg::Positional { .. } => LeafKind::Positional,
            SolvedArg::Eoa => LeafKind::Eoa,
            SolvedArg::Stdin => LeafKind::Stdin,
        }
    }

    fn counts_occurrences(self) -> bool {
        matches!(self, LeafKind::Flag | LeafKind::Command)
    }
}

/// The shape of a key with its name hoisted away
#[derive(Debug)]
struct Faceless {
    kind: LeafKind,
    repeatable: bool,
    fallback: Option<RichValue>,
}

/// Flatten the matched branch into `Key -> Faceless`, propagating group
/// repetition inward
fn branch_shape(patterns: &[Pattern], map: &mut BTreeMap<Key, Faceless>, inherited: bool) {
    for pattern in patterns {
        match pattern {
            Pattern::Leaf {
                repeatable, arg, ..
            } => {
                let entry = map.entry(arg.key.clone()).or_insert_with(|| Faceless {
                    kind: LeafKind::of(&arg.inner),
                    repeatable: false,
                    fallback: None,
                });
                entry.repeatable |= *repeatable || inherited;
                if entry.fallback.is_none() {
                    entry.fallback = arg.fallback.clone();
                }
            }
            Pattern::Choice {
                repeatable,
                branches,
                ..
            } => {
                for branch in branches {
                    branch_shape(branch, map, inherited || *repeatable);
                }
            }
        }
    }
}

/// Group emissions by key, preserving first-sighting order
fn group_by_key(kvs: Vec<KeyValue>) -> Vec<(Key, Vec<RichValue>)> {
    let mut out: Vec<(Key, Vec<RichValue>)> = Vec::new();
    for kv in kvs {
        match out.iter_mut().find(|(key, _)| *key == kv.key) {
            Some((_, values)) => values.push(kv.value),
            None => out.push((kv.key, vec![kv.value])),
        }
    }
    out
}

/// Origin filtering: empty values never survive, argv and environment
/// values shadow defaults, surviving defaults are deduplicated
fn filter_origins(values: Vec<RichValue>) -> Vec<RichValue> {
    let mut values: Vec<RichValue> = values
        .into_iter()
        .filter(|v| v.origin != Origin::Empty)
        .collect();
    if values.iter().any(|v| v.origin > Origin::Default) {
        values.retain(|v| v.origin != Origin::Default);
    } else {
        let mut seen: Vec<Value> = Vec::new();
        values.retain(|v| {
            if seen.contains(&v.value) {
                false
            } else {
                seen.push(v.value.clone());
                true
            }
        });
    }
    values
}

fn merge(values: Vec<RichValue>, repeatable: bool) -> RichValue {
    if values.len() == 1 && !repeatable {
        return values.into_iter().next().expect("one value");
    }
    let origin = values
        .iter()
        .map(|v| v.origin)
        .max()
        .unwrap_or(Origin::Empty);
    let mut elements = Vec::new();
    for v in values {
        elements.extend(v.value.into_elements());
    }
    RichValue {
        origin,
        value: Value::Array(elements),
    }
}

/// Flags and commands report how often they were seen
fn coerce(value: Value, kind: LeafKind, repeatable: bool) -> Value {
    if !kind.counts_occurrences() {
        return value;
    }
    match value {
        Value::Array(xs) if !xs.is_empty() && xs.iter().all(Value::is_bool) => {
            Value::Int(xs.iter().filter(|x| **x == Value::Bool(true)).count() as i64)
        }
        Value::Bool(b) if repeatable => Value::Int(i64::from(b)),
        other => other,
    }
}

/// Fold the winning branch and its emissions into the final map
pub(crate) fn reduce(branch: &[Pattern], kvs: Vec<KeyValue>) -> BTreeMap<String, Value> {
    let mut shape = BTreeMap::new();
    branch_shape(branch, &mut shape, false);

    let mut grouped = group_by_key(kvs);

    // leaves the matcher never visited still surface their fallbacks
    for (key, faceless) in &shape {
        if grouped.iter().any(|(k, _)| k == key) {
            continue;
        }
        if let Some(fb) = &faceless.fallback {
            grouped.push((key.clone(), vec![fb.clone()]));
        }
    }

    let mut out = BTreeMap::new();
    for (key, values) in grouped {
        let values = filter_origins(values);
        if values.is_empty() {
            continue;
        }
        let (kind, repeatable) = match shape.get(&key) {
            Some(f) => (f.kind, f.repeatable),
            // unknown captures always collect, a stray `--` stays as is
            None => match key {
                Key::Unknown => (LeafKind::Argument, true),
                _ => (LeafKind::Eoa, false),
            },
        };
        let merged = merge(values, repeatable);
        let value = coerce(merged.value, kind, repeatable);
        for name in key.output_names() {
            out.insert(name, value.clone());
        }
    }

    tracing::debug!(entries = out.len(), "reduced match");

    out
}
