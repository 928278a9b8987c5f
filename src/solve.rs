//! Rewriting parsed usage into its solved form
//!
//! Solving reconciles the two halves of a help text. Option stacks are
//! expanded into individual options, option arguments written only in the
//! description section get bound to their usage leaves, `[options]`
//! references are inlined, and branches that dissolved in the process are
//! pruned. The output contains only [`SolvedArg`] leaves.

use std::collections::HashMap;

use crate::error::Error;
use crate::layout::{
    Alias, Description, Key, Layout, OptArg, Section, SolvedArg, Spec, UsageArg,
};

fn err(message: impl Into<String>) -> Error {
    Error::Solve(message.into())
}

fn find_short<'a>(descrs: &'a [Description], c: char) -> Option<&'a Description> {
    descrs.iter().find(|d| d.matches_short(c))
}

fn find_long<'a>(descrs: &'a [Description], name: &str) -> Option<&'a Description> {
    descrs.iter().find(|d| d.matches_long(name))
}

/// Two descriptions claiming the same alias make the spec ambiguous
fn check_duplicate_aliases(descrs: &[Description]) -> Result<(), Error> {
    let mut seen: HashMap<&Alias, usize> = HashMap::new();
    for (ix, d) in descrs.iter().enumerate() {
        for alias in &d.aliases {
            if let Some(prev) = seen.insert(alias, ix) {
                if prev != ix {
                    return Err(err(format!("{} is described more than once", alias)));
                }
            }
        }
    }
    Ok(())
}

/// An adjacent layout an option may slurp as its argument: a positional or
/// command leaf, possibly wrapped in a single-branch single-element group
fn slurp_target(layout: &Layout<UsageArg>) -> Option<&str> {
    match layout {
        Layout::Elem(UsageArg::Positional { name, .. })
        | Layout::Elem(UsageArg::Command { name, .. }) => Some(name),
        Layout::Group { branches, .. } => match branches.as_slice() {
            [branch] => match branch.as_slice() {
                [inner] => slurp_target(inner),
                _ => None,
            },
            _ => None,
        },
        _ => None,
    }
}

/// Bind the argument of a single option leaf, consulting the usage-side
/// argument, the description and (under `smart`) the adjacent layout.
/// Returns the solved leaf and whether the adjacent layout was consumed.
fn bind_option(
    alias: Alias,
    usage_arg: Option<OptArg>,
    repeatable: bool,
    descr: Option<&Description>,
    adjacent: Option<&Layout<UsageArg>>,
    smart: bool,
) -> Result<(SolvedArg, bool), Error> {
    let repeatable = repeatable || descr.is_some_and(|d| d.repeatable);
    let descr_arg = descr.and_then(|d| d.arg.as_ref());

    let (arg, consumed) = match (usage_arg, descr_arg) {
        (Some(ua), Some(da)) => {
            if !da.agrees_with(&ua.name) {
                return Err(err(format!(
                    "{} binds argument {:?} but is described with {:?}",
                    alias, ua.name, da.name
                )));
            }
            (
                Some(OptArg {
                    name: da.name.clone(),
                    optional: ua.optional || da.optional,
                }),
                false,
            )
        }
        (Some(ua), None) => {
            if descr.is_some() {
                return Err(err(format!(
                    "{} binds argument {:?} but is described as a flag",
                    alias, ua.name
                )));
            }
            (Some(ua), false)
        }
        (None, Some(da)) => {
            let target = adjacent.and_then(slurp_target);
            match target {
                Some(name) if smart && da.agrees_with(name) => (Some(da.clone()), true),
                _ if da.optional => (Some(da.clone()), false),
                Some(name) if smart => {
                    return Err(err(format!(
                        "adjacent argument {:?} does not spell the {} argument {:?}",
                        name, alias, da.name
                    )))
                }
                _ => {
                    return Err(err(format!(
                        "{} takes an argument {} but the usage section binds none",
                        alias, da.name
                    )))
                }
            }
        }
        (None, None) => (None, false),
    };

    Ok((
        SolvedArg::Option {
            alias,
            arg,
            repeatable,
        },
        consumed,
    ))
}

/// `-abcdFILE` style stacks: every character but the last expands into a
/// bare flag; subsumption may cut the expansion short when the trailing
/// characters spell a placeholder
fn expand_stack(
    chars: &[char],
    explicit: Option<OptArg>,
    repeatable: bool,
    descrs: &[Description],
    adjacent: Option<&Layout<UsageArg>>,
    smart: bool,
) -> Result<(Vec<SolvedArg>, bool), Error> {
    let mut out = Vec::new();
    for (j, &c) in chars.iter().enumerate() {
        let descr = find_short(descrs, c);
        if j + 1 == chars.len() {
            let (leaf, consumed) =
                bind_option(Alias::Short(c), explicit, repeatable, descr, adjacent, smart)?;
            out.push(leaf);
            return Ok((out, consumed));
        }
        if let Some(da) = descr.and_then(|d| d.arg.as_ref()) {
            let rest: String = chars[j + 1..].iter().collect();
            if explicit.is_none() && da.agrees_with(&rest) {
                out.push(SolvedArg::Option {
                    alias: Alias::Short(c),
                    arg: Some(da.clone()),
                    repeatable: repeatable || descr.is_some_and(|d| d.repeatable),
                });
                return Ok((out, false));
            }
            if !da.optional {
                return Err(err(format!(
                    "-{} takes an argument and may only appear last in a stack",
                    c
                )));
            }
        }
        out.push(SolvedArg::Option {
            alias: Alias::Short(c),
            arg: None,
            repeatable: descr.is_some_and(|d| d.repeatable),
        });
    }
    unreachable!("stacks are non-empty by construction")
}

/// Inline one `[options]` style reference as a free-order group of
/// individually optional options
fn inline_reference(name: &str, sections: &[Section]) -> Result<Option<Layout<SolvedArg>>, Error> {
    let matching: Vec<&Section> = if name == "options" {
        sections.iter().collect()
    } else {
        sections.iter().filter(|s| s.name == name).collect()
    };
    if matching.is_empty() {
        return Err(err(format!("unresolved reference [{}]", name)));
    }
    let mut elems = Vec::new();
    for section in matching {
        for d in &section.descriptions {
            elems.push(Layout::optional(vec![Layout::Elem(SolvedArg::Option {
                alias: d.aliases[0].clone(),
                arg: d.arg.clone(),
                repeatable: d.repeatable,
            })]));
        }
    }
    if elems.is_empty() {
        return Ok(None);
    }
    Ok(Some(Layout::Group {
        optional: true,
        repeatable: false,
        branches: vec![elems],
    }))
}

fn solve_branch(
    branch: &[Layout<UsageArg>],
    sections: &[Section],
    descrs: &[Description],
    smart: bool,
) -> Result<Vec<Layout<SolvedArg>>, Error> {
    let mut out = Vec::new();
    let mut ix = 0;
    while ix < branch.len() {
        match &branch[ix] {
            Layout::Elem(arg) => {
                let adjacent = branch.get(ix + 1);
                let mut consumed = false;
                match arg {
                    UsageArg::Command { name, repeatable } => {
                        out.push(Layout::Elem(SolvedArg::Command {
                            name: name.clone(),
                            repeatable: *repeatable,
                        }));
                    }
                    UsageArg::Positional { name, repeatable } => {
                        out.push(Layout::Elem(SolvedArg::Positional {
                            name: name.clone(),
                            repeatable: *repeatable,
                        }));
                    }
                    UsageArg::Eoa => out.push(Layout::Elem(SolvedArg::Eoa)),
                    UsageArg::Stdin => out.push(Layout::Elem(SolvedArg::Stdin)),
                    UsageArg::Reference(name) => {
                        if let Some(group) = inline_reference(name, sections)? {
                            out.push(group);
                        }
                    }
                    UsageArg::Long {
                        name,
                        arg,
                        repeatable,
                    } => {
                        let descr = find_long(descrs, name);
                        let (leaf, slurped) = bind_option(
                            Alias::Long(name.clone()),
                            arg.clone(),
                            *repeatable,
                            descr,
                            adjacent,
                            smart,
                        )?;
                        out.push(Layout::Elem(leaf));
                        consumed = slurped;
                    }
                    UsageArg::Stack {
                        chars,
                        arg,
                        repeatable,
                    } => {
                        let (leaves, slurped) = expand_stack(
                            chars,
                            arg.clone(),
                            *repeatable,
                            descrs,
                            adjacent,
                            smart,
                        )?;
                        out.extend(leaves.into_iter().map(Layout::Elem));
                        consumed = slurped;
                    }
                }
                ix += 1 + usize::from(consumed);
            }
            Layout::Group {
                optional,
                repeatable,
                branches,
            } => {
                let mut solved = Vec::new();
                for b in branches {
                    let sb = solve_branch(b, sections, descrs, smart)?;
                    if !sb.is_empty() {
                        solved.push(sb);
                    }
                }
                if !solved.is_empty() {
                    out.push(Layout::Group {
                        optional: *optional,
                        repeatable: *repeatable,
                        branches: solved,
                    });
                }
                ix += 1;
            }
        }
    }
    Ok(out)
}

/// Per spec leaf repetition is a property of the option, not the sighting:
/// a leaf is repeatable iff any leaf sharing its key is, counting the
/// repetition of enclosing groups
fn propagate_repetition(usage: &mut [Vec<Layout<SolvedArg>>], descrs: &[Description]) {
    fn collect(
        layouts: &[Layout<SolvedArg>],
        inherited: bool,
        descrs: &[Description],
        reps: &mut HashMap<Key, bool>,
    ) {
        for layout in layouts {
            match layout {
                Layout::Elem(arg @ SolvedArg::Option { alias, repeatable, .. }) => {
                    let descr = descrs.iter().find(|d| d.matches(alias));
                    let key = Key::of(arg, descr);
                    let entry = reps.entry(key).or_insert(false);
                    *entry |= *repeatable || inherited;
                }
                Layout::Elem(_) => {}
                Layout::Group {
                    repeatable,
                    branches,
                    ..
                } => {
                    for b in branches {
                        collect(b, inherited || *repeatable, descrs, reps);
                    }
                }
            }
        }
    }

    fn apply(
        layouts: &mut [Layout<SolvedArg>],
        descrs: &[Description],
        reps: &HashMap<Key, bool>,
    ) {
        for layout in layouts {
            match layout {
                Layout::Elem(arg) => {
                    if let SolvedArg::Option { alias, .. } = arg {
                        let descr = descrs.iter().find(|d| d.matches(alias));
                        let key = Key::of(arg, descr);
                        if let Some(true) = reps.get(&key) {
                            if let SolvedArg::Option { repeatable, .. } = arg {
                                *repeatable = true;
                            }
                        }
                    }
                }
                Layout::Group { branches, .. } => {
                    for b in branches {
                        apply(b, descrs, reps);
                    }
                }
            }
        }
    }

    let mut reps = HashMap::new();
    for branch in usage.iter() {
        collect(branch, false, descrs, &mut reps);
    }
    for branch in usage.iter_mut() {
        apply(branch, descrs, &reps);
    }
}

/// Rewrite a parsed spec into its solved form
pub(crate) fn solve_spec(spec: Spec<UsageArg>, smart: bool) -> Result<Spec<SolvedArg>, Error> {
    let descrs: Vec<Description> = spec.descriptions().cloned().collect();
    check_duplicate_aliases(&descrs)?;

    let mut usage = Vec::new();
    for branch in &spec.usage {
        let authored_empty = branch.is_empty();
        let solved = solve_branch(branch, &spec.sections, &descrs, smart)?;
        // a branch that dissolved during rewriting is pruned; an authored
        // empty branch stays and matches the bare program name
        if solved.is_empty() && !authored_empty {
            continue;
        }
        usage.push(solved);
    }
    if usage.is_empty() {
        return Err(err("usage solved to no patterns"));
    }

    propagate_repetition(&mut usage, &descrs);

    tracing::debug!(branches = usage.len(), "solved spec");

    Ok(Spec {
        program: spec.program,
        usage,
        sections: spec.sections,
        help_text: spec.help_text,
        short_usage: spec.short_usage,
    })
}
