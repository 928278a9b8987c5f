use crate::*;

fn args(xs: &[&str]) -> Vec<String> {
    xs.iter().map(|x| x.to_string()).collect()
}

fn env(pairs: &[(&str, &str)]) -> std::collections::BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn parsed(help: &str, argv: &[&str]) -> std::collections::BTreeMap<String, Value> {
    run(help, &RunOptions::default().argv(args(argv)))
        .unwrap()
        .unwrap_parsed()
}

#[test]
fn repeated_positional_collects_everything() {
    let out = parsed("usage: prog <qux>...", &["a", "b", "c"]);
    assert_eq!(out.len(), 1);
    assert_eq!(out["<qux>"], Value::from(vec!["a", "b", "c"]));
}

#[test]
fn double_dash_collects_the_strict_tail() {
    let out = parsed("usage: prog <qux>... --", &["a", "b", "c", "--", "--", "--"]);
    assert_eq!(out["<qux>"], Value::from(vec!["a", "b", "c"]));
    assert_eq!(out["--"], Value::from(vec!["--", "--"]));
}

#[test]
fn attached_short_value_reaches_both_aliases() {
    let help = "\
usage: prog [options]

options:
  -h, --host <H>  host to use [default: \"http://localhost:3000\"]
";
    let out = parsed(help, &["-hhttp://localhost:5000"]);
    assert_eq!(out["-h"], Value::from("http://localhost:5000"));
    assert_eq!(out["--host"], Value::from("http://localhost:5000"));
}

#[test]
fn any_alias_matches_the_same_leaf() {
    let help = "\
usage: prog [options]

options:
  -h, --host <H>  host to use
";
    let out = parsed(help, &["--host=remote"]);
    assert_eq!(out["-h"], Value::from("remote"));
    assert_eq!(out["--host"], Value::from("remote"));

    let out = parsed(help, &["-h", "remote"]);
    assert_eq!(out["--host"], Value::from("remote"));
}

#[test]
fn environment_fallback_fills_unmatched_options() {
    let help = "\
usage: prog [options]

options:
  -h, --host FOO  host to use [env: HOST]
";
    let opts = RunOptions::default()
        .argv(args(&[]))
        .env(env(&[("HOST", "HOME")]));
    let out = run(help, &opts).unwrap().unwrap_parsed();
    assert_eq!(out["-h"], Value::from("HOME"));
    assert_eq!(out["--host"], Value::from("HOME"));
}

#[test]
fn repeated_flags_count_single_ones_stay_boolean() {
    let out = parsed("usage: prog [-i] [-q]...", &["-q", "-i", "-q"]);
    assert_eq!(out["-i"], Value::Bool(true));
    assert_eq!(out["-q"], Value::Int(2));
}

#[test]
fn repeated_alternatives_count_per_option() {
    let out = parsed(
        "usage: prog (-a | -b)... (-d | -e)...",
        &["-a", "-d", "-a", "-a", "-d", "-a"],
    );
    assert_eq!(out["-a"], Value::Int(4));
    assert_eq!(out["-d"], Value::Int(2));
    assert_eq!(out.get("-b"), None);
    assert_eq!(out.get("-e"), None);
}

#[test]
fn stop_at_swallows_the_rest_verbatim() {
    let help = "\
usage: prog [options]

options:
  -n  do nothing
";
    let opts = RunOptions::default()
        .argv(args(&["-n", "-a", "-b", "-c"]))
        .options_first(true)
        .stop_at(["-n"]);
    let out = run(help, &opts).unwrap().unwrap_parsed();
    assert_eq!(out.len(), 1);
    assert_eq!(out["-n"], Value::from(vec!["-a", "-b", "-c"]));
}

#[test]
fn fixed_groups_enforce_positional_order() {
    let help = "\
usage: prog ((-i FILE) <env>) -oFILE

options:
  -i FILE  input
  -o FILE  output
";
    let opts = RunOptions::default()
        .argv(args(&["-o", "bar", "x", "-i", "bar"]))
        .smart_options(true);
    assert!(matches!(run(help, &opts), Err(Error::Match(_))));
}

#[test]
fn same_order_accepted_when_written_that_way() {
    let help = "\
usage: prog ((-i FILE) <env>) -oFILE

options:
  -i FILE  input
  -o FILE  output
";
    let opts = RunOptions::default()
        .argv(args(&["-i", "bar", "x", "-o", "bar"]))
        .smart_options(true);
    let out = run(help, &opts).unwrap().unwrap_parsed();
    assert_eq!(out["-i"], Value::from("bar"));
    assert_eq!(out["<env>"], Value::from("x"));
    assert_eq!(out["-o"], Value::from("bar"));
}

#[test]
fn commands_match_literally() {
    let out = parsed("usage: prog go <x>", &["go", "fast"]);
    assert_eq!(out["go"], Value::Bool(true));
    assert_eq!(out["<x>"], Value::from("fast"));
}

#[test]
fn branches_choose_by_consumed_input() {
    let help = "\
usage: prog go <x>
or: prog stop
or: prog go <x> <y>
";
    let out = parsed(help, &["go", "a", "b"]);
    assert_eq!(out["<y>"], Value::from("b"));

    let out = parsed(help, &["stop"]);
    assert_eq!(out["stop"], Value::Bool(true));
}

#[test]
fn stdin_dash_matches() {
    let out = parsed("usage: prog [-] <x>", &["-", "y"]);
    assert_eq!(out["-"], Value::Bool(true));
    assert_eq!(out["<x>"], Value::from("y"));
}

#[test]
fn long_option_prefix_subsumption() {
    let out = parsed("usage: prog --input=<f>", &["--inputx"]);
    assert_eq!(out["--input"], Value::from("x"));
}

#[test]
fn unmatched_flags_without_fallback_are_omitted() {
    let out = parsed("usage: prog [-a] <x>", &["y"]);
    assert_eq!(out.len(), 1);
    assert_eq!(out["<x>"], Value::from("y"));
}

#[test]
fn optional_argument_option_without_value() {
    let help = "\
usage: prog [options]

options:
  --color[=WHEN]  when to colorize
";
    let out = parsed(help, &["--color"]);
    assert_eq!(out["--color"], Value::Bool(true));

    let out = parsed(help, &["--color=never"]);
    assert_eq!(out["--color"], Value::from("never"));
}

#[test]
fn separate_value_after_long_option() {
    let out = parsed("usage: prog --speed=<kn>", &["--speed", "10"]);
    assert_eq!(out["--speed"], Value::from("10"));
}

#[test]
fn stacked_flags_unstack() {
    let out = parsed("usage: prog [-a] [-b] [-c]", &["-abc"]);
    assert_eq!(out["-a"], Value::Bool(true));
    assert_eq!(out["-b"], Value::Bool(true));
    assert_eq!(out["-c"], Value::Bool(true));
}

#[test]
fn solved_specs_resolve_the_same_way_again() {
    // mapping a solved spec back onto usage leaves and solving again
    // changes nothing
    fn unsolve(layout: &Layout<SolvedArg>) -> Layout<UsageArg> {
        match layout {
            Layout::Elem(arg) => Layout::Elem(match arg {
                SolvedArg::Command { name, repeatable } => UsageArg::Command {
                    name: name.clone(),
                    repeatable: *repeatable,
                },
                SolvedArg::Positional { name, repeatable } => UsageArg::Positional {
                    name: name.clone(),
                    repeatable: *repeatable,
                },
                SolvedArg::Eoa => UsageArg::Eoa,
                SolvedArg::Stdin => UsageArg::Stdin,
                SolvedArg::Option {
                    alias: Alias::Short(c),
                    arg,
                    repeatable,
                } => UsageArg::Stack {
                    chars: vec![*c],
                    arg: arg.clone(),
                    repeatable: *repeatable,
                },
                SolvedArg::Option {
                    alias: Alias::Long(l),
                    arg,
                    repeatable,
                } => UsageArg::Long {
                    name: l.clone(),
                    arg: arg.clone(),
                    repeatable: *repeatable,
                },
            }),
            Layout::Group {
                optional,
                repeatable,
                branches,
            } => Layout::Group {
                optional: *optional,
                repeatable: *repeatable,
                branches: branches
                    .iter()
                    .map(|b| b.iter().map(unsolve).collect())
                    .collect(),
            },
        }
    }

    let help = "\
usage: prog [options] (-a | go <x>)... [--] [-]

options:
  -f, --file <f>  a file [default: in.txt]
  -v, --verbose   noise
";
    let opts = RunOptions::default();
    let solved = solve(parse(help).unwrap(), &opts).unwrap();

    let unsolved = Spec {
        program: solved.program.clone(),
        usage: solved
            .usage
            .iter()
            .map(|b| b.iter().map(unsolve).collect())
            .collect(),
        sections: solved.sections.clone(),
        help_text: solved.help_text.clone(),
        short_usage: solved.short_usage.clone(),
    };
    let resolved = solve(unsolved, &opts).unwrap();
    assert_eq!(resolved, solved);
}

#[test]
fn no_arguments_usage_accepts_empty_argv() {
    let out = parsed("usage: prog", &[]);
    assert!(out.is_empty());
}
