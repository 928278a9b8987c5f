use docarg::*;

fn args(xs: &[&str]) -> Vec<String> {
    xs.iter().map(|x| x.to_string()).collect()
}

fn opts(argv: &[&str]) -> RunOptions {
    RunOptions::default().argv(args(argv))
}

#[test]
fn options_first_turns_the_tail_positional_into_a_sink() {
    let help = "usage: prog [-v] <cmd>...";
    let run_opts = opts(&["-v", "ls", "-la", "--", "x"]).options_first(true);
    let out = run(help, &run_opts).unwrap().unwrap_parsed();
    assert_eq!(out["-v"], Value::Bool(true));
    assert_eq!(out["<cmd>"], Value::from(vec!["ls", "-la", "--", "x"]));
}

#[test]
fn without_options_first_the_tail_stays_a_plain_positional() {
    let help = "usage: prog [-v] <cmd>...";
    let res = run(help, &opts(&["-v", "ls", "-la"]));
    // -la is an undocumented option, not a literal
    assert!(matches!(res, Err(Error::Match(_))));
}

#[test]
fn stop_at_terminates_on_the_nominated_long_alias() {
    let help = "\
usage: prog [options] <x>

options:
  --noop  placeholder
";
    let run_opts = opts(&["--noop", "--trailing", "words"]).stop_at(["--noop"]);
    let out = run(help, &run_opts).unwrap().unwrap_parsed();
    assert_eq!(out["--noop"], Value::from(vec!["--trailing", "words"]));
    assert_eq!(out.get("<x>"), None);
}

#[test]
fn require_flags_makes_bare_flags_mandatory() {
    let help = "usage: prog -a";
    assert!(run(help, &opts(&[])).is_ok());

    let strict = opts(&[]).require_flags(true);
    match run(help, &strict) {
        Err(Error::Match(MatchError::Missing(name))) => assert_eq!(name, "-a"),
        other => panic!("expected missing -a, got {:?}", other),
    }

    let strict = opts(&["-a"]).require_flags(true);
    let out = run(help, &strict).unwrap().unwrap_parsed();
    assert_eq!(out["-a"], Value::Bool(true));
}

#[test]
fn lax_placement_lets_options_float_in_fixed_groups() {
    let help = "usage: prog [-v] <a> <b>";
    let interleaved = &["x", "-v", "y"];

    assert!(matches!(run(help, &opts(interleaved)), Err(Error::Match(_))));

    let lax = opts(interleaved).lax_placement(true);
    let out = run(help, &lax).unwrap().unwrap_parsed();
    assert_eq!(out["-v"], Value::Bool(true));
    assert_eq!(out["<a>"], Value::from("x"));
    assert_eq!(out["<b>"], Value::from("y"));
}

#[test]
fn repeatable_options_lifts_the_once_only_rule() {
    let help = "usage: prog [-v]";
    let res = run(help, &opts(&["-v", "-v"]));
    assert!(matches!(res, Err(Error::Match(_))));

    let relaxed = opts(&["-v", "-v"]).repeatable_options(true);
    let out = run(help, &relaxed).unwrap().unwrap_parsed();
    assert_eq!(out["-v"], Value::Int(2));
}

#[test]
fn allow_unknown_collects_strangers_under_the_question_mark() {
    let help = "usage: prog [-a]";
    let permissive = opts(&["-a", "--wat", "-z"]).allow_unknown(true);
    let out = run(help, &permissive).unwrap().unwrap_parsed();
    assert_eq!(out["-a"], Value::Bool(true));
    assert_eq!(out["?"], Value::from(vec!["--wat", "-z"]));
}

#[test]
fn unknown_options_fold_out_of_positional_sequences() {
    let help = "usage: prog [-a] <x>";
    let permissive = opts(&["-z", "y"]).allow_unknown(true);
    let out = run(help, &permissive).unwrap().unwrap_parsed();
    assert_eq!(out["<x>"], Value::from("y"));
    assert_eq!(out["?"], Value::from(vec!["-z"]));
}

#[test]
fn allow_unknown_still_rejects_stray_literals() {
    let help = "usage: prog [-a]";
    let permissive = opts(&["stray"]).allow_unknown(true);
    assert!(matches!(
        run(help, &permissive),
        Err(Error::Match(MatchError::Unexpected(_)))
    ));
}

#[test]
fn allow_unknown_keeps_an_unclaimed_double_dash() {
    let help = "usage: prog [-a]";
    let permissive = opts(&["-a", "--", "x", "y"]).allow_unknown(true);
    let out = run(help, &permissive).unwrap().unwrap_parsed();
    assert_eq!(out["--"], Value::from(vec!["x", "y"]));
}

#[test]
fn known_options_do_not_count_as_unknown() {
    // a second -a has nowhere to go: known aliases are never captured
    let help = "usage: prog [-a]";
    let permissive = opts(&["-a", "-a"]).allow_unknown(true);
    assert!(matches!(
        run(help, &permissive),
        Err(Error::Match(MatchError::Unexpected(_)))
    ));
}

#[test]
fn smart_options_slurps_the_adjacent_placeholder() {
    let help = "\
usage: prog -f FILE

options:
  -f FILE  input
";
    let smart = opts(&["-f", "data.txt"]).smart_options(true);
    let out = run(help, &smart).unwrap().unwrap_parsed();
    assert_eq!(out["-f"], Value::from("data.txt"));
    // FILE was consumed into -f, it is not a separate positional
    assert_eq!(out.get("FILE"), None);

    assert!(matches!(
        run(help, &opts(&["-f", "data.txt"])),
        Err(Error::Solve(_))
    ));
}

#[test]
fn repeatable_argument_option_collects_adjacent_literals() {
    let help = "usage: prog --pick=<item>...";
    let out = run(help, &opts(&["--pick", "a", "b", "c"]))
        .unwrap()
        .unwrap_parsed();
    assert_eq!(out["--pick"], Value::from(vec!["a", "b", "c"]));
}
