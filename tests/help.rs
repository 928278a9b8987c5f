use docarg::*;

fn args(xs: &[&str]) -> Vec<String> {
    xs.iter().map(|x| x.to_string()).collect()
}

const HELP: &str = "\
Usage: prog [-a] <x>

Options:
  -a  everything
";

#[test]
fn help_flag_returns_the_full_text() {
    let opts = RunOptions::default().argv(args(&["--help"]));
    match run(HELP, &opts).unwrap() {
        Output::Help(text) => assert_eq!(text, HELP),
        other => panic!("expected help output, got {:?}", other),
    }
}

#[test]
fn help_fires_even_when_the_parse_would_fail() {
    // <x> is missing, but help wins
    let opts = RunOptions::default().argv(args(&["--help"]));
    assert!(matches!(run(HELP, &opts), Ok(Output::Help(_))));
}

#[test]
fn help_flag_found_inside_a_stack() {
    let opts = RunOptions::default()
        .argv(args(&["-ah", "x"]))
        .help_flags(vec!["-h".to_string()]);
    assert!(matches!(run(HELP, &opts), Ok(Output::Help(_))));
}

#[test]
fn version_flag_reports_the_configured_version() {
    let opts = RunOptions::default()
        .argv(args(&["--version"]))
        .version("1.2.3");
    match run(HELP, &opts).unwrap() {
        Output::Version(v) => assert_eq!(v, "1.2.3"),
        other => panic!("expected version output, got {:?}", other),
    }
}

#[test]
fn version_flag_without_a_version_is_an_error() {
    let opts = RunOptions::default().argv(args(&["--version"]));
    assert_eq!(run(HELP, &opts), Err(Error::VersionMissing));
}

#[test]
fn trigger_flags_are_configurable() {
    let opts = RunOptions::default()
        .argv(args(&["--help"]))
        .help_flags(vec![]);
    // --help is now just an unknown option
    assert!(matches!(run(HELP, &opts), Err(Error::Match(_))));
}

#[test]
fn words_after_double_dash_do_not_trigger_help() {
    let help = "Usage: prog <x>...";
    let opts = RunOptions::default().argv(args(&["a", "--", "--help"]));
    // `--help` sits behind `--`, so it is data; the usage has no `--`
    // leaf though, so it is also unexpected
    assert!(matches!(run(help, &opts), Err(Error::Match(_))));
}

#[test]
fn double_dash_shields_help_into_data() {
    let help = "Usage: prog <x>... --";
    let opts = RunOptions::default().argv(args(&["a", "--", "--help"]));
    let out = run(help, &opts).unwrap().unwrap_parsed();
    assert_eq!(out["--"], Value::from(vec!["--help"]));
}
