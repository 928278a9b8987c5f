use docarg::*;
use std::collections::BTreeMap;

fn args(xs: &[&str]) -> Vec<String> {
    xs.iter().map(|x| x.to_string()).collect()
}

fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

const HELP: &str = "\
usage: prog [options]

options:
  -o, --out FILE   where to write [default: out.txt]
  -h, --host HOST  host to use [default: localhost] [env: HOST]
  -q               quiet
";

#[test]
fn defaults_fill_absent_options() {
    let opts = RunOptions::default().argv(args(&[])).env(env(&[]));
    let out = run(HELP, &opts).unwrap().unwrap_parsed();
    assert_eq!(out["-o"], Value::from("out.txt"));
    assert_eq!(out["--out"], Value::from("out.txt"));
    assert_eq!(out["--host"], Value::from("localhost"));
    // no default, no env, not given: no entry
    assert_eq!(out.get("-q"), None);
}

#[test]
fn argv_beats_environment_beats_default() {
    let opts = RunOptions::default()
        .argv(args(&[]))
        .env(env(&[("HOST", "from-env")]));
    let out = run(HELP, &opts).unwrap().unwrap_parsed();
    assert_eq!(out["--host"], Value::from("from-env"));

    let opts = RunOptions::default()
        .argv(args(&["--host", "from-argv"]))
        .env(env(&[("HOST", "from-env")]));
    let out = run(HELP, &opts).unwrap().unwrap_parsed();
    assert_eq!(out["--host"], Value::from("from-argv"));
}

#[test]
fn adding_a_default_introduces_exactly_one_binding() {
    let without = "\
usage: prog [options]

options:
  -q  quiet
";
    let with = "\
usage: prog [options]

options:
  -q  quiet [default: shh]
";
    let opts = RunOptions::default().argv(args(&[])).env(env(&[]));
    let before = run(without, &opts).unwrap().unwrap_parsed();
    assert_eq!(before.len(), 0);

    let after = run(with, &opts).unwrap().unwrap_parsed();
    assert_eq!(after.len(), 1);
    assert_eq!(after["-q"], Value::from("shh"));
}

#[test]
fn quoted_defaults_lose_their_quotes() {
    let help = "\
usage: prog [options]

options:
  --greeting TEXT  [default: \"hello world\"]
";
    let opts = RunOptions::default().argv(args(&[])).env(env(&[]));
    let out = run(help, &opts).unwrap().unwrap_parsed();
    assert_eq!(out["--greeting"], Value::from("hello world"));
}

#[test]
fn defaults_shared_between_usage_sightings_dedupe() {
    let help = "\
usage: prog [-f=FILE] [-f=FILE]

options:
  -f FILE  input [default: in.txt]
";
    let opts = RunOptions::default().argv(args(&[])).env(env(&[]));
    let out = run(help, &opts).unwrap().unwrap_parsed();
    assert_eq!(out["-f"], Value::from("in.txt"));
}
