use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn get_binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_precond-bench"))
}

fn write_conf(dir: &Path, text: &str) -> PathBuf {
    let path = dir.join("conf.txt");
    fs::write(&path, text).expect("Failed to write configuration");
    path
}

fn run(args: &[&str]) -> Output {
    Command::new(get_binary_path())
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to execute precond-bench")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "Command failed with status: {:?}\nstderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

#[test]
fn test_bias_max_prints_catalogue() {
    let dir = tempfile::tempdir().unwrap();
    let conf = write_conf(
        dir.path(),
        "expr: (valid v0)\nnargs: 2\ntypes: PTR, PTR\nbias: Valid_X, Alias_X_Y\n",
    );

    let output = run(&["bias", "--file", conf.to_str().unwrap()]);
    assert_eq!(stdout(&output), "bias: Valid_X, Alias_X_Y");
}

#[test]
fn test_bias_min_prints_concrete_atoms() {
    let dir = tempfile::tempdir().unwrap();
    let conf = write_conf(
        dir.path(),
        "expr: (and (valid v0) (overlap v0 v1))\n\
         nargs: 2\ntypes: PTR, PTR\n\
         bias: Valid_X, Overlap_X_Y, Alias_X_Y\n",
    );

    let output = run(&["bias", "--file", conf.to_str().unwrap(), "--lvl", "min"]);
    assert_eq!(stdout(&output), "bias: Overlap_v0_v1, Valid_v0");
}

#[test]
fn test_bias_avg_prints_templates() {
    let dir = tempfile::tempdir().unwrap();
    let conf = write_conf(
        dir.path(),
        "expr: (and (valid v0) (overlap v0 v1))\n\
         nargs: 2\ntypes: PTR, PTR\n\
         bias: Valid_X, Overlap_X_Y, Alias_X_Y\n",
    );

    let output = run(&["bias", "--file", conf.to_str().unwrap(), "--lvl", "avg"]);
    assert_eq!(stdout(&output), "bias: Overlap_X_Y, Valid_X");
}

#[test]
fn test_unknown_family_fails() {
    let dir = tempfile::tempdir().unwrap();
    let conf = write_conf(dir.path(), "nargs: 1\ntypes: PTR\nbias: Aligned_X_8\n");

    let output = run(&["bias", "--file", conf.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Aligned"));
}

#[test]
fn test_mismatched_lists_fail() {
    let dir = tempfile::tempdir().unwrap();
    let conf = write_conf(dir.path(), "nargs: 2\ntypes: PTR\nbias: Valid_X\n");

    let output = run(&["bias", "--file", conf.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_check_equivalent_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let conf = write_conf(dir.path(), "expr: (valid v0)\nnargs: 1\ntypes: PTR\n");

    let output = run(&[
        "check",
        "--file",
        conf.to_str().unwrap(),
        "--candidate",
        "(and (valid v0) (bvugt (value v0) #x00000000))",
    ]);
    assert_eq!(stdout(&output), "yes");
}

#[test]
fn test_check_implication() {
    let dir = tempfile::tempdir().unwrap();
    let conf = write_conf(dir.path(), "expr: (valid v0)\nnargs: 2\ntypes: PTR, PTR\n");
    let file = conf.to_str().unwrap();

    let stronger = "(and (valid v0) (valid v1))";
    let output = run(&["check", "--file", file, "--candidate", stronger]);
    assert_eq!(stdout(&output), "no");

    let output = run(&[
        "check", "--file", file, "--candidate", stronger, "--relation", "implies",
    ]);
    assert_eq!(stdout(&output), "yes");
}
