#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const FAKE_ENGINE: &str = r#"#!/bin/sh
# $1 is -file, $2 the configuration
echo "learning $2"
case "$2" in
    *collapse*) echo '{"network":null,"timeouted":"no","convTime":0.5}' ;;
    *crash*) echo "internal error" >&2; exit 1 ;;
    *slow*) exit 124 ;;
    *) echo '{"network":"Valid_v0","smtlib":"(valid v0)","smtlib_not_simpl":"(and (valid v0) true)","timeouted":"no","convTime":2.5,"nb_queries":4,"nb_pos_queries":1,"nb_neg_queries":3,"query_gen_mean":0.1}' ;;
esac
"#;

fn get_binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_precond-bench"))
}

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new(confs: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("dataset");
        fs::create_dir(&dataset).unwrap();
        for name in confs {
            fs::write(
                dataset.join(name),
                "expr: (valid v0)\nbin: /bin/true\nnargs: 1\ntypes: PTR\nglobals: false\n",
            )
            .unwrap();
        }

        let engine = dir.path().join("engine.sh");
        fs::write(&engine, FAKE_ENGINE).unwrap();
        fs::set_permissions(&engine, fs::Permissions::from_mode(0o755)).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn bench(&self, extra: &[&str]) -> Output {
        Command::new(get_binary_path())
            .arg("bench")
            .arg("--dataset")
            .arg(self.path("dataset"))
            .arg("--out")
            .arg(self.path("out.jsonl"))
            .arg("--engine")
            .arg(self.path("engine.sh"))
            .args(["--emulto", "1"])
            .args(extra)
            .env("RUST_LOG", "warn")
            .output()
            .expect("Failed to execute precond-bench")
    }
}

fn log_lines(path: &Path) -> Vec<serde_json::Value> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).expect("log line is not JSON"))
        .collect()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "Command failed with status: {:?}\nstderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_sweep_records_every_outcome() {
    let ws = Workspace::new(&["a_ok.txt", "b_collapse.txt", "c_crash.txt", "d_slow.txt"]);

    let output = ws.bench(&[]);
    assert_success(&output);

    let lines = log_lines(&ws.path("out.jsonl"));
    let statuses: Vec<_> = lines
        .iter()
        .map(|l| l["record"]["status"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(statuses, vec!["completed", "collapsed", "error", "timed_out"]);

    let ok = &lines[0]["record"];
    assert_eq!(lines[0]["run"], "0");
    assert_eq!(ok["equiv"], "yes");
    assert_eq!(ok["implies"], "yes");
    assert_eq!(ok["isfalse"], "no");
    assert_eq!(ok["consistent"], true);
    assert_eq!(ok["clause_size"], 1);
    assert_eq!(ok["engine"]["convTime"], 2.5);
    assert!(lines[2]["record"]["stderr"]
        .as_str()
        .unwrap()
        .contains("internal error"));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("#Collapse: 1 / 4"), "stdout: {}", stdout);
    assert!(stdout.contains("#Timeout: 1 / 4"), "stdout: {}", stdout);
    assert!(stdout.contains("#Not equiv: 0 - 0 / 1"), "stdout: {}", stdout);
}

#[test]
fn test_sweep_summary_applies_engine_timeout() {
    let ws = Workspace::new(&["a_ok.txt"]);

    // The fake engine reports convTime 2.5, past the 2 s budget
    let output = ws.bench(&["--timeout", "2"]);
    assert_success(&output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("#Timeout: 1 / 1"), "stdout: {}", stdout);
    assert!(stdout.contains("#Not equiv: 0 - 0 / 0"), "stdout: {}", stdout);
}

#[test]
fn test_second_sweep_changes_nothing() {
    let ws = Workspace::new(&["a_ok.txt", "b_collapse.txt"]);

    assert_success(&ws.bench(&["--nruns", "2"]));
    let first = fs::read(ws.path("out.jsonl")).unwrap();
    assert_eq!(log_lines(&ws.path("out.jsonl")).len(), 4);

    assert_success(&ws.bench(&["--nruns", "2"]));
    assert_eq!(fs::read(ws.path("out.jsonl")).unwrap(), first);
}

#[test]
fn test_interrupted_write_is_resumed() {
    let ws = Workspace::new(&["a_ok.txt", "b_collapse.txt"]);
    assert_success(&ws.bench(&[]));

    // Keep the first record and a torn half of the second
    let text = fs::read_to_string(ws.path("out.jsonl")).unwrap();
    let first_len = text.find('\n').unwrap() + 1;
    fs::write(ws.path("out.jsonl"), &text[..first_len + 10]).unwrap();

    assert_success(&ws.bench(&[]));
    let lines = log_lines(&ws.path("out.jsonl"));
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1]["run"], "1");
    assert_eq!(lines[1]["record"]["status"], "collapsed");
}

#[test]
fn test_stats_on_existing_log() {
    let ws = Workspace::new(&["a_ok.txt", "b_ok.txt", "c_collapse.txt"]);
    assert_success(&ws.bench(&[]));

    let output = Command::new(get_binary_path())
        .arg("stats")
        .arg("--file")
        .arg(ws.path("out.jsonl"))
        .output()
        .expect("Failed to execute precond-bench");
    assert_success(&output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Mean convergence time: 2.50 s"), "stdout: {}", stdout);
    assert!(stdout.contains("Mean number of query 4.00"), "stdout: {}", stdout);
    assert!(stdout.contains("#Collapse: 1 / 3"), "stdout: {}", stdout);

    // Everything converged after one second
    let output = Command::new(get_binary_path())
        .arg("stats")
        .arg("--file")
        .arg(ws.path("out.jsonl"))
        .args(["--timeout", "1"])
        .output()
        .expect("Failed to execute precond-bench");
    assert_success(&output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("#Timeout: 2 / 3"));
}

#[test]
fn test_missing_engine_aborts() {
    let ws = Workspace::new(&["a_ok.txt"]);
    fs::remove_file(ws.path("engine.sh")).unwrap();

    let output = ws.bench(&[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!ws.path("out.jsonl").exists() || log_lines(&ws.path("out.jsonl")).is_empty());
}
