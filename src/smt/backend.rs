//! Satisfiability backends
//!
//! Every query gets a fresh solver; nothing is shared between queries.

use crate::error::SolverError;
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::debug;
use z3::{Params, SatResult, Solver};

/// Answer of a single satisfiability check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatOutcome {
    Sat,
    Unsat,
    /// Timeout or undecided, with the solver's reason
    Unknown(String),
}

/// Something that can decide an SMT-LIB script within a time budget
pub trait SmtBackend {
    /// Check the assertions of `script`
    ///
    /// Running out of `timeout` is reported as [`SatOutcome::Unknown`], not as
    /// an error.
    fn check(&self, script: &str, timeout: Duration) -> Result<SatOutcome, SolverError>;
}

impl<T: SmtBackend + ?Sized> SmtBackend for Box<T> {
    fn check(&self, script: &str, timeout: Duration) -> Result<SatOutcome, SolverError> {
        (**self).check(script, timeout)
    }
}

/// In-process Z3
#[derive(Debug, Clone, Copy, Default)]
pub struct Z3Backend;

impl SmtBackend for Z3Backend {
    fn check(&self, script: &str, timeout: Duration) -> Result<SatOutcome, SolverError> {
        let solver = Solver::new();
        let mut params = Params::new();
        params.set_u32("timeout", timeout.as_millis().min(u32::MAX as u128) as u32);
        solver.set_params(&params);
        if script.contains('\0') {
            return Err(SolverError::Rejected("script contains a NUL byte".to_string()));
        }
        solver.from_string(script);
        // A script Z3 fails to parse or sort-check leaves the solver empty
        if solver.get_assertions().is_empty() {
            return Err(SolverError::Rejected(
                "z3 could not parse the script".to_string(),
            ));
        }

        Ok(match solver.check() {
            SatResult::Sat => SatOutcome::Sat,
            SatResult::Unsat => SatOutcome::Unsat,
            SatResult::Unknown => SatOutcome::Unknown(
                solver
                    .get_reason_unknown()
                    .unwrap_or_else(|| "unknown".to_string()),
            ),
        })
    }
}

/// An external SMT-LIB solver reading the script on stdin
///
/// Runs `<command> -in -smt2 -T:<secs>`; the hard timeout makes Z3 print
/// `timeout` instead of an answer.
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    command: String,
}

impl ProcessBackend {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl SmtBackend for ProcessBackend {
    fn check(&self, script: &str, timeout: Duration) -> Result<SatOutcome, SolverError> {
        let secs = timeout.as_secs_f64().ceil().max(1.0) as u64;
        let spawn_error = |source| SolverError::Spawn {
            command: self.command.clone(),
            source,
        };

        let mut child = Command::new(&self.command)
            .arg("-in")
            .arg("-smt2")
            .arg(format!("-T:{}", secs))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(script.as_bytes()).map_err(spawn_error)?;
        }
        let output = child.wait_with_output().map_err(spawn_error)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(command = %self.command, status = ?output.status, "external solver finished");

        parse_answer(&stdout)
    }
}

/// Interpret the stdout of an SMT-LIB solver
pub fn parse_answer(stdout: &str) -> Result<SatOutcome, SolverError> {
    for line in stdout.lines().map(str::trim) {
        match line {
            "sat" => return Ok(SatOutcome::Sat),
            "unsat" => return Ok(SatOutcome::Unsat),
            "unknown" | "timeout" => return Ok(SatOutcome::Unknown(line.to_string())),
            _ if line.starts_with("(error") => {
                return Err(SolverError::Rejected(line.to_string()));
            }
            _ => {}
        }
    }
    Err(SolverError::Rejected(format!(
        "no answer in solver output: {:?}",
        stdout.trim()
    )))
}
