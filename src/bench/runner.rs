//! The sweep loop: one engine run at a time, each recorded before the next

use crate::bench::config::SweepConfig;
use crate::bench::engine::{Engine, EngineRun, parse_output};
use crate::bench::record::{BenchmarkRecord, EngineOutput};
use crate::bench::store::ResultStore;
use crate::error::{EngineError, Error};
use crate::model::Configuration;
use crate::smt::{Oracle, QueryResult, SmtBackend};
use std::path::Path;
use tracing::{debug, error, info, warn};

/// What a sweep did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Runs executed by this sweep
    pub processed: usize,
    /// Runs found already recorded
    pub skipped: usize,
}

/// Run every (configuration, run) pair that `store` does not hold yet
///
/// Engine errors, time-outs and collapses are recorded and the sweep goes
/// on. Malformed configurations, solver failures and store conflicts abort.
pub fn run_sweep<E, B>(
    config: &SweepConfig,
    engine: &E,
    oracle: &Oracle<B>,
    store: &mut ResultStore,
) -> Result<SweepSummary, Error>
where
    E: Engine + ?Sized,
    B: SmtBackend,
{
    let total = config.total_runs();
    let mut summary = SweepSummary::default();

    for run in 0..total {
        let Some(path) = config.conffile(run) else {
            break;
        };
        let conffile = path.display().to_string();

        if store.is_recorded(run, &conffile)? {
            summary.skipped += 1;
            continue;
        }

        let conf = Configuration::load(path)?;
        let types: Vec<String> = conf.arguments.iter().map(|a| a.ty.to_string()).collect();
        debug!(
            binary = ?conf.binary,
            nargs = conf.nargs,
            types = %types.join(", "),
            "configuration loaded"
        );
        let record = run_one(config, engine, oracle, &conf, path)?;
        info!(
            run = run + 1,
            total,
            conffile = conffile.as_str(),
            status = ?record.status,
            "run recorded"
        );
        store.append(run, record)?;
        summary.processed += 1;
    }

    Ok(summary)
}

fn run_one<E, B>(
    config: &SweepConfig,
    engine: &E,
    oracle: &Oracle<B>,
    conf: &Configuration,
    path: &Path,
) -> Result<BenchmarkRecord, Error>
where
    E: Engine + ?Sized,
    B: SmtBackend,
{
    let conffile = path.display().to_string();
    let timeout = config.flags.timeout;

    let stdout = match engine.run(path, &config.flags)? {
        EngineRun::Finished { stdout } => stdout,
        EngineRun::Failed { stderr } => {
            warn!(conffile = conffile.as_str(), stderr = stderr.trim(), "engine failed");
            return Ok(BenchmarkRecord::error(conffile, timeout, stderr));
        }
        EngineRun::TimedOut => return Ok(BenchmarkRecord::timed_out(conffile, timeout, None)),
    };

    let output = parse_output(&stdout, path)?;
    if !output.has_network() {
        return Ok(if output.timeouted {
            BenchmarkRecord::timed_out(conffile, timeout, Some(output))
        } else {
            BenchmarkRecord::collapsed(conffile, timeout, output)
        });
    }

    let candidate = candidate_formula(&output, path)?;
    let target = conf.ground_truth()?.to_string();
    let verdicts = oracle.evaluate(
        &candidate,
        output.smtlib_not_simpl.as_deref(),
        &target,
        &conf.arguments,
    )?;

    if !output.timeouted {
        match verdicts.equiv {
            QueryResult::NotEquivalent => error!(
                conffile = conffile.as_str(),
                network = candidate.as_str(),
                "engine converged on a network not equivalent to the ground truth"
            ),
            QueryResult::Unknown => warn!(
                conffile = conffile.as_str(),
                "could not decide whether the converged network is sound"
            ),
            QueryResult::Equivalent => {}
        }
    }

    Ok(BenchmarkRecord::completed(conffile, timeout, output, target, verdicts))
}

fn candidate_formula(output: &EngineOutput, path: &Path) -> Result<String, EngineError> {
    output
        .smtlib
        .clone()
        .ok_or_else(|| EngineError::MalformedOutput {
            conffile: path.display().to_string(),
            reason: "network without `smtlib` formula".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::config::EngineFlags;
    use crate::bench::record::RunStatus;
    use crate::error::SolverError;
    use crate::smt::{OracleConfig, SatOutcome};
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;

    /// Replays canned outcomes and counts invocations
    struct FakeEngine {
        runs: RefCell<VecDeque<EngineRun>>,
        calls: Cell<usize>,
    }

    impl FakeEngine {
        fn new(runs: Vec<EngineRun>) -> Self {
            Self {
                runs: RefCell::new(runs.into()),
                calls: Cell::new(0),
            }
        }
    }

    impl Engine for FakeEngine {
        fn run(&self, _conffile: &Path, _flags: &EngineFlags) -> Result<EngineRun, EngineError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self
                .runs
                .borrow_mut()
                .pop_front()
                .expect("engine called more often than scripted"))
        }
    }

    /// Every query comes back unsat
    struct AlwaysUnsat;

    impl SmtBackend for AlwaysUnsat {
        fn check(&self, _script: &str, _timeout: Duration) -> Result<SatOutcome, SolverError> {
            Ok(SatOutcome::Unsat)
        }
    }

    /// Replays canned answers in query order and counts the queries
    struct Scripted {
        answers: RefCell<VecDeque<SatOutcome>>,
        queries: Cell<usize>,
    }

    impl SmtBackend for &Scripted {
        fn check(&self, _script: &str, _timeout: Duration) -> Result<SatOutcome, SolverError> {
            self.queries.set(self.queries.get() + 1);
            Ok(self
                .answers
                .borrow_mut()
                .pop_front()
                .expect("solver queried more often than scripted"))
        }
    }

    fn oracle() -> Oracle<AlwaysUnsat> {
        Oracle::new(AlwaysUnsat, OracleConfig::default())
    }

    fn dataset(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
        names
            .iter()
            .map(|name| {
                let path = dir.join(name);
                fs::write(&path, "expr: (valid v0)\nnargs: 1\ntypes: PTR\n").unwrap();
                path
            })
            .collect()
    }

    fn finished(json: &str) -> EngineRun {
        EngineRun::Finished {
            stdout: format!("learning\n{}\n", json),
        }
    }

    #[test]
    fn test_sweep_classifies_runs() {
        let dir = tempfile::tempdir().unwrap();
        let config = SweepConfig::default()
            .with_dataset(dataset(dir.path(), &["a.txt", "b.txt"]))
            .with_nruns(2);
        let engine = FakeEngine::new(vec![
            finished(r#"{"network":"Valid_v0","smtlib":"(valid v0)","timeouted":"no","convTime":2.0}"#),
            finished(r#"{"network":null,"timeouted":"no"}"#),
            EngineRun::Failed {
                stderr: "crash".into(),
            },
            EngineRun::TimedOut,
        ]);
        let mut store = ResultStore::open(&dir.path().join("out.jsonl")).unwrap();

        let summary = run_sweep(&config, &engine, &oracle(), &mut store).unwrap();
        assert_eq!(summary.processed, 4);

        let statuses: Vec<_> = store.records().map(|(_, r)| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                RunStatus::Completed,
                RunStatus::Collapsed,
                RunStatus::Error,
                RunStatus::TimedOut
            ]
        );
        let completed = store.get(0).unwrap();
        assert_eq!(completed.equiv, Some(QueryResult::Equivalent));
        assert_eq!(completed.clause_size, Some(1));
        assert_eq!(store.get(2).unwrap().stderr.as_deref(), Some("crash"));
    }

    #[test]
    fn test_engine_timeout_without_network_is_not_collapse() {
        let dir = tempfile::tempdir().unwrap();
        let config = SweepConfig::default().with_dataset(dataset(dir.path(), &["a.txt"]));
        let engine = FakeEngine::new(vec![finished(r#"{"network":null,"timeouted":"yes"}"#)]);
        let mut store = ResultStore::open(&dir.path().join("out.jsonl")).unwrap();

        run_sweep(&config, &engine, &oracle(), &mut store).unwrap();
        assert_eq!(store.get(0).unwrap().status, RunStatus::TimedOut);
    }

    #[test]
    fn test_second_sweep_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.jsonl");
        let config = SweepConfig::default()
            .with_dataset(dataset(dir.path(), &["a.txt"]))
            .with_nruns(2);

        let engine = FakeEngine::new(vec![EngineRun::TimedOut, EngineRun::TimedOut]);
        let mut store = ResultStore::open(&out).unwrap();
        run_sweep(&config, &engine, &oracle(), &mut store).unwrap();
        let before = fs::read(&out).unwrap();

        let engine = FakeEngine::new(Vec::new());
        let mut store = ResultStore::open(&out).unwrap();
        let summary = run_sweep(&config, &engine, &oracle(), &mut store).unwrap();

        assert_eq!(summary, SweepSummary { processed: 0, skipped: 2 });
        assert_eq!(engine.calls.get(), 0);
        assert_eq!(fs::read(&out).unwrap(), before);
    }

    #[test]
    fn test_resume_after_partial_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.jsonl");
        let files = dataset(dir.path(), &["a.txt", "b.txt"]);

        let partial = SweepConfig::default().with_dataset(files[..1].to_vec());
        let mut store = ResultStore::open(&out).unwrap();
        run_sweep(&partial, &FakeEngine::new(vec![EngineRun::TimedOut]), &oracle(), &mut store)
            .unwrap();

        let full = SweepConfig::default().with_dataset(files);
        let engine = FakeEngine::new(vec![EngineRun::TimedOut]);
        let mut store = ResultStore::open(&out).unwrap();
        let summary = run_sweep(&full, &engine, &oracle(), &mut store).unwrap();
        assert_eq!(summary, SweepSummary { processed: 1, skipped: 1 });
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_changed_dataset_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.jsonl");
        let files = dataset(dir.path(), &["a.txt", "b.txt"]);

        let first = SweepConfig::default().with_dataset(vec![files[0].clone()]);
        let mut store = ResultStore::open(&out).unwrap();
        run_sweep(&first, &FakeEngine::new(vec![EngineRun::TimedOut]), &oracle(), &mut store)
            .unwrap();

        let second = SweepConfig::default().with_dataset(vec![files[1].clone()]);
        let err = run_sweep(&second, &FakeEngine::new(Vec::new()), &oracle(), &mut store)
            .unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    #[test]
    fn test_network_without_formula_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let config = SweepConfig::default().with_dataset(dataset(dir.path(), &["a.txt"]));
        let engine = FakeEngine::new(vec![finished(r#"{"network":"Valid_v0","timeouted":"no"}"#)]);
        let mut store = ResultStore::open(&dir.path().join("out.jsonl")).unwrap();

        let err = run_sweep(&config, &engine, &oracle(), &mut store).unwrap_err();
        assert!(matches!(err, Error::Engine(EngineError::MalformedOutput { .. })));
        assert!(store.is_empty());
    }

    #[test]
    fn test_unsound_network_is_recorded_and_sweep_goes_on() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.jsonl");
        let config = SweepConfig::default().with_dataset(dataset(dir.path(), &["a.txt", "b.txt"]));
        let engine = FakeEngine::new(vec![
            finished(
                r#"{"network":"Valid_v0","smtlib":"true","smtlib_not_simpl":"(valid v0)","timeouted":"no"}"#,
            ),
            EngineRun::TimedOut,
        ]);
        // equiv: sat, unsimplified equiv: unsat, false: sat, implies: unsat
        let backend = Scripted {
            answers: RefCell::new(
                vec![
                    SatOutcome::Sat,
                    SatOutcome::Unsat,
                    SatOutcome::Sat,
                    SatOutcome::Unsat,
                ]
                .into(),
            ),
            queries: Cell::new(0),
        };
        let oracle = Oracle::new(&backend, OracleConfig::default());
        let mut store = ResultStore::open(&out).unwrap();

        let summary = run_sweep(&config, &engine, &oracle, &mut store).unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(backend.queries.get(), 4);
        assert_eq!(store.get(1).unwrap().status, RunStatus::TimedOut);

        let record = store.get(0).unwrap();
        assert_eq!(record.status, RunStatus::Completed);
        assert_eq!(record.equiv, Some(QueryResult::NotEquivalent));
        assert_eq!(record.implies, Some(QueryResult::Equivalent));
        assert_eq!(record.isfalse, Some(QueryResult::NotEquivalent));
        assert_eq!(record.consistent, Some(false));

        let text = fs::read_to_string(&out).unwrap();
        let first = text.lines().next().unwrap();
        assert!(first.contains(r#""equiv":"no""#));
        assert!(first.contains(r#""consistent":false"#));
    }
}
