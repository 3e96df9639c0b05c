//! Error types for the benchmark harness

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Malformed configuration or bias file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("missing field `{field}` in {path}")]
    MissingField { field: &'static str, path: PathBuf },
    #[error("invalid value `{value}` for field `{field}`")]
    InvalidValue { field: &'static str, value: String },
    #[error("field `{field}` lists {found} entries but nargs is {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },
}

/// Unusable constraint template or atom
#[derive(Debug, Error)]
pub enum BiasError {
    #[error("unsupported predicate family `{family}` in template `{template}`")]
    UnknownPredicate { family: String, template: String },
    #[error("template `{template}` has {arity} placeholders, which its family cannot bind")]
    UnsupportedArity { template: String, arity: usize },
    #[error("atom `{atom}` refers to `{name}`, which is not an argument of the right type")]
    UnboundOperand { atom: String, name: String },
}

/// Failure to obtain any answer from the SMT backend
///
/// Timeouts and `unknown` answers are not errors, they surface as
/// [`crate::smt::QueryResult::Unknown`].
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("cannot run solver `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("solver rejected the query: {0}")]
    Rejected(String),
}

/// Failure to run the acquisition engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot run engine `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("engine exited with unexpected status {code} on {conffile}")]
    UnexpectedExit { code: i32, conffile: String },
    #[error("engine was killed by a signal on {conffile}")]
    Killed { conffile: String },
    #[error("engine output on {conffile} is not a result record: {reason}")]
    MalformedOutput { conffile: String, reason: String },
}

/// Failure to read or extend the result log
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("result log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("result log {path} is corrupt at line {line}: {source}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot serialize record for run {run}: {source}")]
    Serialize {
        run: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("run {run} is recorded for {recorded} but the dataset now places {expected} there")]
    Conflict {
        run: usize,
        recorded: String,
        expected: String,
    },
}

/// Any error that aborts a harness command
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Bias(#[from] BiasError),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("cannot list dataset {path}: {source}")]
    Dataset {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
