//! Per-run benchmark records and the engine's output record

use crate::smt::{QueryResult, Verdicts};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Marker the engine puts between the clauses of a printed network
pub const CLAUSE_JOIN: &str = "_or_";

/// Serialize a flag as the engine's `"yes"`/`"no"`
mod yes_no {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(flag: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *flag { "yes" } else { "no" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match String::deserialize(deserializer)?.as_str() {
            "yes" => Ok(true),
            "no" => Ok(false),
            other => Err(de::Error::invalid_value(
                de::Unexpected::Str(other),
                &"\"yes\" or \"no\"",
            )),
        }
    }
}

/// The JSON object the engine prints on success
///
/// Fields the harness does not interpret are kept in `extra` and written
/// back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineOutput {
    /// Learned network in the engine's notation; absent on collapse
    #[serde(default)]
    pub network: Option<String>,
    /// Simplified network as an SMT-LIB formula
    #[serde(default)]
    pub smtlib: Option<String>,
    #[serde(default)]
    pub smtlib_not_simpl: Option<String>,
    /// The engine hit its own global timeout
    #[serde(default, with = "yes_no")]
    pub timeouted: bool,
    /// Convergence time, in seconds
    #[serde(rename = "convTime", default)]
    pub conv_time: Option<f64>,
    #[serde(default)]
    pub nb_queries: Option<f64>,
    #[serde(default)]
    pub nb_pos_queries: Option<f64>,
    #[serde(default)]
    pub nb_neg_queries: Option<f64>,
    #[serde(default)]
    pub query_gen_mean: Option<f64>,
    #[serde(default)]
    pub time_first_constr_learned: Option<f64>,
    /// When the last sound network was found, for runs that timed out
    #[serde(default)]
    pub last_sound_network_time: Option<f64>,
    /// Some membership query ran out of time
    #[serde(default, with = "yes_no")]
    pub answer_timeouted: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EngineOutput {
    /// The engine learned something
    pub fn has_network(&self) -> bool {
        self.network.is_some()
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The engine produced a network that was checked
    Completed,
    /// Normal exit without a network
    Collapsed,
    /// The engine reported an internal error
    Error,
    /// The wall-clock budget ran out
    TimedOut,
}

/// Everything recorded for one (configuration, run) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub conffile: String,
    pub status: RunStatus,
    /// Global engine timeout the run was given, in seconds
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineOutput>,
    /// Ground truth the network was compared against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equiv: Option<QueryResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implies: Option<QueryResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isfalse: Option<QueryResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consistent: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clause_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

impl BenchmarkRecord {
    fn bare(conffile: impl Into<String>, status: RunStatus, timeout: Option<u64>) -> Self {
        Self {
            conffile: conffile.into(),
            status,
            timeout,
            engine: None,
            target: None,
            equiv: None,
            implies: None,
            isfalse: None,
            consistent: None,
            clause_size: None,
            stderr: None,
        }
    }

    pub fn error(conffile: impl Into<String>, timeout: Option<u64>, stderr: String) -> Self {
        Self {
            stderr: Some(stderr),
            ..Self::bare(conffile, RunStatus::Error, timeout)
        }
    }

    pub fn timed_out(
        conffile: impl Into<String>,
        timeout: Option<u64>,
        engine: Option<EngineOutput>,
    ) -> Self {
        Self {
            engine,
            ..Self::bare(conffile, RunStatus::TimedOut, timeout)
        }
    }

    pub fn collapsed(conffile: impl Into<String>, timeout: Option<u64>, engine: EngineOutput) -> Self {
        Self {
            engine: Some(engine),
            ..Self::bare(conffile, RunStatus::Collapsed, timeout)
        }
    }

    pub fn completed(
        conffile: impl Into<String>,
        timeout: Option<u64>,
        engine: EngineOutput,
        target: String,
        verdicts: Verdicts,
    ) -> Self {
        let clause_size = engine.network.as_deref().map(clause_size);
        Self {
            engine: Some(engine),
            target: Some(target),
            equiv: Some(verdicts.equiv),
            implies: Some(verdicts.implies),
            isfalse: Some(verdicts.is_false),
            consistent: verdicts.consistent,
            clause_size,
            ..Self::bare(conffile, RunStatus::Completed, timeout)
        }
    }

    /// Killed by the wall clock or stopped by the engine's own timeout
    pub fn is_timed_out(&self) -> bool {
        self.status == RunStatus::TimedOut || self.engine.as_ref().is_some_and(|e| e.timeouted)
    }
}

/// Largest clause of a printed network
///
/// Each line is one conjunct; a line with `k` join markers has `k + 1`
/// literals. An empty network still counts as one clause of size 1.
pub fn clause_size(network: &str) -> usize {
    network
        .lines()
        .map(|line| 1 + line.matches(CLAUSE_JOIN).count())
        .max()
        .unwrap_or(1)
}
