//! Equivalence oracle for preconditions
//!
//! Decides equivalence, implication and falsifiability of an inferred
//! precondition against a ground truth under the memory/pointer model.

use crate::error::SolverError;
use crate::model::ArgumentModel;
use crate::smt::backend::{SatOutcome, SmtBackend};
use crate::smt::encoder::{Relation, encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Outcome of a relation query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryResult {
    /// The relation holds for every input
    #[serde(rename = "yes")]
    Equivalent,
    /// A distinguishing input or counterexample exists
    #[serde(rename = "no")]
    NotEquivalent,
    /// The solver timed out or gave up
    #[serde(rename = "ukn")]
    Unknown,
}

impl From<&SatOutcome> for QueryResult {
    fn from(outcome: &SatOutcome) -> Self {
        match outcome {
            SatOutcome::Sat => QueryResult::NotEquivalent,
            SatOutcome::Unsat => QueryResult::Equivalent,
            SatOutcome::Unknown(_) => QueryResult::Unknown,
        }
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryResult::Equivalent => write!(f, "yes"),
            QueryResult::NotEquivalent => write!(f, "no"),
            QueryResult::Unknown => write!(f, "ukn"),
        }
    }
}

/// Configuration for the oracle
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Budget of each individual solver query
    pub timeout: Duration,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
        }
    }
}

impl OracleConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_timeout_secs(self, secs: u64) -> Self {
        self.with_timeout(Duration::from_secs(secs))
    }
}

/// Verdicts for one inferred precondition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdicts {
    pub equiv: QueryResult,
    pub implies: QueryResult,
    pub is_false: QueryResult,
    /// Whether the simplified and unsimplified candidates got the same
    /// equivalence verdict; `None` when no unsimplified form was given
    pub consistent: Option<bool>,
}

/// Issues relation queries against a backend
#[derive(Debug)]
pub struct Oracle<B> {
    backend: B,
    config: OracleConfig,
}

impl<B: SmtBackend> Oracle<B> {
    pub fn new(backend: B, config: OracleConfig) -> Self {
        Self { backend, config }
    }

    /// Decide `relation` between `candidate` and `target`
    pub fn decide(
        &self,
        candidate: &str,
        target: &str,
        args: &ArgumentModel,
        relation: Relation,
    ) -> Result<QueryResult, SolverError> {
        let script = encode(candidate, target, args, relation);
        debug!(%relation, candidate, target, "issuing solver query");

        let outcome = self.backend.check(&script, self.config.timeout)?;
        if let SatOutcome::Unknown(reason) = &outcome {
            warn!(%relation, candidate, target, reason = reason.as_str(), "solver query undecided");
        }
        Ok(QueryResult::from(&outcome))
    }

    pub fn equivalence(
        &self,
        candidate: &str,
        target: &str,
        args: &ArgumentModel,
    ) -> Result<QueryResult, SolverError> {
        self.decide(candidate, target, args, Relation::Equiv)
    }

    /// Implication, reusing a known equivalence verdict
    ///
    /// Equivalence implies implication, so no query is issued when
    /// `equivalence` is already `Equivalent`.
    pub fn implication(
        &self,
        candidate: &str,
        target: &str,
        args: &ArgumentModel,
        equivalence: QueryResult,
    ) -> Result<QueryResult, SolverError> {
        if equivalence == QueryResult::Equivalent {
            return Ok(QueryResult::Equivalent);
        }
        self.decide(candidate, target, args, Relation::Implies)
    }

    /// `Equivalent` when `candidate` has no model, i.e. is equivalent to false
    pub fn falsifiability(
        &self,
        candidate: &str,
        args: &ArgumentModel,
    ) -> Result<QueryResult, SolverError> {
        self.decide(candidate, "false", args, Relation::Equiv)
    }

    /// Run every check on an inferred precondition
    ///
    /// `unsimplified` is the engine's formula before simplification; a
    /// different equivalence verdict for it is reported, not fatal.
    pub fn evaluate(
        &self,
        candidate: &str,
        unsimplified: Option<&str>,
        target: &str,
        args: &ArgumentModel,
    ) -> Result<Verdicts, SolverError> {
        let equiv = self.equivalence(candidate, target, args)?;

        let consistent = match unsimplified {
            Some(raw) => {
                let raw_equiv = self.equivalence(raw, target, args)?;
                if raw_equiv != equiv {
                    error!(
                        before = %raw_equiv,
                        after = %equiv,
                        "simplification changed semantics"
                    );
                }
                Some(raw_equiv == equiv)
            }
            None => None,
        };

        let is_false = self.falsifiability(candidate, args)?;
        let implies = self.implication(candidate, target, args, equiv)?;

        Ok(Verdicts {
            equiv,
            implies,
            is_false,
            consistent,
        })
    }
}
