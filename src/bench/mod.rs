//! Benchmark orchestration
//!
//! Drives the acquisition engine over a dataset, checks what it learns with
//! the oracle and appends one record per run to the result log.

pub mod config;
pub mod engine;
pub mod record;
pub mod runner;
pub mod store;

pub use config::{DisjStrategy, EngineFlags, SweepConfig, list_dataset};
pub use engine::ProcessEngine;
#[allow(unused_imports)]
pub use record::{BenchmarkRecord, EngineOutput, RunStatus};
pub use runner::run_sweep;
pub use store::ResultStore;
