//! Memory/pointer model encoding and the equivalence oracle

pub mod backend;
pub mod encoder;
pub mod oracle;

// Re-export main functionality
#[allow(unused_imports)]
pub use backend::SatOutcome;
pub use backend::{ProcessBackend, SmtBackend, Z3Backend};
pub use encoder::Relation;
pub use oracle::{Oracle, OracleConfig, QueryResult, Verdicts};
