//! Typed argument model and configuration files

pub mod config;
pub mod types;

// Re-export commonly used types
pub use config::Configuration;
#[allow(unused_imports)]
pub use types::{ArgType, ArgumentModel, Scope, TypedArgument};
