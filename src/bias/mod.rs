//! Bias template engine
//!
//! Turns a catalogue of generic constraint templates into concrete atoms over
//! the typed arguments of a function, and filters the catalogue down to the
//! requested bias level.

pub mod instantiate;
pub mod level;
pub mod template;
pub mod translate;

pub use level::{BiasLevel, format_bias, select_bias};
