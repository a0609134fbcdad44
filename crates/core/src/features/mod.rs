//! Read-side features built on a loaded generation.

pub mod query;

pub use query::{QueryEngine, REGENERATE_HINT};
