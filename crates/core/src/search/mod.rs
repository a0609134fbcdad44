//! Symbol and file search over a loaded generation.

pub mod fuzzy;
pub mod index;

pub use fuzzy::{levenshtein, tokenize, within_distance};
pub use index::SearchIndex;
