pub mod architecture;
pub mod file;
pub mod graph;
pub mod language;
pub mod query;
pub mod search;
pub mod store;

pub use architecture::*;
pub use file::*;
pub use graph::*;
pub use language::*;
pub use query::*;
pub use search::*;
pub use store::*;
