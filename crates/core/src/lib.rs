pub mod architecture;
pub mod config;
pub mod error;
pub mod extract;
pub mod features;
pub mod flow;
pub mod graph;
pub mod indexing;
pub mod logging;
pub mod rank;
pub mod runtime;
pub mod scan;
pub mod search;
pub mod store;
pub mod util;

pub use config::MapConfig;
pub use error::{MapError, Result};
pub use runtime::MapEngine;
