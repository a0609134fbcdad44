//! Request chains and layer violations over the dependency graph.

pub mod tracer;
pub mod violations;

pub use tracer::{FlowReport, FlowTracer};
pub use violations::detect_violations;
