pub mod error;
pub mod lifecycle;
pub mod models;
pub mod service;

pub use error::{ApiError, ApiResult};
pub use lifecycle::MapLifecycle;
pub use models::*;
pub use service::QueryService;

/// Composite trait representing the full mapscope API.
/// Collaborators (CLI, intent routers) depend on this single trait.
pub trait MapService: MapLifecycle + QueryService {}

impl<T: MapLifecycle + QueryService> MapService for T {}
