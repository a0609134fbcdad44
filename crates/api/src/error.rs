#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No maps found for {root}. Run `generate` first.")]
    ArtifactMissing { root: String },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Operation timed out after {0}s")]
    Timeout(u64),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Hint shown to callers alongside the error message.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            ApiError::ArtifactMissing { .. } => Some("run `generate` to build the project maps"),
            ApiError::Timeout(_) => Some("retry, or raise `io_timeout` in the map configuration"),
            _ => None,
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
