use mapscope_api::ApiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Compression error: {0}")]
    Compression(String),
    #[error("No maps have been generated for {root}")]
    ArtifactMissing { root: String },
    #[error("Artifact '{name}' is unreadable: {reason}")]
    ArtifactCorrupt { name: String, reason: String },
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Timed out after {0}s")]
    Timeout(u64),
    #[error("Generation cycle cancelled before publishing")]
    Cancelled,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<globset::Error> for MapError {
    fn from(err: globset::Error) -> Self {
        MapError::InvalidPattern {
            pattern: err.glob().unwrap_or_default().to_string(),
            reason: err.kind().to_string(),
        }
    }
}

impl From<MapError> for ApiError {
    fn from(err: MapError) -> Self {
        match err {
            MapError::ArtifactMissing { root } => ApiError::ArtifactMissing { root },
            MapError::InvalidPattern { .. } => ApiError::InvalidArgument(err.to_string()),
            MapError::NotFound(what) => ApiError::NotFound(what),
            MapError::Timeout(secs) => ApiError::Timeout(secs),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, MapError>;
