use crate::ApiResult;
use crate::models::{CompressionStats, GenerationReport, RefreshMode, Staleness};
use async_trait::async_trait;

#[async_trait]
pub trait MapLifecycle: Send + Sync {
    /// Run a full generation cycle and publish a new artifact set.
    async fn generate(&self) -> ApiResult<GenerationReport>;

    /// Bring the published artifact set up to date.
    async fn refresh(&self, mode: RefreshMode) -> ApiResult<GenerationReport>;

    /// How far the published maps lag behind the file system.
    async fn staleness(&self) -> ApiResult<Staleness>;

    /// Per-artifact compression statistics of the published set.
    async fn stats(&self) -> ApiResult<CompressionStats>;
}
