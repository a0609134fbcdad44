use crate::ApiResult;
use crate::models::{QueryKind, QueryOptions, QueryResult, SearchRequest, SearchResponse};
use async_trait::async_trait;

#[async_trait]
pub trait QueryService: Send + Sync {
    /// Answer one of the fixed structural queries.
    async fn query(&self, kind: QueryKind, options: QueryOptions) -> ApiResult<QueryResult>;

    /// Ranked search over files, exports, imports and signatures.
    async fn search(&self, request: SearchRequest) -> ApiResult<SearchResponse>;
}
