use crate::{open_engine, print_json, with_hint};
use mapscope_api::{QueryKind, QueryOptions, QueryResult, QueryService, SearchRequest};
use std::path::PathBuf;
use tracing::warn;

pub async fn run_query(
    path: PathBuf,
    kind: QueryKind,
    options: QueryOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine(&path).await?;
    let result = QueryService::query(&engine, kind, options).await.map_err(with_hint)?;
    if let QueryResult::Unavailable { artifact, suggestion, .. } = &result {
        warn!("Artifact {} is unavailable, {}", artifact, suggestion);
    }
    print_json(&result)
}

pub async fn run_search(
    path: PathBuf,
    request: SearchRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine(&path).await?;
    let response = QueryService::search(&engine, request).await.map_err(with_hint)?;
    print_json(&response)
}
