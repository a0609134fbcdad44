use crate::{open_engine, print_json, with_hint};
use mapscope_api::MapLifecycle;
use std::path::PathBuf;
use tracing::info;

pub async fn run_stats(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine(&path).await?;
    let stats = MapLifecycle::stats(&engine).await.map_err(with_hint)?;
    print_json(&stats)
}

pub async fn run_status(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine(&path).await?;
    let staleness = MapLifecycle::staleness(&engine).await.map_err(with_hint)?;
    if staleness.should_refresh() {
        info!(
            "Maps are stale ({} changed files, score {}); run `mapscope refresh`",
            staleness.changed_files, staleness.score
        );
    }
    print_json(&staleness)
}
