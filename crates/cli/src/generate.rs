use crate::{open_engine, print_json, with_hint};
use mapscope_api::{MapLifecycle, RefreshMode};
use std::path::PathBuf;
use tracing::info;

pub async fn run(path: PathBuf, full: bool) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine(&path).await?;
    let mode = if full {
        RefreshMode::Full
    } else {
        RefreshMode::Incremental
    };

    info!("Mapping project at {} ({:?})...", path.display(), mode);
    let report = MapLifecycle::refresh(&engine, mode).await.map_err(with_hint)?;

    info!(
        "Published generation {} to {}",
        report.generation,
        engine.map_dir().display()
    );
    print_json(&report)
}
