//! Map engine: generation cycles, snapshot swapping and the query surface.

pub mod snapshot;

pub use snapshot::{LoadedMaps, MapSnapshot, Slot};

use crate::config::MapConfig;
use crate::error::{MapError, Result};
use crate::features::query::QueryEngine;
use crate::indexing::{CycleStats, MapBuilder, MapDocuments, PriorState};
use crate::rank::{Formatter, Ranker};
use crate::scan::{unix_mtime, Scanner};
use crate::store::{staleness, FileFingerprint, MapStore};
use crate::util::unix_now;
use async_trait::async_trait;
use mapscope_api::{
    ApiResult, CompressionStats, GenerationReport, MapLifecycle, PatternType, QueryKind,
    QueryOptions, QueryResult, QueryService, RefreshMode, SearchRequest, SearchResponse, Staleness,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};

/// Owns the map directory of one project root.
///
/// Readers clone the current [`MapSnapshot`] out of the lock and never block
/// a running cycle; a finished cycle swaps in the new snapshot in one write.
pub struct MapEngine {
    root: PathBuf,
    config: Arc<MapConfig>,
    store: MapStore,
    current: Arc<RwLock<Arc<MapSnapshot>>>,
    /// Serializes generation cycles. Held by the blocking task itself, so it
    /// is only released once that task has finished.
    cycle: Arc<Mutex<()>>,
}

impl MapEngine {
    pub fn new(root: impl Into<PathBuf>, config: MapConfig) -> Self {
        let root = root.into();
        let root = root.canonicalize().unwrap_or(root);
        let store = MapStore::new(config.resolve_map_dir(&root));
        Self {
            root,
            config: Arc::new(config),
            store,
            current: Arc::new(RwLock::new(Arc::new(MapSnapshot::empty()))),
            cycle: Arc::new(Mutex::new(())),
        }
    }

    /// Creates the engine and loads the published generation, if any.
    pub async fn open(root: impl Into<PathBuf>, config: MapConfig) -> Result<Self> {
        let engine = Self::new(root, config);
        engine.reload().await?;
        Ok(engine)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn map_dir(&self) -> &Path {
        self.store.dir()
    }

    /// Cheap handle on the published generation.
    pub async fn snapshot(&self) -> Arc<MapSnapshot> {
        self.current.read().await.clone()
    }

    /// Re-reads the published generation from disk.
    ///
    /// An unreadable manifest leaves the engine empty rather than failing, so
    /// a new generation can still be produced over it.
    pub async fn reload(&self) -> Result<bool> {
        let store = self.store.clone();
        let snapshot = self
            .blocking(move || {
                Ok(MapSnapshot::load(&store).unwrap_or_else(|e| {
                    tracing::warn!(
                        "Ignoring published maps in {}: {}",
                        store.dir().display(),
                        e
                    );
                    MapSnapshot::empty()
                }))
            })
            .await?;
        let loaded = !snapshot.is_empty();
        *self.current.write().await = Arc::new(snapshot);
        Ok(loaded)
    }

    /// Runs `f` on the blocking pool, bounded by the configured I/O timeout.
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let timeout = self.config.io_timeout();
        match tokio::time::timeout(timeout, tokio::task::spawn_blocking(f)).await {
            Ok(joined) => joined.map_err(|e| MapError::Internal(e.to_string()))?,
            Err(_) => Err(MapError::Timeout(timeout.as_secs())),
        }
    }

    async fn loaded(&self) -> Result<Arc<MapSnapshot>> {
        let snapshot = self.snapshot().await;
        if snapshot.is_empty() {
            return Err(MapError::ArtifactMissing {
                root: self.root.display().to_string(),
            });
        }
        Ok(snapshot)
    }

    pub async fn generate(&self) -> Result<GenerationReport> {
        self.run_cycle(RefreshMode::Full).await
    }

    pub async fn refresh(&self, mode: RefreshMode) -> Result<GenerationReport> {
        self.run_cycle(mode).await
    }

    async fn run_cycle(&self, mode: RefreshMode) -> Result<GenerationReport> {
        let guard = self.cycle.clone().lock_owned().await;
        let started = Instant::now();

        let prior = match mode {
            RefreshMode::Full => None,
            RefreshMode::Incremental => {
                let snapshot = self.snapshot().await;
                let prior = snapshot.maps.as_ref().and_then(LoadedMaps::prior_state);
                if prior.is_none() {
                    tracing::info!("No usable prior generation, falling back to a full cycle");
                }
                prior
            }
        };
        let job = self.cycle_job(prior);
        let mode = job.mode();

        // Scanning is unbounded in time, so no I/O timeout here. Dropping this
        // future marks the cycle abandoned; the task then stops before publishing.
        let abandoned = AbandonOnDrop::default();
        let flag = abandoned.flag();
        let outcome = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            job.run(&flag)
        })
        .await
        .map_err(|e| MapError::Internal(e.to_string()))??;

        let report = GenerationReport {
            generation: outcome.manifest.generation,
            mode,
            generated_at: outcome.manifest.generated_at,
            files_scanned: outcome.stats.scanned,
            files_reused: outcome.stats.reused,
            files_removed: outcome.stats.removed,
            issues: outcome.issues,
            primary_pattern: outcome.primary_pattern,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!(
            "Generation {} ({:?}): {} scanned, {} reused, {} removed in {}ms",
            report.generation,
            report.mode,
            report.files_scanned,
            report.files_reused,
            report.files_removed,
            report.duration_ms
        );
        Ok(report)
    }

    fn cycle_job(&self, prior: Option<PriorState>) -> CycleJob {
        CycleJob {
            root: self.root.clone(),
            config: self.config.clone(),
            store: self.store.clone(),
            current: self.current.clone(),
            prior,
        }
    }

    pub async fn staleness(&self) -> Result<Staleness> {
        let snapshot = self.loaded().await?;
        let Some(manifest) = snapshot.manifest.clone() else {
            return Err(MapError::Internal("loaded snapshot has no manifest".into()));
        };
        let root = self.root.clone();
        let config = self.config.clone();
        self.blocking(move || {
            let current = current_fingerprints(&root, &config)?;
            Ok(staleness::assess(
                manifest.generated_at,
                unix_now(),
                &manifest.files,
                &current,
            ))
        })
        .await
    }

    pub async fn stats(&self) -> Result<CompressionStats> {
        let snapshot = self.loaded().await?;
        snapshot
            .manifest
            .as_ref()
            .map(|m| m.stats())
            .ok_or_else(|| MapError::Internal("loaded snapshot has no manifest".into()))
    }

    pub async fn query(&self, kind: QueryKind, options: &QueryOptions) -> Result<QueryResult> {
        let snapshot = self.loaded().await?;
        let Some(maps) = snapshot.maps.as_ref() else {
            return Err(MapError::Internal("loaded snapshot has no maps".into()));
        };
        QueryEngine::new(maps).execute(kind, options)
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let snapshot = self.loaded().await?;
        let index = match snapshot.search.as_ref() {
            Some(Ok(index)) => index,
            Some(Err(reason)) => {
                return Err(MapError::ArtifactCorrupt {
                    name: crate::store::ArtifactName::Metadata.to_string(),
                    reason: reason.clone(),
                });
            }
            None => return Err(MapError::Internal("loaded snapshot has no search index".into())),
        };
        let hits = index.search(request, self.config.fuzzy_distance)?;
        let ranked = Ranker::new(unix_now()).rank(hits);
        Ok(Formatter::from_config(&self.config).format(request, ranked))
    }
}

/// Set when the future driving a cycle is dropped before the cycle finished.
#[derive(Default)]
struct AbandonOnDrop(Arc<AtomicBool>);

impl AbandonOnDrop {
    fn flag(&self) -> Arc<AtomicBool> {
        self.0.clone()
    }
}

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

struct CycleOutcome {
    manifest: crate::store::Manifest,
    stats: CycleStats,
    issues: usize,
    primary_pattern: Option<PatternType>,
}

/// Everything one generation cycle needs, owned so it can run on the
/// blocking pool.
struct CycleJob {
    root: PathBuf,
    config: Arc<MapConfig>,
    store: MapStore,
    current: Arc<RwLock<Arc<MapSnapshot>>>,
    prior: Option<PriorState>,
}

impl CycleJob {
    fn mode(&self) -> RefreshMode {
        if self.prior.is_some() {
            RefreshMode::Incremental
        } else {
            RefreshMode::Full
        }
    }

    /// Builds, publishes and swaps in a generation. Must run off the async
    /// runtime. Publishing and the in-memory swap happen together, so the
    /// engine never disagrees with `CURRENT` on disk.
    fn run(self, abandoned: &AtomicBool) -> Result<CycleOutcome> {
        let mode = self.mode();
        let builder = MapBuilder::new(&self.root, &self.config);
        let (analysis, stats) = match &self.prior {
            Some(prior) => builder.incremental(prior)?,
            None => builder.full()?,
        };
        let generated_at = unix_now();
        let docs = MapDocuments::build(&analysis, generated_at);
        let set = docs.generation_set(generated_at)?;

        if abandoned.load(Ordering::SeqCst) {
            tracing::info!("Generation cycle abandoned, nothing published");
            return Err(MapError::Cancelled);
        }
        let manifest = self
            .store
            .publish(set, &self.root, docs.fingerprints(), mode)?;
        let snapshot = MapSnapshot::new(manifest.clone(), LoadedMaps::from_documents(docs));
        let primary_pattern = snapshot
            .maps
            .as_ref()
            .and_then(|m| m.backend_layers.as_ref().ok())
            .and_then(|b| b.patterns.primary_type());
        *self.current.blocking_write() = Arc::new(snapshot);

        Ok(CycleOutcome {
            manifest,
            stats,
            issues: analysis.issues.len(),
            primary_pattern,
        })
    }
}

/// Size and mtime of every file a scan would consider, without reading contents.
fn current_fingerprints(
    root: &Path,
    config: &MapConfig,
) -> Result<BTreeMap<String, FileFingerprint>> {
    let scanner = Scanner::new(root, config)?;
    let mut files = BTreeMap::new();
    for (abs, rel) in scanner.collect_paths() {
        let Ok(metadata) = std::fs::metadata(&abs) else {
            continue;
        };
        if metadata.len() > config.max_file_size {
            continue;
        }
        files.insert(
            rel,
            FileFingerprint {
                hash: String::new(),
                modified: unix_mtime(&metadata),
                size: metadata.len(),
            },
        );
    }
    Ok(files)
}

#[async_trait]
impl MapLifecycle for MapEngine {
    async fn generate(&self) -> ApiResult<GenerationReport> {
        Ok(MapEngine::generate(self).await?)
    }

    async fn refresh(&self, mode: RefreshMode) -> ApiResult<GenerationReport> {
        Ok(MapEngine::refresh(self, mode).await?)
    }

    async fn staleness(&self) -> ApiResult<Staleness> {
        Ok(MapEngine::staleness(self).await?)
    }

    async fn stats(&self) -> ApiResult<CompressionStats> {
        Ok(MapEngine::stats(self).await?)
    }
}

#[async_trait]
impl QueryService for MapEngine {
    async fn query(&self, kind: QueryKind, options: QueryOptions) -> ApiResult<QueryResult> {
        Ok(MapEngine::query(self, kind, &options).await?)
    }

    async fn search(&self, request: SearchRequest) -> ApiResult<SearchResponse> {
        Ok(MapEngine::search(self, &request).await?)
    }
}
