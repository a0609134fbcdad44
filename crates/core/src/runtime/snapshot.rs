use crate::architecture::ArchitectureReport;
use crate::error::Result;
use crate::graph::DependencyGraph;
use crate::indexing::{MapDocuments, PriorState};
use crate::search::SearchIndex;
use crate::store::artifact::{
    BackendLayersDoc, DataFlowDoc, DependenciesForwardDoc, DependenciesReverseDoc, IssuesDoc,
    MetadataDoc, NpmDependenciesDoc, QuickQueriesDoc, RelationshipsDoc, SummaryDoc, TreeDoc,
};
use crate::store::{Artifact, Manifest, MapStore};

/// A loaded artifact, or why it could not be loaded.
pub type Slot<T> = std::result::Result<T, String>;

/// Every artifact of one generation, each loaded independently.
#[derive(Debug, Clone)]
pub struct LoadedMaps {
    pub summary: Slot<SummaryDoc>,
    pub tree: Slot<TreeDoc>,
    pub metadata: Slot<MetadataDoc>,
    pub quick_queries: Slot<QuickQueriesDoc>,
    pub backend_layers: Slot<BackendLayersDoc>,
    pub data_flow: Slot<DataFlowDoc>,
    pub dependencies_forward: Slot<DependenciesForwardDoc>,
    pub dependencies_reverse: Slot<DependenciesReverseDoc>,
    pub relationships: Slot<RelationshipsDoc>,
    pub issues: Slot<IssuesDoc>,
    pub npm_dependencies: Slot<NpmDependenciesDoc>,
}

fn read_slot<T: Artifact>(store: &MapStore, generation: &str) -> Slot<T> {
    store
        .read::<T>(generation)
        .map(|doc| doc.payload)
        .map_err(|e| {
            tracing::warn!("Artifact {} unavailable: {}", T::NAME, e);
            e.to_string()
        })
}

impl LoadedMaps {
    pub fn load(store: &MapStore, generation: &str) -> Self {
        Self {
            summary: read_slot(store, generation),
            tree: read_slot(store, generation),
            metadata: read_slot(store, generation),
            quick_queries: read_slot(store, generation),
            backend_layers: read_slot(store, generation),
            data_flow: read_slot(store, generation),
            dependencies_forward: read_slot(store, generation),
            dependencies_reverse: read_slot(store, generation),
            relationships: read_slot(store, generation),
            issues: read_slot(store, generation),
            npm_dependencies: read_slot(store, generation),
        }
    }

    pub fn from_documents(docs: MapDocuments) -> Self {
        Self {
            summary: Ok(docs.summary),
            tree: Ok(docs.tree),
            metadata: Ok(docs.metadata),
            quick_queries: Ok(docs.quick_queries),
            backend_layers: Ok(docs.backend_layers),
            data_flow: Ok(docs.data_flow),
            dependencies_forward: Ok(docs.dependencies_forward),
            dependencies_reverse: Ok(docs.dependencies_reverse),
            relationships: Ok(docs.relationships),
            issues: Ok(docs.issues),
            npm_dependencies: Ok(docs.npm_dependencies),
        }
    }

    /// State an incremental refresh can patch, when every artifact it needs loaded.
    pub fn prior_state(&self) -> Option<PriorState> {
        let metadata = self.metadata.as_ref().ok()?;
        let layers = self.backend_layers.as_ref().ok()?;
        let forward = self.dependencies_forward.as_ref().ok()?;
        let issues = self.issues.as_ref().ok()?;
        Some(PriorState {
            records: metadata.files.clone(),
            issues: issues.scan_issues.clone(),
            architecture: ArchitectureReport {
                layers: layers.layers.clone(),
                patterns: layers.patterns.clone(),
            },
            graph: DependencyGraph::from_parts(&forward.forward, forward.external.clone()),
        })
    }

    fn search_index(&self) -> Slot<SearchIndex> {
        let metadata = self.metadata.as_ref().map_err(Clone::clone)?;
        let reverse = self.dependencies_reverse.as_ref().ok();
        Ok(SearchIndex::build(&metadata.files, |path| {
            reverse
                .and_then(|r| r.reverse.get(path))
                .map(Vec::len)
                .unwrap_or(0)
        }))
    }
}

/// Immutable view of the published generation shared by all readers.
#[derive(Debug, Clone, Default)]
pub struct MapSnapshot {
    pub manifest: Option<Manifest>,
    pub maps: Option<LoadedMaps>,
    pub search: Option<Slot<SearchIndex>>,
}

impl MapSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(manifest: Manifest, maps: LoadedMaps) -> Self {
        let search = maps.search_index();
        Self {
            manifest: Some(manifest),
            maps: Some(maps),
            search: Some(search),
        }
    }

    /// Loads the published generation; an empty snapshot when none exists.
    pub fn load(store: &MapStore) -> Result<Self> {
        let Some(manifest) = store.load_manifest()? else {
            return Ok(Self::empty());
        };
        let maps = LoadedMaps::load(store, &manifest.generation);
        tracing::info!(
            "Loaded generation {} from {}",
            manifest.generation,
            store.dir().display()
        );
        Ok(Self::new(manifest, maps))
    }

    pub fn is_empty(&self) -> bool {
        self.manifest.is_none()
    }
}
