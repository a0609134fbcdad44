//! Artifact names and the documents stored under them.

use crate::architecture::{LayerMap, PatternReport};
use crate::flow::FlowReport;
use mapscope_api::{
    ArchitectureViolation, ComponentInfo, DirectoryNode, EntryPoint, ExternalReference,
    FileRecord, FileSummary, FrameworkUsage, HubFile, ImportCycle, LanguageShare, LayerEdge,
    ModuleDependency, PackageManifest, ProjectSummary, ScanIssue, StackInfo,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Bumped whenever a document layout changes; older artifacts are treated as corrupt.
pub const ARTIFACT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactName {
    Summary,
    Tree,
    Metadata,
    QuickQueries,
    BackendLayers,
    DataFlow,
    DependenciesForward,
    DependenciesReverse,
    Relationships,
    Issues,
    NpmDependencies,
}

impl ArtifactName {
    pub const ALL: [ArtifactName; 11] = [
        ArtifactName::Summary,
        ArtifactName::Tree,
        ArtifactName::Metadata,
        ArtifactName::QuickQueries,
        ArtifactName::BackendLayers,
        ArtifactName::DataFlow,
        ArtifactName::DependenciesForward,
        ArtifactName::DependenciesReverse,
        ArtifactName::Relationships,
        ArtifactName::Issues,
        ArtifactName::NpmDependencies,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactName::Summary => "summary",
            ArtifactName::Tree => "tree",
            ArtifactName::Metadata => "metadata",
            ArtifactName::QuickQueries => "quick-queries",
            ArtifactName::BackendLayers => "backend-layers",
            ArtifactName::DataFlow => "data-flow",
            ArtifactName::DependenciesForward => "dependencies-forward",
            ArtifactName::DependenciesReverse => "dependencies-reverse",
            ArtifactName::Relationships => "relationships",
            ArtifactName::Issues => "issues",
            ArtifactName::NpmDependencies => "npm-dependencies",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.json.zst", self.as_str())
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArtifactName::ALL
            .iter()
            .find(|n| n.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown artifact '{}'", s))
    }
}

/// Envelope shared by every stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactDocument<T> {
    pub version: u32,
    pub map_type: String,
    pub generated_at: u64,
    #[serde(flatten)]
    pub payload: T,
}

impl<T> ArtifactDocument<T> {
    pub fn new(name: ArtifactName, generated_at: u64, payload: T) -> Self {
        Self {
            version: ARTIFACT_VERSION,
            map_type: name.as_str().to_string(),
            generated_at,
            payload,
        }
    }
}

/// Ties a payload type to the artifact it is stored as.
pub trait Artifact: Serialize + serde::de::DeserializeOwned {
    const NAME: ArtifactName;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryDoc {
    pub summary: ProjectSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDoc {
    pub tree: DirectoryNode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataDoc {
    pub root: String,
    pub files: Vec<FileRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickQueriesDoc {
    pub entry_points: Vec<EntryPoint>,
    pub frameworks: Vec<FrameworkUsage>,
    pub test_files: Vec<String>,
    pub largest: Vec<FileSummary>,
    pub recent: Vec<FileSummary>,
    pub languages: Vec<LanguageShare>,
    pub components: Vec<ComponentInfo>,
    pub stack: StackInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendLayersDoc {
    pub layers: LayerMap,
    pub patterns: PatternReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFlowDoc {
    #[serde(flatten)]
    pub report: FlowReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependenciesForwardDoc {
    pub forward: BTreeMap<String, Vec<String>>,
    pub external: Vec<ExternalReference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependenciesReverseDoc {
    pub reverse: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipsDoc {
    pub hubs: Vec<HubFile>,
    pub orphans: Vec<String>,
    pub layer_edges: Vec<LayerEdge>,
    pub module_dependencies: Vec<ModuleDependency>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuesDoc {
    pub violations: Vec<ArchitectureViolation>,
    pub cycles: Vec<ImportCycle>,
    pub scan_issues: Vec<ScanIssue>,
    pub unresolved_imports: usize,
    pub ambiguous_pattern: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpmDependenciesDoc {
    pub manifests: Vec<PackageManifest>,
}

macro_rules! artifact {
    ($($ty:ty => $name:ident),* $(,)?) => {
        $(impl Artifact for $ty {
            const NAME: ArtifactName = ArtifactName::$name;
        })*
    };
}

artifact! {
    SummaryDoc => Summary,
    TreeDoc => Tree,
    MetadataDoc => Metadata,
    QuickQueriesDoc => QuickQueries,
    BackendLayersDoc => BackendLayers,
    DataFlowDoc => DataFlow,
    DependenciesForwardDoc => DependenciesForward,
    DependenciesReverseDoc => DependenciesReverse,
    RelationshipsDoc => Relationships,
    IssuesDoc => Issues,
    NpmDependenciesDoc => NpmDependencies,
}
