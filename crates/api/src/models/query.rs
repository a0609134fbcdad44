use super::architecture::{ArchitecturePattern, ArchitectureViolation, Layer, PatternType};
use super::file::ScanIssue;
use super::graph::{DataFlowChain, FlowPattern, FlowSummary, ImportCycle};
use super::language::Language;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Fixed catalog of structural queries.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum QueryKind {
    EntryPoints,
    Framework,
    Tests,
    Largest,
    Recent,
    Structure,
    Languages,
    Summary,
    BackendLayers,
    Modules,
    ModuleDeps,
    Components,
    Database,
    DataFlow,
    TableMapping,
    Dependencies,
    Issues,
    Relationships,
    NpmDeps,
    Stack,
}

impl QueryKind {
    pub const ALL: [QueryKind; 20] = [
        QueryKind::EntryPoints,
        QueryKind::Framework,
        QueryKind::Tests,
        QueryKind::Largest,
        QueryKind::Recent,
        QueryKind::Structure,
        QueryKind::Languages,
        QueryKind::Summary,
        QueryKind::BackendLayers,
        QueryKind::Modules,
        QueryKind::ModuleDeps,
        QueryKind::Components,
        QueryKind::Database,
        QueryKind::DataFlow,
        QueryKind::TableMapping,
        QueryKind::Dependencies,
        QueryKind::Issues,
        QueryKind::Relationships,
        QueryKind::NpmDeps,
        QueryKind::Stack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::EntryPoints => "entry-points",
            QueryKind::Framework => "framework",
            QueryKind::Tests => "tests",
            QueryKind::Largest => "largest",
            QueryKind::Recent => "recent",
            QueryKind::Structure => "structure",
            QueryKind::Languages => "languages",
            QueryKind::Summary => "summary",
            QueryKind::BackendLayers => "backend-layers",
            QueryKind::Modules => "modules",
            QueryKind::ModuleDeps => "module-deps",
            QueryKind::Components => "components",
            QueryKind::Database => "database",
            QueryKind::DataFlow => "data-flow",
            QueryKind::TableMapping => "table-mapping",
            QueryKind::Dependencies => "dependencies",
            QueryKind::Issues => "issues",
            QueryKind::Relationships => "relationships",
            QueryKind::NpmDeps => "npm-deps",
            QueryKind::Stack => "stack",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueryKind::ALL
            .iter()
            .find(|k| k.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown query type '{}'", s))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    /// Restrict file-centric queries (dependencies) to one path
    #[serde(default)]
    pub file: Option<String>,
    /// Restrict layer-centric queries (backend-layers) to one layer
    #[serde(default)]
    pub layer: Option<Layer>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl QueryOptions {
    pub fn for_file(path: impl Into<String>) -> Self {
        Self {
            file: Some(path.into()),
            ..Default::default()
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct EntryPoint {
    pub path: String,
    pub kind: String,
    pub language: Language,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct FrameworkUsage {
    pub name: String,
    pub category: String,
    pub files: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct FileSummary {
    pub path: String,
    pub size: u64,
    pub language: Language,
    pub modified: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryNode {
    pub name: String,
    pub path: String,
    /// Files in this directory and all descendants
    pub file_count: usize,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DirectoryNode>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct LanguageShare {
    pub language: Language,
    pub files: usize,
    pub bytes: u64,
    pub percentage: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub name: String,
    pub total_files: usize,
    pub total_size: u64,
    pub languages: Vec<LanguageShare>,
    pub primary_pattern: Option<ArchitecturePattern>,
    pub frameworks: Vec<String>,
    pub entry_points: Vec<String>,
    pub test_files: usize,
    pub generated_at: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct ModuleInfo {
    pub name: String,
    pub files: usize,
    pub exports: usize,
    pub layers: BTreeMap<Layer, usize>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct ModuleDependency {
    pub from: String,
    pub to: String,
    pub imports: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct ComponentInfo {
    pub name: String,
    pub path: String,
    pub framework: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct TableMapping {
    pub table: String,
    pub file: String,
    pub layer: Option<Layer>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct FileDependencies {
    pub file: String,
    pub imports: Vec<String>,
    pub dependents: Vec<String>,
    pub external: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct HubFile {
    pub path: String,
    pub count: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DependencyOverview {
    pub files: usize,
    pub edges: usize,
    pub external_references: usize,
    pub most_imported: Vec<HubFile>,
    pub most_dependencies: Vec<HubFile>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct LayerEdge {
    pub from: Layer,
    pub to: Layer,
    pub count: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    pub path: String,
    pub name: Option<String>,
    pub version: Option<String>,
    pub dependencies: BTreeMap<String, String>,
    pub dev_dependencies: BTreeMap<String, String>,
    pub scripts: BTreeMap<String, String>,
    /// Package → number of files importing it
    pub used_packages: BTreeMap<String, usize>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StackInfo {
    pub languages: Vec<Language>,
    pub frameworks: Vec<String>,
    pub databases: Vec<String>,
    pub package_managers: Vec<String>,
    pub architecture: Option<PatternType>,
}

/// One variant per query type; consumers match on `type`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QueryResult {
    EntryPoints {
        entries: Vec<EntryPoint>,
    },
    Framework {
        frameworks: Vec<FrameworkUsage>,
    },
    Tests {
        count: usize,
        files: Vec<String>,
    },
    Largest {
        files: Vec<FileSummary>,
    },
    Recent {
        files: Vec<FileSummary>,
    },
    Structure {
        tree: DirectoryNode,
    },
    Languages {
        languages: Vec<LanguageShare>,
    },
    Summary {
        summary: ProjectSummary,
    },
    BackendLayers {
        primary: Option<ArchitecturePattern>,
        candidates: Vec<ArchitecturePattern>,
        layers: BTreeMap<Layer, Vec<String>>,
    },
    Modules {
        modules: Vec<ModuleInfo>,
    },
    ModuleDeps {
        dependencies: Vec<ModuleDependency>,
    },
    Components {
        components: Vec<ComponentInfo>,
    },
    Database {
        frameworks: Vec<FrameworkUsage>,
        model_files: Vec<String>,
        tables: Vec<TableMapping>,
    },
    DataFlow {
        summary: FlowSummary,
        common_patterns: Vec<FlowPattern>,
        isolated_endpoints: Vec<String>,
        flows: Vec<DataFlowChain>,
    },
    TableMapping {
        mappings: Vec<TableMapping>,
    },
    Dependencies {
        file: Option<FileDependencies>,
        overview: Option<DependencyOverview>,
    },
    Issues {
        violations: Vec<ArchitectureViolation>,
        cycles: Vec<ImportCycle>,
        scan_issues: Vec<ScanIssue>,
        unresolved_imports: usize,
        ambiguous_pattern: bool,
    },
    Relationships {
        hubs: Vec<HubFile>,
        orphans: Vec<String>,
        layer_edges: Vec<LayerEdge>,
    },
    NpmDeps {
        manifests: Vec<PackageManifest>,
    },
    Stack {
        stack: StackInfo,
    },
    /// The artifact backing this query could not be loaded
    Unavailable {
        artifact: String,
        reason: String,
        suggestion: String,
    },
}
