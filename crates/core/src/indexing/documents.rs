//! Derives the stored documents from an [`Analysis`].

use super::manifests::{npm_manifests, package_managers};
use super::Analysis;
use crate::architecture::markers::{framework_category, is_component_marker};
use crate::error::Result;
use crate::store::artifact::{
    BackendLayersDoc, DataFlowDoc, DependenciesForwardDoc, DependenciesReverseDoc, IssuesDoc,
    MetadataDoc, NpmDependenciesDoc, QuickQueriesDoc, RelationshipsDoc, SummaryDoc, TreeDoc,
};
use crate::store::{FileFingerprint, GenerationSet};
use crate::util::module_of;
use mapscope_api::{
    ComponentInfo, DirectoryNode, EntryPoint, FileRecord, FileRole, FileSummary, FrameworkUsage,
    HubFile, Language, LanguageShare, LayerEdge, ModuleDependency, ProjectSummary, StackInfo,
};
use std::collections::BTreeMap;
use std::path::Path;

/// Length of the precomputed largest/recent/hub lists.
pub const QUICK_LIST_LEN: usize = 20;
const HUB_COUNT: usize = 10;

/// The full artifact set of one generation, decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct MapDocuments {
    pub summary: SummaryDoc,
    pub tree: TreeDoc,
    pub metadata: MetadataDoc,
    pub quick_queries: QuickQueriesDoc,
    pub backend_layers: BackendLayersDoc,
    pub data_flow: DataFlowDoc,
    pub dependencies_forward: DependenciesForwardDoc,
    pub dependencies_reverse: DependenciesReverseDoc,
    pub relationships: RelationshipsDoc,
    pub issues: IssuesDoc,
    pub npm_dependencies: NpmDependenciesDoc,
}

impl MapDocuments {
    pub fn build(analysis: &Analysis, generated_at: u64) -> Self {
        let records = &analysis.records;
        let languages = language_shares(records);
        let frameworks = framework_usage(records);
        let entry_points = entry_points(records);
        let primary = analysis.architecture.patterns.primary.clone();

        let quick_queries = QuickQueriesDoc {
            entry_points: entry_points.clone(),
            frameworks: frameworks.clone(),
            test_files: records
                .iter()
                .filter(|r| r.role == FileRole::Test)
                .map(|r| r.path.clone())
                .collect(),
            largest: top_files(records, |a, b| b.size.cmp(&a.size)),
            recent: top_files(records, |a, b| b.modified.cmp(&a.modified)),
            languages: languages.clone(),
            components: components(records),
            stack: StackInfo {
                languages: languages
                    .iter()
                    .map(|l| l.language.clone())
                    .filter(Language::is_code)
                    .collect(),
                frameworks: frameworks.iter().map(|f| f.name.clone()).collect(),
                databases: frameworks
                    .iter()
                    .filter(|f| f.category == "database")
                    .map(|f| f.name.clone())
                    .collect(),
                package_managers: package_managers(records),
                architecture: primary.as_ref().map(|p| p.pattern_type),
            },
        };

        let summary = SummaryDoc {
            summary: ProjectSummary {
                name: project_name(&analysis.root),
                total_files: records.len(),
                total_size: records.iter().map(|r| r.size).sum(),
                languages,
                primary_pattern: primary,
                frameworks: frameworks.iter().map(|f| f.name.clone()).collect(),
                entry_points: entry_points.iter().map(|e| e.path.clone()).collect(),
                test_files: quick_queries.test_files.len(),
                generated_at,
            },
        };

        let graph = &analysis.graph;
        let external = graph.external();
        let unresolved_imports = external
            .iter()
            .filter(|e| e.specifier.starts_with('.'))
            .count();

        Self {
            summary,
            tree: TreeDoc {
                tree: directory_tree(&project_name(&analysis.root), records),
            },
            metadata: MetadataDoc {
                root: analysis.root.to_string_lossy().into_owned(),
                files: records.clone(),
            },
            quick_queries,
            backend_layers: BackendLayersDoc {
                layers: analysis.architecture.layers.clone(),
                patterns: analysis.architecture.patterns.clone(),
            },
            data_flow: DataFlowDoc {
                report: analysis.flows.clone(),
            },
            dependencies_forward: DependenciesForwardDoc {
                forward: graph.forward(),
                external,
            },
            dependencies_reverse: DependenciesReverseDoc {
                reverse: graph.reverse(),
            },
            relationships: relationships(analysis),
            issues: IssuesDoc {
                violations: analysis.violations.clone(),
                cycles: analysis.cycles.clone(),
                scan_issues: analysis.issues.clone(),
                unresolved_imports,
                ambiguous_pattern: analysis.architecture.patterns.is_ambiguous(),
            },
            npm_dependencies: NpmDependenciesDoc {
                manifests: npm_manifests(&analysis.root, records, graph),
            },
        }
    }

    /// Encodes every document for publication.
    pub fn generation_set(&self, generated_at: u64) -> Result<GenerationSet> {
        let mut set = GenerationSet::new(generated_at);
        set.add(self.summary.clone())?;
        set.add(self.tree.clone())?;
        set.add(self.metadata.clone())?;
        set.add(self.quick_queries.clone())?;
        set.add(self.backend_layers.clone())?;
        set.add(self.data_flow.clone())?;
        set.add(self.dependencies_forward.clone())?;
        set.add(self.dependencies_reverse.clone())?;
        set.add(self.relationships.clone())?;
        set.add(self.issues.clone())?;
        set.add(self.npm_dependencies.clone())?;
        Ok(set)
    }

    pub fn fingerprints(&self) -> BTreeMap<String, FileFingerprint> {
        fingerprints(&self.metadata.files)
    }
}

pub fn fingerprints(records: &[FileRecord]) -> BTreeMap<String, FileFingerprint> {
    records
        .iter()
        .map(|r| (r.path.clone(), FileFingerprint::from(r)))
        .collect()
}

fn project_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.to_string_lossy().into_owned())
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Share of files per language, most common first.
pub fn language_shares(records: &[FileRecord]) -> Vec<LanguageShare> {
    let mut by_language: BTreeMap<Language, (usize, u64)> = BTreeMap::new();
    for record in records {
        let entry = by_language.entry(record.language.clone()).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += record.size;
    }
    let total = records.len().max(1) as f64;
    let mut shares: Vec<LanguageShare> = by_language
        .into_iter()
        .map(|(language, (files, bytes))| LanguageShare {
            language,
            files,
            bytes,
            percentage: round1(files as f64 * 100.0 / total),
        })
        .collect();
    shares.sort_by(|a, b| b.files.cmp(&a.files).then_with(|| a.language.cmp(&b.language)));
    shares
}

pub fn framework_usage(records: &[FileRecord]) -> Vec<FrameworkUsage> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for framework in records.iter().flat_map(|r| r.frameworks.iter()) {
        *counts.entry(framework.as_str()).or_insert(0) += 1;
    }
    let mut usage: Vec<FrameworkUsage> = counts
        .into_iter()
        .map(|(name, files)| FrameworkUsage {
            name: name.to_string(),
            category: framework_category(name).to_string(),
            files,
        })
        .collect();
    usage.sort_by(|a, b| b.files.cmp(&a.files).then_with(|| a.name.cmp(&b.name)));
    usage
}

fn entry_points(records: &[FileRecord]) -> Vec<EntryPoint> {
    records
        .iter()
        .filter(|r| r.role == FileRole::Entry)
        .map(|r| EntryPoint {
            path: r.path.clone(),
            kind: entry_kind(r),
            language: r.language.clone(),
        })
        .collect()
}

fn entry_kind(record: &FileRecord) -> String {
    let stem = record.stem();
    if stem.ends_with("Application") {
        return "application".to_string();
    }
    if record.signatures.iter().any(|s| s.name == "main") {
        return "main".to_string();
    }
    stem.split('.').next().unwrap_or(stem).to_ascii_lowercase()
}

fn top_files(
    records: &[FileRecord],
    order: impl Fn(&FileRecord, &FileRecord) -> std::cmp::Ordering,
) -> Vec<FileSummary> {
    let mut sorted: Vec<&FileRecord> = records.iter().collect();
    sorted.sort_by(|a, b| order(a, b).then_with(|| a.path.cmp(&b.path)));
    sorted
        .into_iter()
        .take(QUICK_LIST_LEN)
        .map(|r| FileSummary {
            path: r.path.clone(),
            size: r.size,
            language: r.language.clone(),
            modified: r.modified,
        })
        .collect()
}

fn components(records: &[FileRecord]) -> Vec<ComponentInfo> {
    records
        .iter()
        .filter(|r| r.role != FileRole::Test && r.markers.iter().any(|m| is_component_marker(m)))
        .map(|r| ComponentInfo {
            name: r.stem().split('.').next().unwrap_or_default().to_string(),
            path: r.path.clone(),
            framework: r
                .frameworks
                .iter()
                .find(|f| framework_category(f) == "frontend")
                .cloned(),
        })
        .collect()
}

/// Nested directory listing with cumulative counts; children sorted by name.
pub fn directory_tree(name: &str, records: &[FileRecord]) -> DirectoryNode {
    let mut root = DirectoryNode {
        name: name.to_string(),
        ..Default::default()
    };
    for record in records {
        let mut node = &mut root;
        node.file_count += 1;
        node.size += record.size;
        let dir = record.directory();
        if !dir.is_empty() {
            for segment in dir.split('/') {
                let path = if node.path.is_empty() {
                    segment.to_string()
                } else {
                    format!("{}/{}", node.path, segment)
                };
                let idx = match node.children.iter().position(|c| c.name == segment) {
                    Some(idx) => idx,
                    None => {
                        node.children.push(DirectoryNode {
                            name: segment.to_string(),
                            path,
                            ..Default::default()
                        });
                        node.children.len() - 1
                    }
                };
                node = &mut node.children[idx];
                node.file_count += 1;
                node.size += record.size;
            }
        }
        node.files.push(record.file_name().to_string());
    }
    sort_tree(&mut root);
    root
}

fn sort_tree(node: &mut DirectoryNode) {
    node.files.sort();
    node.children.sort_by(|a, b| a.name.cmp(&b.name));
    for child in &mut node.children {
        sort_tree(child);
    }
}

fn relationships(analysis: &Analysis) -> RelationshipsDoc {
    let graph = &analysis.graph;
    let layers = &analysis.architecture.layers;

    let mut hubs: Vec<HubFile> = graph
        .files()
        .into_iter()
        .map(|path| HubFile {
            count: graph.dependent_count(&path),
            path,
        })
        .filter(|h| h.count > 0)
        .collect();
    hubs.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.path.cmp(&b.path)));
    hubs.truncate(HUB_COUNT);

    let orphans = analysis
        .records
        .iter()
        .filter(|r| r.language.is_code() && r.role == FileRole::Source)
        .filter(|r| graph.imports_of(&r.path).is_empty() && graph.dependent_count(&r.path) == 0)
        .map(|r| r.path.clone())
        .collect();

    let mut layer_counts = BTreeMap::new();
    let mut module_counts: BTreeMap<(String, String), usize> = BTreeMap::new();
    for edge in graph.edges() {
        if let (Some(from), Some(to)) = (layers.layer_of(&edge.source), layers.layer_of(&edge.target)) {
            if from != to {
                *layer_counts.entry((from, to)).or_insert(0) += 1;
            }
        }
        let (from, to) = (module_of(&edge.source), module_of(&edge.target));
        if from != to {
            *module_counts
                .entry((from.to_string(), to.to_string()))
                .or_insert(0) += 1;
        }
    }

    let mut layer_edges: Vec<LayerEdge> = layer_counts
        .into_iter()
        .map(|((from, to), count)| LayerEdge { from, to, count })
        .collect();
    layer_edges.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| (a.from, a.to).cmp(&(b.from, b.to))));

    let mut module_dependencies: Vec<ModuleDependency> = module_counts
        .into_iter()
        .map(|((from, to), imports)| ModuleDependency { from, to, imports })
        .collect();
    module_dependencies.sort_by(|a, b| {
        b.imports
            .cmp(&a.imports)
            .then_with(|| (&a.from, &a.to).cmp(&(&b.from, &b.to)))
    });

    RelationshipsDoc {
        hubs,
        orphans,
        layer_edges,
        module_dependencies,
    }
}
