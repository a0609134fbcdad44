//! File-level dependency graph.
//!
//! Nodes are code files, edges are resolved imports. Forward and reverse
//! adjacency come from the same `StableDiGraph`, so they can never disagree.

pub mod resolver;

pub use resolver::{GoModule, ImportResolver, Resolution};

use mapscope_api::{DependencyEdge, ExternalReference, FileRecord, ImportCycle};
use petgraph::algo::tarjan_scc;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

pub const GO_MOD: &str = "go.mod";

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    topology: StableDiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
    /// Unresolved imports, keyed by importing file
    external: BTreeMap<String, Vec<ExternalReference>>,
}

impl PartialEq for DependencyGraph {
    fn eq(&self, other: &Self) -> bool {
        self.forward() == other.forward() && self.external == other.external
    }
}

fn is_node(record: &FileRecord) -> bool {
    record.language.is_code()
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(records: &[FileRecord], resolver: &ImportResolver) -> Self {
        let mut graph = Self::new();
        for record in records.iter().filter(|r| is_node(r)) {
            graph.ensure_node(&record.path);
        }
        for record in records.iter().filter(|r| is_node(r)) {
            graph.connect(record, resolver);
        }
        tracing::debug!(
            "Dependency graph: {} files, {} edges, {} external references",
            graph.node_count(),
            graph.edge_count(),
            graph.external_count()
        );
        graph
    }

    /// Re-resolves the outgoing imports of `changed` files and drops `removed` ones.
    ///
    /// Adding or removing a file can turn an external reference of an untouched
    /// file into an edge (or the reverse), so any change in file membership
    /// re-resolves every file.
    pub fn patch(
        &self,
        records: &[FileRecord],
        changed: &BTreeSet<String>,
        removed: &BTreeSet<String>,
        resolver: &ImportResolver,
    ) -> Self {
        let membership_changed = !removed.is_empty()
            || changed
                .iter()
                .any(|p| !self.index.contains_key(p) || p.ends_with(GO_MOD));
        if membership_changed {
            tracing::debug!("File set changed, re-resolving every import");
            return Self::build(records, resolver);
        }

        let mut graph = self.clone();
        let by_path: HashMap<&str, &FileRecord> =
            records.iter().map(|r| (r.path.as_str(), r)).collect();
        for path in changed {
            let Some(record) = by_path.get(path.as_str()) else {
                continue;
            };
            if !is_node(record) {
                continue;
            }
            graph.clear_outgoing(path);
            graph.connect(record, resolver);
        }
        graph
    }

    /// Rebuilds a graph from a stored forward adjacency map.
    pub fn from_parts(
        forward: &BTreeMap<String, Vec<String>>,
        external: Vec<ExternalReference>,
    ) -> Self {
        let mut graph = Self::new();
        for (source, targets) in forward {
            let from = graph.ensure_node(source);
            for target in targets {
                let to = graph.ensure_node(target);
                graph.topology.update_edge(from, to, ());
            }
        }
        for reference in external {
            graph
                .external
                .entry(reference.source.clone())
                .or_default()
                .push(reference);
        }
        graph
    }

    fn ensure_node(&mut self, path: &str) -> NodeIndex {
        if let Some(idx) = self.index.get(path) {
            return *idx;
        }
        let idx = self.topology.add_node(path.to_string());
        self.index.insert(path.to_string(), idx);
        idx
    }

    fn clear_outgoing(&mut self, path: &str) {
        if let Some(&idx) = self.index.get(path) {
            let edges: Vec<_> = self.topology.edges(idx).map(|e| e.id()).collect();
            for edge in edges {
                self.topology.remove_edge(edge);
            }
        }
        self.external.remove(path);
    }

    fn connect(&mut self, record: &FileRecord, resolver: &ImportResolver) {
        let from = self.ensure_node(&record.path);
        let mut external = Vec::new();
        for specifier in &record.imports {
            match resolver.resolve(record, specifier) {
                Resolution::Internal(targets) => {
                    for target in targets {
                        let to = self.ensure_node(&target);
                        self.topology.update_edge(from, to, ());
                    }
                }
                Resolution::External { package } => external.push(ExternalReference {
                    source: record.path.clone(),
                    specifier: specifier.clone(),
                    package,
                }),
            }
        }
        if !external.is_empty() {
            self.external.insert(record.path.clone(), external);
        }
    }

    fn neighbors(&self, path: &str, direction: Direction) -> Vec<String> {
        let Some(&idx) = self.index.get(path) else {
            return Vec::new();
        };
        let mut out: Vec<String> = self
            .topology
            .neighbors_directed(idx, direction)
            .filter_map(|n| self.topology.node_weight(n).cloned())
            .collect();
        out.sort();
        out.dedup();
        out
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Internal files `path` imports, sorted.
    pub fn imports_of(&self, path: &str) -> Vec<String> {
        self.neighbors(path, Direction::Outgoing)
    }

    /// Internal files importing `path`, sorted.
    pub fn dependents_of(&self, path: &str) -> Vec<String> {
        self.neighbors(path, Direction::Incoming)
    }

    pub fn dependent_count(&self, path: &str) -> usize {
        self.index
            .get(path)
            .map(|&idx| {
                self.topology
                    .neighbors_directed(idx, Direction::Incoming)
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn files(&self) -> Vec<String> {
        let mut files: Vec<String> = self.index.keys().cloned().collect();
        files.sort();
        files
    }

    fn adjacency(&self, direction: Direction) -> BTreeMap<String, Vec<String>> {
        self.index
            .keys()
            .map(|path| (path.clone(), self.neighbors(path, direction)))
            .collect()
    }

    /// Every node with its sorted imports (possibly empty).
    pub fn forward(&self) -> BTreeMap<String, Vec<String>> {
        self.adjacency(Direction::Outgoing)
    }

    /// Every node with its sorted dependents (possibly empty).
    pub fn reverse(&self) -> BTreeMap<String, Vec<String>> {
        self.adjacency(Direction::Incoming)
    }

    pub fn edges(&self) -> Vec<DependencyEdge> {
        let mut edges: Vec<DependencyEdge> = self
            .topology
            .edge_indices()
            .filter_map(|e| {
                let (source, target) = self.topology.edge_endpoints(e)?;
                Some(DependencyEdge {
                    source: self.topology.node_weight(source)?.clone(),
                    target: self.topology.node_weight(target)?.clone(),
                })
            })
            .collect();
        edges.sort();
        edges
    }

    pub fn external(&self) -> Vec<ExternalReference> {
        self.external.values().flatten().cloned().collect()
    }

    pub fn external_of(&self, path: &str) -> &[ExternalReference] {
        self.external.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn node_count(&self) -> usize {
        self.topology.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.topology.edge_count()
    }

    pub fn external_count(&self) -> usize {
        self.external.values().map(Vec::len).sum()
    }

    /// Import cycles: strongly connected components with more than one file.
    pub fn cycles(&self) -> Vec<ImportCycle> {
        let mut cycles: Vec<ImportCycle> = tarjan_scc(&self.topology)
            .into_iter()
            .filter(|component| component.len() > 1)
            .map(|component| {
                let mut files: Vec<String> = component
                    .into_iter()
                    .filter_map(|idx| self.topology.node_weight(idx).cloned())
                    .collect();
                files.sort();
                ImportCycle { files }
            })
            .collect();
        cycles.sort_by(|a, b| a.files.cmp(&b.files));
        cycles
    }
}

/// Reads the `module` line of every `go.mod` among `records`.
pub fn go_modules(root: &Path, records: &[FileRecord]) -> Vec<GoModule> {
    records
        .iter()
        .filter(|r| r.file_name() == GO_MOD)
        .filter_map(|r| {
            let text = match std::fs::read_to_string(root.join(&r.path)) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", r.path, e);
                    return None;
                }
            };
            let module = text
                .lines()
                .find_map(|line| line.trim().strip_prefix("module "))?
                .trim()
                .trim_matches('"')
                .to_string();
            Some(GoModule {
                path: module,
                dir: r.directory().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapscope_api::{FileRole, Language};

    fn record(path: &str, imports: &[&str]) -> FileRecord {
        FileRecord {
            path: path.to_string(),
            size: 1,
            language: Language::JAVASCRIPT,
            role: FileRole::Source,
            layer: None,
            content_hash: String::new(),
            modified: 0,
            exports: vec![],
            imports: imports.iter().map(|s| s.to_string()).collect(),
            signatures: vec![],
            frameworks: vec![],
            markers: vec![],
            tables: vec![],
        }
    }

    fn build(records: &[FileRecord]) -> DependencyGraph {
        let resolver = ImportResolver::new(records, vec![]);
        DependencyGraph::build(records, &resolver)
    }

    #[test]
    fn test_forward_and_reverse_agree() {
        let records = vec![
            record("src/a.js", &["./b", "./c", "express"]),
            record("src/b.js", &["./c"]),
            record("src/c.js", &[]),
        ];
        let graph = build(&records);
        assert_eq!(graph.imports_of("src/a.js"), vec!["src/b.js", "src/c.js"]);
        assert_eq!(graph.dependents_of("src/c.js"), vec!["src/a.js", "src/b.js"]);
        assert_eq!(graph.dependent_count("src/c.js"), 2);

        for (source, targets) in graph.forward() {
            for target in targets {
                assert!(graph.reverse()[&target].contains(&source));
            }
        }
        let external = graph.external();
        assert_eq!(external.len(), 1);
        assert_eq!(external[0].package, "express");
    }

    #[test]
    fn test_cycles_reported() {
        let records = vec![
            record("src/a.js", &["./b"]),
            record("src/b.js", &["./a"]),
            record("src/c.js", &["./a"]),
        ];
        let graph = build(&records);
        let cycles = graph.cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].files, vec!["src/a.js", "src/b.js"]);
    }

    #[test]
    fn test_patch_matches_rebuild() {
        let before = vec![
            record("src/a.js", &["./b"]),
            record("src/b.js", &[]),
            record("src/c.js", &[]),
        ];
        let graph = build(&before);

        let after = vec![
            record("src/a.js", &["./c", "lodash"]),
            record("src/b.js", &[]),
            record("src/c.js", &[]),
        ];
        let resolver = ImportResolver::new(&after, vec![]);
        let changed: BTreeSet<String> = ["src/a.js".to_string()].into();
        let patched = graph.patch(&after, &changed, &BTreeSet::new(), &resolver);
        assert_eq!(patched, build(&after));
        assert!(patched.dependents_of("src/b.js").is_empty());
    }

    #[test]
    fn test_patch_with_removed_file() {
        let before = vec![record("src/a.js", &["./b"]), record("src/b.js", &[])];
        let graph = build(&before);
        let after = vec![record("src/a.js", &["./b"])];
        let resolver = ImportResolver::new(&after, vec![]);
        let removed: BTreeSet<String> = ["src/b.js".to_string()].into();
        let patched = graph.patch(&after, &BTreeSet::new(), &removed, &resolver);
        assert!(!patched.contains("src/b.js"));
        assert_eq!(patched.external_of("src/a.js").len(), 1);
    }

    #[test]
    fn test_from_parts_round_trip() {
        let records = vec![record("src/a.js", &["./b", "react"]), record("src/b.js", &[])];
        let graph = build(&records);
        let restored = DependencyGraph::from_parts(&graph.forward(), graph.external());
        assert_eq!(restored, graph);
    }
}
