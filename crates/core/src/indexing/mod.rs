//! One generation cycle: scan, classify, link, trace.

pub mod documents;
pub mod manifests;

pub use documents::MapDocuments;

use crate::architecture::{ArchitectureReport, Hierarchy};
use crate::config::MapConfig;
use crate::error::Result;
use crate::flow::{detect_violations, FlowReport, FlowTracer};
use crate::graph::{go_modules, DependencyGraph, ImportResolver};
use crate::scan::{ScanOutput, Scanner};
use mapscope_api::{ArchitectureViolation, FileRecord, ImportCycle, Layer, ScanIssue};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Everything one cycle derives from the file system.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub root: PathBuf,
    /// Sorted by path, layers filled in
    pub records: Vec<FileRecord>,
    pub issues: Vec<ScanIssue>,
    pub architecture: ArchitectureReport,
    pub graph: DependencyGraph,
    pub flows: FlowReport,
    pub violations: Vec<ArchitectureViolation>,
    pub cycles: Vec<ImportCycle>,
}

/// Outcome counters of one cycle, not part of the analysis itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub scanned: usize,
    pub reused: usize,
    pub removed: usize,
}

/// State carried over from the published generation for an incremental cycle.
#[derive(Debug, Clone)]
pub struct PriorState {
    pub records: Vec<FileRecord>,
    pub issues: Vec<ScanIssue>,
    pub architecture: ArchitectureReport,
    pub graph: DependencyGraph,
}

pub struct MapBuilder<'a> {
    root: &'a Path,
    config: &'a MapConfig,
}

impl<'a> MapBuilder<'a> {
    pub fn new(root: &'a Path, config: &'a MapConfig) -> Self {
        Self { root, config }
    }

    /// Rescans everything and rebuilds every structure.
    pub fn full(&self) -> Result<(Analysis, CycleStats)> {
        let scan = Scanner::new(self.root, self.config)?.scan()?;
        let stats = CycleStats {
            scanned: scan.records.len(),
            reused: scan.reused,
            removed: 0,
        };
        let ScanOutput {
            records, issues, ..
        } = scan;

        let architecture = ArchitectureReport::detect(&records);
        let resolver = ImportResolver::new(&records, go_modules(self.root, &records));
        let graph = DependencyGraph::build(&records, &resolver);
        Ok((self.finish(records, issues, architecture, graph), stats))
    }

    /// Rescans changed files only and patches layers and graph in place of a rebuild.
    pub fn incremental(&self, prior: &PriorState) -> Result<(Analysis, CycleStats)> {
        let scan = Scanner::new(self.root, self.config)?.scan_with_previous(&prior.records)?;
        let stats = CycleStats {
            scanned: scan.changed.len(),
            reused: scan.reused,
            removed: scan.removed.len(),
        };
        tracing::debug!(
            "Incremental scan: {} changed, {} removed",
            scan.changed.len(),
            scan.removed.len()
        );

        let issues = carry_issues(&scan, &prior.issues);
        let architecture = prior
            .architecture
            .patch(&scan.records, &scan.changed, &scan.removed);
        let resolver = ImportResolver::new(&scan.records, go_modules(self.root, &scan.records));
        let graph = prior
            .graph
            .patch(&scan.records, &scan.changed, &scan.removed, &resolver);
        Ok((self.finish(scan.records, issues, architecture, graph), stats))
    }

    fn finish(
        &self,
        mut records: Vec<FileRecord>,
        issues: Vec<ScanIssue>,
        architecture: ArchitectureReport,
        graph: DependencyGraph,
    ) -> Analysis {
        architecture.layers.annotate(&mut records);

        let primary = architecture.patterns.primary_type();
        let entry_layer = primary.map(|p| p.entry_layer()).unwrap_or(Layer::Routes);
        let flows = FlowTracer::new(&graph, &architecture.layers, self.config).trace(entry_layer);

        let hierarchy = primary.map(|p| Hierarchy::for_pattern(p, self.config));
        let violations = detect_violations(&graph, &architecture.layers, hierarchy.as_ref());
        let cycles = graph.cycles();

        tracing::debug!(
            "Analysis: {} files, {} edges, {} chains, {} violations, {} cycles",
            records.len(),
            graph.edge_count(),
            flows.chains.len(),
            violations.len(),
            cycles.len()
        );
        Analysis {
            root: self.root.to_path_buf(),
            records,
            issues,
            architecture,
            graph,
            flows,
            violations,
            cycles,
        }
    }
}

/// Issues of reused files survive; issues of rescanned or removed files are replaced.
fn carry_issues(scan: &ScanOutput, prior: &[ScanIssue]) -> Vec<ScanIssue> {
    let reused: BTreeSet<&str> = scan
        .records
        .iter()
        .map(|r| r.path.as_str())
        .filter(|p| !scan.changed.contains(*p))
        .collect();
    let mut issues: Vec<ScanIssue> = prior
        .iter()
        .filter(|i| reused.contains(i.path.as_str()))
        .cloned()
        .chain(scan.issues.iter().cloned())
        .collect();
    issues.sort();
    issues.dedup();
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapscope_api::PatternType;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn fixture(root: &Path) {
        write(root, "src/routes/users.js", "const c = require('../controllers/users');\n");
        write(root, "src/routes/orders.js", "const c = require('../controllers/orders');\n");
        write(root, "src/routes/health.js", "module.exports = {};\n");
        write(root, "src/controllers/users.js", "const s = require('../services/users');\n");
        write(root, "src/controllers/orders.js", "const s = require('../services/orders');\n");
        write(root, "src/services/users.js", "const m = require('../models/user');\n");
        write(root, "src/services/orders.js", "const m = require('../models/order');\n");
        write(root, "src/models/user.js", "module.exports = {};\n");
        write(root, "src/models/order.js", "module.exports = {};\n");
    }

    #[test]
    fn test_full_cycle() {
        let dir = tempdir().unwrap();
        fixture(dir.path());
        let config = MapConfig::default().with_map_dir(dir.path().join(".maps"));
        let (analysis, stats) = MapBuilder::new(dir.path(), &config).full().unwrap();

        assert_eq!(stats.scanned, 9);
        assert_eq!(analysis.flows.isolated_endpoints, vec!["src/routes/health.js"]);
        assert_eq!(
            analysis.architecture.patterns.primary_type(),
            Some(PatternType::ServiceOriented)
        );
        assert_eq!(analysis.flows.chains.len(), 2);
        assert!(analysis.flows.chains.iter().all(|c| c.depth == 4));
        assert!(analysis.violations.is_empty());
        assert!(analysis.records.iter().all(|r| r.layer.is_some()));
    }

    #[test]
    fn test_incremental_equals_full() {
        let dir = tempdir().unwrap();
        fixture(dir.path());
        let config = MapConfig::default().with_map_dir(dir.path().join(".maps"));
        let builder = MapBuilder::new(dir.path(), &config);
        let (first, _) = builder.full().unwrap();

        // new content with a different size so the stored fingerprint no longer matches
        write(
            dir.path(),
            "src/models/user.js",
            "const c = require('../controllers/users');\nmodule.exports = {};\n",
        );
        fs::remove_file(dir.path().join("src/routes/health.js")).unwrap();

        let prior = PriorState {
            records: first.records.clone(),
            issues: first.issues.clone(),
            architecture: first.architecture.clone(),
            graph: first.graph.clone(),
        };
        let (patched, stats) = builder.incremental(&prior).unwrap();
        let (full, _) = builder.full().unwrap();

        assert_eq!(stats.removed, 1);
        assert_eq!(patched, full);
        assert_eq!(patched.violations.len(), 1);
    }
}
