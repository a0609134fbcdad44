use crate::architecture::{Hierarchy, LayerMap};
use crate::graph::DependencyGraph;
use mapscope_api::{ArchitectureViolation, Severity, ViolationType};

/// Flags every edge pointing back toward an outer layer.
///
/// Without a hierarchy (no primary pattern) nothing is reported.
pub fn detect_violations(
    graph: &DependencyGraph,
    layers: &LayerMap,
    hierarchy: Option<&Hierarchy>,
) -> Vec<ArchitectureViolation> {
    let Some(hierarchy) = hierarchy else {
        tracing::debug!("No primary pattern, skipping violation detection");
        return Vec::new();
    };

    graph
        .edges()
        .into_iter()
        .filter_map(|edge| {
            let source_layer = layers.layer_of(&edge.source)?;
            let target_layer = layers.layer_of(&edge.target)?;
            if !hierarchy.is_upward(source_layer, target_layer) {
                return None;
            }
            Some(ArchitectureViolation {
                file: edge.source,
                target: edge.target,
                source_layer,
                target_layer,
                violation_type: ViolationType::UpwardDependency,
                severity: Severity::Error,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfig;
    use crate::graph::ImportResolver;
    use mapscope_api::{FileRecord, FileRole, Language, Layer, PatternType};

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

    #[test]
    fn test_upward_import_flagged_once() {
        let records = vec![
            record("controllers/a.js", &["../models/a"]),
            record("models/a.js", &["../controllers/a"]),
        ];
        let resolver = ImportResolver::new(&records, vec![]);
        let graph = DependencyGraph::build(&records, &resolver);
        let layers = LayerMap::assign(&records);
        let hierarchy = Hierarchy::for_pattern(PatternType::ServiceOriented, &MapConfig::default());

        let violations = detect_violations(&graph, &layers, Some(&hierarchy));
        assert_eq!(violations.len(), 1);
        let v = &violations[0];
        assert_eq!(v.file, "models/a.js");
        assert_eq!(v.target, "controllers/a.js");
        assert_eq!(v.source_layer, Layer::Models);
        assert_eq!(v.target_layer, Layer::Controllers);
        assert_eq!(v.severity, Severity::Error);
    }

    #[test]
    fn test_skipped_without_pattern() {
        let records = vec![
            record("controllers/a.js", &[]),
            record("models/a.js", &["../controllers/a"]),
        ];
        let resolver = ImportResolver::new(&records, vec![]);
        let graph = DependencyGraph::build(&records, &resolver);
        let layers = LayerMap::assign(&records);
        assert!(detect_violations(&graph, &layers, None).is_empty());
    }
}
