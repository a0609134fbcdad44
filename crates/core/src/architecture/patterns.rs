use super::layers::LayerMap;
use mapscope_api::{ArchitecturePattern, Confidence, FileRecord, FileRole, Layer, PatternType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Directories whose children are treated as independently deployable services.
pub const SERVICE_CONTAINERS: &[&str] = &["services", "apps", "packages"];

fn requirements(pattern: PatternType) -> &'static [(Layer, usize)] {
    match pattern {
        PatternType::Mvc => &[(Layer::Models, 2), (Layer::Views, 2), (Layer::Controllers, 2)],
        PatternType::Layered => &[
            (Layer::Controllers, 2),
            (Layer::Services, 2),
            (Layer::Repositories, 2),
        ],
        PatternType::Clean => &[
            (Layer::Entities, 2),
            (Layer::Services, 2),
            (Layer::Repositories, 1),
        ],
        PatternType::ServiceOriented => &[(Layer::Routes, 2), (Layer::Services, 2)],
        PatternType::ApiCentric => &[(Layer::Api, 3)],
        PatternType::Microservices => &[],
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternReport {
    pub primary: Option<ArchitecturePattern>,
    /// Other qualifying patterns, strongest first
    pub candidates: Vec<ArchitecturePattern>,
}

impl PatternReport {
    pub fn is_ambiguous(&self) -> bool {
        self.primary.is_none()
    }

    pub fn primary_type(&self) -> Option<PatternType> {
        self.primary.as_ref().map(|p| p.pattern_type)
    }
}

/// `services/<name>` (or `apps/`, `packages/`) directories carrying their own manifest.
pub fn service_roots(records: &[FileRecord]) -> BTreeSet<String> {
    records
        .iter()
        .filter(|r| r.role == FileRole::Manifest)
        .filter_map(|r| {
            let segments: Vec<&str> = r.path.split('/').collect();
            let n = segments.len();
            if n >= 3 && SERVICE_CONTAINERS.contains(&segments[n - 3]) {
                Some(segments[..n - 1].join("/"))
            } else {
                None
            }
        })
        .collect()
}

fn evaluate(pattern: PatternType, counts: &BTreeMap<Layer, usize>) -> Option<ArchitecturePattern> {
    let reqs = requirements(pattern);
    let mut evidence = 0;
    let mut layer_counts = BTreeMap::new();
    for (layer, min) in reqs {
        let count = counts.get(layer).copied().unwrap_or(0);
        if count < *min {
            return None;
        }
        evidence += count;
        layer_counts.insert(*layer, count);
    }
    Some(build(pattern, evidence, layer_counts))
}

fn evaluate_microservices(records: &[FileRecord], layers: &LayerMap) -> Option<ArchitecturePattern> {
    let roots = service_roots(records);
    if roots.len() < 2 {
        return None;
    }
    let inside: Vec<&FileRecord> = records
        .iter()
        .filter(|r| roots.iter().any(|root| r.path.starts_with(&format!("{}/", root))))
        .collect();
    let mut layer_counts = BTreeMap::new();
    for record in &inside {
        if let Some(layer) = layers.layer_of(&record.path) {
            *layer_counts.entry(layer).or_insert(0) += 1;
        }
    }
    Some(build(PatternType::Microservices, inside.len(), layer_counts))
}

fn build(pattern: PatternType, evidence: usize, layer_counts: BTreeMap<Layer, usize>) -> ArchitecturePattern {
    ArchitecturePattern {
        name: pattern.display_name().to_string(),
        pattern_type: pattern,
        confidence: Confidence::from_evidence(evidence),
        evidence,
        layer_counts,
    }
}

/// Evaluates every pattern; the one with the most evidence is primary,
/// ties going to the earlier entry of [`PatternType::ALL`].
pub fn detect_patterns(records: &[FileRecord], layers: &LayerMap) -> PatternReport {
    let counts = layers.counts();
    let mut qualifying: Vec<ArchitecturePattern> = PatternType::ALL
        .iter()
        .filter_map(|&pattern| match pattern {
            PatternType::Microservices => evaluate_microservices(records, layers),
            _ => evaluate(pattern, &counts),
        })
        .collect();

    // stable sort keeps the fixed order among equal evidence
    qualifying.sort_by(|a, b| b.evidence.cmp(&a.evidence));

    let mut iter = qualifying.into_iter();
    let primary = iter.next();
    PatternReport {
        primary,
        candidates: iter.collect(),
    }
}
