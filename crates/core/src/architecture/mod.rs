//! Layer assignment and architecture pattern detection.

pub mod hierarchy;
pub mod layers;
pub mod markers;
pub mod patterns;

pub use hierarchy::Hierarchy;
pub use layers::LayerMap;
pub use markers::{detect_markers, ContentMarkers};
pub use patterns::{detect_patterns, PatternReport};

use mapscope_api::FileRecord;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchitectureReport {
    pub layers: LayerMap,
    pub patterns: PatternReport,
}

impl ArchitectureReport {
    pub fn detect(records: &[FileRecord]) -> Self {
        let layers = LayerMap::assign(records);
        let patterns = detect_patterns(records, &layers);
        tracing::debug!(
            "Assigned layers to {} files, primary pattern: {:?}",
            layers.len(),
            patterns.primary_type()
        );
        Self { layers, patterns }
    }

    /// Patches layer assignments for changed/removed files and re-evaluates patterns.
    pub fn patch(
        &self,
        records: &[FileRecord],
        changed: &BTreeSet<String>,
        removed: &BTreeSet<String>,
    ) -> Self {
        let layers = self.layers.patch(records, changed, removed);
        let patterns = detect_patterns(records, &layers);
        Self { layers, patterns }
    }
}
