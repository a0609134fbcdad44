use super::architecture::PatternType;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    /// Discard every prior artifact and rerun the whole pipeline
    Full,
    /// Rescan only changed files and patch the stored maps
    Incremental,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactStats {
    pub name: String,
    pub original_size: u64,
    pub stored_size: u64,
    /// Space saved, in percent
    pub ratio: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompressionStats {
    pub generation: String,
    pub artifacts: Vec<ArtifactStats>,
    pub total_original: u64,
    pub total_stored: u64,
    pub ratio: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StalenessLevel {
    Fresh,
    Aging,
    Stale,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Staleness {
    pub generated_at: u64,
    pub elapsed_secs: u64,
    pub changed_files: usize,
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub removed: Vec<String>,
    pub score: f64,
    pub level: StalenessLevel,
}

impl Staleness {
    pub fn should_refresh(&self) -> bool {
        self.level == StalenessLevel::Stale
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub generation: String,
    pub mode: RefreshMode,
    pub generated_at: u64,
    pub files_scanned: usize,
    pub files_reused: usize,
    pub files_removed: usize,
    pub issues: usize,
    pub primary_pattern: Option<PatternType>,
    pub duration_ms: u64,
}
