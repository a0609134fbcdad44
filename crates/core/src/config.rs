//! Engine configuration.
//!
//! Defaults are overridden, in order, by an optional `<root>/.mapscope.json`
//! and by the builder-style setters. The map directory can be relocated
//! with `MAPSCOPE_MAP_DIR`.

use crate::error::Result;
use mapscope_api::{Layer, PatternType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use xxhash_rust::xxh3::xxh3_64;

pub const DEFAULT_MAP_DIR: &str = ".mapscope/maps";
pub const PROJECT_CONFIG_FILE: &str = ".mapscope.json";
pub const MAP_DIR_ENV: &str = "MAPSCOPE_MAP_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct MapConfig {
    /// Explicit artifact directory; derived from the project root when unset
    pub map_dir: Option<PathBuf>,
    /// Extra glob patterns (relative to the root) excluded from scanning
    pub ignore_patterns: Vec<String>,
    pub max_workers: usize,
    pub max_file_size: u64,
    pub max_flow_depth: usize,
    pub max_chains_per_entry: usize,
    pub common_pattern_count: usize,
    pub fuzzy_distance: usize,
    pub summarize_threshold: usize,
    pub summary_top_n: usize,
    pub io_timeout_secs: u64,
    /// Layer ordering overrides, outermost layer first
    pub hierarchies: BTreeMap<PatternType, Vec<Layer>>,
}

impl Default for MapConfig {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
            .min(8);
        Self {
            map_dir: None,
            ignore_patterns: Vec::new(),
            max_workers: workers,
            max_file_size: 1024 * 1024,
            max_flow_depth: 10,
            max_chains_per_entry: 64,
            common_pattern_count: 5,
            fuzzy_distance: 2,
            summarize_threshold: 50,
            summary_top_n: 10,
            io_timeout_secs: 30,
            hierarchies: BTreeMap::new(),
        }
    }
}

impl MapConfig {
    /// Defaults merged with `<root>/.mapscope.json` when present.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(PROJECT_CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)?;
        let config: MapConfig = serde_json::from_str(&text)?;
        tracing::debug!("Loaded project configuration from {}", path.display());
        Ok(config)
    }

    pub fn with_map_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.map_dir = Some(dir.into());
        self
    }

    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers.max(1);
        self
    }

    pub fn with_max_flow_depth(mut self, depth: usize) -> Self {
        self.max_flow_depth = depth.max(1);
        self
    }

    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_hierarchy(mut self, pattern: PatternType, order: Vec<Layer>) -> Self {
        self.hierarchies.insert(pattern, order);
        self
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }

    /// Directory holding the generations for `root`.
    pub fn resolve_map_dir(&self, root: &Path) -> PathBuf {
        if let Some(dir) = &self.map_dir {
            return dir.clone();
        }
        let base = match std::env::var(MAP_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(DEFAULT_MAP_DIR),
        };
        let abs = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let hash = xxh3_64(abs.to_string_lossy().as_bytes());
        base.join(format!("{:016x}", hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_project_file_overrides_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            r#"{ "maxFlowDepth": 4, "ignorePatterns": ["legacy/**"], "hierarchies": { "MVC": ["controllers", "models"] } }"#,
        )
        .unwrap();

        let config = MapConfig::load(dir.path()).unwrap();
        assert_eq!(config.max_flow_depth, 4);
        assert_eq!(config.ignore_patterns, vec!["legacy/**".to_string()]);
        assert_eq!(config.fuzzy_distance, 2);
        assert_eq!(
            config.hierarchies.get(&PatternType::Mvc),
            Some(&vec![Layer::Controllers, Layer::Models])
        );
    }

    #[test]
    fn test_explicit_map_dir_wins() {
        let config = MapConfig::default().with_map_dir("/tmp/maps");
        assert_eq!(
            config.resolve_map_dir(Path::new("/any/project")),
            PathBuf::from("/tmp/maps")
        );
    }

    #[test]
    fn test_derived_map_dir_is_stable_per_root() {
        let config = MapConfig::default();
        let a = config.resolve_map_dir(Path::new("/nonexistent/project-a"));
        let b = config.resolve_map_dir(Path::new("/nonexistent/project-a"));
        let c = config.resolve_map_dir(Path::new("/nonexistent/project-b"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
