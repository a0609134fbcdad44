//! Compressed, generation-based artifact storage.
//!
//! Layout under the map directory:
//!
//! ```text
//! CURRENT                         id of the published generation
//! generations/<id>/manifest.json  sizes and file fingerprints
//! generations/<id>/<name>.json.zst
//! ```
//!
//! A generation is written completely before `CURRENT` is swapped to it
//! (write-temp-then-rename), so readers see either the old or the new set.

pub mod artifact;
pub mod codec;
pub mod staleness;

pub use artifact::{Artifact, ArtifactDocument, ArtifactName, ARTIFACT_VERSION};
pub use codec::EncodedArtifact;

use crate::error::{MapError, Result};
use mapscope_api::{ArtifactStats, CompressionStats, FileRecord, RefreshMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const CURRENT_FILE: &str = "CURRENT";
pub const GENERATIONS_DIR: &str = "generations";
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFingerprint {
    pub hash: String,
    pub modified: u64,
    pub size: u64,
}

impl From<&FileRecord> for FileFingerprint {
    fn from(record: &FileRecord) -> Self {
        Self {
            hash: record.content_hash.clone(),
            modified: record.modified,
            size: record.size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactEntry {
    pub name: ArtifactName,
    pub original_size: u64,
    pub stored_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub version: u32,
    pub generation: String,
    pub generated_at: u64,
    pub root: String,
    pub artifacts: Vec<ArtifactEntry>,
    pub files: BTreeMap<String, FileFingerprint>,
}

/// Space saved in percent, one decimal.
pub fn saved_ratio(original: u64, stored: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    let ratio = (1.0 - stored as f64 / original as f64) * 100.0;
    (ratio * 10.0).round() / 10.0
}

impl Manifest {
    pub fn stats(&self) -> CompressionStats {
        let artifacts: Vec<ArtifactStats> = self
            .artifacts
            .iter()
            .map(|a| ArtifactStats {
                name: a.name.to_string(),
                original_size: a.original_size,
                stored_size: a.stored_size,
                ratio: saved_ratio(a.original_size, a.stored_size),
            })
            .collect();
        let total_original = self.artifacts.iter().map(|a| a.original_size).sum();
        let total_stored = self.artifacts.iter().map(|a| a.stored_size).sum();
        CompressionStats {
            generation: self.generation.clone(),
            artifacts,
            total_original,
            total_stored,
            ratio: saved_ratio(total_original, total_stored),
        }
    }
}

/// Encoded artifacts of one generation, collected before publication.
#[derive(Debug, Default)]
pub struct GenerationSet {
    generated_at: u64,
    artifacts: BTreeMap<ArtifactName, EncodedArtifact>,
}

impl GenerationSet {
    pub fn new(generated_at: u64) -> Self {
        Self {
            generated_at,
            artifacts: BTreeMap::new(),
        }
    }

    pub fn generated_at(&self) -> u64 {
        self.generated_at
    }

    /// Wraps and encodes `payload` under its artifact name.
    pub fn add<T: Artifact>(&mut self, payload: T) -> Result<()> {
        let document = ArtifactDocument::new(T::NAME, self.generated_at, payload);
        let encoded = codec::encode(&document)?;
        self.artifacts.insert(T::NAME, encoded);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct MapStore {
    dir: PathBuf,
}

impl MapStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn generations_dir(&self) -> PathBuf {
        self.dir.join(GENERATIONS_DIR)
    }

    fn generation_dir(&self, id: &str) -> PathBuf {
        self.generations_dir().join(id)
    }

    /// Id of the published generation, `None` before the first publication.
    pub fn current_id(&self) -> Result<Option<String>> {
        match fs::read_to_string(self.dir.join(CURRENT_FILE)) {
            Ok(id) => {
                let id = id.trim().to_string();
                Ok((!id.is_empty()).then_some(id))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn load_manifest(&self) -> Result<Option<Manifest>> {
        let Some(id) = self.current_id()? else {
            return Ok(None);
        };
        let path = self.generation_dir(&id).join(MANIFEST_FILE);
        let text = fs::read_to_string(&path).map_err(|e| MapError::ArtifactCorrupt {
            name: MANIFEST_FILE.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })?;
        let manifest = serde_json::from_str(&text).map_err(|e| MapError::ArtifactCorrupt {
            name: MANIFEST_FILE.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(manifest))
    }

    /// Loads one artifact of `generation`; failures only concern that artifact.
    pub fn read<T: Artifact>(&self, generation: &str) -> Result<ArtifactDocument<T>> {
        let path = self.generation_dir(generation).join(T::NAME.file_name());
        let bytes = fs::read(&path).map_err(|e| MapError::ArtifactCorrupt {
            name: T::NAME.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })?;
        codec::decode(&bytes)
    }

    /// Writes `set` as a new generation and points `CURRENT` at it.
    ///
    /// A full cycle prunes every other generation; an incremental one keeps
    /// the previously published generation next to the new one.
    pub fn publish(
        &self,
        set: GenerationSet,
        root: &Path,
        files: BTreeMap<String, FileFingerprint>,
        mode: RefreshMode,
    ) -> Result<Manifest> {
        let previous = self.current_id().ok().flatten();
        let id = self.next_generation_id(set.generated_at)?;
        let dir = self.generation_dir(&id);
        fs::create_dir_all(&dir)?;

        let mut artifacts = Vec::with_capacity(set.artifacts.len());
        for (name, encoded) in &set.artifacts {
            fs::write(dir.join(name.file_name()), &encoded.bytes)?;
            artifacts.push(ArtifactEntry {
                name: *name,
                original_size: encoded.original_size,
                stored_size: encoded.bytes.len() as u64,
            });
        }

        let manifest = Manifest {
            version: ARTIFACT_VERSION,
            generation: id.clone(),
            generated_at: set.generated_at,
            root: root.to_string_lossy().into_owned(),
            artifacts,
            files,
        };
        fs::write(dir.join(MANIFEST_FILE), serde_json::to_vec_pretty(&manifest)?)?;

        write_atomic(&self.dir.join(CURRENT_FILE), id.as_bytes())?;
        tracing::info!("Published generation {} to {}", id, self.dir.display());

        let previous = match mode {
            RefreshMode::Full => None,
            RefreshMode::Incremental => previous,
        };
        let keep: Vec<&str> = std::iter::once(id.as_str())
            .chain(previous.as_deref())
            .collect();
        self.prune(&keep);
        Ok(manifest)
    }

    fn next_generation_id(&self, generated_at: u64) -> Result<String> {
        fs::create_dir_all(self.generations_dir())?;
        for seq in 0..1000u32 {
            let id = format!("{}-{:03}", generated_at, seq);
            if !self.generation_dir(&id).exists() {
                return Ok(id);
            }
        }
        Err(MapError::Internal(format!(
            "no free generation id for timestamp {}",
            generated_at
        )))
    }

    /// Removes every generation not in `keep`. Failures are logged, not returned.
    pub fn prune(&self, keep: &[&str]) {
        let entries = match fs::read_dir(self.generations_dir()) {
            Ok(entries) => entries,
            Err(_) => return,
        };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if keep.contains(&name.as_str()) {
                continue;
            }
            match fs::remove_dir_all(entry.path()) {
                Ok(()) => tracing::debug!("Pruned generation {}", name),
                Err(e) => tracing::warn!("Failed to prune generation {}: {}", name, e),
            }
        }
    }

    /// Ids of every stored generation, oldest first.
    pub fn generations(&self) -> Vec<String> {
        let mut ids: Vec<String> = fs::read_dir(self.generations_dir())
            .map(|entries| {
                entries
                    .flatten()
                    .filter(|e| e.path().is_dir())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        ids.sort();
        ids
    }
}

/// Write to a sibling temp file, then rename over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, bytes)?;
    fs::rename(temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use artifact::{DependenciesReverseDoc, IssuesDoc};
    use tempfile::tempdir;

    fn reverse_doc() -> DependenciesReverseDoc {
        DependenciesReverseDoc {
            reverse: BTreeMap::from([("src/a.js".to_string(), vec!["src/b.js".to_string()])]),
        }
    }

    #[test]
    fn test_ratio_math() {
        let manifest = Manifest {
            version: ARTIFACT_VERSION,
            generation: "g".into(),
            generated_at: 0,
            root: "/p".into(),
            artifacts: vec![
                ArtifactEntry {
                    name: ArtifactName::Summary,
                    original_size: 1000,
                    stored_size: 400,
                },
                ArtifactEntry {
                    name: ArtifactName::Tree,
                    original_size: 500,
                    stored_size: 250,
                },
            ],
            files: BTreeMap::new(),
        };
        let stats = manifest.stats();
        assert_eq!(stats.artifacts[0].ratio, 60.0);
        assert_eq!(stats.artifacts[1].ratio, 50.0);
        assert_eq!(stats.total_original, 1500);
        assert_eq!(stats.total_stored, 650);
        assert_eq!(stats.ratio, 56.7);
        assert_eq!(saved_ratio(0, 0), 0.0);
    }

    #[test]
    fn test_publish_and_read_back() {
        let dir = tempdir().unwrap();
        let store = MapStore::new(dir.path().join("maps"));
        assert_eq!(store.current_id().unwrap(), None);
        assert!(store.load_manifest().unwrap().is_none());

        let mut set = GenerationSet::new(1_700_000_000);
        set.add(reverse_doc()).unwrap();
        let manifest = store.publish(set, dir.path(), BTreeMap::new(), RefreshMode::Full).unwrap();

        assert_eq!(store.current_id().unwrap().as_deref(), Some(manifest.generation.as_str()));
        let loaded = store.load_manifest().unwrap().unwrap();
        assert_eq!(loaded, manifest);

        let doc: ArtifactDocument<DependenciesReverseDoc> = store.read(&manifest.generation).unwrap();
        assert_eq!(doc.payload, reverse_doc());
        assert_eq!(doc.generated_at, 1_700_000_000);

        // not part of this generation
        assert!(matches!(
            store.read::<IssuesDoc>(&manifest.generation),
            Err(MapError::ArtifactCorrupt { .. })
        ));
    }

    #[test]
    fn test_incremental_keeps_current_and_previous_only() {
        let dir = tempdir().unwrap();
        let store = MapStore::new(dir.path());
        let mut ids = Vec::new();
        for _ in 0..3 {
            let mut set = GenerationSet::new(1_700_000_000);
            set.add(reverse_doc()).unwrap();
            let manifest = store
                .publish(set, dir.path(), BTreeMap::new(), RefreshMode::Incremental)
                .unwrap();
            ids.push(manifest.generation);
        }
        assert_eq!(store.generations(), vec![ids[1].clone(), ids[2].clone()]);
        assert_eq!(store.current_id().unwrap(), Some(ids[2].clone()));
    }

    #[test]
    fn test_full_publish_discards_prior_generations() {
        let dir = tempdir().unwrap();
        let store = MapStore::new(dir.path());
        for mode in [RefreshMode::Full, RefreshMode::Incremental] {
            let mut set = GenerationSet::new(1_700_000_000);
            set.add(reverse_doc()).unwrap();
            store.publish(set, dir.path(), BTreeMap::new(), mode).unwrap();
        }
        assert_eq!(store.generations().len(), 2);

        let mut set = GenerationSet::new(1_700_000_000);
        set.add(reverse_doc()).unwrap();
        let manifest = store
            .publish(set, dir.path(), BTreeMap::new(), RefreshMode::Full)
            .unwrap();
        assert_eq!(store.generations(), vec![manifest.generation]);
    }

    #[test]
    fn test_corrupt_artifact_is_isolated() {
        let dir = tempdir().unwrap();
        let store = MapStore::new(dir.path());
        let mut set = GenerationSet::new(10);
        set.add(reverse_doc()).unwrap();
        set.add(IssuesDoc {
            violations: vec![],
            cycles: vec![],
            scan_issues: vec![],
            unresolved_imports: 0,
            ambiguous_pattern: false,
        })
        .unwrap();
        let manifest = store.publish(set, dir.path(), BTreeMap::new(), RefreshMode::Full).unwrap();

        let path = dir
            .path()
            .join(GENERATIONS_DIR)
            .join(&manifest.generation)
            .join(ArtifactName::Issues.file_name());
        fs::write(path, b"garbage").unwrap();

        assert!(store.read::<IssuesDoc>(&manifest.generation).is_err());
        assert!(store.read::<DependenciesReverseDoc>(&manifest.generation).is_ok());
    }
}
