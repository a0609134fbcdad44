use super::FileFingerprint;
use mapscope_api::{Staleness, StalenessLevel};
use std::collections::BTreeMap;

const SECONDS_PER_DAY: f64 = 86_400.0;
const CHANGE_WEIGHT: f64 = 7.0;
const CHANGE_CAP: f64 = 70.0;
const AGE_WEIGHT: f64 = 5.0;
const AGE_CAP: f64 = 30.0;
const AGING_AT: f64 = 10.0;
const STALE_AT: f64 = 40.0;

pub fn score(changed_files: usize, elapsed_secs: u64) -> f64 {
    let changes = (CHANGE_WEIGHT * changed_files as f64).min(CHANGE_CAP);
    let days = elapsed_secs as f64 / SECONDS_PER_DAY;
    let age = (AGE_WEIGHT * days).min(AGE_CAP);
    changes + age
}

pub fn level(score: f64) -> StalenessLevel {
    if score < AGING_AT {
        StalenessLevel::Fresh
    } else if score < STALE_AT {
        StalenessLevel::Aging
    } else {
        StalenessLevel::Stale
    }
}

/// Compares the fingerprints stored with a generation to the current file set.
///
/// A file counts as modified when it is newer than the generation or its
/// recorded mtime/size no longer match.
pub fn assess(
    generated_at: u64,
    now: u64,
    stored: &BTreeMap<String, FileFingerprint>,
    current: &BTreeMap<String, FileFingerprint>,
) -> Staleness {
    let mut added = Vec::new();
    let mut modified = Vec::new();
    for (path, fp) in current {
        match stored.get(path) {
            None => added.push(path.clone()),
            Some(old) => {
                if fp.modified > generated_at || fp.modified != old.modified || fp.size != old.size {
                    modified.push(path.clone());
                }
            }
        }
    }
    let removed: Vec<String> = stored
        .keys()
        .filter(|path| !current.contains_key(*path))
        .cloned()
        .collect();

    let changed_files = added.len() + modified.len() + removed.len();
    let elapsed_secs = now.saturating_sub(generated_at);
    let score = score(changed_files, elapsed_secs);
    Staleness {
        generated_at,
        elapsed_secs,
        changed_files,
        added,
        modified,
        removed,
        score: (score * 10.0).round() / 10.0,
        level: level(score),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(modified: u64, size: u64) -> FileFingerprint {
        FileFingerprint {
            hash: String::new(),
            modified,
            size,
        }
    }

    #[test]
    fn test_score_caps() {
        assert_eq!(score(0, 0), 0.0);
        assert_eq!(score(2, 0), 14.0);
        assert_eq!(score(100, 0), 70.0);
        assert_eq!(score(0, 86_400 * 2), 10.0);
        assert_eq!(score(100, 86_400 * 100), 100.0);
    }

    #[test]
    fn test_levels() {
        assert_eq!(level(9.9), StalenessLevel::Fresh);
        assert_eq!(level(10.0), StalenessLevel::Aging);
        assert_eq!(level(39.9), StalenessLevel::Aging);
        assert_eq!(level(40.0), StalenessLevel::Stale);
    }

    #[test]
    fn test_assess_counts_every_kind_of_change() {
        let stored = BTreeMap::from([
            ("a.js".to_string(), fp(100, 10)),
            ("b.js".to_string(), fp(100, 10)),
            ("c.js".to_string(), fp(100, 10)),
        ]);
        let current = BTreeMap::from([
            ("a.js".to_string(), fp(100, 10)),
            ("b.js".to_string(), fp(300, 12)),
            ("d.js".to_string(), fp(300, 5)),
        ]);
        let s = assess(200, 200, &stored, &current);
        assert_eq!(s.added, vec!["d.js"]);
        assert_eq!(s.modified, vec!["b.js"]);
        assert_eq!(s.removed, vec!["c.js"]);
        assert_eq!(s.changed_files, 3);
        assert_eq!(s.score, 21.0);
        assert_eq!(s.level, StalenessLevel::Aging);
        assert!(!s.should_refresh());
    }
}
