//! Result scoring and presentation.

pub mod format;

pub use format::{Formatter, NO_RESULTS_FUZZY_HINT, NO_RESULTS_HINT};

use mapscope_api::{RankedHit, SearchHit, SignatureKind, Visibility};

const BASE_SCORE: u32 = 50;
const MAX_SCORE: u32 = 100;
const DAY: u64 = 86_400;
/// (max age in days, bonus)
const RECENCY: &[(u64, u32)] = &[(1, 20), (7, 15), (30, 10), (90, 5)];
const PER_DEPENDENT: u32 = 2;
const CENTRALITY_CAP: u32 = 20;

/// Scores hits relative to a fixed point in time.
#[derive(Debug, Clone, Copy)]
pub struct Ranker {
    now: u64,
}

impl Ranker {
    pub fn new(now: u64) -> Self {
        Self { now }
    }

    pub fn score(&self, hit: &SearchHit) -> u32 {
        let mut score = BASE_SCORE;

        let age = self.now.saturating_sub(hit.modified);
        if let Some((_, bonus)) = RECENCY.iter().find(|(days, _)| age <= days * DAY) {
            score += bonus;
        }

        let dependents = u32::try_from(hit.dependents).unwrap_or(u32::MAX);
        score += dependents.saturating_mul(PER_DEPENDENT).min(CENTRALITY_CAP);

        let signature = hit.signature.as_ref();
        if hit.exported {
            score += 10;
        } else if signature.is_some_and(|s| s.visibility == Visibility::Public) {
            score += 5;
        }

        if let Some(sig) = signature {
            if matches!(sig.kind, SignatureKind::Class | SignatureKind::Interface) {
                score += 5;
            }
            if sig.is_async {
                score += 3;
            }
            // location, parameters, return type
            if sig.line > 0 {
                score += 5;
            }
            if !sig.params.is_empty() {
                score += 5;
            }
            if sig.return_type.is_some() {
                score += 5;
            }
        }

        score += hit.quality.bonus();
        score.min(MAX_SCORE)
    }

    /// Highest score first, then path, then name.
    pub fn rank(&self, hits: Vec<SearchHit>) -> Vec<RankedHit> {
        let mut ranked: Vec<RankedHit> = hits
            .into_iter()
            .map(|hit| RankedHit {
                score: self.score(&hit),
                hit,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.hit.path.cmp(&b.hit.path))
                .then_with(|| a.hit.name.cmp(&b.hit.name))
        });
        ranked
    }
}
