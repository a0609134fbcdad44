use crate::config::MapConfig;
use mapscope_api::{RankedHit, SearchRequest, SearchResponse};
use std::collections::BTreeMap;

pub const NO_RESULTS_HINT: &str = "try a fuzzy search or a shorter pattern";
pub const NO_RESULTS_FUZZY_HINT: &str =
    "try a shorter pattern, a larger edit distance, or search type 'all'";

/// Shapes ranked hits into a response: full list, directory summary or no results.
#[derive(Debug, Clone, Copy)]
pub struct Formatter {
    threshold: usize,
    top_n: usize,
}

impl Formatter {
    pub fn new(threshold: usize, top_n: usize) -> Self {
        Self { threshold, top_n }
    }

    pub fn from_config(config: &MapConfig) -> Self {
        Self::new(config.summarize_threshold, config.summary_top_n)
    }

    pub fn format(&self, request: &SearchRequest, ranked: Vec<RankedHit>) -> SearchResponse {
        if ranked.is_empty() {
            let suggestion = if request.fuzzy {
                NO_RESULTS_FUZZY_HINT
            } else {
                NO_RESULTS_HINT
            };
            return SearchResponse::NoResults {
                query: request.pattern.clone(),
                suggestion: suggestion.to_string(),
            };
        }

        let total = ranked.len();
        let shown = request.limit.map_or(total, |limit| limit.min(total));
        let mut items = ranked;

        if shown > self.threshold {
            // breakdown covers every match so it adds up to `total`
            let mut by_directory: BTreeMap<String, usize> = BTreeMap::new();
            let mut by_category: BTreeMap<String, usize> = BTreeMap::new();
            for item in &items {
                *by_directory.entry(item.hit.directory().to_string()).or_insert(0) += 1;
                *by_category
                    .entry(item.hit.category.as_str().to_string())
                    .or_insert(0) += 1;
            }
            items.truncate(shown.min(self.top_n));
            return SearchResponse::Summary {
                total,
                by_directory,
                by_category,
                top: items,
            };
        }

        items.truncate(shown);

        let groups = request.group_by_directory.then(|| {
            let mut groups: BTreeMap<String, Vec<RankedHit>> = BTreeMap::new();
            for item in &items {
                groups
                    .entry(item.hit.directory().to_string())
                    .or_default()
                    .push(item.clone());
            }
            groups
        });
        SearchResponse::Results {
            total,
            items,
            groups,
        }
    }
}
