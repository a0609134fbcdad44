//! Per-file layer assignment.
//!
//! Rules run in priority order: directory segment (innermost first),
//! filename convention, framework marker. Files no rule matches take the
//! most common rule-assigned layer of their directory, or `other`.

use super::markers::marker_layer;
use mapscope_api::{FileRecord, FileRole, Layer, LayerAssignment, LayerSource};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

fn word_layer(word: &str) -> Option<Layer> {
    let layer = match word {
        "route" | "routes" | "router" | "routers" | "urls" => Layer::Routes,
        "controller" | "controllers" | "handler" | "handlers" | "ctrl" | "resolvers" => {
            Layer::Controllers
        }
        "service" | "services" => Layer::Services,
        "model" | "models" => Layer::Models,
        "repository" | "repositories" | "repo" | "repos" | "dao" | "daos" => Layer::Repositories,
        "middleware" | "middlewares" => Layer::Middleware,
        "schema" | "schemas" | "validator" | "validators" => Layer::Schemas,
        "entity" | "entities" => Layer::Entities,
        "dto" | "dtos" => Layer::Dto,
        "mapper" | "mappers" => Layer::Mappers,
        "api" => Layer::Api,
        "util" | "utils" | "helper" | "helpers" => Layer::Utils,
        "config" | "configs" | "configuration" | "settings" => Layer::Config,
        "view" | "views" | "template" | "templates" => Layer::Views,
        _ => return None,
    };
    Some(layer)
}

fn directory_layer(segment: &str) -> Option<Layer> {
    let lower = segment.to_ascii_lowercase();
    word_layer(&lower).or(match lower.as_str() {
        "apis" | "endpoints" => Some(Layer::Api),
        "usecases" | "use-cases" | "use_cases" => Some(Layer::Services),
        "domain" => Some(Layer::Entities),
        "lib" | "common" | "shared" => Some(Layer::Utils),
        "pages" | "layouts" | "components" => Some(Layer::Views),
        _ => None,
    })
}

/// `UserDTO` → `["User", "DTO"]`, `userRoutes` → `["user", "Routes"]`.
fn camel_words(token: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let mut start = 0;
    let chars: Vec<(usize, char)> = token.char_indices().collect();
    for i in 1..chars.len() {
        let (idx, c) = chars[i];
        let prev = chars[i - 1].1;
        let next_lower = chars.get(i + 1).is_some_and(|(_, n)| n.is_lowercase());
        if c.is_uppercase() && (prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower)) {
            words.push(&token[start..idx]);
            start = idx;
        }
    }
    words.push(&token[start..]);
    words
}

fn filename_layer(file_name: &str) -> Option<Layer> {
    let stem = file_name.rsplit_once('.').map(|(s, _)| s).unwrap_or(file_name);
    for token in stem.rsplit(['.', '-', '_']) {
        if let Some(layer) = word_layer(&token.to_ascii_lowercase()) {
            return Some(layer);
        }
        let words = camel_words(token);
        if words.len() > 1 {
            if let Some(last) = words.last() {
                if let Some(layer) = word_layer(&last.to_ascii_lowercase()) {
                    return Some(layer);
                }
            }
        }
    }
    None
}

/// Rule-based layer of one file; a pure function of its path and markers.
pub fn classify(path: &str, markers: &[String]) -> Option<(Layer, LayerSource)> {
    let (dir, file_name) = path.rsplit_once('/').unwrap_or(("", path));
    if let Some(layer) = dir.rsplit('/').filter(|s| !s.is_empty()).find_map(directory_layer) {
        return Some((layer, LayerSource::Directory));
    }
    if let Some(layer) = filename_layer(file_name) {
        return Some((layer, LayerSource::Filename));
    }
    marker_layer(markers).map(|layer| (layer, LayerSource::Framework))
}

/// Only code files that are not tests take part in layering.
pub fn is_layerable(record: &FileRecord) -> bool {
    record.language.is_code() && record.role != FileRole::Test
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerMap {
    assignments: BTreeMap<String, LayerAssignment>,
}

impl LayerMap {
    /// Full assignment over every layerable record.
    pub fn assign(records: &[FileRecord]) -> Self {
        let rules: BTreeMap<String, Option<(Layer, LayerSource)>> = records
            .iter()
            .filter(|r| is_layerable(r))
            .map(|r| (r.path.clone(), classify(&r.path, &r.markers)))
            .collect();
        let mut map = LayerMap::default();
        map.apply(&rules);
        map
    }

    /// Re-runs rules for `changed` files and the fallback for every directory
    /// touched by a change or removal. Produces the same map as [`LayerMap::assign`].
    pub fn patch(
        &self,
        records: &[FileRecord],
        changed: &BTreeSet<String>,
        removed: &BTreeSet<String>,
    ) -> Self {
        let mut rules: BTreeMap<String, Option<(Layer, LayerSource)>> = BTreeMap::new();
        for record in records.iter().filter(|r| is_layerable(r)) {
            let rule = if changed.contains(&record.path) {
                classify(&record.path, &record.markers)
            } else {
                match self.assignments.get(&record.path) {
                    Some(a) if a.source.is_rule() => Some((a.layer, a.source)),
                    Some(_) => None,
                    None => classify(&record.path, &record.markers),
                }
            };
            rules.insert(record.path.clone(), rule);
        }

        let touched: BTreeSet<String> = changed
            .iter()
            .chain(removed.iter())
            .map(|p| directory_of(p).to_string())
            .collect();

        let mut map = LayerMap::default();
        for (path, assignment) in &self.assignments {
            if rules.contains_key(path) && !touched.contains(directory_of(path)) {
                map.assignments.insert(path.clone(), assignment.clone());
            }
        }
        // Unchanged files outside touched directories keep their assignment;
        // everything else is recomputed.
        let pending: BTreeMap<String, Option<(Layer, LayerSource)>> = rules
            .into_iter()
            .filter(|(path, _)| !map.assignments.contains_key(path))
            .collect();
        let mut directories: BTreeSet<String> =
            pending.keys().map(|p| directory_of(p).to_string()).collect();
        directories.extend(touched);
        map.apply_with_neighbours(&pending, &directories);
        map
    }

    fn apply(&mut self, rules: &BTreeMap<String, Option<(Layer, LayerSource)>>) {
        let fallbacks = fallback_layers(rules.iter().map(|(p, r)| (p.as_str(), *r)));
        for (path, rule) in rules {
            let (layer, source) = rule.unwrap_or_else(|| resolve_fallback(&fallbacks, path));
            self.assignments.insert(
                path.clone(),
                LayerAssignment {
                    path: path.clone(),
                    layer,
                    source,
                },
            );
        }
    }

    /// Like `apply`, but rule results already stored in `self` also vote.
    fn apply_with_neighbours(
        &mut self,
        pending: &BTreeMap<String, Option<(Layer, LayerSource)>>,
        directories: &BTreeSet<String>,
    ) {
        let kept = self
            .assignments
            .values()
            .filter(|a| directories.contains(directory_of(&a.path)) && a.source.is_rule())
            .map(|a| (a.path.as_str(), Some((a.layer, a.source))));
        let votes: Vec<(&str, Option<(Layer, LayerSource)>)> = kept
            .chain(pending.iter().map(|(p, r)| (p.as_str(), *r)))
            .collect();
        let fallbacks = fallback_layers(votes.into_iter());
        for (path, rule) in pending {
            let (layer, source) = rule.unwrap_or_else(|| resolve_fallback(&fallbacks, path));
            self.assignments.insert(
                path.clone(),
                LayerAssignment {
                    path: path.clone(),
                    layer,
                    source,
                },
            );
        }
    }

    pub fn get(&self, path: &str) -> Option<&LayerAssignment> {
        self.assignments.get(path)
    }

    pub fn layer_of(&self, path: &str) -> Option<Layer> {
        self.assignments.get(path).map(|a| a.layer)
    }

    pub fn assignments(&self) -> impl Iterator<Item = &LayerAssignment> {
        self.assignments.values()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn counts(&self) -> BTreeMap<Layer, usize> {
        let mut counts = BTreeMap::new();
        for a in self.assignments.values() {
            *counts.entry(a.layer).or_insert(0) += 1;
        }
        counts
    }

    /// Files per layer, each list sorted by path.
    pub fn files_by_layer(&self) -> BTreeMap<Layer, Vec<String>> {
        let mut by_layer: BTreeMap<Layer, Vec<String>> = BTreeMap::new();
        for a in self.assignments.values() {
            by_layer.entry(a.layer).or_default().push(a.path.clone());
        }
        by_layer
    }

    pub fn files_in(&self, layer: Layer) -> Vec<String> {
        self.assignments
            .values()
            .filter(|a| a.layer == layer)
            .map(|a| a.path.clone())
            .collect()
    }

    /// Writes the assigned layer into each record.
    pub fn annotate(&self, records: &mut [FileRecord]) {
        for record in records {
            record.layer = self.layer_of(&record.path);
        }
    }
}

fn directory_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(d, _)| d).unwrap_or("")
}

/// Most common rule-assigned layer per directory; ties go to the lower layer.
fn fallback_layers<'a>(
    rules: impl Iterator<Item = (&'a str, Option<(Layer, LayerSource)>)>,
) -> BTreeMap<String, Layer> {
    let mut tallies: BTreeMap<String, BTreeMap<Layer, usize>> = BTreeMap::new();
    for (path, rule) in rules {
        if let Some((layer, _)) = rule {
            *tallies
                .entry(directory_of(path).to_string())
                .or_default()
                .entry(layer)
                .or_insert(0) += 1;
        }
    }
    tallies
        .into_iter()
        .filter_map(|(dir, counts)| {
            counts
                .into_iter()
                .max_by(|(la, ca), (lb, cb)| ca.cmp(cb).then_with(|| lb.cmp(la)))
                .map(|(layer, _)| (dir, layer))
        })
        .collect()
}

fn resolve_fallback(fallbacks: &BTreeMap<String, Layer>, path: &str) -> (Layer, LayerSource) {
    match fallbacks.get(directory_of(path)) {
        Some(layer) => (*layer, LayerSource::Fallback),
        None => (Layer::Other, LayerSource::Unmatched),
    }
}
