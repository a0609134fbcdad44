use super::fuzzy::{tokenize, within_distance};
use crate::error::{MapError, Result};
use globset::{GlobBuilder, GlobMatcher};
use mapscope_api::{
    FileRecord, HitCategory, MatchQuality, SearchHit, SearchKind, SearchRequest, Signature,
};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
struct Entry {
    category: HitCategory,
    file: usize,
    name: String,
    signature: Option<usize>,
}

/// In-memory lookup structures over one generation's file records.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    files: Vec<FileRecord>,
    dependents: Vec<usize>,
    entries: Vec<Entry>,
    /// Lowercased name → entries, per category
    names: BTreeMap<HitCategory, BTreeMap<String, Vec<usize>>>,
    /// Flattened token set used by fuzzy search
    tokens: BTreeMap<String, BTreeSet<usize>>,
}

impl SearchIndex {
    /// `dependents` maps a path to the number of files importing it.
    pub fn build(records: &[FileRecord], dependents: impl Fn(&str) -> usize) -> Self {
        let mut index = Self {
            files: records.to_vec(),
            dependents: records.iter().map(|r| dependents(&r.path)).collect(),
            ..Default::default()
        };
        for (file, record) in records.iter().enumerate() {
            index.insert(HitCategory::File, file, record.file_name().to_string(), None);
            for export in &record.exports {
                index.insert(HitCategory::Export, file, export.clone(), None);
            }
            for import in &record.imports {
                index.insert(HitCategory::Import, file, import.clone(), None);
            }
            for (i, signature) in record.signatures.iter().enumerate() {
                index.insert(HitCategory::Signature, file, signature.name.clone(), Some(i));
            }
        }
        tracing::debug!(
            "Search index: {} entries, {} tokens",
            index.entries.len(),
            index.tokens.len()
        );
        index
    }

    fn insert(&mut self, category: HitCategory, file: usize, name: String, signature: Option<usize>) {
        let id = self.entries.len();
        for token in tokenize(&name) {
            self.tokens.entry(token).or_default().insert(id);
        }
        self.names
            .entry(category)
            .or_default()
            .entry(name.to_lowercase())
            .or_default()
            .push(id);
        self.entries.push(Entry {
            category,
            file,
            name,
            signature,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Unranked hits for `request`; `default_distance` applies when the
    /// request is fuzzy without an explicit distance.
    pub fn search(&self, request: &SearchRequest, default_distance: usize) -> Result<Vec<SearchHit>> {
        let categories = categories(request);
        let pattern = request.pattern.trim();
        let needle = pattern.to_lowercase();
        let mut matched: BTreeMap<usize, MatchQuality> = BTreeMap::new();

        for category in &categories {
            let Some(names) = self.names.get(category) else {
                continue;
            };
            if *category == HitCategory::File && is_glob(pattern) {
                let glob = compile_glob(pattern)?;
                for ids in names.values() {
                    for &id in ids {
                        if let Some(quality) = self.glob_quality(&glob, id) {
                            matched.insert(id, quality);
                        }
                    }
                }
                continue;
            }
            for (name, ids) in names {
                let quality = if *category == HitCategory::File {
                    self.file_quality(name, &needle, ids)
                } else {
                    quality(name, &needle)
                };
                if let Some(quality) = quality {
                    for &id in ids {
                        matched.insert(id, quality);
                    }
                }
            }
        }

        if request.fuzzy && !needle.is_empty() && !is_glob(pattern) {
            let max = request.max_distance.unwrap_or(default_distance);
            for (token, ids) in &self.tokens {
                if !within_distance(&needle, token, max) {
                    continue;
                }
                for &id in ids {
                    if categories.contains(&self.entries[id].category) {
                        matched.entry(id).or_insert(MatchQuality::Fuzzy);
                    }
                }
            }
        }

        let hits = matched
            .into_iter()
            .filter_map(|(id, quality)| self.hit(id, quality))
            .filter(|hit| match (&request.criteria, &hit.signature) {
                (Some(criteria), Some(signature)) => criteria.matches(signature),
                (Some(_), None) => false,
                (None, _) => true,
            })
            .collect();
        Ok(hits)
    }

    fn file_quality(&self, name: &str, needle: &str, ids: &[usize]) -> Option<MatchQuality> {
        if let Some(q) = quality(name, needle) {
            return Some(q);
        }
        let stem = name.rsplit_once('.').map(|(s, _)| s).unwrap_or(name);
        if stem == needle {
            return Some(MatchQuality::Exact);
        }
        // fall back to the directory part of the path
        ids.iter()
            .any(|&id| self.files[self.entries[id].file].path.to_lowercase().contains(needle))
            .then_some(MatchQuality::Contains)
    }

    fn glob_quality(&self, glob: &GlobMatcher, id: usize) -> Option<MatchQuality> {
        let entry = &self.entries[id];
        let record = &self.files[entry.file];
        if glob.is_match(&entry.name) {
            Some(MatchQuality::Exact)
        } else if glob.is_match(&record.path) {
            Some(MatchQuality::Contains)
        } else {
            None
        }
    }

    fn hit(&self, id: usize, quality: MatchQuality) -> Option<SearchHit> {
        let entry = self.entries.get(id)?;
        let record = self.files.get(entry.file)?;
        let signature: Option<Signature> = match entry.category {
            HitCategory::Signature => entry.signature.and_then(|i| record.signatures.get(i)).cloned(),
            HitCategory::Export => record.signatures.iter().find(|s| s.name == entry.name).cloned(),
            _ => None,
        };
        let exported = match entry.category {
            HitCategory::Export => true,
            HitCategory::File => !record.exports.is_empty(),
            HitCategory::Import => false,
            HitCategory::Signature => signature.as_ref().is_some_and(|s| s.exported),
        };
        Some(SearchHit {
            category: entry.category,
            path: record.path.clone(),
            name: entry.name.clone(),
            quality,
            layer: record.layer,
            modified: record.modified,
            dependents: self.dependents[entry.file],
            exported,
            signature,
        })
    }
}

fn categories(request: &SearchRequest) -> Vec<HitCategory> {
    if request.criteria.is_some() {
        return vec![HitCategory::Signature];
    }
    match request.kind {
        SearchKind::File => vec![HitCategory::File],
        SearchKind::Export => vec![HitCategory::Export],
        SearchKind::Import => vec![HitCategory::Import],
        SearchKind::Signature => vec![HitCategory::Signature],
        SearchKind::All => vec![
            HitCategory::File,
            HitCategory::Export,
            HitCategory::Import,
            HitCategory::Signature,
        ],
    }
}

/// Case-insensitive match quality; an empty needle matches everything.
pub fn quality(name: &str, needle: &str) -> Option<MatchQuality> {
    if needle.is_empty() {
        Some(MatchQuality::Contains)
    } else if name == needle {
        Some(MatchQuality::Exact)
    } else if name.starts_with(needle) {
        Some(MatchQuality::Prefix)
    } else if name.contains(needle) {
        Some(MatchQuality::Contains)
    } else {
        None
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

fn compile_glob(pattern: &str) -> Result<GlobMatcher> {
    GlobBuilder::new(pattern)
        .case_insensitive(true)
        .literal_separator(false)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| MapError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.kind().to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapscope_api::{
        FileRole, Language, SignatureCriteria, SignatureKind, Visibility,
    };

    fn record(path: &str, exports: &[&str], signatures: Vec<Signature>) -> FileRecord {
        FileRecord {
            path: path.to_string(),
            size: 10,
            language: Language::TYPESCRIPT,
            role: FileRole::Source,
            layer: None,
            content_hash: String::new(),
            modified: 0,
            exports: exports.iter().map(|s| s.to_string()).collect(),
            imports: vec!["express".to_string()],
            signatures,
            frameworks: vec![],
            markers: vec![],
            tables: vec![],
        }
    }

    fn sig(name: &str, kind: SignatureKind, is_async: bool) -> Signature {
        let mut s = Signature::new(name, kind, 1);
        s.is_async = is_async;
        s.exported = true;
        s
    }

    fn index() -> SearchIndex {
        let records = vec![
            record(
                "src/controllers/user.controller.ts",
                &["UserController"],
                vec![
                    sig("UserController", SignatureKind::Class, false),
                    sig("getUser", SignatureKind::Method, true),
                ],
            ),
            record(
                "src/services/user.service.ts",
                &["getUsers"],
                vec![sig("getUsers", SignatureKind::Function, true)],
            ),
            record("src/utils/format.ts", &["formatDate"], vec![sig("formatDate", SignatureKind::Function, false)]),
        ];
        SearchIndex::build(&records, |p| usize::from(p.contains("service")))
    }

    #[test]
    fn test_match_qualities() {
        let idx = index();
        let hits = idx
            .search(&SearchRequest::new(SearchKind::Signature, "getuser"), 2)
            .unwrap();
        let quality_of = |name: &str| hits.iter().find(|h| h.name == name).map(|h| h.quality);
        assert_eq!(quality_of("getUser"), Some(MatchQuality::Exact));
        assert_eq!(quality_of("getUsers"), Some(MatchQuality::Prefix));
        assert_eq!(quality_of("formatDate"), None);
    }

    #[test]
    fn test_fuzzy_distance() {
        let idx = index();
        let hits = idx
            .search(&SearchRequest::new(SearchKind::Signature, "getUsr").fuzzy(2), 2)
            .unwrap();
        assert!(hits.iter().any(|h| h.name == "getUser" && h.quality == MatchQuality::Fuzzy));

        let hits = idx
            .search(&SearchRequest::new(SearchKind::Signature, "gtUs").fuzzy(2), 2)
            .unwrap();
        assert!(hits.iter().all(|h| h.name != "getUser"));
    }

    #[test]
    fn test_file_glob() {
        let idx = index();
        let hits = idx
            .search(&SearchRequest::new(SearchKind::File, "*.controller.ts"), 2)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "src/controllers/user.controller.ts");
        assert!(hits[0].exported);

        let err = idx.search(&SearchRequest::new(SearchKind::File, "src/[x"), 2);
        assert!(matches!(err, Err(MapError::InvalidPattern { .. })));
    }

    #[test]
    fn test_criteria_only() {
        let idx = index();
        let request = SearchRequest::new(SearchKind::Signature, "").with_criteria(SignatureCriteria {
            is_async: Some(true),
            visibility: Some(Visibility::Public),
            ..Default::default()
        });
        let mut names: Vec<String> = idx.search(&request, 2).unwrap().into_iter().map(|h| h.name).collect();
        names.sort();
        assert_eq!(names, vec!["getUser", "getUsers"]);
    }

    #[test]
    fn test_all_categories_and_dependents() {
        let idx = index();
        let hits = idx.search(&SearchRequest::new(SearchKind::All, "getUsers"), 2).unwrap();
        let categories: BTreeSet<HitCategory> = hits.iter().map(|h| h.category).collect();
        assert!(categories.contains(&HitCategory::Export));
        assert!(categories.contains(&HitCategory::Signature));
        assert!(hits.iter().all(|h| h.dependents == 1));
        let export = hits.iter().find(|h| h.category == HitCategory::Export).unwrap();
        assert!(export.signature.is_some());
    }
}
