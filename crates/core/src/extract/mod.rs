//! Heuristic export/import/signature extraction.
//!
//! Each supported language family has a [`SignatureExtractor`]; the
//! [`ExtractorRegistry`] picks one by language class. Extraction is
//! line/regex based and never aims for full parsing fidelity.

mod go;
mod javascript;
mod jvm;
mod python;
mod rust;

pub use go::GoExtractor;
pub use javascript::JavaScriptExtractor;
pub use jvm::JvmExtractor;
pub use python::PythonExtractor;
pub use rust::{RustExtractor, MOD_PREFIX};

use mapscope_api::{Language, Signature};
use thiserror::Error;

/// Files longer than this are not worth running regexes over.
pub const MAX_EXTRACT_LINES: usize = 50_000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub exports: Vec<String>,
    pub imports: Vec<String>,
    pub signatures: Vec<Signature>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.exports.is_empty() && self.imports.is_empty() && self.signatures.is_empty()
    }

    /// Dedups exports/imports (first occurrence wins) and orders signatures by line.
    fn normalize(mut self) -> Self {
        dedup_in_place(&mut self.exports);
        dedup_in_place(&mut self.imports);
        self.signatures.sort_by(|a, b| a.line.cmp(&b.line).then_with(|| a.name.cmp(&b.name)));
        self.signatures
            .dedup_by(|a, b| a.line == b.line && a.name == b.name && a.kind == b.kind);
        self
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("content looks binary")]
    Binary,
    #[error("{lines} lines exceeds the {limit} line limit")]
    TooLong { lines: usize, limit: usize },
    #[error("extraction failed: {0}")]
    Failed(String),
}

pub trait SignatureExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    fn supports(&self, language: &Language) -> bool;

    fn extract(&self, text: &str, language: &Language) -> Result<Extraction, ExtractError>;
}

/// Result of a best-effort extraction: never an error, at worst empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractOutcome {
    pub extraction: Extraction,
    pub issue: Option<String>,
}

pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn SignatureExtractor>>,
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(JavaScriptExtractor));
        registry.register(Box::new(PythonExtractor));
        registry.register(Box::new(JvmExtractor));
        registry.register(Box::new(GoExtractor));
        registry.register(Box::new(RustExtractor));
        registry
    }
}

impl ExtractorRegistry {
    pub fn empty() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Later registrations take precedence over earlier ones.
    pub fn register(&mut self, extractor: Box<dyn SignatureExtractor>) {
        self.extractors.insert(0, extractor);
    }

    pub fn extractor_for(&self, language: &Language) -> Option<&dyn SignatureExtractor> {
        self.extractors
            .iter()
            .find(|e| e.supports(language))
            .map(|e| e.as_ref())
    }

    pub fn extract_signatures(&self, text: &str, hint: &Language) -> ExtractOutcome {
        let Some(extractor) = self.extractor_for(hint) else {
            return ExtractOutcome::default();
        };

        match guard(text).and_then(|_| extractor.extract(text, hint)) {
            Ok(extraction) => ExtractOutcome {
                extraction: extraction.normalize(),
                issue: None,
            },
            Err(e) => {
                tracing::debug!("{} extractor gave up: {}", extractor.name(), e);
                ExtractOutcome {
                    extraction: Extraction::default(),
                    issue: Some(e.to_string()),
                }
            }
        }
    }
}

fn guard(text: &str) -> Result<(), ExtractError> {
    if text.contains('\0') {
        return Err(ExtractError::Binary);
    }
    let lines = text.lines().count();
    if lines > MAX_EXTRACT_LINES {
        return Err(ExtractError::TooLong {
            lines,
            limit: MAX_EXTRACT_LINES,
        });
    }
    Ok(())
}

fn dedup_in_place(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}

/// Maps byte offsets to 1-based line numbers.
pub(crate) struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub(crate) fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    pub(crate) fn line_of(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(i) => i + 1,
            Err(i) => i,
        }
    }
}

/// Splits a parameter list on top-level commas, ignoring nested brackets.
pub(crate) fn split_params(list: &str) -> Vec<String> {
    let mut params = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for ch in list.chars() {
        match ch {
            '(' | '[' | '{' | '<' => {
                depth += 1;
                current.push(ch);
            }
            ')' | ']' | '}' | '>' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth <= 0 => {
                push_param(&mut params, &current);
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    push_param(&mut params, &current);
    params
}

fn push_param(params: &mut Vec<String>, raw: &str) {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if !collapsed.is_empty() {
        params.push(collapsed);
    }
}

/// Trims a captured return type, dropping empties.
pub(crate) fn clean_type(raw: Option<&str>) -> Option<String> {
    let collapsed = raw?.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim().trim_end_matches(['{', ';', '=']).trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_params_respects_nesting() {
        let params = split_params("a: Map<string, number>, b = {x: 1, y: 2}, ...rest");
        assert_eq!(
            params,
            vec!["a: Map<string, number>", "b = {x: 1, y: 2}", "...rest"]
        );
        assert!(split_params("  ").is_empty());
    }

    #[test]
    fn test_line_index() {
        let idx = LineIndex::new("a\nbb\nccc");
        assert_eq!(idx.line_of(0), 1);
        assert_eq!(idx.line_of(2), 2);
        assert_eq!(idx.line_of(3), 2);
        assert_eq!(idx.line_of(5), 3);
    }

    #[test]
    fn test_registry_never_fails() {
        let registry = ExtractorRegistry::default();
        let outcome = registry.extract_signatures("function a() {}\0", &Language::JAVASCRIPT);
        assert!(outcome.extraction.is_empty());
        assert_eq!(outcome.issue.as_deref(), Some("content looks binary"));

        let none = registry.extract_signatures("# title", &Language::MARKDOWN);
        assert!(none.extraction.is_empty());
        assert!(none.issue.is_none());
    }

    #[test]
    fn test_custom_extractor_takes_precedence() {
        struct Fixed;
        impl SignatureExtractor for Fixed {
            fn name(&self) -> &'static str {
                "fixed"
            }
            fn supports(&self, language: &Language) -> bool {
                *language == Language::JAVASCRIPT
            }
            fn extract(&self, _: &str, _: &Language) -> Result<Extraction, ExtractError> {
                Ok(Extraction {
                    exports: vec!["x".into(), "x".into()],
                    ..Default::default()
                })
            }
        }

        let mut registry = ExtractorRegistry::default();
        registry.register(Box::new(Fixed));
        let outcome = registry.extract_signatures("anything", &Language::JAVASCRIPT);
        assert_eq!(outcome.extraction.exports, vec!["x".to_string()]);
    }
}
