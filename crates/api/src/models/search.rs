use super::architecture::Layer;
use super::file::{Signature, SignatureKind, Visibility};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    /// File names, glob-style (`*.controller.ts`)
    File,
    /// Exported symbols
    Export,
    /// Import targets
    Import,
    /// Function/class/type signatures
    Signature,
    /// Every category
    All,
}

impl FromStr for SearchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" | "files" => Ok(SearchKind::File),
            "export" | "exports" => Ok(SearchKind::Export),
            "import" | "imports" => Ok(SearchKind::Import),
            "signature" | "signatures" | "function" | "class" | "type" => Ok(SearchKind::Signature),
            "all" => Ok(SearchKind::All),
            other => Err(format!("unknown search type '{}'", other)),
        }
    }
}

/// Criteria applied to signatures; unset fields match anything.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignatureCriteria {
    #[serde(default)]
    pub kind: Option<SignatureKind>,
    #[serde(default)]
    pub is_async: Option<bool>,
    #[serde(default)]
    pub param_count: Option<usize>,
    /// Case-insensitive substring of the return type
    #[serde(default)]
    pub return_type: Option<String>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub exported: Option<bool>,
}

impl SignatureCriteria {
    pub fn matches(&self, sig: &Signature) -> bool {
        if self.kind.is_some_and(|k| k != sig.kind) {
            return false;
        }
        if self.is_async.is_some_and(|a| a != sig.is_async) {
            return false;
        }
        if self.param_count.is_some_and(|n| n != sig.param_count()) {
            return false;
        }
        if self.visibility.is_some_and(|v| v != sig.visibility) {
            return false;
        }
        if self.exported.is_some_and(|e| e != sig.exported) {
            return false;
        }
        if let Some(needle) = &self.return_type {
            let needle = needle.to_lowercase();
            match &sig.return_type {
                Some(rt) if rt.to_lowercase().contains(&needle) => {}
                _ => return false,
            }
        }
        true
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub kind: SearchKind,
    /// Empty pattern matches everything (criteria-only signature search)
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub fuzzy: bool,
    #[serde(default)]
    pub max_distance: Option<usize>,
    #[serde(default)]
    pub criteria: Option<SignatureCriteria>,
    #[serde(default)]
    pub group_by_directory: bool,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SearchRequest {
    pub fn new(kind: SearchKind, pattern: impl Into<String>) -> Self {
        Self {
            kind,
            pattern: pattern.into(),
            fuzzy: false,
            max_distance: None,
            criteria: None,
            group_by_directory: false,
            limit: None,
        }
    }

    pub fn fuzzy(mut self, max_distance: usize) -> Self {
        self.fuzzy = true;
        self.max_distance = Some(max_distance);
        self
    }

    pub fn with_criteria(mut self, criteria: SignatureCriteria) -> Self {
        self.criteria = Some(criteria);
        self
    }
}

/// How closely a result matched the search pattern.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MatchQuality {
    Exact,
    Prefix,
    Contains,
    Fuzzy,
}

impl MatchQuality {
    pub fn bonus(&self) -> u32 {
        match self {
            MatchQuality::Exact => 15,
            MatchQuality::Prefix => 10,
            MatchQuality::Contains => 5,
            MatchQuality::Fuzzy => 0,
        }
    }
}

impl fmt::Display for MatchQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchQuality::Exact => "exact",
            MatchQuality::Prefix => "prefix",
            MatchQuality::Contains => "contains",
            MatchQuality::Fuzzy => "fuzzy",
        };
        f.write_str(s)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HitCategory {
    File,
    Export,
    Import,
    Signature,
}

impl HitCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            HitCategory::File => "file",
            HitCategory::Export => "export",
            HitCategory::Import => "import",
            HitCategory::Signature => "signature",
        }
    }
}

/// One raw match, before scoring.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub category: HitCategory,
    pub path: String,
    /// Matched name: file name, symbol, import specifier or signature name
    pub name: String,
    pub quality: MatchQuality,
    pub layer: Option<Layer>,
    pub modified: u64,
    pub dependents: usize,
    pub exported: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
}

impl SearchHit {
    pub fn directory(&self) -> &str {
        self.path.rsplit_once('/').map(|(d, _)| d).unwrap_or(".")
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct RankedHit {
    pub score: u32,
    #[serde(flatten)]
    pub hit: SearchHit,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SearchResponse {
    /// Every result, optionally grouped by containing directory
    Results {
        total: usize,
        items: Vec<RankedHit>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        groups: Option<BTreeMap<String, Vec<RankedHit>>>,
    },
    /// Too many results: breakdown plus the best few
    Summary {
        total: usize,
        by_directory: BTreeMap<String, usize>,
        by_category: BTreeMap<String, usize>,
        top: Vec<RankedHit>,
    },
    NoResults {
        query: String,
        suggestion: String,
    },
}

impl SearchResponse {
    pub fn total(&self) -> usize {
        match self {
            SearchResponse::Results { total, .. } | SearchResponse::Summary { total, .. } => *total,
            SearchResponse::NoResults { .. } => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criteria_matching() {
        let mut sig = Signature::new("fetchUser", SignatureKind::Function, 3);
        sig.is_async = true;
        sig.params = vec!["id".into()];
        sig.return_type = Some("Promise<User>".into());

        let criteria = SignatureCriteria {
            is_async: Some(true),
            param_count: Some(1),
            return_type: Some("promise".into()),
            ..Default::default()
        };
        assert!(criteria.matches(&sig));

        let sync_only = SignatureCriteria {
            is_async: Some(false),
            ..Default::default()
        };
        assert!(!sync_only.matches(&sig));
    }

    #[test]
    fn test_quality_bonus_order() {
        assert!(MatchQuality::Exact.bonus() > MatchQuality::Prefix.bonus());
        assert!(MatchQuality::Prefix.bonus() > MatchQuality::Contains.bonus());
        assert!(MatchQuality::Contains.bonus() > MatchQuality::Fuzzy.bonus());
    }
}
