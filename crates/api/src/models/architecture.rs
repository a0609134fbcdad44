use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Architectural role bucket assigned to a file.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Routes,
    Controllers,
    Services,
    Models,
    Repositories,
    Middleware,
    Schemas,
    Entities,
    Dto,
    Mappers,
    Api,
    Utils,
    Config,
    Views,
    Other,
}

impl Layer {
    pub const ALL: [Layer; 15] = [
        Layer::Routes,
        Layer::Controllers,
        Layer::Services,
        Layer::Models,
        Layer::Repositories,
        Layer::Middleware,
        Layer::Schemas,
        Layer::Entities,
        Layer::Dto,
        Layer::Mappers,
        Layer::Api,
        Layer::Utils,
        Layer::Config,
        Layer::Views,
        Layer::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Routes => "routes",
            Layer::Controllers => "controllers",
            Layer::Services => "services",
            Layer::Models => "models",
            Layer::Repositories => "repositories",
            Layer::Middleware => "middleware",
            Layer::Schemas => "schemas",
            Layer::Entities => "entities",
            Layer::Dto => "dto",
            Layer::Mappers => "mappers",
            Layer::Api => "api",
            Layer::Utils => "utils",
            Layer::Config => "config",
            Layer::Views => "views",
            Layer::Other => "other",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Layer::ALL
            .iter()
            .find(|l| l.as_str() == lower)
            .copied()
            .ok_or_else(|| format!("unknown layer '{}'", s))
    }
}

/// Which rule produced a layer assignment.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LayerSource {
    Directory,
    Filename,
    Framework,
    Fallback,
    Unmatched,
}

impl LayerSource {
    /// Rule-based sources do not depend on neighbouring files.
    pub fn is_rule(&self) -> bool {
        matches!(
            self,
            LayerSource::Directory | LayerSource::Filename | LayerSource::Framework
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LayerAssignment {
    pub path: String,
    pub layer: Layer,
    pub source: LayerSource,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema)]
pub enum PatternType {
    #[serde(rename = "MVC")]
    Mvc,
    Layered,
    Clean,
    ServiceOriented,
    Microservices,
    #[serde(rename = "APICentric")]
    ApiCentric,
}

impl PatternType {
    /// Fixed order, also used to break evidence ties.
    pub const ALL: [PatternType; 6] = [
        PatternType::Mvc,
        PatternType::Layered,
        PatternType::Clean,
        PatternType::ServiceOriented,
        PatternType::Microservices,
        PatternType::ApiCentric,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            PatternType::Mvc => "Model-View-Controller",
            PatternType::Layered => "Layered Architecture",
            PatternType::Clean => "Clean Architecture",
            PatternType::ServiceOriented => "Service-Oriented",
            PatternType::Microservices => "Microservices",
            PatternType::ApiCentric => "API-Centric",
        }
    }

    /// Layer whose files start request chains.
    pub fn entry_layer(&self) -> Layer {
        match self {
            PatternType::ApiCentric => Layer::Api,
            _ => Layer::Routes,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub const HIGH_THRESHOLD: usize = 20;
    pub const MEDIUM_THRESHOLD: usize = 10;

    /// Buckets an evidence count; monotone in `count`.
    pub fn from_evidence(count: usize) -> Self {
        if count >= Self::HIGH_THRESHOLD {
            Confidence::High
        } else if count >= Self::MEDIUM_THRESHOLD {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArchitecturePattern {
    pub name: String,
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    pub confidence: Confidence,
    /// Number of files counted toward the pattern's requirements
    pub evidence: usize,
    pub layer_counts: BTreeMap<Layer, usize>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationType {
    UpwardDependency,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArchitectureViolation {
    pub file: String,
    pub target: String,
    pub source_layer: Layer,
    pub target_layer: Layer,
    #[serde(rename = "type")]
    pub violation_type: ViolationType,
    pub severity: Severity,
}
