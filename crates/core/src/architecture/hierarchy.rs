//! Allowed dependency direction per architecture pattern.

use crate::config::MapConfig;
use mapscope_api::{Layer, PatternType};

/// Outermost layer first; a file may depend on layers at the same or a later position.
pub fn default_hierarchy(pattern: PatternType) -> Vec<Layer> {
    use Layer::*;
    match pattern {
        PatternType::ServiceOriented | PatternType::Microservices => {
            vec![Routes, Controllers, Services, Repositories, Models]
        }
        PatternType::Layered => vec![Controllers, Services, Repositories, Models],
        PatternType::Mvc => vec![Routes, Controllers, Views, Models],
        PatternType::Clean => vec![Routes, Controllers, Services, Repositories, Entities],
        PatternType::ApiCentric => vec![Api, Controllers, Services, Models],
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hierarchy {
    pattern: PatternType,
    order: Vec<Layer>,
}

impl Hierarchy {
    /// Configured override for `pattern`, else the built-in table.
    pub fn for_pattern(pattern: PatternType, config: &MapConfig) -> Self {
        let order = config
            .hierarchies
            .get(&pattern)
            .cloned()
            .unwrap_or_else(|| default_hierarchy(pattern));
        Self { pattern, order }
    }

    pub fn pattern(&self) -> PatternType {
        self.pattern
    }

    pub fn position(&self, layer: Layer) -> Option<usize> {
        self.order.iter().position(|l| *l == layer)
    }

    /// True when `source → target` points back toward the outside.
    pub fn is_upward(&self, source: Layer, target: Layer) -> bool {
        match (self.position(source), self.position(target)) {
            (Some(s), Some(t)) => t < s,
            _ => false,
        }
    }
}
