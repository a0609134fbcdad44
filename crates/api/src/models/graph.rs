use super::architecture::Layer;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema)]
pub struct DependencyEdge {
    pub source: String,
    pub target: String,
}

/// An import that could not be mapped to a file inside the project.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalReference {
    pub source: String,
    pub specifier: String,
    /// Package name derived from the specifier (`@scope/pkg`, `pkg`)
    pub package: String,
}

/// Files forming an import cycle, in traversal order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct ImportCycle {
    pub files: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct FlowStep {
    pub file: String,
    pub layer: Layer,
}

/// One traced request path starting at an entry file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DataFlowChain {
    pub entry: String,
    pub steps: Vec<FlowStep>,
    pub depth: usize,
    pub layers: Vec<Layer>,
}

impl DataFlowChain {
    pub fn from_steps(steps: Vec<FlowStep>) -> Self {
        let entry = steps.first().map(|s| s.file.clone()).unwrap_or_default();
        let layers = steps.iter().map(|s| s.layer).collect();
        Self {
            entry,
            depth: steps.len(),
            steps,
            layers,
        }
    }

    /// Layer sequence rendered as `routes → controllers → …`.
    pub fn sequence_label(&self) -> String {
        self.layers
            .iter()
            .map(|l| l.as_str())
            .collect::<Vec<_>>()
            .join(" → ")
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowSummary {
    pub total_flows: usize,
    pub average_depth: f64,
    pub max_depth: usize,
    pub layer_usage: BTreeMap<Layer, usize>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct FlowPattern {
    pub sequence: Vec<Layer>,
    pub label: String,
    pub count: usize,
}
