use crate::architecture::LayerMap;
use crate::config::MapConfig;
use crate::graph::DependencyGraph;
use mapscope_api::{DataFlowChain, FlowPattern, FlowStep, FlowSummary, Layer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowReport {
    pub entry_layer: Option<Layer>,
    pub summary: FlowSummary,
    pub common_patterns: Vec<FlowPattern>,
    /// Entry files without any internal import
    pub isolated_endpoints: Vec<String>,
    pub chains: Vec<DataFlowChain>,
}

/// Enumerates request chains over forward edges.
pub struct FlowTracer<'a> {
    graph: &'a DependencyGraph,
    layers: &'a LayerMap,
    max_depth: usize,
    max_chains: usize,
    pattern_count: usize,
}

impl<'a> FlowTracer<'a> {
    pub fn new(graph: &'a DependencyGraph, layers: &'a LayerMap, config: &MapConfig) -> Self {
        Self {
            graph,
            layers,
            max_depth: config.max_flow_depth.max(1),
            max_chains: config.max_chains_per_entry.max(1),
            pattern_count: config.common_pattern_count,
        }
    }

    pub fn trace(&self, entry_layer: Layer) -> FlowReport {
        let entries = self.layers.files_in(entry_layer);
        let mut chains = Vec::new();
        let mut isolated = Vec::new();

        for entry in entries {
            if self.graph.imports_of(&entry).is_empty() {
                isolated.push(entry);
                continue;
            }
            chains.extend(self.chains_from(&entry));
        }

        let summary = summarize(&chains);
        let common_patterns = common_patterns(&chains, self.pattern_count);
        tracing::debug!(
            "Traced {} chains from {} layer, {} isolated endpoints",
            chains.len(),
            entry_layer,
            isolated.len()
        );
        FlowReport {
            entry_layer: Some(entry_layer),
            summary,
            common_patterns,
            isolated_endpoints: isolated,
            chains,
        }
    }

    /// Every maximal path from `entry`, depth-first in path order.
    pub fn chains_from(&self, entry: &str) -> Vec<DataFlowChain> {
        let mut out = Vec::new();
        let mut path = vec![entry.to_string()];
        self.walk(&mut path, &mut out);
        out
    }

    fn walk(&self, path: &mut Vec<String>, out: &mut Vec<DataFlowChain>) {
        let Some(current) = path.last() else {
            return;
        };
        let next: Vec<String> = if path.len() >= self.max_depth {
            Vec::new()
        } else {
            self.graph
                .imports_of(current)
                .into_iter()
                .filter(|n| !path.contains(n))
                .collect()
        };

        if next.is_empty() {
            if path.len() > 1 {
                out.push(self.chain(path));
            }
            return;
        }

        for file in next {
            if out.len() >= self.max_chains {
                break;
            }
            path.push(file);
            self.walk(path, out);
            path.pop();
        }
    }

    fn chain(&self, path: &[String]) -> DataFlowChain {
        let steps = path
            .iter()
            .map(|file| FlowStep {
                file: file.clone(),
                layer: self.layers.layer_of(file).unwrap_or(Layer::Other),
            })
            .collect();
        DataFlowChain::from_steps(steps)
    }
}

fn summarize(chains: &[DataFlowChain]) -> FlowSummary {
    if chains.is_empty() {
        return FlowSummary::default();
    }
    let total_depth: usize = chains.iter().map(|c| c.depth).sum();
    let average = total_depth as f64 / chains.len() as f64;
    let mut layer_usage = BTreeMap::new();
    for layer in chains.iter().flat_map(|c| c.layers.iter()) {
        *layer_usage.entry(*layer).or_insert(0) += 1;
    }
    FlowSummary {
        total_flows: chains.len(),
        average_depth: (average * 100.0).round() / 100.0,
        max_depth: chains.iter().map(|c| c.depth).max().unwrap_or(0),
        layer_usage,
    }
}

/// Most frequent layer sequences; ties ordered by label.
fn common_patterns(chains: &[DataFlowChain], top: usize) -> Vec<FlowPattern> {
    let mut counts: BTreeMap<String, (Vec<Layer>, usize)> = BTreeMap::new();
    for chain in chains {
        counts
            .entry(chain.sequence_label())
            .or_insert_with(|| (chain.layers.clone(), 0))
            .1 += 1;
    }
    let mut patterns: Vec<FlowPattern> = counts
        .into_iter()
        .map(|(label, (sequence, count))| FlowPattern {
            sequence,
            label,
            count,
        })
        .collect();
    patterns.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    patterns.truncate(top);
    patterns
}
