// Role classification: label each node from its structural metrics.
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use std::collections::BTreeMap;

use petgraph::Direction;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::centrality::{CentralityConfig, compute_betweenness, compute_pagerank};
use super::components::weak_component_sizes;
use crate::error::AnalyzeError;
use crate::graph::CallGraph;

// ── Configuration ──────────────────────────────────────────────────

/// Thresholds for role classification. Percentiles are in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyConfig {
    /// Total degree or betweenness at or above this quantile makes a hub.
    pub hub_percentile: f64,
    /// Out-degree quantile a utility must reach.
    pub utility_out_degree_percentile: f64,
    /// Complexity quantile a utility must stay at or below.
    pub utility_complexity_percentile: f64,
    /// Nodes in weak components smaller than this are orphans.
    pub orphan_component_size: usize,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            hub_percentile: 0.9,
            utility_out_degree_percentile: 0.75,
            utility_complexity_percentile: 0.5,
            orphan_component_size: 3,
        }
    }
}

impl ClassifyConfig {
    pub fn validate(&self) -> Result<(), AnalyzeError> {
        for (name, value) in [
            ("hub_percentile", self.hub_percentile),
            ("utility_out_degree_percentile", self.utility_out_degree_percentile),
            ("utility_complexity_percentile", self.utility_complexity_percentile),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AnalyzeError::InvalidThreshold { name, value });
            }
        }
        if self.orphan_component_size == 0 {
            return Err(AnalyzeError::InvalidThreshold {
                name: "orphan_component_size",
                value: 0.0,
            });
        }
        Ok(())
    }
}

// ── Result types ───────────────────────────────────────────────────

/// Structural role of a node. Rules are tried in declaration order and the
/// first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Orphan,
    Hub,
    EntryPoint,
    Terminal,
    Utility,
    Unclassified,
}

impl NodeRole {
    pub const ALL: [Self; 6] = [
        Self::Orphan,
        Self::Hub,
        Self::EntryPoint,
        Self::Terminal,
        Self::Utility,
        Self::Unclassified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Orphan => "orphan",
            Self::Hub => "hub",
            Self::EntryPoint => "entry_point",
            Self::Terminal => "terminal",
            Self::Utility => "utility",
            Self::Unclassified => "unclassified",
        }
    }
}

impl std::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-node metrics feeding the role rules.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeMetrics {
    pub in_degree: usize,
    pub out_degree: usize,
    pub total_degree: usize,
    pub betweenness: f64,
    pub pagerank: f64,
    /// `None` when the node carries no source text.
    pub complexity: Option<usize>,
    /// Size of the node's weakly-connected component.
    pub component_size: usize,
}

/// Quantile cutoffs actually used for a classification run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Thresholds {
    pub hub_degree: f64,
    pub hub_betweenness: f64,
    pub utility_out_degree: f64,
    /// `None` when no node has a complexity score.
    pub utility_complexity: Option<f64>,
}

/// Output of [`classify_nodes`]: a role and the metrics for every node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub roles: BTreeMap<String, NodeRole>,
    pub metrics: BTreeMap<String, NodeMetrics>,
    pub thresholds: Thresholds,
}

impl Classification {
    pub fn role(&self, id: &str) -> Option<NodeRole> {
        self.roles.get(id).copied()
    }

    /// Ids with the given role, sorted.
    pub fn nodes_with(&self, role: NodeRole) -> Vec<&str> {
        self.roles
            .iter()
            .filter(|(_, r)| **r == role)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Number of nodes per role; roles with no nodes are omitted.
    pub fn counts(&self) -> BTreeMap<NodeRole, usize> {
        let mut counts = BTreeMap::new();
        for role in self.roles.values() {
            *counts.entry(*role).or_insert(0) += 1;
        }
        counts
    }
}

// ── Classification ─────────────────────────────────────────────────

/// Classify every node using default centrality settings.
pub fn classify_nodes(
    graph: &CallGraph,
    config: &ClassifyConfig,
) -> Result<Classification, AnalyzeError> {
    classify_nodes_with(graph, config, &CentralityConfig::default())
}

/// Classify every node, computing betweenness and `PageRank` with `centrality`.
pub fn classify_nodes_with(
    graph: &CallGraph,
    config: &ClassifyConfig,
    centrality: &CentralityConfig,
) -> Result<Classification, AnalyzeError> {
    config.validate()?;

    let metrics = collect_metrics(graph, centrality);

    let degrees: Vec<f64> = metrics.values().map(|m| m.total_degree as f64).collect();
    let betweenness: Vec<f64> = metrics.values().map(|m| m.betweenness).collect();
    let out_degrees: Vec<f64> = metrics.values().map(|m| m.out_degree as f64).collect();
    let complexities: Vec<f64> = metrics
        .values()
        .filter_map(|m| m.complexity.map(|c| c as f64))
        .collect();

    let thresholds = Thresholds {
        hub_degree: quantile(&degrees, config.hub_percentile).unwrap_or(0.0),
        hub_betweenness: quantile(&betweenness, config.hub_percentile).unwrap_or(0.0),
        utility_out_degree: quantile(&out_degrees, config.utility_out_degree_percentile)
            .unwrap_or(0.0),
        utility_complexity: quantile(&complexities, config.utility_complexity_percentile),
    };

    let roles: BTreeMap<String, NodeRole> = metrics
        .iter()
        .map(|(id, m)| (id.clone(), assign_role(m, config, &thresholds)))
        .collect();

    let classification = Classification {
        roles,
        metrics,
        thresholds,
    };
    let counts = classification.counts();
    info!(
        nodes = classification.roles.len(),
        hubs = counts.get(&NodeRole::Hub).copied().unwrap_or(0),
        orphans = counts.get(&NodeRole::Orphan).copied().unwrap_or(0),
        utilities = counts.get(&NodeRole::Utility).copied().unwrap_or(0),
        "Classified nodes"
    );
    Ok(classification)
}

fn collect_metrics(
    graph: &CallGraph,
    centrality: &CentralityConfig,
) -> BTreeMap<String, NodeMetrics> {
    let betweenness = compute_betweenness(graph, centrality);
    let pagerank = compute_pagerank(graph, centrality);
    let components = weak_component_sizes(graph);

    let g = graph.inner();
    g.node_indices()
        .map(|idx| {
            let node = &g[idx];
            let in_degree = g.edges_directed(idx, Direction::Incoming).count();
            let out_degree = g.edges_directed(idx, Direction::Outgoing).count();
            let metrics = NodeMetrics {
                in_degree,
                out_degree,
                total_degree: in_degree + out_degree,
                betweenness: betweenness.get(&node.id).copied().unwrap_or(0.0),
                pagerank: pagerank.get(&node.id).copied().unwrap_or(0.0),
                complexity: node.object.as_ref().and_then(|o| o.complexity_score()),
                component_size: components.get(&node.id).copied().unwrap_or(1),
            };
            (node.id.clone(), metrics)
        })
        .collect()
}

fn assign_role(m: &NodeMetrics, config: &ClassifyConfig, t: &Thresholds) -> NodeRole {
    if m.component_size < config.orphan_component_size {
        return NodeRole::Orphan;
    }

    let total = m.total_degree as f64;
    let by_degree = m.total_degree > 0 && total >= t.hub_degree;
    let by_betweenness = m.betweenness > 0.0 && m.betweenness >= t.hub_betweenness;
    if by_degree || by_betweenness {
        return NodeRole::Hub;
    }

    if m.in_degree == 0 {
        return NodeRole::EntryPoint;
    }
    if m.out_degree == 0 {
        return NodeRole::Terminal;
    }

    if let (Some(complexity), Some(max_complexity)) = (m.complexity, t.utility_complexity) {
        if m.out_degree as f64 >= t.utility_out_degree && complexity as f64 <= max_complexity {
            return NodeRole::Utility;
        }
    }

    NodeRole::Unclassified
}

/// Nearest-rank quantile: the smallest value with at least `p` of the data
/// at or below it. `None` for empty input.
fn quantile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    let rank = ((p * n as f64).ceil() as usize).clamp(1, n);
    Some(sorted[rank - 1])
}

// ── Write-back ─────────────────────────────────────────────────────

/// Store `role`, `betweenness` and `pagerank` as node attributes.
///
/// Returns the number of nodes updated; ids not in the graph are skipped.
pub fn annotate_roles(graph: &mut CallGraph, classification: &Classification) -> usize {
    let mut updated = 0;
    for (id, role) in &classification.roles {
        let Some(node) = graph.node_mut(id) else {
            continue;
        };
        node.attributes.insert("role".into(), role.as_str().into());
        if let Some(m) = classification.metrics.get(id) {
            node.attributes
                .insert("betweenness".into(), format!("{:.6}", m.betweenness));
            node.attributes
                .insert("pagerank".into(), format!("{:.6}", m.pagerank));
        }
        updated += 1;
    }
    updated
}

// ── Tests ──────────────────────────────────────────────────────────
