// Centrality analysis: Brandes betweenness and PageRank.
//
// Graph algorithms intentionally cast int↔float (precision loss acceptable for metrics).
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use std::collections::{BTreeMap, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::graph::{CallGraph, GraphNode};

/// Sources per parallel work unit. Fixed so the summation order, and hence
/// the result, does not depend on the thread count.
const SOURCES_PER_CHUNK: usize = 32;

// ── Configuration ──────────────────────────────────────────────────

/// Configuration for centrality algorithms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CentralityConfig {
    /// Node count above which betweenness uses k-source sampling.
    pub approx_threshold: usize,
    /// Number of source nodes to sample. Setting it forces sampling; when
    /// unset and the graph is above `approx_threshold`, sqrt(V) is used.
    pub sample_size: Option<usize>,
    /// `PageRank` damping factor.
    pub damping: f64,
    /// `PageRank` iterations.
    pub max_iterations: u32,
}

impl Default for CentralityConfig {
    fn default() -> Self {
        Self {
            approx_threshold: 50_000,
            sample_size: None,
            damping: 0.85,
            max_iterations: 100,
        }
    }
}

impl CentralityConfig {
    /// Number of source nodes betweenness will use for a graph of `n` nodes.
    pub fn source_count(&self, n: usize) -> usize {
        let k = match self.sample_size {
            Some(k) => k,
            None if n > self.approx_threshold => (n as f64).sqrt() as usize,
            None => n,
        };
        k.clamp(1, n.max(1))
    }
}

// ── PageRank ───────────────────────────────────────────────────────

/// `PageRank` score per node id.
pub fn compute_pagerank(graph: &CallGraph, config: &CentralityConfig) -> BTreeMap<String, f64> {
    let g = graph.inner();
    if g.node_count() == 0 {
        return BTreeMap::new();
    }
    let ranks = petgraph::algo::page_rank(g, config.damping, config.max_iterations as usize);
    g.node_indices()
        .map(|idx| (graph.id_at(idx).to_string(), ranks[idx.index()]))
        .collect()
}

// ── Betweenness Centrality (Brandes algorithm) ─────────────────────

/// Betweenness per node id, normalized to [0, 1] by the maximum.
pub fn compute_betweenness(graph: &CallGraph, config: &CentralityConfig) -> BTreeMap<String, f64> {
    let g = graph.inner();
    let n = g.node_count();
    if n == 0 {
        return BTreeMap::new();
    }

    // Sample from id order so the choice does not depend on insertion order.
    let mut ordered: Vec<NodeIndex> = g.node_indices().collect();
    ordered.sort_by(|a, b| graph.id_at(*a).cmp(graph.id_at(*b)));

    let k = config.source_count(n);
    let sources: Vec<NodeIndex> = if k >= n {
        ordered
    } else {
        info!(n, k, "Using approximate betweenness (k-source sampling)");
        // Deterministic sampling: evenly spaced nodes
        let step = (n / k).max(1);
        ordered.into_iter().step_by(step).take(k).collect()
    };

    let scores = brandes_betweenness(g, &sources);
    g.node_indices()
        .map(|idx| (graph.id_at(idx).to_string(), scores[idx.index()]))
        .collect()
}

/// Brandes' algorithm accumulated over `sources`, normalized by the maximum.
fn brandes_betweenness(graph: &DiGraph<GraphNode, ()>, sources: &[NodeIndex]) -> Vec<f64> {
    let n = graph.node_count();

    let partials: Vec<Vec<f64>> = sources
        .par_chunks(SOURCES_PER_CHUNK)
        .map(|chunk| {
            let mut acc = vec![0.0_f64; n];
            for &s in chunk {
                accumulate_dependencies(graph, s, &mut acc);
            }
            acc
        })
        .collect();

    let mut cb = vec![0.0_f64; n];
    for partial in partials {
        for (total, value) in cb.iter_mut().zip(partial) {
            *total += value;
        }
    }

    let max_cb = cb.iter().copied().fold(0.0_f64, f64::max);
    if max_cb > 0.0 {
        cb.iter().map(|&v| v / max_cb).collect()
    } else {
        cb
    }
}

/// Single-source shortest paths from `s`, then back-propagation of
/// dependencies into `cb`.
fn accumulate_dependencies(graph: &DiGraph<GraphNode, ()>, s: NodeIndex, cb: &mut [f64]) {
    let n = graph.node_count();
    let s_idx = s.index();

    let mut stack: Vec<NodeIndex> = Vec::new();
    let mut predecessors: Vec<Vec<NodeIndex>> = vec![vec![]; n];
    let mut sigma = vec![0.0_f64; n]; // number of shortest paths
    sigma[s_idx] = 1.0;
    let mut dist: Vec<i64> = vec![-1; n];
    dist[s_idx] = 0;

    let mut queue = VecDeque::new();
    queue.push_back(s);

    while let Some(v) = queue.pop_front() {
        stack.push(v);
        let v_idx = v.index();

        for neighbor in graph.neighbors(v) {
            let w_idx = neighbor.index();

            // First visit?
            if dist[w_idx] < 0 {
                dist[w_idx] = dist[v_idx] + 1;
                queue.push_back(neighbor);
            }

            // Shortest path via v?
            if dist[w_idx] == dist[v_idx] + 1 {
                sigma[w_idx] += sigma[v_idx];
                predecessors[w_idx].push(v);
            }
        }
    }

    let mut delta = vec![0.0_f64; n];
    while let Some(w) = stack.pop() {
        let w_idx = w.index();
        for &v in &predecessors[w_idx] {
            let v_idx = v.index();
            delta[v_idx] += sigma[v_idx] / sigma[w_idx] * (1.0 + delta[w_idx]);
        }
        if w != s {
            cb[w_idx] += delta[w_idx];
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────
