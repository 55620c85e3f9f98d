//! In-memory call graph keyed by code-object id.
//!
//! Wraps a petgraph `DiGraph` with an id ↔ `NodeIndex` map, the same shape
//! the analyzers and persistence layers all operate on.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::error::GraphError;
use crate::types::{CodeObject, ObjectKind};

/// A node in the call graph.
///
/// `object` is `None` for structure-only nodes: they carry just enough
/// (id, kind, package, name) to render, and are rehydrated from a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub package_name: String,
    pub kind: ObjectKind,
    pub object: Option<CodeObject>,
    /// Plain string attributes (e.g. `role` after classification write-back).
    pub attributes: BTreeMap<String, String>,
}

impl GraphNode {
    /// A full node carrying the complete code object.
    pub fn from_object(object: CodeObject) -> Self {
        Self {
            id: object.id.clone(),
            name: object.name.clone(),
            package_name: object.package_name.clone(),
            kind: object.kind,
            object: Some(object),
            attributes: BTreeMap::new(),
        }
    }

    /// A structure-only node.
    pub fn placeholder(
        id: impl Into<String>,
        name: impl Into<String>,
        package_name: impl Into<String>,
        kind: ObjectKind,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            package_name: package_name.into(),
            kind,
            object: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn is_populated(&self) -> bool {
        self.object.is_some()
    }

    /// Attach a full object. The node id is never changed; name, package and
    /// kind are refreshed from the object.
    pub fn attach(&mut self, object: CodeObject) {
        self.name.clone_from(&object.name);
        self.package_name.clone_from(&object.package_name);
        self.kind = object.kind;
        self.object = Some(object);
    }

    /// Drop the object payload, keeping only the structural fields.
    #[must_use]
    pub fn to_structure_only(&self) -> Self {
        Self {
            object: None,
            ..self.clone()
        }
    }
}

/// Directed call graph: an edge `a → b` means `a`'s code calls `b`.
///
/// At most one edge exists per ordered pair; self-loops are allowed.
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    graph: DiGraph<GraphNode, ()>,
    index: HashMap<String, NodeIndex>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            graph: DiGraph::with_capacity(nodes, edges),
            index: HashMap::with_capacity(nodes),
        }
    }

    /// Insert a node. If the id is already present the existing node is
    /// replaced in place and its edges are kept.
    pub fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        if let Some(&idx) = self.index.get(&node.id) {
            self.graph[idx] = node;
            return idx;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        idx
    }

    /// Add `caller → callee`. Returns `Ok(true)` if the edge is new and
    /// `Ok(false)` if it already existed.
    pub fn add_edge(&mut self, caller: &str, callee: &str) -> Result<bool, GraphError> {
        let src = self.require(caller)?;
        let dst = self.require(callee)?;
        if self.graph.find_edge(src, dst).is_some() {
            return Ok(false);
        }
        self.graph.add_edge(src, dst, ());
        Ok(true)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn has_edge(&self, caller: &str, callee: &str) -> bool {
        match (self.index.get(caller), self.index.get(callee)) {
            (Some(&s), Some(&t)) => self.graph.find_edge(s, t).is_some(),
            _ => false,
        }
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&idx| &self.graph[idx])
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        self.index.get(id).map(|&idx| &mut self.graph[idx])
    }

    /// Look up a node index, failing with `NodeNotFound`.
    pub fn require(&self, id: &str) -> Result<NodeIndex, GraphError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// All node ids, sorted.
    pub fn node_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.index.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Nodes in id order.
    pub fn nodes(&self) -> Vec<&GraphNode> {
        let mut nodes: Vec<&GraphNode> = self.graph.node_weights().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    /// All edges as `(caller, callee)` id pairs, sorted.
    pub fn edges(&self) -> Vec<(String, String)> {
        let mut edges: Vec<(String, String)> = self
            .graph
            .edge_references()
            .map(|e| {
                (
                    self.graph[e.source()].id.clone(),
                    self.graph[e.target()].id.clone(),
                )
            })
            .collect();
        edges.sort();
        edges
    }

    /// Direct callees of `id`, sorted.
    pub fn successors(&self, id: &str) -> Result<Vec<String>, GraphError> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Direct callers of `id`, sorted.
    pub fn predecessors(&self, id: &str) -> Result<Vec<String>, GraphError> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: &str, dir: Direction) -> Result<Vec<String>, GraphError> {
        let idx = self.require(id)?;
        let mut out: Vec<String> = self
            .graph
            .neighbors_directed(idx, dir)
            .map(|n| self.graph[n].id.clone())
            .collect();
        out.sort();
        out.dedup();
        Ok(out)
    }

    pub fn in_degree(&self, id: &str) -> Result<usize, GraphError> {
        let idx = self.require(id)?;
        Ok(self.graph.edges_directed(idx, Direction::Incoming).count())
    }

    pub fn out_degree(&self, id: &str) -> Result<usize, GraphError> {
        let idx = self.require(id)?;
        Ok(self.graph.edges_directed(idx, Direction::Outgoing).count())
    }

    /// The graph restricted to `ids`, with every original edge whose
    /// endpoints are both kept. Unknown ids are ignored.
    pub fn induced_subgraph(&self, ids: &BTreeSet<String>) -> Self {
        let mut sub = Self::with_capacity(ids.len(), ids.len());
        for id in ids {
            if let Some(node) = self.node(id) {
                sub.add_node(node.clone());
            }
        }
        for e in self.graph.edge_references() {
            let src = &self.graph[e.source()].id;
            let dst = &self.graph[e.target()].id;
            if ids.contains(src) && ids.contains(dst) {
                let s = sub.index[src];
                let t = sub.index[dst];
                sub.graph.add_edge(s, t, ());
            }
        }
        sub
    }

    /// A copy with every object payload dropped.
    #[must_use]
    pub fn to_structure_only(&self) -> Self {
        let mut copy = self.clone();
        for node in copy.graph.node_weights_mut() {
            node.object = None;
        }
        copy
    }

    /// Number of nodes carrying a full code object.
    pub fn populated_count(&self) -> usize {
        self.graph.node_weights().filter(|n| n.is_populated()).count()
    }

    /// Underlying petgraph graph, for algorithms that work on indices.
    pub fn inner(&self) -> &DiGraph<GraphNode, ()> {
        &self.graph
    }

    pub(crate) fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub(crate) fn id_at(&self, idx: NodeIndex) -> &str {
        &self.graph[idx].id
    }
}

impl PartialEq for CallGraph {
    fn eq(&self, other: &Self) -> bool {
        self.node_count() == other.node_count()
            && self.edge_count() == other.edge_count()
            && self.nodes() == other.nodes()
            && self.edges() == other.edges()
    }
}

impl Eq for CallGraph {}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> GraphNode {
        GraphNode::placeholder(id, id, "", ObjectKind::Procedure)
    }

    #[test]
    fn duplicate_edges_collapse() {
        let mut g = CallGraph::new();
        g.add_node(node("a"));
        g.add_node(node("b"));
        assert!(g.add_edge("a", "b").unwrap());
        assert!(!g.add_edge("a", "b").unwrap());
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn self_loops_are_allowed() {
        let mut g = CallGraph::new();
        g.add_node(node("a"));
        assert!(g.add_edge("a", "a").unwrap());
        assert_eq!(g.in_degree("a").unwrap(), 1);
        assert_eq!(g.out_degree("a").unwrap(), 1);
    }

    #[test]
    fn edge_to_missing_node_fails() {
        let mut g = CallGraph::new();
        g.add_node(node("a"));
        let err = g.add_edge("a", "ghost").unwrap_err();
        assert_eq!(err, GraphError::NodeNotFound("ghost".into()));
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn re_adding_node_keeps_edges() {
        let mut g = CallGraph::new();
        g.add_node(node("a"));
        g.add_node(node("b"));
        g.add_edge("a", "b").unwrap();
        let mut replacement = node("a");
        replacement.attributes.insert("role".into(), "hub".into());
        g.add_node(replacement);
        assert_eq!(g.node_count(), 2);
        assert!(g.has_edge("a", "b"));
        assert_eq!(g.node("a").unwrap().attributes["role"], "hub");
    }

    #[test]
    fn induced_subgraph_keeps_cross_links() {
        let mut g = CallGraph::new();
        for id in ["a", "b", "c", "d"] {
            g.add_node(node(id));
        }
        g.add_edge("a", "b").unwrap();
        g.add_edge("b", "c").unwrap();
        g.add_edge("c", "a").unwrap();
        g.add_edge("c", "d").unwrap();

        let keep: BTreeSet<String> = ["a", "b", "c"].iter().map(ToString::to_string).collect();
        let sub = g.induced_subgraph(&keep);
        assert_eq!(sub.node_ids(), vec!["a", "b", "c"]);
        assert_eq!(
            sub.edges(),
            vec![
                ("a".to_string(), "b".to_string()),
                ("b".to_string(), "c".to_string()),
                ("c".to_string(), "a".to_string()),
            ]
        );
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let mut g1 = CallGraph::new();
        g1.add_node(node("a"));
        g1.add_node(node("b"));
        g1.add_edge("a", "b").unwrap();

        let mut g2 = CallGraph::new();
        g2.add_node(node("b"));
        g2.add_node(node("a"));
        g2.add_edge("a", "b").unwrap();

        assert_eq!(g1, g2);
    }

    #[test]
    fn attach_keeps_id() {
        let mut n = GraphNode::placeholder("pkg.f-1a2b", "f", "pkg", ObjectKind::Unknown);
        let obj = CodeObject::new("pkg", "f", ObjectKind::Function).with_id("pkg.f-1a2b");
        n.attach(obj);
        assert_eq!(n.id, "pkg.f-1a2b");
        assert_eq!(n.kind, ObjectKind::Function);
        assert!(n.is_populated());
    }
}
