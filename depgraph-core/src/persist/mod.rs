//! Saving and loading call graphs.
//!
//! Every format goes through [`GraphDocument`], a flat node-link view of a
//! [`CallGraph`]. A graph is saved either in full (each node carries its
//! complete [`CodeObject`]) or structure-only (id, name, package, kind and
//! node attributes), and structure-only files can be rehydrated from a
//! [`CodeObjectStore`] after loading.

pub mod binary;
pub mod gexf;
pub mod graphml;
pub mod json;

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::PersistError;
use crate::graph::{CallGraph, GraphNode};
use crate::store::CodeObjectStore;
use crate::types::{CodeObject, ObjectKind};

/// Version written into every saved document.
pub const FORMAT_VERSION: u32 = 1;

// ── Formats and modes ──────────────────────────────────────────────

/// On-disk graph encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphFormat {
    /// `DGB1` magic followed by a bincode payload.
    Binary,
    /// GraphML with string-typed keys.
    GraphMl,
    /// Pretty-printed node-link JSON.
    Json,
    /// GEXF 1.2.
    Gexf,
}

impl GraphFormat {
    pub const ALL: [Self; 4] = [Self::Binary, Self::GraphMl, Self::Json, Self::Gexf];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::GraphMl => "graphml",
            Self::Json => "json",
            Self::Gexf => "gexf",
        }
    }

    /// Preferred file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Binary => "dgb",
            Self::GraphMl => "graphml",
            Self::Json => "json",
            Self::Gexf => "gexf",
        }
    }

    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, PersistError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "bin" | "dgb" => Ok(Self::Binary),
            "graphml" | "xml" => Ok(Self::GraphMl),
            "json" => Ok(Self::Json),
            "gexf" => Ok(Self::Gexf),
            _ => Err(PersistError::UnsupportedFormat(format!(
                "cannot infer graph format from {}",
                path.display()
            ))),
        }
    }
}

impl FromStr for GraphFormat {
    type Err = PersistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "binary" | "native" | "native-binary" | "bin" => Ok(Self::Binary),
            "graphml" | "xml" | "portable-xml" => Ok(Self::GraphMl),
            "json" => Ok(Self::Json),
            "gexf" | "gexf-like" => Ok(Self::Gexf),
            other => Err(PersistError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for GraphFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much of each node is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistMode {
    /// Nodes carry their complete code object.
    Full,
    /// Nodes carry only id, name, package, kind and attributes.
    #[default]
    StructureOnly,
}

impl PersistMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::StructureOnly => "structure_only",
        }
    }
}

impl FromStr for PersistMode {
    type Err = PersistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "full" => Ok(Self::Full),
            "structure_only" | "structure" => Ok(Self::StructureOnly),
            other => Err(PersistError::UnsupportedFormat(format!(
                "unknown persist mode {other:?}"
            ))),
        }
    }
}

impl fmt::Display for PersistMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Document model ─────────────────────────────────────────────────

/// One node as written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    pub name: String,
    pub package_name: String,
    pub kind: ObjectKind,
    pub attributes: BTreeMap<String, String>,
    /// Present only in full mode.
    pub object: Option<CodeObject>,
}

/// A directed `source → target` edge between node ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
}

/// Format-independent view of a saved graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub format_version: u32,
    pub mode: PersistMode,
    pub saved_at: DateTime<Utc>,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

impl GraphDocument {
    /// Snapshot a graph. Nodes and edges are written in id order.
    pub fn from_graph(graph: &CallGraph, mode: PersistMode) -> Self {
        let nodes = graph
            .nodes()
            .into_iter()
            .map(|n| NodeRecord {
                id: n.id.clone(),
                name: n.name.clone(),
                package_name: n.package_name.clone(),
                kind: n.kind,
                attributes: n.attributes.clone(),
                object: match mode {
                    PersistMode::Full => n.object.clone(),
                    PersistMode::StructureOnly => None,
                },
            })
            .collect();
        let edges = graph
            .edges()
            .into_iter()
            .map(|(source, target)| EdgeRecord { source, target })
            .collect();
        Self {
            format_version: FORMAT_VERSION,
            mode,
            saved_at: Utc::now(),
            nodes,
            edges,
        }
    }

    /// Rebuild the graph, rejecting documents that are internally
    /// inconsistent (duplicate node ids, edges to unknown nodes).
    pub fn into_graph(self) -> Result<CallGraph, String> {
        if self.format_version > FORMAT_VERSION {
            return Err(format!(
                "format version {} is newer than supported version {FORMAT_VERSION}",
                self.format_version
            ));
        }

        let mut graph = CallGraph::with_capacity(self.nodes.len(), self.edges.len());
        let mut seen = HashSet::with_capacity(self.nodes.len());
        for record in self.nodes {
            if record.id.is_empty() {
                return Err("node with empty id".into());
            }
            if !seen.insert(record.id.clone()) {
                return Err(format!("duplicate node id {:?}", record.id));
            }
            let object = match self.mode {
                PersistMode::Full => record.object,
                PersistMode::StructureOnly => None,
            };
            graph.add_node(GraphNode {
                id: record.id,
                name: record.name,
                package_name: record.package_name,
                kind: record.kind,
                object,
                attributes: record.attributes,
            });
        }
        for edge in self.edges {
            graph
                .add_edge(&edge.source, &edge.target)
                .map_err(|e| format!("edge {} -> {}: {e}", edge.source, edge.target))?;
        }
        Ok(graph)
    }
}

// ── Save / load ────────────────────────────────────────────────────

/// Result of a save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveStats {
    pub path: PathBuf,
    pub format: GraphFormat,
    pub mode: PersistMode,
    pub nodes: usize,
    pub edges: usize,
    pub bytes: u64,
}

/// A node whose code object could not be found during rehydration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RehydrationGap {
    pub id: String,
}

/// Result of rehydrating a loaded graph from a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PopulateStats {
    /// Placeholder nodes that were looked up.
    pub requested: usize,
    /// Placeholder nodes that received their code object.
    pub populated: usize,
    /// Placeholder nodes left as-is because the store had no such id.
    pub gaps: Vec<RehydrationGap>,
}

fn format_error(format: GraphFormat, path: &Path, message: impl fmt::Display) -> PersistError {
    PersistError::Format {
        format: format.to_string(),
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

fn io_error(path: &Path, source: std::io::Error) -> PersistError {
    PersistError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write through a temporary file in the target's directory and rename it
/// over `path` once complete. A failed write leaves any existing file intact.
fn write_atomically<F>(path: &Path, write: F) -> Result<(), PersistError>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> Result<(), PersistError>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".depgraph-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| io_error(dir, e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write(&mut writer)?;
        writer.flush().map_err(|e| io_error(path, e))?;
    }
    tmp.persist(path).map_err(|e| io_error(path, e.error))?;
    Ok(())
}

/// Write `graph` to `path`, replacing any existing file.
pub fn save(
    graph: &CallGraph,
    path: &Path,
    format: GraphFormat,
    mode: PersistMode,
) -> crate::error::Result<SaveStats> {
    let start = Instant::now();
    let doc = GraphDocument::from_graph(graph, mode);

    write_atomically(path, |writer| {
        match format {
            GraphFormat::Binary => binary::write_document(&doc, writer),
            GraphFormat::GraphMl => graphml::write_document(&doc, writer),
            GraphFormat::Json => json::write_document(&doc, writer),
            GraphFormat::Gexf => gexf::write_document(&doc, writer),
        }
        .map_err(|m| format_error(format, path, m))
    })?;

    let bytes = std::fs::metadata(path).map_or(0, |m| m.len());
    let stats = SaveStats {
        path: path.to_path_buf(),
        format,
        mode,
        nodes: doc.nodes.len(),
        edges: doc.edges.len(),
        bytes,
    };
    info!(
        path = %path.display(),
        format = %format,
        mode = %mode,
        nodes = stats.nodes,
        edges = stats.edges,
        bytes,
        duration = ?start.elapsed(),
        "Graph saved"
    );
    Ok(stats)
}

/// Read the raw document from `path` without building a graph.
pub fn read_document(path: &Path, format: GraphFormat) -> crate::error::Result<GraphDocument> {
    if !path.exists() {
        return Err(PersistError::NotFound(path.to_path_buf()).into());
    }
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    let reader = BufReader::new(file);
    let doc = match format {
        GraphFormat::Binary => binary::read_document(reader),
        GraphFormat::GraphMl => graphml::read_document(reader),
        GraphFormat::Json => json::read_document(reader),
        GraphFormat::Gexf => gexf::read_document(reader),
    }
    .map_err(|m| format_error(format, path, m))?;
    Ok(doc)
}

/// Load a graph saved in `format`.
///
/// Fails with `NotFound` for a missing file and `Format` for contents that
/// do not decode as `format`; a partial graph is never returned.
pub fn load(path: &Path, format: GraphFormat) -> crate::error::Result<CallGraph> {
    let start = Instant::now();
    let doc = read_document(path, format)?;
    let mode = doc.mode;
    let graph = doc
        .into_graph()
        .map_err(|m| format_error(format, path, m))?;
    info!(
        path = %path.display(),
        format = %format,
        mode = %mode,
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        duration = ?start.elapsed(),
        "Graph loaded"
    );
    Ok(graph)
}

/// Load a graph, inferring the format from the file extension.
pub fn load_auto(path: &Path) -> crate::error::Result<CallGraph> {
    let format = GraphFormat::from_path(path)?;
    load(path, format)
}

/// Attach code objects from `store` to every placeholder node.
///
/// Ids the store does not know stay as placeholders and are reported as
/// gaps. Node ids are never changed.
pub async fn populate(
    graph: &mut CallGraph,
    store: &dyn CodeObjectStore,
) -> crate::error::Result<PopulateStats> {
    let wanted: Vec<String> = graph
        .nodes()
        .into_iter()
        .filter(|n| !n.is_populated())
        .map(|n| n.id.clone())
        .collect();

    let mut stats = PopulateStats {
        requested: wanted.len(),
        ..PopulateStats::default()
    };
    if wanted.is_empty() {
        return Ok(stats);
    }

    let mut found = store.get_objects(&wanted).await?;
    for id in wanted {
        match (found.remove(&id), graph.node_mut(&id)) {
            (Some(object), Some(node)) => {
                node.attach(object);
                stats.populated += 1;
            }
            _ => {
                warn!(id = %id, "Code object missing from store, keeping placeholder");
                stats.gaps.push(RehydrationGap { id });
            }
        }
    }

    info!(
        requested = stats.requested,
        populated = stats.populated,
        gaps = stats.gaps.len(),
        "Graph rehydrated"
    );
    Ok(stats)
}

/// Load a graph and rehydrate its placeholder nodes from `store`.
pub async fn load_and_populate(
    path: &Path,
    format: GraphFormat,
    store: &dyn CodeObjectStore,
) -> crate::error::Result<(CallGraph, PopulateStats)> {
    let mut graph = load(path, format)?;
    let stats = populate(&mut graph, store).await?;
    Ok((graph, stats))
}

// ── Tests ──────────────────────────────────────────────────────────
