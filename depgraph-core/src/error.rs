use std::path::PathBuf;

/// Top-level depgraph error type.
///
/// All fallible operations in `depgraph-core` return [`Result<T, DepGraphError>`](Result).
/// Each variant wraps a domain-specific error enum so callers can tell
/// "that node id does not exist" apart from "that graph file is unreadable".
#[derive(thiserror::Error, Debug)]
pub enum DepGraphError {
    /// Error from the code-object store (`SQLite` operations, JSON columns).
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A graph query referenced something that is not in the graph.
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Error while constructing the call graph from code objects.
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Error saving or loading a persisted graph.
    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    /// Error during analysis (invalid thresholds, etc.).
    #[error("Analysis error: {0}")]
    Analyze(#[from] AnalyzeError),

    /// Error in configuration parsing or validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl DepGraphError {
    /// True when the error means a referenced node id is absent from the graph.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Graph(GraphError::NodeNotFound(_)))
    }
}

/// Errors from the SQLite-backed code-object store.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Underlying `SQLite` operation failed.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The database file does not exist.
    #[error("Database not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Schema creation or version check failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// JSON serialization/deserialization of a record column failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from graph queries over an in-memory call graph.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The referenced node id does not exist in the graph.
    #[error("Node not found: {0}")]
    NodeNotFound(String),
}

/// Per-item problems found while building a graph.
///
/// Construction is batch-tolerant: these are logged and recorded in
/// [`BuildStats`](crate::construct::BuildStats) rather than returned, but the
/// type is shared so upstream layers can render them uniformly.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A code object is missing its identity or duplicates another object's id.
    #[error("Malformed code object ({reason}): {id:?}")]
    MalformedInput {
        /// The offending id as given (possibly empty).
        id: String,
        /// Why the object was rejected.
        reason: String,
    },

    /// A call reference could not be mapped to any known code object.
    #[error("Unresolved call from {caller} to {callee}")]
    UnresolvedReference {
        /// Id of the calling object.
        caller: String,
        /// Callee name as written in source.
        callee: String,
    },
}

/// Errors saving or loading a persisted graph file.
#[derive(thiserror::Error, Debug)]
pub enum PersistError {
    /// The graph file does not exist.
    #[error("Graph file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Filesystem I/O failed while reading or writing the graph file.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        /// File being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// File contents are unreadable or do not match the requested format.
    #[error("Invalid {format} graph file {}: {message}", path.display())]
    Format {
        /// Format the file was expected to be in.
        format: String,
        /// File that failed to decode.
        path: PathBuf,
        /// Description of the decode failure.
        message: String,
    },

    /// The format name or file extension is not a supported graph format.
    #[error("Unsupported graph format: {0}")]
    UnsupportedFormat(String),
}

/// Errors during graph analysis.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AnalyzeError {
    /// A classification threshold is outside its valid range.
    #[error("Invalid threshold {name} = {value}")]
    InvalidThreshold {
        /// Name of the threshold field.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
}

/// Errors in depgraph configuration parsing and validation.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist at the expected path.
    #[error("Config file not found: {0}")]
    NotFound(String),

    /// Configuration values are present but semantically invalid.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Configuration file syntax could not be parsed (TOML error).
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convenience alias for `Result<T, DepGraphError>`.
pub type Result<T> = std::result::Result<T, DepGraphError>;
