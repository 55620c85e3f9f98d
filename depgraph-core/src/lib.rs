//! depgraph core library: call-dependency graphs over extracted PL/SQL code objects.
//!
//! The usual flow is [`store`] → [`construct::GraphBuilder`] → [`persist::save`],
//! then later [`persist::load`] (optionally rehydrated from the store) and the
//! read-only queries in [`analyze`] and [`subgraph`].

pub mod analyze;
pub mod config;
pub mod construct;
pub mod error;
pub mod graph;
pub mod persist;
pub mod progress;
pub mod store;
pub mod subgraph;
pub mod types;

pub use error::{DepGraphError, Result};
pub use graph::{CallGraph, GraphNode};
pub use types::{CallReference, CodeObject, ObjectKind, ParamMode, Parameter};
