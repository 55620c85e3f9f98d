//! Call graph construction from extracted code objects.
//!
//! [`resolve`] maps each call site's callee name to a code-object id;
//! [`build`] turns the resolved calls into a [`CallGraph`](crate::graph::CallGraph).

pub mod build;
pub mod resolve;

pub use build::{
    AmbiguousCall, BuildOutcome, BuildStats, GraphBuilder, MalformedObject, UnresolvedCall,
    build_graph,
};
pub use resolve::{Resolution, ResolutionIndex, ResolutionRule, resolve_call};
