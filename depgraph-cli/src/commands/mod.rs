pub mod analyze;
pub mod build;
pub mod classify;
pub mod convert;
pub mod import;
pub mod paths;
pub mod subgraph;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;
use tracing::debug;

use depgraph_core::analyze::SearchLimits;
use depgraph_core::config::DepGraphConfig;
use depgraph_core::error::DepGraphError;
use depgraph_core::graph::CallGraph;
use depgraph_core::persist::{self, GraphFormat, PersistMode};

/// Name of the config file picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "depgraph.toml";

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a call graph from the code-object store and save it
    Build(build::BuildArgs),
    /// Report entry points, terminals, cycles and components of a graph
    Analyze(analyze::AnalyzeArgs),
    /// Extract the neighbourhood of one node into a new graph file
    Subgraph(subgraph::SubgraphArgs),
    /// List every simple call path between two nodes
    Paths(paths::PathsArgs),
    /// Label nodes with structural roles
    Classify(classify::ClassifyArgs),
    /// Convert a graph file between formats and persistence modes
    Convert(convert::ConvertArgs),
    /// Load extracted code objects (JSON) into the store
    Import(import::ImportArgs),
}

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOpts {
    pub config: Option<PathBuf>,
    pub quiet: bool,
}

pub async fn run(cmd: Command, global: &GlobalOpts) -> anyhow::Result<()> {
    let config = load_config(global.config.as_deref())?;
    match cmd {
        Command::Build(args) => build::run(args, &config, global).await,
        Command::Analyze(args) => analyze::run(args, &config),
        Command::Subgraph(args) => subgraph::run(args, &config),
        Command::Paths(args) => paths::run(args, &config),
        Command::Classify(args) => classify::run(args, &config),
        Command::Convert(args) => convert::run(args, &config).await,
        Command::Import(args) => import::run(args, &config).await,
    }
}

/// Explicit config path, else `./depgraph.toml` if present, else defaults.
fn load_config(explicit: Option<&Path>) -> anyhow::Result<DepGraphConfig> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default.exists() {
                return Ok(DepGraphConfig::default());
            }
            default
        }
    };
    debug!(path = %path.display(), "Loading config");
    DepGraphConfig::load(&path)
        .map_err(DepGraphError::from)
        .with_context(|| format!("Cannot load config: {}", path.display()))
}

/// Format for writing `path`: explicit choice, else the extension, else the
/// configured default.
pub fn output_format(explicit: Option<GraphFormat>, path: &Path, config: &DepGraphConfig) -> GraphFormat {
    explicit
        .or_else(|| GraphFormat::from_path(path).ok())
        .unwrap_or(config.graph.format)
}

/// Load a graph file, taking the format from `explicit` or the extension.
pub fn load_graph(path: &Path, explicit: Option<GraphFormat>) -> anyhow::Result<CallGraph> {
    let graph = match explicit {
        Some(format) => persist::load(path, format),
        None => persist::load_auto(path),
    };
    graph.with_context(|| format!("Cannot load graph: {}", path.display()))
}

/// Configured search limits with command-line overrides, checked the same
/// way as the config file.
pub fn search_limits(config: &DepGraphConfig, overrides: SearchLimits) -> anyhow::Result<SearchLimits> {
    let limits = SearchLimits {
        path_cutoff: overrides.path_cutoff.or(config.search.path_cutoff),
        max_cycle_length: overrides.max_cycle_length.or(config.search.max_cycle_length),
        max_cycles: overrides.max_cycles.or(config.search.max_cycles),
    };
    limits
        .validate()
        .map_err(DepGraphError::from)
        .context("Invalid search limits")?;
    Ok(limits)
}

/// Full if any node carries its code object, so re-saving loses nothing.
pub fn mode_of(graph: &CallGraph) -> PersistMode {
    if graph.populated_count() > 0 {
        PersistMode::Full
    } else {
        PersistMode::StructureOnly
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
