use std::path::PathBuf;

use clap::Args;

use depgraph_core::DepGraphError;
use depgraph_core::analyze::{SearchLimits, find_all_paths};
use depgraph_core::config::DepGraphConfig;
use depgraph_core::persist::GraphFormat;

#[derive(Args, Debug)]
pub struct PathsArgs {
    /// Graph file
    pub graph: PathBuf,

    /// Starting node id
    #[arg(long)]
    pub from: String,

    /// Target node id
    #[arg(long)]
    pub to: String,

    /// Maximum path length in edges (default: from config, else unlimited)
    #[arg(long)]
    pub cutoff: Option<usize>,

    /// Input format (default: from extension)
    #[arg(long)]
    pub format: Option<GraphFormat>,

    /// Print paths as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: PathsArgs, config: &DepGraphConfig) -> anyhow::Result<()> {
    let limits = super::search_limits(
        config,
        SearchLimits {
            path_cutoff: args.cutoff,
            ..SearchLimits::default()
        },
    )?;
    let graph = super::load_graph(&args.graph, args.format)?;
    let paths = find_all_paths(&graph, &args.from, &args.to, limits.path_cutoff).map_err(DepGraphError::from)?;

    if args.json {
        return super::print_json(&paths);
    }

    println!("{} path(s) from {} to {}:", paths.len(), args.from, args.to);
    for path in &paths {
        println!("  {}", path.join(" -> "));
    }
    Ok(())
}
