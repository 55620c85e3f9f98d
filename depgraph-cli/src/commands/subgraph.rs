use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use depgraph_core::config::DepGraphConfig;
use depgraph_core::persist::{self, GraphFormat, PersistMode};
use depgraph_core::subgraph::SubgraphRequest;

#[derive(Args, Debug)]
pub struct SubgraphArgs {
    /// Source graph file
    pub graph: PathBuf,

    /// Id of the node to focus on
    #[arg(long)]
    pub focus: String,

    /// Caller hops to include
    #[arg(long, default_value = "1")]
    pub up: usize,

    /// Callee hops to include (default: unlimited)
    #[arg(long)]
    pub down: Option<usize>,

    /// Output graph file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Input format (default: from extension)
    #[arg(long)]
    pub format: Option<GraphFormat>,

    /// Output format (default: from output extension)
    #[arg(long)]
    pub to: Option<GraphFormat>,

    /// Persistence mode for the output (default: same as the input)
    #[arg(long)]
    pub mode: Option<PersistMode>,
}

pub fn run(args: SubgraphArgs, config: &DepGraphConfig) -> anyhow::Result<()> {
    let graph = super::load_graph(&args.graph, args.format)?;

    let sub = SubgraphRequest::new(args.focus.as_str())
        .upstream(args.up)
        .downstream(args.down)
        .generate(&graph)
        .map_err(depgraph_core::DepGraphError::from)?;

    let format = super::output_format(args.to, &args.output, config);
    let mode = args.mode.unwrap_or_else(|| super::mode_of(&sub));
    let saved = persist::save(&sub, &args.output, format, mode)
        .with_context(|| format!("Cannot save subgraph: {}", args.output.display()))?;

    println!(
        "Subgraph around {}: {} nodes, {} edges -> {} ({format})",
        args.focus,
        saved.nodes,
        saved.edges,
        saved.path.display()
    );
    Ok(())
}
