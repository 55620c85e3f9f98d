use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use depgraph_core::config::DepGraphConfig;
use depgraph_core::persist::{self, GraphFormat, PersistMode};
use depgraph_core::store::SqliteStore;

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input graph file
    pub input: PathBuf,

    /// Output graph file
    pub output: PathBuf,

    /// Input format (default: from input extension)
    #[arg(long)]
    pub from: Option<GraphFormat>,

    /// Output format (default: from output extension)
    #[arg(long)]
    pub to: Option<GraphFormat>,

    /// Persistence mode for the output (default: from config)
    #[arg(long)]
    pub mode: Option<PersistMode>,

    /// Rehydrate placeholder nodes from the code-object store first
    #[arg(long)]
    pub populate: bool,

    /// Code-object database used by --populate (default: from config)
    #[arg(long)]
    pub database: Option<PathBuf>,
}

pub async fn run(args: ConvertArgs, config: &DepGraphConfig) -> anyhow::Result<()> {
    let mut graph = super::load_graph(&args.input, args.from)?;

    if args.populate {
        let db_path = args.database.unwrap_or_else(|| config.store.database.clone());
        let store = SqliteStore::open_existing(&db_path)
            .with_context(|| format!("Cannot open database: {}", db_path.display()))?;
        let stats = persist::populate(&mut graph, &store)
            .await
            .context("Failed to rehydrate graph")?;
        println!(
            "Rehydrated {}/{} placeholder nodes ({} missing from store)",
            stats.populated,
            stats.requested,
            stats.gaps.len()
        );
    }

    let format = super::output_format(args.to, &args.output, config);
    let mode = args.mode.unwrap_or(config.graph.mode);
    let saved = persist::save(&graph, &args.output, format, mode)
        .with_context(|| format!("Cannot save graph: {}", args.output.display()))?;

    println!(
        "Converted {} -> {} ({}, {}): {} nodes, {} edges",
        args.input.display(),
        saved.path.display(),
        saved.format,
        saved.mode,
        saved.nodes,
        saved.edges
    );
    Ok(())
}
