use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use serde::Serialize;

use depgraph_core::config::DepGraphConfig;
use depgraph_core::construct::{BuildStats, GraphBuilder};
use depgraph_core::persist::{self, GraphFormat, PersistMode, SaveStats};
use depgraph_core::progress::IndicatifReporter;
use depgraph_core::store::{LoadOptions, SqliteStore};

use super::GlobalOpts;

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Output graph file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Code-object database (default: from config)
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Output format: binary, graphml, json, gexf (default: from extension)
    #[arg(long)]
    pub format: Option<GraphFormat>,

    /// Persistence mode: full, structure-only (default: from config)
    #[arg(long)]
    pub mode: Option<PersistMode>,

    /// Print build statistics as JSON
    #[arg(long)]
    pub json: bool,

    /// List every unresolved and ambiguous call
    #[arg(long)]
    pub details: bool,
}

#[derive(Serialize)]
struct BuildReport<'a> {
    saved: &'a SaveStats,
    stats: &'a BuildStats,
    duration_ms: u128,
}

pub async fn run(args: BuildArgs, config: &DepGraphConfig, global: &GlobalOpts) -> anyhow::Result<()> {
    let db_path = args.database.unwrap_or_else(|| config.store.database.clone());
    let store = SqliteStore::open_existing(&db_path)
        .with_context(|| format!("Cannot open database: {}", db_path.display()))?;

    let reporter = if global.quiet || args.json {
        IndicatifReporter::hidden()
    } else {
        IndicatifReporter::new()
    };
    let builder = GraphBuilder::new().with_reporter(Arc::new(reporter));
    let outcome = builder
        .build_from_store(&store, LoadOptions::default())
        .await
        .context("Failed to build call graph")?;

    let format = super::output_format(args.format, &args.output, config);
    let mode = args.mode.unwrap_or(config.graph.mode);
    let saved = persist::save(&outcome.graph, &args.output, format, mode)
        .with_context(|| format!("Cannot save graph: {}", args.output.display()))?;

    let stats = &outcome.stats;
    if args.json {
        return super::print_json(&BuildReport {
            saved: &saved,
            stats,
            duration_ms: stats.duration.as_millis(),
        });
    }

    println!(
        "Built call graph: {} nodes, {} edges ({} call sites, {} self-loops)",
        stats.nodes_added, stats.edges_added, stats.call_sites, stats.self_loops
    );
    println!(
        "  Unresolved: {}  Ambiguous: {}  Malformed: {}",
        stats.unresolved.len(),
        stats.ambiguous.len(),
        stats.malformed.len()
    );
    println!(
        "  Saved {} ({}, {}, {} bytes)",
        saved.path.display(),
        saved.format,
        saved.mode,
        saved.bytes
    );

    if args.details {
        for m in &stats.malformed {
            println!("  malformed   {}", m.to_error());
        }
        for u in &stats.unresolved {
            println!("  unresolved  {} -> {} (line {})", u.caller, u.callee_name, u.line);
        }
        for a in &stats.ambiguous {
            println!(
                "  ambiguous   {} -> {} (line {}): chose {} of [{}]",
                a.caller,
                a.callee_name,
                a.line,
                a.chosen,
                a.candidates.join(", ")
            );
        }
    }
    Ok(())
}
