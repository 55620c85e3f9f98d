use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use depgraph_core::analyze::{
    Cycle, GraphSummary, SearchLimits, find_circular_dependencies_within, find_entry_points,
    find_terminal_nodes, get_connected_components, summarize,
};
use depgraph_core::config::DepGraphConfig;
use depgraph_core::persist::GraphFormat;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Graph file to analyze
    pub graph: PathBuf,

    /// Input format (default: from extension)
    #[arg(long)]
    pub format: Option<GraphFormat>,

    /// Leave unresolved (unknown-kind) nodes out of the terminal list
    #[arg(long)]
    pub exclude_unresolved: bool,

    /// Longest cycle to report, in nodes (default: from config)
    #[arg(long)]
    pub max_cycle_length: Option<usize>,

    /// Stop after this many cycles (default: from config)
    #[arg(long)]
    pub max_cycles: Option<usize>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct AnalysisReport {
    summary: GraphSummary,
    entry_points: Vec<String>,
    terminal_nodes: Vec<String>,
    cycles: Vec<Cycle>,
    cycles_truncated: bool,
    /// Strongly-connected components with more than one member.
    cyclic_components: Vec<Vec<String>>,
    weak_components: Vec<Vec<String>>,
}

pub fn run(args: AnalyzeArgs, config: &DepGraphConfig) -> anyhow::Result<()> {
    let limits = super::search_limits(
        config,
        SearchLimits {
            max_cycle_length: args.max_cycle_length,
            max_cycles: args.max_cycles,
            ..SearchLimits::default()
        },
    )?;
    let graph = super::load_graph(&args.graph, args.format)?;
    let search = find_circular_dependencies_within(&graph, &limits);

    let report = AnalysisReport {
        summary: summarize(&graph),
        entry_points: find_entry_points(&graph),
        terminal_nodes: find_terminal_nodes(&graph, args.exclude_unresolved),
        cycles: search.cycles,
        cycles_truncated: search.truncated,
        cyclic_components: get_connected_components(&graph, true)
            .into_iter()
            .filter(|c| c.len() > 1)
            .collect(),
        weak_components: get_connected_components(&graph, false),
    };

    if args.json {
        return super::print_json(&report);
    }
    print_text(&report);
    Ok(())
}

fn print_text(report: &AnalysisReport) {
    let s = &report.summary;
    println!("Graph: {} nodes, {} edges, {} self-loops", s.nodes, s.edges, s.self_loops);
    println!(
        "  Density {:.4}, {} populated / {} placeholder nodes",
        s.density, s.populated_nodes, s.placeholder_nodes
    );
    println!(
        "  {} weak components (largest {}), {} cyclic components",
        s.weak_components, s.largest_weak_component, s.cyclic_components
    );
    println!();

    print_list("Entry points", &report.entry_points);
    print_list("Terminal nodes", &report.terminal_nodes);

    let suffix = if report.cycles_truncated { " (truncated)" } else { "" };
    println!("Cycles: {}{suffix}", report.cycles.len());
    for cycle in &report.cycles {
        println!("  {cycle}");
    }
    println!();

    println!("Strongly-connected components: {}", report.cyclic_components.len());
    for comp in &report.cyclic_components {
        println!("  [{}]", comp.join(", "));
    }
}

fn print_list(title: &str, ids: &[String]) {
    println!("{title}: {}", ids.len());
    for id in ids {
        println!("  {id}");
    }
    println!();
}
