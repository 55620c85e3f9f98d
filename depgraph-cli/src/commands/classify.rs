use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use depgraph_core::DepGraphError;
use depgraph_core::analyze::{Classification, NodeRole, annotate_roles, classify_nodes_with};
use depgraph_core::config::DepGraphConfig;
use depgraph_core::persist::{self, GraphFormat};

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Graph file
    pub graph: PathBuf,

    /// Input format (default: from extension)
    #[arg(long)]
    pub format: Option<GraphFormat>,

    /// Only list nodes with this role (e.g. hub, utility, orphan)
    #[arg(long)]
    pub role: Option<String>,

    /// Write role and centrality attributes back into a graph file
    #[arg(long)]
    pub annotate: bool,

    /// Where to write the annotated graph (default: overwrite the input)
    #[arg(short, long, requires = "annotate")]
    pub output: Option<PathBuf>,

    /// Print the classification as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ClassifyArgs, config: &DepGraphConfig) -> anyhow::Result<()> {
    let mut graph = super::load_graph(&args.graph, args.format)?;

    let role_filter = match args.role.as_deref() {
        Some(name) => Some(parse_role(name)?),
        None => None,
    };

    let classification = classify_nodes_with(&graph, &config.classify, &config.centrality)
        .map_err(DepGraphError::from)?;

    if args.annotate {
        let updated = annotate_roles(&mut graph, &classification);
        let output = args.output.clone().unwrap_or_else(|| args.graph.clone());
        let format = match args.format {
            Some(f) if output == args.graph => f,
            _ => super::output_format(None, &output, config),
        };
        persist::save(&graph, &output, format, super::mode_of(&graph))
            .with_context(|| format!("Cannot save annotated graph: {}", output.display()))?;
        if !args.json {
            println!("Annotated {updated} nodes -> {}", output.display());
        }
    }

    if args.json {
        return super::print_json(&classification);
    }
    print_table(&classification, role_filter);
    Ok(())
}

fn parse_role(name: &str) -> anyhow::Result<NodeRole> {
    let normalized = name.trim().to_lowercase().replace('-', "_");
    NodeRole::ALL
        .into_iter()
        .find(|r| r.as_str() == normalized)
        .with_context(|| {
            let names: Vec<&str> = NodeRole::ALL.iter().map(NodeRole::as_str).collect();
            format!("Unknown role: {name}. Use one of: {}", names.join(", "))
        })
}

const ID_WIDTH: usize = 48;

/// Keep the tail of `id` so it fits `width` characters, marking the cut
/// with `..`.
fn shorten_id(id: &str, width: usize) -> String {
    let len = id.chars().count();
    if len <= width {
        return id.to_string();
    }
    let keep = width.saturating_sub(2);
    let tail: String = id.chars().skip(len - keep).collect();
    format!("..{tail}")
}

fn print_table(classification: &Classification, filter: Option<NodeRole>) {
    let counts = classification.counts();
    let summary: Vec<String> = counts.iter().map(|(r, n)| format!("{r} {n}")).collect();
    println!("Roles: {}", summary.join(", "));
    println!();
    println!(
        "{:<48} {:<13} {:>5} {:>5} {:>11} {:>9}",
        "Node", "Role", "In", "Out", "Betweenness", "PageRank"
    );
    println!("{:-<96}", "");

    for (id, role) in &classification.roles {
        if filter.is_some_and(|f| f != *role) {
            continue;
        }
        let Some(m) = classification.metrics.get(id) else {
            continue;
        };
        let display_id = shorten_id(id, ID_WIDTH);
        println!(
            "{display_id:<48} {:<13} {:>5} {:>5} {:>11.4} {:>9.4}",
            role.as_str(),
            m.in_degree,
            m.out_degree,
            m.betweenness,
            m.pagerank
        );
    }
}
