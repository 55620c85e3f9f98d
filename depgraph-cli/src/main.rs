use std::path::PathBuf;

use clap::Parser;

use depgraph_core::error::{ConfigError, DepGraphError, GraphError, PersistError, StoreError};

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "depgraph",
    version,
    about = "Build, persist and analyze call-dependency graphs of PL/SQL code"
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Config file (default: ./depgraph.toml if present)
    #[arg(long, global = true, env = "DEPGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Map an error to the process exit code.
///
/// Exit codes:
///   0  success
///   1  general/unknown error
///   2  configuration error
///   3  node id not found in the graph
///   4  code-object store error
///   5  graph file missing, unreadable or in the wrong format
fn classify_exit_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<DepGraphError>() {
            return match e {
                DepGraphError::Config(_) => 2,
                DepGraphError::Graph(_) => 3,
                DepGraphError::Store(_) => 4,
                DepGraphError::Persist(_) => 5,
                DepGraphError::Build(_) | DepGraphError::Analyze(_) => 1,
            };
        }
        if cause.is::<ConfigError>() {
            return 2;
        }
        if cause.is::<GraphError>() {
            return 3;
        }
        if cause.is::<StoreError>() {
            return 4;
        }
        if cause.is::<PersistError>() {
            return 5;
        }
    }
    1
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let filter = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (_, 0) => "warn",
        (_, 1) => "info",
        (_, 2) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: Failed to create runtime: {e}");
            std::process::exit(1);
        }
    };

    let global = commands::GlobalOpts {
        config: cli.config,
        quiet: cli.quiet,
    };
    match runtime.block_on(commands::run(cli.command, &global)) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(classify_exit_code(&e));
        }
    }
}
