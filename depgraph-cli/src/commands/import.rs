use std::io::BufReader;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::{error, warn};

use depgraph_core::config::DepGraphConfig;
use depgraph_core::error::BuildError;
use depgraph_core::store::{CodeObjectStore, SqliteStore};
use depgraph_core::types::CodeObject;

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// JSON file holding an array of extracted code objects
    pub input: PathBuf,

    /// Code-object database, created if missing (default: from config)
    #[arg(long)]
    pub database: Option<PathBuf>,
}

pub async fn run(args: ImportArgs, config: &DepGraphConfig) -> anyhow::Result<()> {
    let file = std::fs::File::open(&args.input)
        .with_context(|| format!("Cannot read code objects: {}", args.input.display()))?;
    let records: Vec<serde_json::Value> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Invalid code-object JSON: {}", args.input.display()))?;
    let (objects, skipped) = decode_objects(records);

    let db_path = args.database.unwrap_or_else(|| config.store.database.clone());
    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("Cannot open database: {}", db_path.display()))?;
    let written = store
        .upsert_objects_batch(&objects)
        .await
        .context("Failed to write code objects")?;
    let stats = store.stats().await?;

    println!(
        "Imported {written} code objects into {} ({} total, {skipped} skipped)",
        db_path.display(),
        stats.total_objects
    );
    Ok(())
}

/// Decode each record on its own so one malformed entry does not sink the
/// batch. Returns the objects and the number of records skipped.
fn decode_objects(records: Vec<serde_json::Value>) -> (Vec<CodeObject>, usize) {
    let mut objects = Vec::with_capacity(records.len());
    let mut skipped = 0;
    for (index, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<CodeObject>(record) {
            Ok(object) => objects.push(object),
            Err(e) => {
                let err = BuildError::MalformedInput {
                    id: format!("#{index}"),
                    reason: e.to_string(),
                };
                error!(index, "{err}");
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        warn!(skipped, kept = objects.len(), "Skipped malformed code-object records");
    }
    (objects, skipped)
}
