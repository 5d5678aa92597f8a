use crate::prelude::{println, *};
use classifieds_core::listing::ListingId;
use colored::Colorize;
use serde_json::Value;
use std::path::PathBuf;

use crate::store::{ListingStore, SqliteStore};

#[derive(Debug, Clone, clap::Args)]
pub struct ImportOptions {
    /// JSON file holding an array of listing documents
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// Insert `documents` in order, returning the identifiers they were stored under
///
/// Either every document is stored or none is.
pub fn import_documents(store: &dyn ListingStore, documents: &[Value]) -> Result<Vec<ListingId>> {
    store
        .insert_all(documents)
        .map_err(|e| eyre!("Import failed, no listings were stored: {e}"))
}

pub fn parse_documents(text: &str) -> Result<Vec<Value>> {
    match serde_json::from_str::<Value>(text).context("Import file is not valid JSON")? {
        Value::Array(documents) => Ok(documents),
        other => Err(eyre!(
            "Import file must hold a JSON array of documents, found {}",
            json_kind(&other)
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub async fn run(options: ImportOptions, global: crate::Global) -> Result<()> {
    let text = tokio::fs::read_to_string(&options.file)
        .await
        .map_err(|e| eyre!("Failed to read {}: {}", options.file.display(), e))?;
    let documents = parse_documents(&text)?;

    let database = global.database_path()?;
    let store = SqliteStore::open(&database, 1)
        .map_err(|e| eyre!("Failed to open database {}: {}", database.display(), e))?;

    let ids = import_documents(&store, &documents)?;

    log::info!("Imported {} listings into {}", ids.len(), database.display());
    println!("{}", f!("Imported {} listings", ids.len()).green().bold());
    if global.verbose {
        for id in &ids {
            println!("  {}", id.to_string().cyan());
        }
    }

    Ok(())
}
