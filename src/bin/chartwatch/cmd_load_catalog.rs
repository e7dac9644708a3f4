use anyhow::{Context, Result};
use std::path::PathBuf;

use chartwatch::model::parse_catalog_records;
use chartwatch::Store;

use super::util;

pub fn exec(db: Option<PathBuf>, file: PathBuf, json: bool) -> Result<()> {
    let cfg = util::load_config(db);
    let text =
        std::fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
    let records = parse_catalog_records(&text)
        .with_context(|| format!("parsing {}", file.display()))?;

    let mut store = Store::open(&cfg)?;
    let report = store.ingest_catalog(&records)?;

    if json {
        println!("{}", serde_json::to_string(&report).context("serializing report")?);
        return Ok(());
    }
    println!("Loaded {} into {}", file.display(), cfg.db_path.display());
    println!("  read    = {}", report.read);
    println!("  updated = {}", report.updated);
    println!("  skipped = {}", report.skipped);
    Ok(())
}
