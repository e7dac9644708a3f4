use anyhow::{Context, Result};
use std::path::PathBuf;

use chartwatch::crawl::{fetch_catalog, HttpFetcher};
use chartwatch::Store;

use super::util;

pub fn exec(db: Option<PathBuf>, ids: PathBuf, out: Option<PathBuf>, json: bool) -> Result<()> {
    let cfg = util::load_config(db);
    let app_ids = util::read_id_lines(&ids)?;

    let fetcher = HttpFetcher::new();
    let (records, report) = fetch_catalog(&fetcher, &cfg.catalog_url, &app_ids)?;

    if let Some(path) = out.as_ref() {
        let payload = serde_json::to_string_pretty(&records).context("serializing records")?;
        std::fs::write(path, payload)
            .with_context(|| format!("writing records to {}", path.display()))?;
    }

    let mut store = Store::open(&cfg)?;
    let ingest = store.ingest_catalog(&records)?;

    if json {
        let doc = serde_json::json!({ "fetch": report, "ingest": ingest });
        println!("{}", serde_json::to_string(&doc).context("serializing report")?);
        return Ok(());
    }
    println!("Catalog fetch for {} ids:", report.requested);
    println!("  fetched = {}", report.fetched);
    println!("  skipped = {}", report.skipped);
    println!("  updated = {}", ingest.updated);
    if let Some(path) = out {
        println!("  wrote {} records -> {}", records.len(), path.display());
    }
    Ok(())
}
