use anyhow::{Context, Result};
use std::path::PathBuf;

use chartwatch::crawl::{run_crawl, CrawlOptions, HttpFetcher};
use chartwatch::model::IngestReport;
use chartwatch::{SnapshotRecord, Store};

use super::util;

pub fn exec(
    db: Option<PathBuf>,
    min_players: Option<i64>,
    max_pages: Option<u32>,
    out: Option<PathBuf>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let cfg = util::load_config(db);
    let mut store = if dry_run { None } else { Some(Store::open(&cfg)?) };

    let start_url = format!("{}/p.1", cfg.ranking_url);
    let fetcher = HttpFetcher::new();
    let opts = CrawlOptions {
        min_players,
        max_pages,
    };

    let mut totals = IngestReport::default();
    let mut captured: Vec<SnapshotRecord> = Vec::new();
    let keep = out.is_some();

    let report = run_crawl(&fetcher, &opts, &start_url, |batch| {
        if let Some(store) = store.as_mut() {
            let rep = store.ingest_batch(batch)?;
            totals.read += rep.read;
            totals.snapshots += rep.snapshots;
            totals.entities += rep.entities;
            totals.skipped += rep.skipped;
        }
        if keep {
            captured.extend_from_slice(batch);
        }
        Ok(())
    })?;

    if let Some(path) = out.as_ref() {
        let payload = serde_json::to_string_pretty(&captured).context("serializing capture")?;
        std::fs::write(path, payload)
            .with_context(|| format!("writing capture to {}", path.display()))?;
    }

    if json {
        let doc = serde_json::json!({
            "crawl": report,
            "ingest": totals,
            "dry_run": dry_run,
        });
        println!("{}", serde_json::to_string(&doc).context("serializing report")?);
        return Ok(());
    }

    println!("Crawl of {} finished: {}", cfg.ranking_url, report.stop);
    println!("  pages     = {}", report.pages);
    println!("  rows      = {}", report.rows);
    println!("  emitted   = {}", report.emitted);
    println!("  capture   = {}", report.timestamp);
    if dry_run {
        println!("  (dry run, nothing stored)");
    } else {
        println!("  snapshots = {}", totals.snapshots);
        println!("  entities  = {}", totals.entities);
        println!("  skipped   = {}", totals.skipped);
    }
    if let Some(path) = out {
        println!("  wrote {} records -> {}", captured.len(), path.display());
    }
    Ok(())
}
