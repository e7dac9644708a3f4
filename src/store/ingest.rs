//! Batch ingestion.
//!
//! Each batch is one transaction: either every valid record lands or none
//! do. Records missing their identifier or capture timestamp are tallied and
//! skipped inside the batch, not treated as failures. The entity row is
//! upserted before its snapshot so the reference always resolves.

use anyhow::{Context, Result};
use log::info;
use rusqlite::{params, Connection};

use crate::model::{
    now_ts, CatalogIngestReport, CatalogRecord, EntityFields, IngestReport, SnapshotRecord,
};
use crate::store::Store;

impl Store {
    /// Ingest one batch of snapshot records atomically. Returns the batch
    /// counters; a storage error aborts the whole batch.
    pub fn ingest_batch(&mut self, records: &[SnapshotRecord]) -> Result<IngestReport> {
        let tx = self
            .conn
            .transaction()
            .context("starting ingest transaction")?;
        let mut report = IngestReport {
            read: records.len() as u64,
            ..IngestReport::default()
        };

        for rec in records {
            let Some(app_id) = rec.app_id else {
                report.skipped += 1;
                continue;
            };
            let Some(ts) = rec.timestamp.as_deref() else {
                report.skipped += 1;
                continue;
            };
            let seed = EntityFields::seed(rec.name.clone(), Some(ts.to_string()));
            upsert_entity(&tx, app_id, &seed)?;
            report.entities += 1;
            upsert_snapshot(&tx, app_id, ts, rec)?;
            report.snapshots += 1;
        }

        tx.commit().context("committing ingest transaction")?;
        info!(
            "ingest: {} read, {} snapshots, {} entities, {} skipped",
            report.read, report.snapshots, report.entities, report.skipped
        );
        Ok(report)
    }

    /// Ingest catalog enrichment records atomically. Records without an id
    /// are tallied and skipped; a missing last_refreshed defaults to now so
    /// the refresh timestamp still moves forward.
    pub fn ingest_catalog(&mut self, records: &[CatalogRecord]) -> Result<CatalogIngestReport> {
        let tx = self
            .conn
            .transaction()
            .context("starting catalog transaction")?;
        let mut report = CatalogIngestReport {
            read: records.len() as u64,
            ..CatalogIngestReport::default()
        };

        for rec in records {
            let Some(app_id) = rec.app_id else {
                report.skipped += 1;
                continue;
            };
            let mut fields = rec.to_entity_fields();
            if fields.last_refreshed.is_none() {
                fields.last_refreshed = Some(now_ts());
            }
            upsert_entity(&tx, app_id, &fields)?;
            report.updated += 1;
        }

        tx.commit().context("committing catalog transaction")?;
        info!(
            "catalog ingest: {} read, {} updated, {} skipped",
            report.read, report.updated, report.skipped
        );
        Ok(report)
    }

    /// Insert a game row or merge fields into an existing one.
    pub fn upsert_entity(&self, app_id: i64, fields: &EntityFields) -> Result<()> {
        upsert_entity(&self.conn, app_id, fields)
    }

    /// Insert or replace one snapshot on its (app_id, ts) key. The game row
    /// must exist; [`Store::ingest_batch`] takes care of that ordering.
    pub fn upsert_snapshot(&self, app_id: i64, ts: &str, rec: &SnapshotRecord) -> Result<()> {
        upsert_snapshot(&self.conn, app_id, ts, rec)
    }
}

/// Field-level merge: absent incoming values never erase stored ones. The
/// refresh timestamp is the exception and always takes the incoming value.
fn upsert_entity(conn: &Connection, app_id: i64, fields: &EntityFields) -> Result<()> {
    conn.execute(
        "INSERT INTO games (
            app_id, name, short_description, release_date,
            developers, publishers, genres, categories,
            store_app_url, last_refreshed
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(app_id) DO UPDATE SET
            name              = COALESCE(excluded.name, games.name),
            short_description = COALESCE(excluded.short_description, games.short_description),
            release_date      = COALESCE(excluded.release_date, games.release_date),
            developers        = COALESCE(excluded.developers, games.developers),
            publishers        = COALESCE(excluded.publishers, games.publishers),
            genres            = COALESCE(excluded.genres, games.genres),
            categories        = COALESCE(excluded.categories, games.categories),
            store_app_url     = COALESCE(excluded.store_app_url, games.store_app_url),
            last_refreshed    = excluded.last_refreshed",
        params![
            app_id,
            fields.name,
            fields.short_description,
            fields.release_date,
            fields.developers_json,
            fields.publishers_json,
            fields.genres_json,
            fields.categories_json,
            fields.store_app_url,
            fields.last_refreshed,
        ],
    )
    .with_context(|| format!("upserting game {}", app_id))?;
    Ok(())
}

fn upsert_snapshot(conn: &Connection, app_id: i64, ts: &str, rec: &SnapshotRecord) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO snapshots
            (app_id, ts, rank, avg_players, peak_players, detail_url)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            app_id,
            ts,
            rec.rank,
            rec.avg_players,
            rec.peak_players,
            rec.detail_url,
        ],
    )
    .with_context(|| format!("writing snapshot for game {} at {}", app_id, ts))?;
    Ok(())
}
