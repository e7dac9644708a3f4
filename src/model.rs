//! Record types shared across the pipeline.
//!
//! - SnapshotRecord: one observation of a game, as produced by the crawler
//!   and consumed by ingestion. All fields except app_id survive as NULLs.
//! - CatalogRecord: enrichment payload for the games table (descriptions,
//!   dates, list-valued attributes stored as JSON text).
//! - LatestRow: the read-side shape served by the query layer.
//! - Ingest reports: counters returned by batch operations.
//!
//! Ingestion payloads are lenient on purpose: app_id may arrive as a JSON
//! number or a digit string, and a single object is accepted where an array
//! is expected. Anything that cannot be coerced degrades to None and is
//! skipped (and tallied) downstream, never a parse abort.

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// One crawled or file-loaded observation. Identity key downstream is
/// (app_id, timestamp); either may be absent here, ingestion decides.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SnapshotRecord {
    #[serde(default, alias = "appid", deserialize_with = "de_lenient_i64")]
    pub app_id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "ts")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_i64")]
    pub rank: Option<i64>,
    #[serde(default, alias = "avg", deserialize_with = "de_lenient_i64")]
    pub avg_players: Option<i64>,
    #[serde(default, alias = "peak", deserialize_with = "de_lenient_i64")]
    pub peak_players: Option<i64>,
    #[serde(default)]
    pub detail_url: Option<String>,
}

/// Catalog enrichment payload for one game. List fields are kept as lists
/// here and serialized to JSON text at store time.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogRecord {
    #[serde(default, alias = "appid", deserialize_with = "de_lenient_i64")]
    pub app_id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub developers: Vec<String>,
    #[serde(default)]
    pub publishers: Vec<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub store_app_url: Option<String>,
    #[serde(default)]
    pub last_refreshed: Option<String>,
}

/// Field set written into the games row by an entity upsert. Every field is
/// merged COALESCE-style (fill only if currently NULL) except last_refreshed,
/// which always takes the incoming value; ingest paths always supply one.
#[derive(Clone, Debug, Default)]
pub struct EntityFields {
    pub name: Option<String>,
    pub short_description: Option<String>,
    pub release_date: Option<String>,
    pub developers_json: Option<String>,
    pub publishers_json: Option<String>,
    pub genres_json: Option<String>,
    pub categories_json: Option<String>,
    pub store_app_url: Option<String>,
    pub last_refreshed: Option<String>,
}

impl EntityFields {
    /// Minimal field set used when seeding an entity from a crawl row.
    pub fn seed(name: Option<String>, last_refreshed: Option<String>) -> Self {
        Self {
            name,
            last_refreshed,
            ..Self::default()
        }
    }
}

impl CatalogRecord {
    pub fn to_entity_fields(&self) -> EntityFields {
        EntityFields {
            name: clean_opt(&self.name),
            short_description: clean_opt(&self.short_description),
            release_date: clean_opt(&self.release_date),
            developers_json: list_to_json(&self.developers),
            publishers_json: list_to_json(&self.publishers),
            genres_json: list_to_json(&self.genres),
            categories_json: list_to_json(&self.categories),
            store_app_url: clean_opt(&self.store_app_url),
            last_refreshed: clean_opt(&self.last_refreshed),
        }
    }
}

/// One row of the latest-state view, served by the query layer.
#[derive(Clone, Debug, Serialize)]
pub struct LatestRow {
    pub app_id: i64,
    pub name: Option<String>,
    pub rank: Option<i64>,
    pub current: Option<i64>,
    pub peak: Option<i64>,
    pub timestamp: String,
}

/// Counters from a snapshot batch ingest.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct IngestReport {
    /// Records read from the payload.
    pub read: u64,
    /// Snapshot rows written (insert or replace).
    pub snapshots: u64,
    /// Entity rows inserted or merged.
    pub entities: u64,
    /// Records skipped for a missing app_id or timestamp.
    pub skipped: u64,
}

/// Counters from a catalog batch ingest.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct CatalogIngestReport {
    pub read: u64,
    pub updated: u64,
    pub skipped: u64,
}

/// Parse an ingestion payload: a JSON array of records, or a single record
/// object (wrapped into a one-element batch).
pub fn parse_snapshot_records(text: &str) -> Result<Vec<SnapshotRecord>> {
    parse_records(text)
}

/// Catalog flavor of [`parse_snapshot_records`].
pub fn parse_catalog_records(text: &str) -> Result<Vec<CatalogRecord>> {
    parse_records(text)
}

fn parse_records<T: DeserializeOwned>(text: &str) -> Result<Vec<T>> {
    let value: serde_json::Value =
        serde_json::from_str(text).context("payload is not valid JSON")?;
    match value {
        serde_json::Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                let rec = serde_json::from_value(item)
                    .with_context(|| format!("record #{} has an unexpected shape", i))?;
                out.push(rec);
            }
            Ok(out)
        }
        obj @ serde_json::Value::Object(_) => {
            let rec = serde_json::from_value(obj).context("record has an unexpected shape")?;
            Ok(vec![rec])
        }
        other => bail!("expected a JSON array or object, got {}", json_kind(&other)),
    }
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Accept an integer field as a JSON number, a digit string, or null. Every
/// other shape (boolean, array, nested object) degrades to None rather than
/// a parse error, so one sloppy record cannot abort a whole batch.
fn de_lenient_i64<'de, D>(d: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(d)? {
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Some(i),
            None => n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64),
        },
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

fn clean_opt(v: &Option<String>) -> Option<String> {
    match v {
        Some(s) => {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        }
        None => None,
    }
}

/// Serialize a list attribute as JSON text; empty lists store as NULL so the
/// COALESCE merge never overwrites real data with an empty marker.
fn list_to_json(items: &[String]) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    serde_json::to_string(items).ok()
}

/// Current UTC time as a second-precision ISO-8601 string. Fixed width, so
/// snapshot timestamps compare correctly as plain strings.
pub fn now_ts() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}
