//! Catalog detail fetch.
//!
//! One request per app id against the store's appdetails endpoint; no
//! pagination, no stop conditions. Delisted or age-gated apps answer with
//! success=false and are skipped quietly. A failed request skips that id and
//! the pass keeps going; enrichment is best-effort by nature.

use anyhow::Result;
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;

use crate::crawl::fetch::PageFetch;
use crate::model::{now_ts, CatalogRecord};

/// Counters from one catalog fetch pass.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct CatalogFetchReport {
    pub requested: u64,
    pub fetched: u64,
    pub skipped: u64,
}

/// Fetch catalog details for each id. Returns the records that resolved plus
/// the pass counters; ids that failed or answered unsuccessfully are only
/// counted.
pub fn fetch_catalog<F>(
    fetcher: &F,
    base_url: &str,
    app_ids: &[i64],
) -> Result<(Vec<CatalogRecord>, CatalogFetchReport)>
where
    F: PageFetch + ?Sized,
{
    let mut records = Vec::with_capacity(app_ids.len());
    let mut report = CatalogFetchReport {
        requested: app_ids.len() as u64,
        ..CatalogFetchReport::default()
    };

    for &app_id in app_ids {
        let url = format!(
            "{}/api/appdetails?appids={}&cc=us&l=en",
            base_url.trim_end_matches('/'),
            app_id
        );
        let body = match fetcher.fetch(&url) {
            Ok(b) => b,
            Err(e) => {
                warn!("catalog fetch for app {} failed: {:#}", app_id, e);
                report.skipped += 1;
                continue;
            }
        };
        match parse_appdetails(&body, app_id, base_url) {
            Some(rec) => {
                records.push(rec);
                report.fetched += 1;
            }
            None => {
                debug!("app {}: no catalog data (delisted or gated)", app_id);
                report.skipped += 1;
            }
        }
    }

    Ok((records, report))
}

/// Pull one record out of an appdetails response. The payload nests under
/// the stringified id: `{"730": {"success": true, "data": {...}}}`.
fn parse_appdetails(body: &str, app_id: i64, base_url: &str) -> Option<CatalogRecord> {
    let payload: Value = serde_json::from_str(body).ok()?;
    let node = payload.get(app_id.to_string())?;
    if !node.get("success").and_then(Value::as_bool).unwrap_or(false) {
        return None;
    }
    let data = node.get("data")?;

    Some(CatalogRecord {
        app_id: Some(app_id),
        name: str_field(data, "name"),
        short_description: str_field(data, "short_description"),
        release_date: data
            .get("release_date")
            .and_then(|r| r.get("date"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        developers: str_list(data.get("developers")),
        publishers: str_list(data.get("publishers")),
        genres: desc_list(data.get("genres")),
        categories: desc_list(data.get("categories")),
        store_app_url: Some(format!("{}/app/{}/", base_url.trim_end_matches('/'), app_id)),
        last_refreshed: Some(now_ts()),
    })
}

fn str_field(data: &Value, key: &str) -> Option<String> {
    data.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A JSON array of strings, dropping anything else.
fn str_list(v: Option<&Value>) -> Vec<String> {
    v.and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// A JSON array of `{"description": ...}` objects, keeping the descriptions.
fn desc_list(v: Option<&Value>) -> Vec<String> {
    v.and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|x| x.get("description").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
