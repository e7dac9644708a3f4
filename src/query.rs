//! Read-side query engine over the latest-state view.
//!
//! Filters (name/id text, metric floor, capture-date range) are combined
//! into one WHERE clause with bound parameters. Sort keys come from a fixed
//! allow-list; anything else silently falls back to the default ordering,
//! because the key is interpolated into SQL and must never carry request
//! input. Table and column names come from validated config only.
//!
//! The matching total is always counted before the page slice, so `total`
//! is stable across pages of the same filter.

use anyhow::{bail, Context, Result};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, OptionalExtension, Row};
use serde::Serialize;

use crate::config::Config;
use crate::model::LatestRow;
use crate::store::Store;

/// One query against the latest-state view.
#[derive(Clone, Debug)]
pub struct QueryParams {
    /// Name substring, or an exact app id when purely numeric.
    pub q: Option<String>,
    /// Sort key, optionally prefixed with '-' (descending) or '+'.
    pub sort: Option<String>,
    /// Inclusive floor on current players; zero disables.
    pub min_current: i64,
    /// Inclusive capture-date bounds, compared as ISO-8601 strings.
    pub from: Option<String>,
    pub to: Option<String>,
    /// 1-based page number.
    pub page: i64,
    /// Requested page size; capped by the configured maximum.
    pub size: i64,
}

impl QueryParams {
    /// Unfiltered first page at the configured default size.
    pub fn first_page(cfg: &Config) -> Self {
        Self {
            q: None,
            sort: None,
            min_current: 0,
            from: None,
            to: None,
            page: 1,
            size: i64::from(cfg.default_page_size),
        }
    }
}

/// One page of results plus the filter-wide total.
#[derive(Clone, Debug, Serialize)]
pub struct QueryPage {
    pub items: Vec<LatestRow>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
}

/// Run a filtered, sorted, paginated query. Non-positive page or size is a
/// caller error; an oversized page size is quietly capped.
pub fn run(store: &Store, cfg: &Config, params: &QueryParams) -> Result<QueryPage> {
    if params.page < 1 {
        bail!("page must be a positive number");
    }
    if params.size < 1 {
        bail!("page size must be a positive number");
    }
    let size = params.size.min(i64::from(cfg.max_page_size));
    let offset = (params.page - 1).saturating_mul(size);

    let (where_sql, mut args) = where_clause(cfg, params);

    let count_sql = format!("SELECT COUNT(*) FROM {}{}", cfg.latest_table, where_sql);
    let total: i64 = store
        .conn
        .query_row(&count_sql, params_from_iter(args.clone()), |r| r.get(0))
        .context("counting matching rows")?;

    let item_sql = format!(
        "SELECT {}, {}, {}, {}, {}, {} FROM {}{} {} LIMIT ? OFFSET ?",
        cfg.col_app_id,
        cfg.col_name,
        cfg.col_rank,
        cfg.col_current,
        cfg.col_peak,
        cfg.col_timestamp,
        cfg.latest_table,
        where_sql,
        order_clause(cfg, params.sort.as_deref()),
    );
    args.push(Value::from(size));
    args.push(Value::from(offset));

    let mut stmt = store
        .conn
        .prepare(&item_sql)
        .context("preparing page query")?;
    let rows = stmt
        .query_map(params_from_iter(args), latest_row)
        .context("querying page")?;
    let mut items = Vec::new();
    for row in rows {
        items.push(row.context("reading result row")?);
    }

    Ok(QueryPage {
        items,
        total,
        page: params.page,
        size,
    })
}

/// Latest state of a single game, or None when it has no snapshot yet.
pub fn get_game(store: &Store, cfg: &Config, app_id: i64) -> Result<Option<LatestRow>> {
    let sql = format!(
        "SELECT {}, {}, {}, {}, {}, {} FROM {} WHERE {} = ?1",
        cfg.col_app_id,
        cfg.col_name,
        cfg.col_rank,
        cfg.col_current,
        cfg.col_peak,
        cfg.col_timestamp,
        cfg.latest_table,
        cfg.col_app_id,
    );
    store
        .conn
        .query_row(&sql, [app_id], latest_row)
        .optional()
        .with_context(|| format!("looking up game {}", app_id))
}

fn latest_row(r: &Row<'_>) -> rusqlite::Result<LatestRow> {
    Ok(LatestRow {
        app_id: r.get(0)?,
        name: r.get(1)?,
        rank: r.get(2)?,
        current: r.get(3)?,
        peak: r.get(4)?,
        timestamp: r.get(5)?,
    })
}

fn where_clause(cfg: &Config, params: &QueryParams) -> (String, Vec<Value>) {
    let mut parts: Vec<String> = Vec::new();
    let mut args: Vec<Value> = Vec::new();

    if let Some(q) = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let numeric_id = if q.bytes().all(|b| b.is_ascii_digit()) {
            q.parse::<i64>().ok()
        } else {
            None
        };
        match numeric_id {
            Some(id) => {
                parts.push(format!(
                    "({} = ? OR LOWER({}) LIKE ?)",
                    cfg.col_app_id, cfg.col_name
                ));
                args.push(Value::from(id));
                args.push(Value::from(format!("%{}%", q.to_lowercase())));
            }
            None => {
                parts.push(format!("LOWER({}) LIKE ?", cfg.col_name));
                args.push(Value::from(format!("%{}%", q.to_lowercase())));
            }
        }
    }

    if params.min_current > 0 {
        parts.push(format!("{} >= ?", cfg.col_current));
        args.push(Value::from(params.min_current));
    }
    if let Some(from) = params.from.as_deref().filter(|s| !s.is_empty()) {
        parts.push(format!("{} >= ?", cfg.col_timestamp));
        args.push(Value::from(from.to_string()));
    }
    if let Some(to) = params.to.as_deref().filter(|s| !s.is_empty()) {
        parts.push(format!("{} <= ?", cfg.col_timestamp));
        args.push(Value::from(to.to_string()));
    }

    if parts.is_empty() {
        (String::new(), args)
    } else {
        (format!(" WHERE {}", parts.join(" AND ")), args)
    }
}

/// Map a sort request onto the allow-listed columns. '-' means descending,
/// '+' or no prefix ascending. An unknown key, or no key at all, orders by
/// current players descending.
fn order_clause(cfg: &Config, sort: Option<&str>) -> String {
    let raw = sort.unwrap_or("-current");
    let (desc, key) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };
    let dir = if desc { "DESC" } else { "ASC" };
    match key {
        "name" => format!("ORDER BY LOWER({}) {}", cfg.col_name, dir),
        "current" => format!("ORDER BY {} {}", cfg.col_current, dir),
        "peak" => format!("ORDER BY {} {}", cfg.col_peak, dir),
        "rank" => format!("ORDER BY {} {}", cfg.col_rank, dir),
        "timestamp" => format!("ORDER BY {} {}", cfg.col_timestamp, dir),
        _ => format!("ORDER BY {} DESC", cfg.col_current),
    }
}
