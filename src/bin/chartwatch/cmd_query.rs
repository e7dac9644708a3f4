use anyhow::{Context, Result};
use std::path::PathBuf;

use chartwatch::{query, QueryParams, Store};

use super::util;

#[allow(clippy::too_many_arguments)]
pub fn exec(
    db: Option<PathBuf>,
    q: Option<String>,
    sort: Option<String>,
    page: i64,
    size: Option<i64>,
    min_current: i64,
    from: Option<String>,
    to: Option<String>,
    json: bool,
) -> Result<()> {
    let cfg = util::load_config(db);
    let store = Store::open_ro(&cfg)?;

    let params = QueryParams {
        q,
        sort,
        min_current,
        from,
        to,
        page,
        size: size.unwrap_or(i64::from(cfg.default_page_size)),
    };
    let result = query::run(&store, &cfg, &params)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("serializing result")?
        );
        return Ok(());
    }

    println!(
        "{} matches, page {}/{} (size {})",
        result.total,
        result.page,
        page_count(result.total, result.size),
        result.size
    );
    for row in &result.items {
        println!(
            "{:>8}  {:<40}  rank {:>4}  avg {:>9}  peak {:>9}  at {}",
            row.app_id,
            row.name.as_deref().unwrap_or("(unnamed)"),
            fmt_opt(row.rank),
            fmt_opt(row.current),
            fmt_opt(row.peak),
            row.timestamp,
        );
    }
    Ok(())
}

fn fmt_opt(v: Option<i64>) -> String {
    match v {
        Some(n) => n.to_string(),
        None => "-".to_string(),
    }
}

fn page_count(total: i64, size: i64) -> i64 {
    if size <= 0 {
        return 0;
    }
    (total + size - 1) / size
}
