use anyhow::{Context, Result};
use std::path::PathBuf;

use chartwatch::store::IdSource;
use chartwatch::Store;

use super::util;

pub fn exec(db: Option<PathBuf>, source: String, stale_days: u32, out: PathBuf) -> Result<()> {
    let cfg = util::load_config(db);
    let source: IdSource = source.parse()?;

    let store = Store::open_ro(&cfg)?;
    let ids = store.export_app_ids(source, stale_days)?;

    let mut body = String::with_capacity(ids.len() * 8);
    for id in &ids {
        body.push_str(&id.to_string());
        body.push('\n');
    }
    std::fs::write(&out, body).with_context(|| format!("writing {}", out.display()))?;

    println!("Wrote {} app ids -> {}", ids.len(), out.display());
    Ok(())
}
