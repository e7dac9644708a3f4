use anyhow::{Context, Result};
use std::path::PathBuf;

use chartwatch::Store;

use super::util;

pub fn exec(db: Option<PathBuf>, json: bool) -> Result<()> {
    let cfg = util::load_config(db);
    let store = Store::open_ro(&cfg)?;
    let st = store.status()?;

    if json {
        println!("{}", serde_json::to_string(&st).context("serializing status")?);
        return Ok(());
    }
    println!("DB {}", cfg.db_path.display());
    println!("  games          = {}", st.games);
    println!("  snapshots      = {}", st.snapshots);
    println!(
        "  latest_capture = {}",
        st.latest_capture.as_deref().unwrap_or("(none)")
    );
    Ok(())
}
