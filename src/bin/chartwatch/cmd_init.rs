use anyhow::Result;
use std::path::PathBuf;

use chartwatch::Store;

use super::util;

pub fn exec(db: Option<PathBuf>) -> Result<()> {
    let cfg = util::load_config(db);
    let store = Store::open(&cfg)?;
    let st = store.status()?;
    println!("Initialized DB at {}", cfg.db_path.display());
    println!("  games     = {}", st.games);
    println!("  snapshots = {}", st.snapshots);
    Ok(())
}
