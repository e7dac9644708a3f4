use anyhow::{Context, Result};
use std::path::PathBuf;

use chartwatch::Config;

/// Env-derived config with the --db override applied.
pub fn load_config(db: Option<PathBuf>) -> Config {
    let cfg = Config::from_env();
    match db {
        Some(p) => cfg.with_db_path(p),
        None => cfg,
    }
}

/// Read an app-id file: one id per line, blank lines and #-comments allowed.
pub fn read_id_lines(path: &PathBuf) -> Result<Vec<i64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading id file {}", path.display()))?;
    let mut ids = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let t = line.trim();
        if t.is_empty() || t.starts_with('#') {
            continue;
        }
        let id: i64 = t
            .parse()
            .with_context(|| format!("bad app id at {}:{}", path.display(), lineno + 1))?;
        ids.push(id);
    }
    Ok(ids)
}
