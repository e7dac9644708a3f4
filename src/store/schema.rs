//! Schema management.
//!
//! Tables are created if missing; the latest-state view is dropped and
//! recreated on every writer open so renaming it (or its columns) in config
//! takes effect without a migration. All interpolated identifiers come from
//! a validated [`Config`], never from request input.
//!
//! Latest-state rule: the snapshot with the highest capture timestamp wins;
//! equal timestamps (only possible across replaced rows) fall back to the
//! highest rowid, so the view always yields exactly one row per game.

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::config::Config;

const TABLES: &str = "
CREATE TABLE IF NOT EXISTS games (
    app_id            INTEGER PRIMARY KEY,
    name              TEXT,
    short_description TEXT,
    release_date      TEXT,
    developers        TEXT,
    publishers        TEXT,
    genres            TEXT,
    categories        TEXT,
    store_app_url     TEXT,
    last_refreshed    TEXT
);

CREATE TABLE IF NOT EXISTS snapshots (
    app_id       INTEGER NOT NULL REFERENCES games(app_id),
    ts           TEXT NOT NULL,
    rank         INTEGER,
    avg_players  INTEGER,
    peak_players INTEGER,
    detail_url   TEXT,
    PRIMARY KEY (app_id, ts)
);

CREATE INDEX IF NOT EXISTS idx_games_name ON games(name);
CREATE INDEX IF NOT EXISTS idx_snapshots_ts ON snapshots(ts);
";

/// Create tables and indexes as needed, then rebuild the latest-state view
/// from the configured names.
pub fn ensure(conn: &Connection, cfg: &Config) -> Result<()> {
    conn.execute_batch(TABLES).context("creating tables")?;

    let view = format!(
        "DROP VIEW IF EXISTS {table};
         CREATE VIEW {table} AS
         SELECT
             g.app_id       AS {app_id},
             g.name         AS {name},
             s.rank         AS {rank},
             s.avg_players  AS {current},
             s.peak_players AS {peak},
             s.ts           AS {timestamp}
         FROM games g
         JOIN snapshots s ON s.app_id = g.app_id
         WHERE s.rowid = (
             SELECT s2.rowid FROM snapshots s2
             WHERE s2.app_id = g.app_id
             ORDER BY s2.ts DESC, s2.rowid DESC
             LIMIT 1
         );",
        table = cfg.latest_table,
        app_id = cfg.col_app_id,
        name = cfg.col_name,
        rank = cfg.col_rank,
        current = cfg.col_current,
        peak = cfg.col_peak,
        timestamp = cfg.col_timestamp,
    );
    conn.execute_batch(&view)
        .context("creating latest-state view")?;
    Ok(())
}
