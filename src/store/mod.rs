//! SQLite snapshot store.
//!
//! Two tables and a view:
//! - games: one row per tracked game, slowly-changing catalog attributes.
//! - snapshots: one row per (game, capture timestamp) observation.
//! - a latest-state view joining each game to its most recent snapshot,
//!   recreated from config at every writer open.
//!
//! Writers open read-write with WAL journaling and keep transactions short;
//! readers open a separate read-only connection so queries never wait on an
//! ingest. Re-running an ingest is safe: snapshots replace on their key,
//! game attributes merge without losing information.

pub mod ingest;
pub mod schema;

use std::collections::BTreeSet;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use chrono::{Duration, Utc};
use log::debug;
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;

use crate::config::Config;

/// Handle to the snapshot database. Obtained via [`Store::open`] for writers
/// and [`Store::open_ro`] for read-only consumers.
pub struct Store {
    pub(crate) conn: Connection,
}

impl Store {
    /// Open read-write, creating the file and schema as needed. The
    /// latest-state view is dropped and recreated so it always matches the
    /// configured table and column names.
    pub fn open(cfg: &Config) -> Result<Self> {
        cfg.validate()?;
        let conn = Connection::open_with_flags(
            &cfg.db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("opening database at {}", cfg.db_path.display()))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .context("setting WAL journal mode")?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .context("setting synchronous mode")?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .context("enabling foreign keys")?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .context("setting busy timeout")?;

        schema::ensure(&conn, cfg)?;
        debug!("store open (rw) at {}", cfg.db_path.display());
        Ok(Self { conn })
    }

    /// Open read-only. The schema must already exist; run an init or a crawl
    /// first on a fresh database.
    pub fn open_ro(cfg: &Config) -> Result<Self> {
        cfg.validate()?;
        let conn = Connection::open_with_flags(
            &cfg.db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| {
            format!(
                "opening database at {} read-only (does it exist yet?)",
                cfg.db_path.display()
            )
        })?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .context("enabling foreign keys")?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .context("setting busy timeout")?;
        debug!("store open (ro) at {}", cfg.db_path.display());
        Ok(Self { conn })
    }

    /// Row counts and the newest capture timestamp.
    pub fn status(&self) -> Result<StoreStatus> {
        let games: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM games", [], |r| r.get(0))
            .context("counting games")?;
        let snapshots: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM snapshots", [], |r| r.get(0))
            .context("counting snapshots")?;
        let latest_capture: Option<String> = self
            .conn
            .query_row("SELECT MAX(ts) FROM snapshots", [], |r| r.get(0))
            .context("reading newest capture timestamp")?;
        Ok(StoreStatus {
            games,
            snapshots,
            latest_capture,
        })
    }

    /// Export app ids for a catalog refresh, sorted ascending and
    /// deduplicated. With `stale_days > 0`, ids from the games side are
    /// limited to rows whose last_refreshed is absent or older than the
    /// cutoff; the pure snapshot source has no refresh column to filter on.
    pub fn export_app_ids(&self, source: IdSource, stale_days: u32) -> Result<Vec<i64>> {
        let base_sql = match source {
            IdSource::Games => "SELECT app_id FROM games",
            IdSource::Snapshots => "SELECT DISTINCT app_id FROM snapshots",
            IdSource::Union => {
                "SELECT app_id FROM games UNION SELECT DISTINCT app_id FROM snapshots"
            }
        };

        let mut ids = BTreeSet::new();
        if stale_days > 0 && source != IdSource::Snapshots {
            let cutoff = (Utc::now() - Duration::days(i64::from(stale_days)))
                .format("%Y-%m-%dT%H:%M:%S")
                .to_string();
            let sql = format!(
                "SELECT t.app_id FROM ({}) AS t \
                 LEFT JOIN games g ON g.app_id = t.app_id \
                 WHERE g.last_refreshed IS NULL OR g.last_refreshed < ?1",
                base_sql
            );
            let mut stmt = self.conn.prepare(&sql).context("preparing id export")?;
            let rows = stmt
                .query_map([&cutoff], |r| r.get::<_, i64>(0))
                .context("querying stale ids")?;
            for id in rows {
                ids.insert(id.context("reading id row")?);
            }
        } else {
            let mut stmt = self.conn.prepare(base_sql).context("preparing id export")?;
            let rows = stmt
                .query_map([], |r| r.get::<_, i64>(0))
                .context("querying ids")?;
            for id in rows {
                ids.insert(id.context("reading id row")?);
            }
        }
        Ok(ids.into_iter().collect())
    }
}

/// Snapshot of store size, for status output.
#[derive(Clone, Debug, Serialize)]
pub struct StoreStatus {
    pub games: u64,
    pub snapshots: u64,
    pub latest_capture: Option<String>,
}

/// Which rows feed an app-id export.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdSource {
    Games,
    Snapshots,
    Union,
}

impl FromStr for IdSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "games" => Ok(IdSource::Games),
            "snapshots" => Ok(IdSource::Snapshots),
            "union" => Ok(IdSource::Union),
            other => Err(anyhow!(
                "unknown id source {:?} (expected games, snapshots or union)",
                other
            )),
        }
    }
}
