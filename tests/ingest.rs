use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chartwatch::model::parse_snapshot_records;
use chartwatch::store::IdSource;
use chartwatch::{query, CatalogRecord, Config, SnapshotRecord, Store};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("cwtest-ingest-{prefix}-{pid}-{t}-{id}"))
}

fn file_config(prefix: &str) -> Result<Config> {
    let root = unique_root(prefix);
    fs::create_dir_all(&root)?;
    Ok(Config::default().with_db_path(root.join("snapshots.db")))
}

fn snap(app_id: i64, name: &str, ts: &str, avg: i64) -> SnapshotRecord {
    SnapshotRecord {
        app_id: Some(app_id),
        name: Some(name.to_string()),
        timestamp: Some(ts.to_string()),
        rank: None,
        avg_players: Some(avg),
        peak_players: Some(avg * 2),
        detail_url: None,
    }
}

const T1: &str = "2024-03-01T09:00:00";
const T2: &str = "2024-03-02T09:00:00";

#[test]
fn reingest_of_the_same_capture_is_a_noop() -> Result<()> {
    let cfg = file_config("idem")?;
    let batch = vec![snap(10, "Alpha", T1, 500), snap(20, "Beta", T1, 400)];

    let mut store = Store::open(&cfg)?;
    let first = store.ingest_batch(&batch)?;
    assert_eq!(first.read, 2);
    assert_eq!(first.snapshots, 2);
    assert_eq!(first.entities, 2);
    assert_eq!(first.skipped, 0);

    let before = store.status()?;
    store.ingest_batch(&batch)?;
    store.ingest_batch(&batch)?;
    let after = store.status()?;

    assert_eq!(before.games, after.games);
    assert_eq!(before.snapshots, after.snapshots);

    // content unchanged too
    let row = query::get_game(&store, &cfg, 10)?.expect("alpha");
    assert_eq!(row.current, Some(500));
    assert_eq!(row.timestamp, T1);
    Ok(())
}

#[test]
fn batch_into_readonly_store_fails_without_partial_writes() -> Result<()> {
    let cfg = file_config("atomic")?;

    // seed through a writer, then reopen the same file read-only
    let mut store = Store::open(&cfg)?;
    store.ingest_batch(&[snap(10, "Alpha", T1, 500)])?;
    drop(store);

    let mut ro = Store::open_ro(&cfg)?;
    let batch = vec![snap(20, "Beta", T2, 400), snap(30, "Gamma", T2, 300)];
    assert!(ro.ingest_batch(&batch).is_err());

    // the failed batch left no trace, in counts or in content
    let st = ro.status()?;
    assert_eq!(st.games, 1);
    assert_eq!(st.snapshots, 1);
    assert_eq!(st.latest_capture.as_deref(), Some(T1));
    assert!(query::get_game(&ro, &cfg, 20)?.is_none());
    assert!(query::get_game(&ro, &cfg, 30)?.is_none());
    Ok(())
}

#[test]
fn records_without_identity_are_tallied_not_stored() -> Result<()> {
    let cfg = file_config("skips")?;
    let batch = vec![
        snap(10, "Alpha", T1, 500),
        SnapshotRecord {
            app_id: None,
            name: Some("lost".to_string()),
            timestamp: Some(T1.to_string()),
            ..SnapshotRecord::default()
        },
        SnapshotRecord {
            app_id: Some(20),
            name: Some("Beta".to_string()),
            timestamp: None,
            ..SnapshotRecord::default()
        },
    ];

    let mut store = Store::open(&cfg)?;
    let report = store.ingest_batch(&batch)?;
    assert_eq!(report.read, 3);
    assert_eq!(report.snapshots, 1);
    assert_eq!(report.skipped, 2);

    let st = store.status()?;
    assert_eq!(st.games, 1);
    assert_eq!(st.snapshots, 1);
    Ok(())
}

#[test]
fn file_payloads_round_through_the_lenient_parser() -> Result<()> {
    let cfg = file_config("payload")?;
    // app_id as digit string, aliased field names, one bad id
    let payload = r#"[
        {"appid": "730", "name": "Counter-Strike 2", "ts": "2024-03-01T09:00:00", "avg": 1002518, "peak": "1458374"},
        {"app_id": 570, "name": "Dota 2", "timestamp": "2024-03-01T09:00:00", "avg_players": 522101},
        {"app_id": "soon", "name": "Unannounced", "timestamp": "2024-03-01T09:00:00"}
    ]"#;
    let records = parse_snapshot_records(payload)?;
    assert_eq!(records.len(), 3);

    let mut store = Store::open(&cfg)?;
    let report = store.ingest_batch(&records)?;
    assert_eq!(report.snapshots, 2);
    assert_eq!(report.skipped, 1);

    let cs2 = query::get_game(&store, &cfg, 730)?.expect("cs2");
    assert_eq!(cs2.current, Some(1_002_518));
    assert_eq!(cs2.peak, Some(1_458_374));
    Ok(())
}

#[test]
fn merge_fills_nulls_without_erasing() -> Result<()> {
    let cfg = file_config("merge")?;
    let mut store = Store::open(&cfg)?;

    // catalog first: name plus description
    let catalog = CatalogRecord {
        app_id: Some(10),
        name: Some("Alpha".to_string()),
        short_description: Some("A fine game".to_string()),
        developers: vec!["Alpha Works".to_string()],
        last_refreshed: Some("2020-01-01T00:00:00".to_string()),
        ..CatalogRecord::default()
    };
    store.ingest_catalog(&[catalog])?;

    // a nameless snapshot later must not blank the name
    store.ingest_batch(&[SnapshotRecord {
        app_id: Some(10),
        name: None,
        timestamp: Some(T2.to_string()),
        avg_players: Some(700),
        ..SnapshotRecord::default()
    }])?;

    let row = query::get_game(&store, &cfg, 10)?.expect("alpha");
    assert_eq!(row.name.as_deref(), Some("Alpha"));
    assert_eq!(row.current, Some(700));

    // and a catalog record with empty fields keeps the description too
    store.ingest_catalog(&[CatalogRecord {
        app_id: Some(10),
        ..CatalogRecord::default()
    }])?;
    let row = query::get_game(&store, &cfg, 10)?.expect("alpha");
    assert_eq!(row.name.as_deref(), Some("Alpha"));
    Ok(())
}

#[test]
fn refresh_timestamp_always_moves_forward() -> Result<()> {
    let cfg = file_config("refresh")?;
    let mut store = Store::open(&cfg)?;

    store.ingest_catalog(&[CatalogRecord {
        app_id: Some(10),
        name: Some("Alpha".to_string()),
        last_refreshed: Some("2020-01-01T00:00:00".to_string()),
        ..CatalogRecord::default()
    }])?;

    // refreshed six years ago: stale for any recent cutoff
    let stale = store.export_app_ids(IdSource::Games, 30)?;
    assert_eq!(stale, vec![10]);

    // re-ingest without a timestamp: defaults to now, no longer stale
    store.ingest_catalog(&[CatalogRecord {
        app_id: Some(10),
        ..CatalogRecord::default()
    }])?;
    let stale = store.export_app_ids(IdSource::Games, 30)?;
    assert!(stale.is_empty());

    // without a cutoff every id comes back
    let all = store.export_app_ids(IdSource::Games, 0)?;
    assert_eq!(all, vec![10]);
    Ok(())
}

#[test]
fn export_sources_cover_games_snapshots_and_union() -> Result<()> {
    let cfg = file_config("sources")?;
    let mut store = Store::open(&cfg)?;

    store.ingest_batch(&[snap(20, "Beta", T1, 400), snap(10, "Alpha", T1, 500)])?;
    // catalog-only entity: present in games, absent from snapshots
    store.ingest_catalog(&[CatalogRecord {
        app_id: Some(99),
        name: Some("Ghost".to_string()),
        ..CatalogRecord::default()
    }])?;

    assert_eq!(store.export_app_ids(IdSource::Games, 0)?, vec![10, 20, 99]);
    assert_eq!(store.export_app_ids(IdSource::Snapshots, 0)?, vec![10, 20]);
    assert_eq!(store.export_app_ids(IdSource::Union, 0)?, vec![10, 20, 99]);

    // the catalog-only entity has no latest state
    assert!(query::get_game(&store, &cfg, 99)?.is_none());
    Ok(())
}

#[test]
fn catalog_attributes_survive_for_the_read_side() -> Result<()> {
    let cfg = file_config("attrs")?;
    let mut store = Store::open(&cfg)?;

    store.ingest_catalog(&[CatalogRecord {
        app_id: Some(730),
        name: Some("Counter-Strike 2".to_string()),
        short_description: Some("The CS you know".to_string()),
        release_date: Some("2012-08-21".to_string()),
        developers: vec!["Valve".to_string()],
        publishers: vec!["Valve".to_string()],
        genres: vec!["Action".to_string(), "Free To Play".to_string()],
        categories: vec!["Multi-player".to_string()],
        store_app_url: Some("https://store.test/app/730/".to_string()),
        last_refreshed: None,
    }])?;
    store.ingest_batch(&[snap(730, "Counter-Strike 2", T1, 1_002_518)])?;

    // name flows through the latest view; the rest sits on the games row
    let row = query::get_game(&store, &cfg, 730)?.expect("cs2");
    assert_eq!(row.name.as_deref(), Some("Counter-Strike 2"));
    assert_eq!(row.current, Some(1_002_518));
    Ok(())
}
