use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chartwatch::crawl::{run_crawl, CrawlOptions, PageFetch};
use chartwatch::{query, Config, QueryParams, SnapshotRecord, StopReason, Store};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("cwtest-crawl-{prefix}-{pid}-{t}-{id}"))
}

fn file_config(prefix: &str) -> Result<Config> {
    let root = unique_root(prefix);
    fs::create_dir_all(&root)?;
    Ok(Config::default().with_db_path(root.join("snapshots.db")))
}

struct SiteFetch(HashMap<String, String>);

impl PageFetch for SiteFetch {
    fn fetch(&self, url: &str) -> Result<String> {
        self.0
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("no such page: {}", url))
    }
}

/// One ranking page; ranks continue from `first_rank` so multi-page fixtures
/// look like the real ranking.
fn page(first_rank: usize, rows: &[(i64, &str, i64)], next: Option<&str>) -> String {
    let mut html = String::from("<html><body><table class=\"common-table\"><tbody>\n");
    for (i, (id, name, avg)) in rows.iter().enumerate() {
        html.push_str(&format!(
            "<tr><td>{rank}.</td>\
             <td class=\"game-name\"><a href=\"/app/{id}/{slug}\">{name}</a></td>\
             <td>{avg}</td><td>+0</td><td>{peak}</td><td>1</td></tr>\n",
            rank = first_rank + i,
            id = id,
            slug = name.replace(' ', "-"),
            name = name,
            avg = avg,
            peak = avg * 2,
        ));
    }
    html.push_str("</tbody></table>\n");
    if let Some(href) = next {
        html.push_str(&format!(
            "<ul class=\"pagination\"><li class=\"next\">\
             <a class=\"page-link next\" rel=\"next\" href=\"{}\">Next &gt;</a>\
             </li></ul>\n",
            href
        ));
    }
    html.push_str("</body></html>");
    html
}

fn two_page_site() -> SiteFetch {
    let mut pages = HashMap::new();
    pages.insert(
        "https://ranking.test/top/p.1".to_string(),
        page(
            1,
            &[(10, "Alpha", 900), (20, "Beta", 850), (30, "Gamma", 700)],
            Some("/top/p.2"),
        ),
    );
    pages.insert(
        "https://ranking.test/top/p.2".to_string(),
        page(
            4,
            &[(40, "Delta", 650), (50, "Epsilon", 400), (60, "Zeta", 300)],
            None,
        ),
    );
    SiteFetch(pages)
}

#[test]
fn threshold_crawl_lands_in_store() -> Result<()> {
    let cfg = file_config("threshold")?;
    let fetch = two_page_site();
    let opts = CrawlOptions {
        min_players: Some(600),
        max_pages: None,
    };

    // crawl straight into the store, one batch per page
    let report = {
        let mut store = Store::open(&cfg)?;
        run_crawl(&fetch, &opts, "https://ranking.test/top/p.1", |batch| {
            store.ingest_batch(batch)?;
            Ok(())
        })?
    };

    assert_eq!(report.stop, StopReason::ThresholdCrossed { value: 400 });
    assert_eq!(report.pages, 2);
    assert_eq!(report.emitted, 4);

    // the breach row and everything behind it never reached the store
    let store = Store::open_ro(&cfg)?;
    let st = store.status()?;
    assert_eq!(st.games, 4);
    assert_eq!(st.snapshots, 4);
    assert_eq!(st.latest_capture.as_deref(), Some(report.timestamp.as_str()));

    let page = query::run(&store, &cfg, &QueryParams::first_page(&cfg))?;
    assert_eq!(page.total, 4);
    let ids: Vec<i64> = page.items.iter().map(|r| r.app_id).collect();
    assert_eq!(ids, vec![10, 20, 30, 40]);

    let delta = query::get_game(&store, &cfg, 40)?.expect("delta stored");
    assert_eq!(delta.current, Some(650));
    assert_eq!(delta.peak, Some(1300));
    assert_eq!(delta.rank, Some(4));
    assert_eq!(delta.timestamp, report.timestamp);

    assert!(query::get_game(&store, &cfg, 50)?.is_none());
    assert!(query::get_game(&store, &cfg, 60)?.is_none());
    Ok(())
}

#[test]
fn full_crawl_without_floor_reaches_the_last_page() -> Result<()> {
    let cfg = file_config("full")?;
    let fetch = two_page_site();

    let mut order: Vec<Vec<i64>> = Vec::new();
    let report = {
        let mut store = Store::open(&cfg)?;
        run_crawl(
            &fetch,
            &CrawlOptions::default(),
            "https://ranking.test/top/p.1",
            |batch| {
                order.push(batch.iter().filter_map(|r| r.app_id).collect());
                store.ingest_batch(batch)?;
                Ok(())
            },
        )?
    };

    assert_eq!(report.stop, StopReason::NoNextLink);
    // batches arrive in page order
    assert_eq!(order, vec![vec![10, 20, 30], vec![40, 50, 60]]);

    let store = Store::open_ro(&cfg)?;
    assert_eq!(store.status()?.snapshots, 6);
    Ok(())
}

#[test]
fn page_ceiling_keeps_later_pages_out() -> Result<()> {
    let cfg = file_config("ceiling")?;
    let fetch = two_page_site();
    let opts = CrawlOptions {
        min_players: None,
        max_pages: Some(1),
    };

    let report = {
        let mut store = Store::open(&cfg)?;
        run_crawl(&fetch, &opts, "https://ranking.test/top/p.1", |batch| {
            store.ingest_batch(batch)?;
            Ok(())
        })?
    };

    assert_eq!(report.stop, StopReason::MaxPages);
    assert_eq!(report.pages, 1);

    let store = Store::open_ro(&cfg)?;
    assert_eq!(store.status()?.snapshots, 3);
    assert!(query::get_game(&store, &cfg, 40)?.is_none());
    Ok(())
}

#[test]
fn committed_pages_survive_a_failing_sink() -> Result<()> {
    let cfg = file_config("abort")?;
    let fetch = two_page_site();

    let mut seen_pages = 0u32;
    let err = {
        let mut store = Store::open(&cfg)?;
        run_crawl(
            &fetch,
            &CrawlOptions::default(),
            "https://ranking.test/top/p.1",
            |batch| {
                seen_pages += 1;
                if seen_pages > 1 {
                    return Err(anyhow!("simulated ingest outage"));
                }
                store.ingest_batch(batch)?;
                Ok(())
            },
        )
        .unwrap_err()
    };
    assert!(format!("{:#}", err).contains("simulated ingest outage"));

    // page 1 was committed before page 2 was ever fetched
    let store = Store::open_ro(&cfg)?;
    let st = store.status()?;
    assert_eq!(st.snapshots, 3);
    assert!(query::get_game(&store, &cfg, 10)?.is_some());
    assert!(query::get_game(&store, &cfg, 40)?.is_none());
    Ok(())
}

#[test]
fn empty_page_stores_nothing() -> Result<()> {
    let cfg = file_config("empty")?;
    let mut pages = HashMap::new();
    pages.insert(
        "https://ranking.test/top/p.1".to_string(),
        "<html><body><p>down for maintenance</p></body></html>".to_string(),
    );
    let fetch = SiteFetch(pages);

    let report = {
        let mut store = Store::open(&cfg)?;
        run_crawl(
            &fetch,
            &CrawlOptions::default(),
            "https://ranking.test/top/p.1",
            |batch| {
                store.ingest_batch(batch)?;
                Ok(())
            },
        )?
    };

    assert_eq!(report.stop, StopReason::EmptyPage);
    assert_eq!(report.emitted, 0);

    let store = Store::open_ro(&cfg)?;
    let st = store.status()?;
    assert_eq!(st.games, 0);
    assert_eq!(st.snapshots, 0);
    assert_eq!(st.latest_capture, None);
    Ok(())
}

#[test]
fn detail_urls_are_absolutized_against_the_page() -> Result<()> {
    let fetch = two_page_site();
    let mut hrefs: Vec<String> = Vec::new();
    run_crawl(
        &fetch,
        &CrawlOptions::default(),
        "https://ranking.test/top/p.1",
        |batch: &[SnapshotRecord]| {
            hrefs.extend(batch.iter().filter_map(|r| r.detail_url.clone()));
            Ok(())
        },
    )?;

    assert_eq!(hrefs.len(), 6);
    assert_eq!(hrefs[0], "https://ranking.test/app/10/Alpha");
    assert!(hrefs.iter().all(|h| h.starts_with("https://ranking.test/app/")));
    Ok(())
}
