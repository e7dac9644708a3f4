//! The page loop.
//!
//! One crawl run walks the ranking from page 1 until a stop condition fires:
//!   - a page with no extractable rows,
//!   - the primary metric dropping below the configured floor,
//!   - the configured page ceiling,
//!   - no resolvable next-page link.
//! All four are successful terminations, not errors. The floor check trusts
//! that the ranking is ordered by average players non-increasing: the first
//! row under the floor ends the run at that row, rows behind it are never
//! emitted.
//!
//! Every emitted row is stamped with one run-level capture timestamp, so a
//! whole run lands under a single snapshot key per game and a re-run of the
//! same capture replaces instead of duplicating.

use anyhow::{Context, Result};
use log::{debug, info};
use serde::Serialize;
use std::fmt;

use crate::crawl::fetch::PageFetch;
use crate::crawl::next_link;
use crate::extract::rank_rows;
use crate::model::{now_ts, SnapshotRecord};

/// Tunables for one crawl run.
#[derive(Clone, Debug, Default)]
pub struct CrawlOptions {
    /// Stop once a row's average players falls below this floor.
    pub min_players: Option<i64>,
    /// Stop after this many pages.
    pub max_pages: Option<u32>,
}

/// Why a crawl run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A fetched page had no ranking rows.
    EmptyPage,
    /// A row's average players fell below the floor; `value` is that reading.
    ThresholdCrossed { value: i64 },
    /// The configured page ceiling was reached.
    MaxPages,
    /// No strategy could resolve a next-page link.
    NoNextLink,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::EmptyPage => write!(f, "empty page"),
            StopReason::ThresholdCrossed { value } => {
                write!(f, "threshold crossed at {}", value)
            }
            StopReason::MaxPages => write!(f, "max pages reached"),
            StopReason::NoNextLink => write!(f, "no next link"),
        }
    }
}

/// Summary of a finished crawl run.
#[derive(Clone, Debug, Serialize)]
pub struct CrawlReport {
    /// Pages fetched, including the one that triggered the stop.
    pub pages: u32,
    /// Rows scanned across all pages.
    pub rows: u64,
    /// Records emitted to the sink.
    pub emitted: u64,
    pub stop: StopReason,
    /// Capture timestamp stamped on every emitted record.
    pub timestamp: String,
}

/// Walk the ranking starting at `start_url`, handing each page's emitted
/// records to `sink` in page order. The sink is expected to commit before
/// returning; a run aborted mid-flight then keeps every page it completed.
pub fn run_crawl<F, S>(
    fetcher: &F,
    opts: &CrawlOptions,
    start_url: &str,
    mut sink: S,
) -> Result<CrawlReport>
where
    F: PageFetch + ?Sized,
    S: FnMut(&[SnapshotRecord]) -> Result<()>,
{
    let run_ts = now_ts();
    let mut url = start_url.to_string();
    let mut page_no: u32 = 0;
    let mut rows_total: u64 = 0;
    let mut emitted: u64 = 0;

    let stop = loop {
        page_no += 1;
        let body = fetcher
            .fetch(&url)
            .with_context(|| format!("fetching ranking page {} ({})", page_no, url))?;

        let mut batch: Vec<SnapshotRecord> = Vec::new();
        let mut rows_on_page: u64 = 0;
        let mut min_seen: Option<i64> = None;
        let mut breached: Option<i64> = None;

        for mut rec in rank_rows(&body) {
            rows_on_page += 1;
            if let Some(avg) = rec.avg_players {
                min_seen = Some(min_seen.map_or(avg, |m| m.min(avg)));
            }
            if let (Some(floor), Some(avg)) = (opts.min_players, rec.avg_players) {
                if avg < floor {
                    breached = Some(avg);
                    break;
                }
            }
            rec.timestamp = Some(run_ts.clone());
            rec.detail_url = rec.detail_url.map(|h| next_link::join_url(&url, &h));
            batch.push(rec);
        }
        rows_total += rows_on_page;

        if rows_on_page == 0 {
            info!("page {}: no rows at {}, crawl ends", page_no, url);
            break StopReason::EmptyPage;
        }

        info!(
            "page {}: {} rows, {} emitted, min avg on page {:?}",
            page_no,
            rows_on_page,
            batch.len(),
            min_seen
        );

        if !batch.is_empty() {
            emitted += batch.len() as u64;
            sink(&batch).with_context(|| format!("ingesting page {}", page_no))?;
        }

        if let Some(value) = breached {
            info!(
                "page {}: avg players {} fell below floor {}, stopping",
                page_no,
                value,
                opts.min_players.unwrap_or(0)
            );
            break StopReason::ThresholdCrossed { value };
        }

        if let Some(cap) = opts.max_pages {
            if page_no >= cap {
                info!("reached page ceiling {}, stopping", cap);
                break StopReason::MaxPages;
            }
        }

        match next_link::next_href(&body) {
            Some(href) => {
                url = next_link::join_url(&url, &href);
                debug!("following next link to {}", url);
            }
            None => {
                info!("page {}: no next link, crawl finished", page_no);
                break StopReason::NoNextLink;
            }
        }
    };

    Ok(CrawlReport {
        pages: page_no,
        rows: rows_total,
        emitted,
        stop,
        timestamp: run_ts,
    })
}
