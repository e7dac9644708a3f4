//! Crawling: the paginated ranking walk and the one-shot catalog fetch.
//!
//! - fetch: the PageFetch trait and its HTTP implementation.
//! - next_link: ordered strategies for resolving the "next page" link.
//! - pager: the page loop with its stop conditions.
//! - catalog: per-id detail fetch for entity enrichment.
//!
//! The pager drives everything: fetch a page, stream its rows, hand the
//! emitted batch to a sink, decide whether to continue. Batches are handed
//! over in page order and committed before the next fetch starts, so an
//! aborted run keeps every fully processed page.

pub mod catalog;
pub mod fetch;
pub mod next_link;
pub mod pager;

pub use catalog::{fetch_catalog, CatalogFetchReport};
pub use fetch::{HttpFetcher, PageFetch};
pub use pager::{run_crawl, CrawlOptions, CrawlReport, StopReason};
