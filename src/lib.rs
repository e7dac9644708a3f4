// Core modules
pub mod config;
pub mod model;

// Pipeline modules (folders with mod.rs)
pub mod extract; // src/extract/{mod,html,row}.rs
pub mod crawl;   // src/crawl/{mod,fetch,next_link,pager,catalog}.rs
pub mod store;   // src/store/{mod,schema,ingest}.rs

// Read side
pub mod query;
pub mod api;

// Convenience re-exports
pub use config::Config;
pub use crawl::{CrawlOptions, CrawlReport, StopReason};
pub use model::{CatalogRecord, IngestReport, LatestRow, SnapshotRecord};
pub use query::{QueryPage, QueryParams};
pub use store::Store;
