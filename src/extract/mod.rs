//! Ranking-page extraction.
//!
//! - html: small case-insensitive tag scanner (no DOM, no external parser).
//! - row: turns the ranking table into a lazy stream of snapshot records.
//!
//! Extraction is total: a row that cannot be parsed is skipped, a field that
//! cannot be parsed becomes None. Nothing in here returns an error.

pub mod html;
pub mod row;

pub use row::{clean_int, rank_rows, RankRows};
