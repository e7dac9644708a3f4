//! Centralized configuration for chartwatch.
//!
//! Goals:
//! - Single place to collect tunables instead of scattering env lookups.
//! - Config::from_env() reads the CW_* env vars; fluent with_* setters allow
//!   overrides from CLI flags and tests.
//! - validate() is called once at process start by both binaries: every
//!   identifier-shaped field (latest view name, column names) must match a
//!   strict pattern before it is ever interpolated into SQL. A violation is a
//!   startup error, never a per-request one.

use std::fmt;
use std::path::PathBuf;

use anyhow::{anyhow, Result};

/// Top-level configuration (crawler, store, query layer, HTTP API).
#[derive(Clone, Debug)]
pub struct Config {
    /// SQLite database path.
    /// Env: CW_DB (default "chartwatch.db")
    pub db_path: PathBuf,

    /// Base URL of the paginated ranking (page 1 lives at <ranking_url>/p.1).
    /// Env: CW_RANKING_URL (default "https://steamcharts.com/top")
    pub ranking_url: String,

    /// Base URL of the catalog detail API.
    /// Env: CW_CATALOG_URL (default "https://store.steampowered.com")
    pub catalog_url: String,

    /// Bind address for the query API server.
    /// Env: CW_HTTP_ADDR (default "127.0.0.1:8077")
    pub http_addr: String,

    /// Name of the latest-state view the query layer reads from.
    /// Env: CW_LATEST_TABLE (default "game_latest")
    pub latest_table: String,

    /// Column names of the latest-state view, in case a deployment maps the
    /// view onto an existing table with different names.
    /// Env: CW_COL_APP_ID / CW_COL_NAME / CW_COL_RANK / CW_COL_CURRENT /
    ///      CW_COL_PEAK / CW_COL_TIMESTAMP
    pub col_app_id: String,
    pub col_name: String,
    pub col_rank: String,
    pub col_current: String,
    pub col_peak: String,
    pub col_timestamp: String,

    /// Page size used when a query does not specify one.
    /// Env: CW_DEFAULT_PAGE_SIZE (default 25)
    pub default_page_size: u32,

    /// Hard cap on the requested page size.
    /// Env: CW_MAX_PAGE_SIZE (default 200)
    pub max_page_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("chartwatch.db"),
            ranking_url: "https://steamcharts.com/top".to_string(),
            catalog_url: "https://store.steampowered.com".to_string(),
            http_addr: "127.0.0.1:8077".to_string(),
            latest_table: "game_latest".to_string(),
            col_app_id: "app_id".to_string(),
            col_name: "name".to_string(),
            col_rank: "rank".to_string(),
            col_current: "current".to_string(),
            col_peak: "peak".to_string(),
            col_timestamp: "timestamp".to_string(),
            default_page_size: 25,
            max_page_size: 200,
        }
    }
}

impl Config {
    /// Load configuration from CW_* environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("CW_DB") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.db_path = PathBuf::from(s);
            }
        }
        if let Ok(v) = std::env::var("CW_RANKING_URL") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.ranking_url = s.trim_end_matches('/').to_string();
            }
        }
        if let Ok(v) = std::env::var("CW_CATALOG_URL") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.catalog_url = s.trim_end_matches('/').to_string();
            }
        }
        if let Ok(v) = std::env::var("CW_HTTP_ADDR") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.http_addr = s.to_string();
            }
        }
        if let Ok(v) = std::env::var("CW_LATEST_TABLE") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.latest_table = s.to_string();
            }
        }

        for (var, slot) in [
            ("CW_COL_APP_ID", &mut cfg.col_app_id),
            ("CW_COL_NAME", &mut cfg.col_name),
            ("CW_COL_RANK", &mut cfg.col_rank),
            ("CW_COL_CURRENT", &mut cfg.col_current),
            ("CW_COL_PEAK", &mut cfg.col_peak),
            ("CW_COL_TIMESTAMP", &mut cfg.col_timestamp),
        ] {
            if let Ok(v) = std::env::var(var) {
                let s = v.trim();
                if !s.is_empty() {
                    *slot = s.to_string();
                }
            }
        }

        if let Ok(v) = std::env::var("CW_DEFAULT_PAGE_SIZE") {
            if let Ok(n) = v.trim().parse::<u32>() {
                cfg.default_page_size = n;
            }
        }
        if let Ok(v) = std::env::var("CW_MAX_PAGE_SIZE") {
            if let Ok(n) = v.trim().parse::<u32>() {
                cfg.max_page_size = n;
            }
        }

        cfg
    }

    // ----- fluent setters (builder-style overrides) -----

    pub fn with_db_path<P: Into<PathBuf>>(mut self, p: P) -> Self {
        self.db_path = p.into();
        self
    }

    pub fn with_ranking_url<S: Into<String>>(mut self, url: S) -> Self {
        self.ranking_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_catalog_url<S: Into<String>>(mut self, url: S) -> Self {
        self.catalog_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_http_addr<S: Into<String>>(mut self, addr: S) -> Self {
        self.http_addr = addr.into();
        self
    }

    pub fn with_latest_table<S: Into<String>>(mut self, name: S) -> Self {
        self.latest_table = name.into();
        self
    }

    pub fn with_max_page_size(mut self, n: u32) -> Self {
        self.max_page_size = n;
        self
    }

    /// Validate everything that must be right before serving or writing:
    /// identifier-shaped fields and page-size bounds. Call once at startup.
    pub fn validate(&self) -> Result<()> {
        for (what, ident) in [
            ("latest_table", self.latest_table.as_str()),
            ("col_app_id", self.col_app_id.as_str()),
            ("col_name", self.col_name.as_str()),
            ("col_rank", self.col_rank.as_str()),
            ("col_current", self.col_current.as_str()),
            ("col_peak", self.col_peak.as_str()),
            ("col_timestamp", self.col_timestamp.as_str()),
        ] {
            if !is_valid_ident(ident) {
                return Err(anyhow!("invalid identifier for {}: {:?}", what, ident));
            }
        }
        if self.default_page_size == 0 || self.max_page_size == 0 {
            return Err(anyhow!("page sizes must be positive"));
        }
        if self.default_page_size > self.max_page_size {
            return Err(anyhow!(
                "default_page_size {} exceeds max_page_size {}",
                self.default_page_size,
                self.max_page_size
            ));
        }
        Ok(())
    }
}

/// Strict SQL identifier check: letters/digits/underscore, no leading digit.
pub fn is_valid_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Config {{ db: {}, ranking: {}, catalog: {}, http: {}, latest_table: {}, page_size: {}/{} }}",
            self.db_path.display(),
            self.ranking_url,
            self.catalog_url,
            self.http_addr,
            self.latest_table,
            self.default_page_size,
            self.max_page_size,
        )
    }
}
