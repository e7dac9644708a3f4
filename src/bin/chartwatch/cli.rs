use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI for the chartwatch crawl-and-ingest pipeline
#[derive(Parser, Debug)]
#[command(name = "chartwatch", version, about = "Ranking crawler and snapshot store CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Create the database schema and latest-state view (idempotent)
    Init {
        /// Database path (overrides CW_DB)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Crawl the ranking, ingesting each page as it is scraped
    ///
    /// Examples:
    ///   chartwatch crawl --min-players 1000
    ///   chartwatch crawl --max-pages 3 --out capture.json
    Crawl {
        #[arg(long)]
        db: Option<PathBuf>,
        /// Stop once a row's average players falls below this floor
        #[arg(long)]
        min_players: Option<i64>,
        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<u32>,
        /// Also write the emitted records to a JSON file
        #[arg(long)]
        out: Option<PathBuf>,
        /// Crawl without touching the database
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        /// JSON report instead of plain text
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Ingest a snapshot JSON file (array of records, or one object)
    Load {
        #[arg(long)]
        db: Option<PathBuf>,
        /// JSON payload file
        file: PathBuf,
        /// JSON report instead of plain text
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Ingest a catalog JSON file
    LoadCatalog {
        #[arg(long)]
        db: Option<PathBuf>,
        /// JSON payload file
        file: PathBuf,
        /// JSON report instead of plain text
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Fetch catalog details for a list of app ids and upsert them
    ///
    /// The id file holds one app id per line, as written by export-ids.
    FetchCatalog {
        #[arg(long)]
        db: Option<PathBuf>,
        /// File with one app id per line
        #[arg(long)]
        ids: PathBuf,
        /// Also write the fetched records to a JSON file
        #[arg(long)]
        out: Option<PathBuf>,
        /// JSON report instead of plain text
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Write app ids (one per line) for a catalog refresh pass
    ExportIds {
        #[arg(long)]
        db: Option<PathBuf>,
        /// Where the ids come from: games, snapshots or union
        #[arg(long, default_value = "union")]
        source: String,
        /// Only ids not refreshed in the last N days (0 = all)
        #[arg(long, default_value_t = 0)]
        stale_days: u32,
        /// Output file
        #[arg(long)]
        out: PathBuf,
    },
    /// Query the latest-state view from the command line
    ///
    /// Examples:
    ///   chartwatch query --q dota --sort -peak
    ///   chartwatch query --min-current 1000 --page 2 --json
    Query {
        #[arg(long)]
        db: Option<PathBuf>,
        /// Name substring, or an exact app id when purely numeric
        #[arg(long)]
        q: Option<String>,
        /// Sort key (name|current|peak|rank|timestamp), '-' prefix for descending
        #[arg(long)]
        sort: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: i64,
        /// Page size (defaults to the configured default)
        #[arg(long)]
        size: Option<i64>,
        /// Inclusive floor on current players (0 disables)
        #[arg(long, default_value_t = 0)]
        min_current: i64,
        /// Inclusive capture-time lower bound (ISO-8601)
        #[arg(long)]
        from: Option<String>,
        /// Inclusive capture-time upper bound (ISO-8601)
        #[arg(long)]
        to: Option<String>,
        /// JSON output instead of plain lines
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print row counts and the newest capture timestamp
    Status {
        #[arg(long)]
        db: Option<PathBuf>,
        /// JSON output (single object)
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Cli as Parser>::parse()
    }
}
