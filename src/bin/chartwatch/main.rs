use anyhow::Result;
use env_logger::{Builder, Env};

mod cli;
mod util;
mod cmd_init;
mod cmd_crawl;
mod cmd_load;
mod cmd_load_catalog;
mod cmd_fetch_catalog;
mod cmd_export_ids;
mod cmd_query;
mod cmd_status;

fn init_logger() {
    // Level comes from RUST_LOG, default info.
    // Example: RUST_LOG=debug chartwatch crawl ...
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = cli::Cli::parse();
    match cli.cmd {
        cli::Cmd::Init { db } => cmd_init::exec(db),

        cli::Cmd::Crawl { db, min_players, max_pages, out, dry_run, json } =>
            cmd_crawl::exec(db, min_players, max_pages, out, dry_run, json),

        cli::Cmd::Load { db, file, json } =>
            cmd_load::exec(db, file, json),

        cli::Cmd::LoadCatalog { db, file, json } =>
            cmd_load_catalog::exec(db, file, json),

        cli::Cmd::FetchCatalog { db, ids, out, json } =>
            cmd_fetch_catalog::exec(db, ids, out, json),

        cli::Cmd::ExportIds { db, source, stale_days, out } =>
            cmd_export_ids::exec(db, source, stale_days, out),

        cli::Cmd::Query { db, q, sort, page, size, min_current, from, to, json } =>
            cmd_query::exec(db, q, sort, page, size, min_current, from, to, json),

        cli::Cmd::Status { db, json } =>
            cmd_status::exec(db, json),
    }
}
