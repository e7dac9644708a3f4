use anyhow::{anyhow, Result};
use clap::Parser;
use env_logger::{Builder, Env};
use log::debug;
use tiny_http::{Header, Response, Server};

use std::path::PathBuf;

use chartwatch::{api, Config, Store};

#[derive(Parser, Debug)]
#[command(
    name = "chartwatch_api",
    version,
    about = "Latest-state query API over the chartwatch snapshot store"
)]
struct Opt {
    /// Bind address (overrides CW_HTTP_ADDR)
    #[arg(long)]
    addr: Option<String>,
    /// Database path (overrides CW_DB)
    #[arg(long)]
    db: Option<PathBuf>,
}

fn init_logger() {
    // Level comes from RUST_LOG, default info.
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
    let opt = Opt::parse();

    let mut cfg = Config::from_env();
    if let Some(addr) = opt.addr {
        cfg = cfg.with_http_addr(addr);
    }
    if let Some(db) = opt.db {
        cfg = cfg.with_db_path(db);
    }
    cfg.validate()?;

    // One writer open so the schema and the latest-state view exist and
    // match the configured names; serving runs on a read-only connection.
    Store::open(&cfg)?;
    let store = Store::open_ro(&cfg)?;

    let server = Server::http(&cfg.http_addr)
        .map_err(|e| anyhow!("bind http at {}: {}", cfg.http_addr, e))?;
    println!("chartwatch_api listening on {}", cfg.http_addr);

    loop {
        let rq = match server.recv() {
            Ok(rq) => rq,
            Err(e) => {
                eprintln!("http recv error: {}", e);
                continue;
            }
        };

        let url = rq.url().to_string();
        let method = rq.method().as_str().to_string();

        let answer = api::handle_request(&store, &cfg, &method, &url);
        debug!("{} {} -> {}", method, url, answer.status);

        let mut resp = Response::from_string(answer.body).with_status_code(answer.status);
        if let Ok(ct) = Header::from_bytes(b"Content-Type", b"application/json") {
            resp.add_header(ct);
        }
        let _ = rq.respond(resp);
    }
}
