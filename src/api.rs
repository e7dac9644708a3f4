//! HTTP boundary for the query endpoint.
//!
//! Routing and parameter handling live here, separated from the socket loop
//! in the server binary so they stay testable. Responses are always JSON:
//!   GET /health        liveness check
//!   GET /games         filtered/sorted/paginated latest state
//!   GET /games/<id>    single game lookup
//! Malformed numeric parameters and out-of-range pages are client errors;
//! unknown sort keys are normalized instead (see the query module).

use serde_json::json;

use crate::config::Config;
use crate::query::{self, QueryParams};
use crate::store::Store;

/// Status and JSON body the server sends back.
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    fn ok(body: String) -> Self {
        Self { status: 200, body }
    }

    fn error(status: u16, msg: &str) -> Self {
        Self {
            status,
            body: json!({ "error": msg }).to_string(),
        }
    }
}

/// Dispatch one request. Only GET routes exist; everything else is a 404,
/// and internal failures surface as 500 with a generic body.
pub fn handle_request(store: &Store, cfg: &Config, method: &str, raw_url: &str) -> ApiResponse {
    let (path, query) = match raw_url.split_once('?') {
        Some((p, q)) => (p, q),
        None => (raw_url, ""),
    };

    if method != "GET" {
        return ApiResponse::error(404, "not found");
    }

    match path {
        "/health" => ApiResponse::ok(json!({ "ok": true }).to_string()),
        "/games" => list_games(store, cfg, query),
        _ => match path.strip_prefix("/games/") {
            Some(id_part) if !id_part.is_empty() && !id_part.contains('/') => {
                get_game(store, cfg, id_part)
            }
            _ => ApiResponse::error(404, "not found"),
        },
    }
}

fn list_games(store: &Store, cfg: &Config, query: &str) -> ApiResponse {
    let pairs = query_pairs(query);
    let get = |k: &str| {
        pairs
            .iter()
            .find(|(key, _)| key == k)
            .map(|(_, v)| v.as_str())
    };

    let page = match parse_num(get("page"), 1) {
        Ok(n) => n,
        Err(msg) => return ApiResponse::error(400, &msg),
    };
    let size = match parse_num(
        get("size").or_else(|| get("page_size")),
        i64::from(cfg.default_page_size),
    ) {
        Ok(n) => n,
        Err(msg) => return ApiResponse::error(400, &msg),
    };
    let min_current = match parse_num(get("min_current").or_else(|| get("min_metric")), 0) {
        Ok(n) => n,
        Err(msg) => return ApiResponse::error(400, &msg),
    };
    if page < 1 {
        return ApiResponse::error(400, "page must be >= 1");
    }
    if size < 1 {
        return ApiResponse::error(400, "size must be >= 1");
    }

    let params = QueryParams {
        q: get("q").map(str::to_string).filter(|s| !s.is_empty()),
        sort: get("sort").map(str::to_string),
        min_current,
        from: get("from").map(str::to_string).filter(|s| !s.is_empty()),
        to: get("to").map(str::to_string).filter(|s| !s.is_empty()),
        page,
        size,
    };

    match query::run(store, cfg, &params) {
        Ok(page) => match serde_json::to_string(&page) {
            Ok(body) => ApiResponse::ok(body),
            Err(_) => ApiResponse::error(500, "internal error"),
        },
        Err(e) => {
            log::error!("query failed: {:#}", e);
            ApiResponse::error(500, "internal error")
        }
    }
}

fn get_game(store: &Store, cfg: &Config, id_part: &str) -> ApiResponse {
    let Ok(app_id) = id_part.parse::<i64>() else {
        return ApiResponse::error(400, "app id must be an integer");
    };
    match query::get_game(store, cfg, app_id) {
        Ok(Some(row)) => match serde_json::to_string(&row) {
            Ok(body) => ApiResponse::ok(body),
            Err(_) => ApiResponse::error(500, "internal error"),
        },
        Ok(None) => ApiResponse::error(404, "not found"),
        Err(e) => {
            log::error!("lookup of game {} failed: {:#}", app_id, e);
            ApiResponse::error(500, "internal error")
        }
    }
}

fn parse_num(v: Option<&str>, default: i64) -> Result<i64, String> {
    match v {
        None | Some("") => Ok(default),
        Some(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("{:?} is not a valid number", s)),
    }
}

/// Decode a query string into key/value pairs. '+' means space, percent
/// escapes are decoded bytewise, broken escapes pass through literally.
fn query_pairs(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|p| match p.split_once('=') {
            Some((k, v)) => (percent_decode(k), percent_decode(v)),
            None => (percent_decode(p), String::new()),
        })
        .collect()
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                match (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi << 4 | lo);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
