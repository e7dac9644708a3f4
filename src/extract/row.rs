//! Ranking table rows -> snapshot records.
//!
//! The ranking table carries one game per row:
//!   cell 0: rank ("1.")
//!   cell 1: name anchor, href holds the detail link with the app id
//!   cell 2: average players
//!   cell 4: peak players
//! Cells that fail to parse become None fields. A row with no data cells at
//! all is skipped. The iterator is pull-based; callers that stop early never
//! pay for the rest of the page.

use crate::extract::html;
use crate::model::SnapshotRecord;

/// Lazy iterator over the ranking rows of one page. Rows with no `<td>`
/// cells (header rows, decorative rows) are silently skipped.
pub struct RankRows<'a> {
    table: &'a str,
    pos: usize,
}

/// Build a row iterator over a raw ranking page. A page without the ranking
/// table yields nothing, which the caller treats as the end of the crawl.
pub fn rank_rows(page: &str) -> RankRows<'_> {
    RankRows {
        table: ranking_table_body(page).unwrap_or(""),
        pos: 0,
    }
}

impl<'a> Iterator for RankRows<'a> {
    type Item = SnapshotRecord;

    fn next(&mut self) -> Option<SnapshotRecord> {
        loop {
            let (s, e) = html::next_block(self.table, "tr", self.pos)?;
            self.pos = e;
            if let Some(rec) = parse_row(&self.table[s..e]) {
                return Some(rec);
            }
        }
    }
}

/// The `<tbody>` of the first table carrying the ranking class.
fn ranking_table_body(page: &str) -> Option<&str> {
    let mut at = 0;
    while let Some((s, e)) = html::next_block(page, "table", at) {
        let block = &page[s..e];
        if html::has_class(html::open_tag(block), "common-table") {
            if let Some((ts, te)) = html::next_block(block, "tbody", 0) {
                return Some(&block[ts..te]);
            }
        }
        at = e;
    }
    None
}

fn parse_row(row: &str) -> Option<SnapshotRecord> {
    let cells = td_blocks(row);
    if cells.is_empty() {
        return None;
    }

    let rank = cells
        .first()
        .map(|c| html::text_of(c))
        .as_deref()
        .map(|t| t.trim_matches('.').to_string())
        .as_deref()
        .and_then(clean_int);

    let (name, href) = match cells.get(1) {
        Some(c) => name_and_href(c),
        None => (None, None),
    };

    let avg_players = cells.get(2).map(|c| html::text_of(c)).as_deref().and_then(clean_int);
    let peak_players = cells.get(4).map(|c| html::text_of(c)).as_deref().and_then(clean_int);
    let app_id = href.as_deref().and_then(app_id_from_href);

    Some(SnapshotRecord {
        app_id,
        name,
        timestamp: None,
        rank,
        avg_players,
        peak_players,
        detail_url: href,
    })
}

fn td_blocks(row: &str) -> Vec<&str> {
    let mut cells = Vec::new();
    let mut pos = 0;
    while let Some((s, e)) = html::next_block(row, "td", pos) {
        cells.push(&row[s..e]);
        pos = e;
    }
    cells
}

/// Name text and raw href of the first anchor in the name cell. The href is
/// kept relative here; the crawler absolutizes it against the page URL.
fn name_and_href(cell: &str) -> (Option<String>, Option<String>) {
    let Some((s, e)) = html::next_block(cell, "a", 0) else {
        return (clean_text(&html::text_of(cell)), None);
    };
    let anchor = &cell[s..e];
    let name = clean_text(&html::text_of(anchor));
    let href = html::attr(html::open_tag(anchor), "href").and_then(|h| clean_text(&h));
    (name, href)
}

/// App id embedded in a detail link as `/app/<digits>`. Every occurrence is
/// tried, in case an earlier `/app/` has no digits after it.
fn app_id_from_href(href: &str) -> Option<i64> {
    let mut at = 0;
    while let Some(rel) = href[at..].find("/app/") {
        let start = at + rel + "/app/".len();
        let digits: &str = href[start..]
            .split(|c: char| !c.is_ascii_digit())
            .next()
            .unwrap_or("");
        if !digits.is_empty() {
            return digits.parse::<i64>().ok();
        }
        at = start;
    }
    None
}

/// Integer out of noisy metric text: thousands separators, stray spaces and
/// `+` signs are dropped, the typographic minus becomes ASCII. Anything still
/// unparseable is None, never an error.
pub fn clean_int(text: &str) -> Option<i64> {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            ',' | '+' => {}
            '\u{2212}' => out.push('-'),
            c if c.is_whitespace() => {}
            c => out.push(c),
        }
    }
    if out.is_empty() {
        return None;
    }
    out.parse::<i64>().ok()
}

fn clean_text(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}
