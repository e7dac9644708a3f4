//! Next-page link resolution.
//!
//! Pagination markup drifts, so the link is located by an ordered chain of
//! independent strategies; the first one producing a non-empty href wins:
//!   1. an anchor carrying rel="next"
//!   2. an anchor classed page-link next
//!   3. an anchor whose visible text contains "Next"
//!   4. a list item whose class mentions next, via its inner anchor
//!
//! Each strategy inspects only the first element it matches. An anchor that
//! matches but has no usable href counts as a miss and the chain moves on.

use crate::extract::html;

/// Resolve the next-page href on a ranking page. Relative as found in the
/// markup; callers join it against the page URL.
pub fn next_href(page: &str) -> Option<String> {
    rel_next_anchor(page)
        .or_else(|| classed_next_anchor(page))
        .or_else(|| text_next_anchor(page))
        .or_else(|| next_item_anchor(page))
}

fn rel_next_anchor(page: &str) -> Option<String> {
    first_anchor(page, |tag, _| {
        html::attr(tag, "rel")
            .map(|v| v.split_ascii_whitespace().any(|t| t.eq_ignore_ascii_case("next")))
            .unwrap_or(false)
    })
}

fn classed_next_anchor(page: &str) -> Option<String> {
    first_anchor(page, |tag, _| {
        html::has_class(tag, "page-link") && html::has_class(tag, "next")
    })
}

fn text_next_anchor(page: &str) -> Option<String> {
    first_anchor(page, |_, block| html::text_of(block).contains("Next"))
}

fn next_item_anchor(page: &str) -> Option<String> {
    let mut pos = 0;
    while let Some((s, e)) = html::next_block(page, "li", pos) {
        let block = &page[s..e];
        pos = e;
        let classed = html::attr(html::open_tag(block), "class")
            .map(|v| v.contains("next"))
            .unwrap_or(false);
        if !classed {
            continue;
        }
        if let Some((a, b)) = html::next_block(block, "a", 0) {
            if let Some(h) = href_of(&block[a..b]) {
                return Some(h);
            }
        }
    }
    None
}

/// First anchor on the page satisfying `pred(open_tag, block)`; its href, or
/// None when the anchor has none worth following.
fn first_anchor<P>(page: &str, pred: P) -> Option<String>
where
    P: Fn(&str, &str) -> bool,
{
    let mut pos = 0;
    while let Some((s, e)) = html::next_block(page, "a", pos) {
        let block = &page[s..e];
        pos = e;
        if pred(html::open_tag(block), block) {
            return href_of(block);
        }
    }
    None
}

fn href_of(anchor: &str) -> Option<String> {
    match html::attr(html::open_tag(anchor), "href") {
        Some(h) if !h.trim().is_empty() => Some(h),
        _ => None,
    }
}

/// Join an href against the URL of the page it was found on. Handles the
/// shapes that actually occur in links: absolute, scheme-relative,
/// root-relative and path-relative.
pub fn join_url(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    if let Some(rest) = href.strip_prefix("//") {
        let scheme = base.split("://").next().unwrap_or("https");
        return format!("{}://{}", scheme, rest);
    }
    if href.starts_with('/') {
        return format!("{}{}", origin(base), href);
    }
    let path_start = base.find("://").map(|i| i + 3).unwrap_or(0);
    match base[path_start..].rfind('/') {
        Some(i) => format!("{}{}", &base[..path_start + i + 1], href),
        None => format!("{}/{}", base, href),
    }
}

/// Scheme and host of a URL, without any path.
fn origin(base: &str) -> &str {
    let host_start = base.find("://").map(|i| i + 3).unwrap_or(0);
    match base[host_start..].find('/') {
        Some(i) => &base[..host_start + i],
        None => base,
    }
}
