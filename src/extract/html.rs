//! Minimal HTML scanning over raw page text.
//!
//! The pages this crate reads are table-shaped and server-rendered, so a
//! handful of case-insensitive scans is enough: find a tag block, read an
//! attribute out of its open tag, strip markup from its inner text. Offsets
//! always index the original string; lowering is ASCII-only so byte positions
//! stay aligned with the source.

/// ASCII-only lowercase. Non-ASCII chars pass through untouched, which keeps
/// the lowered copy byte-for-byte aligned with the original.
pub fn lower(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() { c.to_ascii_lowercase() } else { c })
        .collect()
}

/// Find the next `<tag ...> ... </tag>` block at or after `from`. Returns the
/// byte span of the whole block including both tags. The tag name must be
/// followed by whitespace, '>' or '/', so searching for "tr" will not land
/// inside "track". Nested same-name tags are not handled; the tables this
/// scanner reads do not nest them.
pub fn next_block(s: &str, tag: &str, from: usize) -> Option<(usize, usize)> {
    let lc = lower(s);
    let open_pat = format!("<{}", lower(tag));
    let close_pat = format!("</{}", lower(tag));

    let mut at = from;
    let start = loop {
        let i = lc.get(at..)?.find(&open_pat)? + at;
        match lc.as_bytes().get(i + open_pat.len()) {
            Some(b) if b.is_ascii_whitespace() || *b == b'>' || *b == b'/' => break i,
            Some(_) => at = i + open_pat.len(),
            None => return None,
        }
    };
    let open_end = s[start..].find('>')? + start + 1;
    let close_start = lc[open_end..].find(&close_pat)? + open_end;
    let close_end = s[close_start..].find('>')? + close_start + 1;
    Some((start, close_end))
}

/// The `<tag ...>` prefix of a block returned by [`next_block`].
pub fn open_tag(block: &str) -> &str {
    match block.find('>') {
        Some(i) => &block[..=i],
        None => block,
    }
}

/// The text between the open tag and the closing tag of a block.
pub fn inner(block: &str) -> &str {
    let Some(oe) = block.find('>') else {
        return "";
    };
    let Some(cs) = block.rfind('<') else {
        return "";
    };
    if cs > oe {
        &block[oe + 1..cs]
    } else {
        ""
    }
}

/// Read an attribute value from an open tag. The attribute name is matched
/// case-insensitively on a word boundary; double-quoted, single-quoted and
/// bare values are all accepted.
pub fn attr(tag: &str, name: &str) -> Option<String> {
    let lc = lower(tag);
    let pat = format!("{}=", lower(name));
    let mut at = 0;
    loop {
        let i = lc.get(at..)?.find(&pat)? + at;
        let boundary = i == 0 || lc.as_bytes()[i - 1].is_ascii_whitespace();
        let val_at = i + pat.len();
        if !boundary {
            at = val_at;
            continue;
        }
        let rest = &tag[val_at..];
        let value = match rest.as_bytes().first()? {
            b'"' => rest[1..].split('"').next()?,
            b'\'' => rest[1..].split('\'').next()?,
            _ => rest
                .split(|c: char| c.is_ascii_whitespace() || c == '>')
                .next()?,
        };
        return Some(value.to_string());
    }
}

/// True if the tag's class list contains `class` as a whole token.
pub fn has_class(tag: &str, class: &str) -> bool {
    match attr(tag, "class") {
        Some(v) => v
            .split_ascii_whitespace()
            .any(|c| c.eq_ignore_ascii_case(class)),
        None => false,
    }
}

/// Drop all markup, keeping only text content.
pub fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

/// Decode the entities that actually occur in these pages: the common named
/// five plus numeric references. Unknown sequences are kept literally.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        // entities are short; give up past a dozen chars
        let semi = tail
            .char_indices()
            .take(12)
            .find(|&(_, c)| c == ';')
            .map(|(i, _)| i);
        let Some(semi) = semi else {
            out.push('&');
            rest = &tail[1..];
            continue;
        };
        let body = &tail[1..semi];
        let decoded = match body {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some(' '),
            _ => decode_numeric_entity(body),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_numeric_entity(body: &str) -> Option<char> {
    let digits = body.strip_prefix('#')?;
    let code = if let Some(hex) = digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        digits.parse::<u32>().ok()?
    };
    char::from_u32(code)
}

/// Collapse whitespace runs to single spaces and trim the ends.
pub fn collapse_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

/// Visible text of a block: markup stripped, entities decoded, whitespace
/// collapsed.
pub fn text_of(block: &str) -> String {
    collapse_ws(&decode_entities(&strip_tags(inner(block))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_scan_respects_tag_boundary() {
        let s = "<track>no</track><tr class=\"odd\"><td>1.</td></tr>";
        let (a, b) = next_block(s, "tr", 0).expect("tr block");
        assert!(s[a..b].starts_with("<tr class"));
        assert!(s[a..b].ends_with("</tr>"));
    }

    #[test]
    fn block_scan_is_case_insensitive() {
        let s = "<TBODY><TR><TD>x</TD></TR></TBODY>";
        let (a, b) = next_block(s, "tbody", 0).expect("tbody");
        assert_eq!(&s[a..b], s);
        assert!(next_block(s, "tr", 0).is_some());
    }

    #[test]
    fn attr_handles_quote_styles() {
        let tag = r#"<a HREF="/top/p.2" class='page-link next' rel=next>"#;
        assert_eq!(attr(tag, "href").as_deref(), Some("/top/p.2"));
        assert_eq!(attr(tag, "class").as_deref(), Some("page-link next"));
        assert_eq!(attr(tag, "rel").as_deref(), Some("next"));
    }

    #[test]
    fn attr_requires_word_boundary() {
        let tag = r#"<a data-href="/wrong" href="/right">"#;
        assert_eq!(attr(tag, "href").as_deref(), Some("/right"));
    }

    #[test]
    fn class_token_matching() {
        let tag = r#"<li class="pagination-next active">"#;
        assert!(has_class(tag, "pagination-next"));
        assert!(!has_class(tag, "next"));
        assert!(!has_class("<li>", "next"));
    }

    #[test]
    fn entities_and_whitespace() {
        assert_eq!(decode_entities("Tom &amp; Jerry&nbsp;2"), "Tom & Jerry 2");
        assert_eq!(decode_entities("Baldur&#39;s Gate"), "Baldur's Gate");
        assert_eq!(decode_entities("&#x2212;5"), "\u{2212}5");
        assert_eq!(decode_entities("AT&T rocks"), "AT&T rocks");
        assert_eq!(collapse_ws("  a \n\t b  "), "a b");
    }

    #[test]
    fn text_of_a_cell() {
        let td = "<td class=\"game-name left\">\n  <a href=\"/app/730/CS2\">Counter-Strike&nbsp;2</a>\n</td>";
        assert_eq!(text_of(td), "Counter-Strike 2");
    }
}
