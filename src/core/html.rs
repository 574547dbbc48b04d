// src/core/html.rs
// Small string helpers for the bits of markup we read without a DOM.

pub fn to_lower(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() { c.to_ascii_lowercase() } else { c })
        .collect()
}

/// Case-insensitive substring test (ASCII folding only).
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    to_lower(haystack).contains(&to_lower(needle))
}

/// Inner text of the first `<tag ...>...</tag>` block, case-insensitive on
/// the tag name. CDATA wrappers are unwrapped and the result trimmed.
pub fn tag_text_ci<'a>(doc: &'a str, tag: &str) -> Option<&'a str> {
    let lc = to_lower(doc);
    let open = format!("<{}", to_lower(tag));
    let close = format!("</{}>", to_lower(tag));

    let mut from = 0usize;
    let start = loop {
        let o = lc[from..].find(&open)? + from;
        // reject prefixes: <steamID64x> must not match <steamID64
        match lc.as_bytes().get(o + open.len()) {
            Some(b'>') | Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') => break o,
            _ => from = o + open.len(),
        }
    };
    let after = doc[start..].find('>')? + start + 1;
    let end = lc[after..].find(&close)? + after;

    let inner = doc[after..end].trim();
    let inner = inner
        .strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
        .unwrap_or(inner);
    Some(inner.trim())
}
