//! Cache-busting helpers for asset URLs.
//!
//! Pure string rewriting; the loader and the live-reload bridge apply these
//! to `<link>` and `<script>` tags.

#[cfg(test)]
#[path = "assets_test.rs"]
mod assets_test;

/// Query parameter carrying the cache-busting stamp.
pub const CACHE_BUST_PARAM: &str = "v";

/// Set `key=value` in the query string of `uri`.
///
/// An existing `key` (matched case-insensitively, first occurrence) has its
/// value replaced up to the next `&` or the end of the string. Otherwise the
/// pair is appended with `?` or `&` as appropriate.
pub fn update_query_param(uri: &str, key: &str, value: &str) -> String {
    if let Some((start, end)) = find_param_value(uri, key) {
        let mut out = String::with_capacity(uri.len() + value.len());
        out.push_str(&uri[..start]);
        out.push_str(value);
        out.push_str(&uri[end..]);
        return out;
    }
    let separator = if uri.contains('?') { '&' } else { '?' };
    format!("{uri}{separator}{key}={value}")
}

/// `uri` with `v=<stamp>` set.
pub fn cache_bust(uri: &str, stamp: u64) -> String {
    update_query_param(uri, CACHE_BUST_PARAM, &stamp.to_string())
}

/// Byte range of the value of `key` when `uri` contains `?key=` or `&key=`.
fn find_param_value(uri: &str, key: &str) -> Option<(usize, usize)> {
    let needle_len = key.len() + 1;
    for (idx, ch) in uri.char_indices() {
        if ch != '?' && ch != '&' {
            continue;
        }
        let name_start = idx + 1;
        let Some(candidate) = uri.get(name_start..name_start + needle_len) else {
            continue;
        };
        let (Some(name), Some(eq)) = (candidate.get(..key.len()), candidate.get(key.len()..)) else {
            continue;
        };
        if eq == "=" && name.eq_ignore_ascii_case(key) {
            let value_start = name_start + needle_len;
            let value_end = uri[value_start..]
                .find('&')
                .map_or(uri.len(), |offset| value_start + offset);
            return Some((value_start, value_end));
        }
    }
    None
}
