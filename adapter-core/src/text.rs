//! UTF-8-bounded text reads, URL host extraction, and regex-bounded
//! pattern counting (§2 "Text/marker helpers").

use regex::Regex;
use std::sync::OnceLock;

/// Hard cap on how much of any single blob of text a helper will ever
/// materialize (§3.3).
pub const MAX_TEXT_BYTES: usize = 256 * 1024;

/// Lossily decode at most `MAX_TEXT_BYTES` of `bytes` as UTF-8,
/// reporting whether the cap was hit.
pub fn bounded_text(bytes: &[u8]) -> (String, bool) {
    let truncated = bytes.len() > MAX_TEXT_BYTES;
    let window = &bytes[..bytes.len().min(MAX_TEXT_BYTES)];
    (String::from_utf8_lossy(window).into_owned(), truncated)
}

fn https_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"https?://([A-Za-z0-9.\-]+(?::[0-9]+)?)").expect("static regex")
    })
}

/// Extract the host component from the first HTTPS/HTTP URL found in
/// `text`, if any.
pub fn first_url_host(text: &str) -> Option<String> {
    https_url_regex()
        .captures(text)
        .map(|c| c[1].to_string())
}

/// Extract every distinct URL host found in `text`, sorted and
/// deduped.
pub fn all_url_hosts(text: &str) -> Vec<String> {
    let mut hosts: Vec<String> = https_url_regex()
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect();
    hosts.sort();
    hosts.dedup();
    hosts
}

/// Count how many lines in `text` match `pattern`, bounded by the
/// text already having been truncated to `MAX_TEXT_BYTES` upstream.
pub fn count_line_matches(text: &str, pattern: &Regex) -> usize {
    text.lines().filter(|line| pattern.is_match(line)).count()
}

/// Count total regex matches anywhere in `text` (not line-anchored).
pub fn count_matches(text: &str, pattern: &Regex) -> usize {
    pattern.find_iter(text).count()
}

/// Case-insensitive substring containment check used for the
/// lightweight "keyword hint" families (script/permission/secret
/// indicators) across several analyzers.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_ascii_lowercase().contains(&needle.to_ascii_lowercase())
}
