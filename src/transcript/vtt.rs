use std::sync::LazyLock;

use regex::Regex;

use crate::text::{clean_text, dedupe_consecutive};

const HEADER_PREFIXES: [&str; 3] = ["WEBVTT", "Kind:", "Language:"];

// <00:00:01.439>, <c>, </c>, <c.colorE5E5E5>
static INLINE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// Cue text lines of a WebVTT payload, in order.
///
/// Drops timing lines, blank lines, and header metadata; strips inline cue
/// markup and decodes HTML entities.
pub fn cue_lines(payload: &str) -> Vec<String> {
    payload
        .trim_start_matches('\u{feff}')
        .lines()
        .filter(|line| !line.contains("-->"))
        .filter(|line| !HEADER_PREFIXES.iter().any(|p| line.starts_with(p)))
        .filter_map(|line| {
            let stripped = INLINE_TAG.replace_all(line, "");
            let decoded = html_escape::decode_html_entities(stripped.trim()).trim().to_string();
            (!decoded.is_empty()).then_some(decoded)
        })
        .collect()
}

/// Cue lines with adjacent repeats collapsed, joined by single spaces.
pub fn vtt_to_text(payload: &str) -> String {
    let lines = cue_lines(payload);
    clean_text(&dedupe_consecutive(lines.iter().map(String::as_str)).join(" "))
}
