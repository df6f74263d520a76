pub mod chat;
pub mod completion;
pub mod config;
pub mod document;
pub mod error;
pub mod output;
pub mod server;
pub mod service;
pub mod study;
pub mod text;
pub mod transcript;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Normalized learning material handed to generation. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SourceText(String);

impl SourceText {
    /// Collapse whitespace; `None` when nothing is left.
    pub fn new(raw: &str) -> Option<Self> {
        let cleaned = text::clean_text(raw);
        if cleaned.is_empty() { None } else { Some(Self(cleaned)) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First `max_chars` characters, split on a char boundary.
    pub fn prefix(&self, max_chars: usize) -> &str {
        text::truncate_chars(&self.0, max_chars)
    }
}

impl std::fmt::Display for SourceText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated 11-character YouTube video ID
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoReference(String);

impl VideoReference {
    pub fn parse(input: &str) -> Option<Self> {
        extract_video_id(input).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl std::fmt::Display for VideoReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

static BARE_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("valid regex"));

static URL_SHAPES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // youtube.com/watch?v=ID, m.youtube.com, music.youtube.com, extra params before v=
        r"youtube\.com/watch\?(?:.*&)?v=([a-zA-Z0-9_-]{11})(?:[^a-zA-Z0-9_-]|$)",
        // youtu.be/ID
        r"youtu\.be/([a-zA-Z0-9_-]{11})(?:[^a-zA-Z0-9_-]|$)",
        // youtube.com/embed/ID and the no-cookie domain
        r"youtube(?:-nocookie)?\.com/embed/([a-zA-Z0-9_-]{11})(?:[^a-zA-Z0-9_-]|$)",
        // youtube.com/shorts/ID, /live/ID, /v/ID
        r"youtube\.com/(?:shorts|live|v)/([a-zA-Z0-9_-]{11})(?:[^a-zA-Z0-9_-]|$)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Extract video ID from various YouTube URL formats
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();

    if BARE_ID.is_match(input) {
        return Some(input.to_string());
    }

    URL_SHAPES
        .iter()
        .find_map(|re| re.captures(input))
        .map(|caps| caps[1].to_string())
}
