//! Line-oriented parsers for model output.
//!
//! Each parser keeps whatever lines it can use and records every line it
//! skipped with a [`SkipReason`], so malformed output degrades a section
//! instead of failing it.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::prompts::{FLASHCARDS_MARKER, QUIZ_MARKER, SUMMARY_SEPARATOR};

const QUIZ_FIELDS: usize = 5;

// "- ", "* ", "• ", "1. ", "2) "
static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:[-*•]|\d+[.)])\s+").expect("valid regex"));

// "A: ", "b) ", "C. "
static OPTION_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Ha-h](?::|\)|\.\s)\s*").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesSection {
    pub summary: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizItem {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoDelimiter,
    MissingQuestionLabel,
    TooFewFields { found: usize, needed: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number within the section
    pub line: usize,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed<T> {
    pub items: Vec<T>,
    pub skipped: Vec<SkippedLine>,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// Summary before the separator, notes after it.
///
/// Without a separator the whole output serves as both.
pub fn parse_notes(raw: &str) -> NotesSection {
    match raw.split_once(SUMMARY_SEPARATOR) {
        Some((summary, rest)) => {
            // Anything after a repeated separator is not part of the notes.
            let notes = rest.split(SUMMARY_SEPARATOR).next().unwrap_or(rest);
            NotesSection {
                summary: summary.trim().to_string(),
                notes: notes.trim().to_string(),
            }
        }
        None => NotesSection {
            summary: raw.trim().to_string(),
            notes: raw.to_string(),
        },
    }
}

pub fn parse_flashcards(raw: &str) -> Parsed<Flashcard> {
    let Some(section) = section(raw, FLASHCARDS_MARKER, &[QUIZ_MARKER]) else {
        return Parsed::default();
    };
    parse_lines(section, |line| {
        if !line.contains('|') {
            return Err(SkipReason::NoDelimiter);
        }
        let fields: Vec<&str> = line.split('|').collect();
        if fields.len() < 2 {
            return Err(SkipReason::TooFewFields {
                found: fields.len(),
                needed: 2,
            });
        }
        Ok(Flashcard {
            front: strip_label(fields[0], "Front:").to_string(),
            back: strip_label(fields[1], "Back:").to_string(),
        })
    })
}

pub fn parse_quiz(raw: &str) -> Parsed<QuizItem> {
    let Some(section) = section(raw, QUIZ_MARKER, &[FLASHCARDS_MARKER]) else {
        return Parsed::default();
    };
    parse_lines(section, |line| {
        if !line.contains('|') {
            return Err(SkipReason::NoDelimiter);
        }
        if !line.contains("Q:") {
            return Err(SkipReason::MissingQuestionLabel);
        }
        let fields: Vec<&str> = line.split('|').collect();
        if fields.len() < QUIZ_FIELDS {
            return Err(SkipReason::TooFewFields {
                found: fields.len(),
                needed: QUIZ_FIELDS,
            });
        }
        let last = fields.len() - 1;
        let options = fields[1..last]
            .iter()
            .map(|f| OPTION_LABEL.replace(f.trim(), "").trim().to_string())
            .collect();
        Ok(QuizItem {
            question: strip_label(fields[0], "Q:").to_string(),
            options,
            answer: strip_label(fields[last], "Answer:").to_string(),
        })
    })
}

/// Text after the first `start` marker, cut at the next marker of any kind.
fn section<'a>(raw: &'a str, start: &str, until: &[&str]) -> Option<&'a str> {
    let (_, rest) = raw.split_once(start)?;
    let end = until
        .iter()
        .chain(std::iter::once(&start))
        .filter_map(|marker| rest.find(marker))
        .min()
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Apply `parse` to every non-blank line, keeping successes and recording skips.
fn parse_lines<T>(section: &str, parse: impl Fn(&str) -> Result<T, SkipReason>) -> Parsed<T> {
    let mut parsed = Parsed::default();
    for (idx, line) in section.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let line = LIST_MARKER.replace(line, "");
        match parse(&*line) {
            Ok(item) => parsed.items.push(item),
            Err(reason) => parsed.skipped.push(SkippedLine { line: idx + 1, reason }),
        }
    }
    parsed
}

/// Trim `field` and drop a leading `label`, compared case-insensitively.
fn strip_label<'a>(field: &'a str, label: &str) -> &'a str {
    let field = field.trim();
    match field.get(..label.len()) {
        Some(head) if head.eq_ignore_ascii_case(label) => field[label.len()..].trim(),
        _ => field,
    }
}
