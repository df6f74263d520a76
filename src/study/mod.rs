//! Three-stage generation of a study bundle.
//!
//! Stage 1 (summary + notes) must succeed or the bundle is abandoned.
//! Stage 2 (flashcards + quiz) degrades to empty lists. Stage 3 (narration)
//! works from the stage 1 summary and keeps a failure as marker text.

pub mod parse;
pub mod prompts;

use log::{debug, info, warn};
use serde::Serialize;

use crate::SourceText;
use crate::completion::{Completer, CompletionError};
use parse::{Flashcard, NotesSection, QuizItem, SkippedLine};

/// Source characters sent with the notes prompt
pub const NOTES_INPUT_CHARS: usize = 60_000;
/// Source characters sent with the study-aids prompt
pub const STUDY_AIDS_INPUT_CHARS: usize = 40_000;
/// Source characters kept on the bundle for follow-up chat
pub const RAW_SAMPLE_CHARS: usize = 20_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudyBundle {
    pub summary: String,
    /// Markdown, may contain mermaid diagrams and LaTeX
    pub notes: String,
    pub flashcards: Vec<Flashcard>,
    pub quiz: Vec<QuizItem>,
    #[serde(rename = "podcast")]
    pub podcast_script: String,
    #[serde(rename = "raw_transcript")]
    pub raw_text_sample: String,
}

pub struct StudyBundleGenerator<'a> {
    completer: &'a dyn Completer,
}

impl<'a> StudyBundleGenerator<'a> {
    pub fn new(completer: &'a dyn Completer) -> Self {
        Self { completer }
    }

    pub async fn generate(&self, source: &SourceText) -> Result<StudyBundle, CompletionError> {
        info!("Generating study bundle from {} chars of source", source.as_str().chars().count());

        let NotesSection { summary, notes } = self.notes_stage(source).await?;
        let (flashcards, quiz) = self.study_aids_stage(source).await;
        let podcast_script = self.narration_stage(&summary).await;

        Ok(StudyBundle {
            summary,
            notes,
            flashcards,
            quiz,
            podcast_script,
            raw_text_sample: source.prefix(RAW_SAMPLE_CHARS).to_string(),
        })
    }

    async fn notes_stage(&self, source: &SourceText) -> Result<NotesSection, CompletionError> {
        info!("Stage 1: summary and notes");
        let prompt = prompts::with_content(prompts::NOTES_PROMPT, source.prefix(NOTES_INPUT_CHARS));
        match self.completer.complete(&prompt).await {
            Ok(raw) => Ok(parse::parse_notes(&raw)),
            Err(e) => {
                warn!("Notes stage failed, abandoning bundle: {e}");
                Err(e)
            }
        }
    }

    async fn study_aids_stage(&self, source: &SourceText) -> (Vec<Flashcard>, Vec<QuizItem>) {
        info!("Stage 2: flashcards and quiz");
        let prompt = prompts::with_content(prompts::STUDY_AIDS_PROMPT, source.prefix(STUDY_AIDS_INPUT_CHARS));
        let raw = match self.completer.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Study aids stage failed, continuing without flashcards or quiz: {e}");
                return (Vec::new(), Vec::new());
            }
        };
        let flashcards = parse::parse_flashcards(&raw);
        let quiz = parse::parse_quiz(&raw);
        log_skipped("flashcards", &flashcards.skipped);
        log_skipped("quiz", &quiz.skipped);
        (flashcards.items, quiz.items)
    }

    async fn narration_stage(&self, summary: &str) -> String {
        info!("Stage 3: narration");
        let prompt = prompts::with_content(prompts::NARRATION_PROMPT, summary);
        match self.completer.complete(&prompt).await {
            Ok(script) => script,
            Err(e) => {
                warn!("Narration stage failed, keeping the error text as the script: {e}");
                e.marked()
            }
        }
    }
}

fn log_skipped(section: &str, skipped: &[SkippedLine]) {
    for s in skipped {
        debug!("Skipped {section} line {}: {:?}", s.line, s.reason);
    }
}
