//! The four request operations, independent of any transport.
//!
//! Every operation checks the credential before touching the network.

use std::path::PathBuf;

use log::info;

use crate::chat::{self, ChatAnswer, ChatRequest};
use crate::completion::{Completer, CompletionBackend, Credential, LlmBackend};
use crate::config::Config;
use crate::document;
use crate::error::PipelineError;
use crate::study::{StudyBundle, StudyBundleGenerator};
use crate::transcript::TranscriptChain;
use crate::SourceText;

pub struct StudyService {
    chain: TranscriptChain,
    backend: Box<dyn CompletionBackend>,
    scratch_dir: PathBuf,
}

impl StudyService {
    pub fn new(chain: TranscriptChain, backend: Box<dyn CompletionBackend>, scratch_dir: PathBuf) -> Self {
        Self {
            chain,
            backend,
            scratch_dir,
        }
    }

    pub fn from_config(client: reqwest::Client, config: &Config) -> Self {
        Self::new(
            TranscriptChain::from_config(&client, config),
            Box::new(LlmBackend::from_config(client, config)),
            config.scratch_dir(),
        )
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.chain.provider_names()
    }

    fn authorize(&self, credential: Option<&str>) -> Result<Box<dyn Completer>, PipelineError> {
        let credential = Credential::parse(credential)?;
        Ok(self.backend.connect(credential))
    }

    pub async fn analyze_url(&self, credential: Option<&str>, url: &str) -> Result<StudyBundle, PipelineError> {
        let completer = self.authorize(credential)?;
        let source = self.transcript(url).await?;
        generate(completer.as_ref(), &source).await
    }

    pub async fn analyze_text(&self, credential: Option<&str>, text: &str) -> Result<StudyBundle, PipelineError> {
        let completer = self.authorize(credential)?;
        let source = SourceText::new(text).ok_or(PipelineError::EmptyInput)?;
        generate(completer.as_ref(), &source).await
    }

    pub async fn analyze_document(&self, credential: Option<&str>, bytes: &[u8]) -> Result<StudyBundle, PipelineError> {
        let completer = self.authorize(credential)?;
        info!("Analyzing uploaded document ({} bytes)", bytes.len());
        let source = document::extract_upload(bytes, &self.scratch_dir)
            .await?
            .ok_or(PipelineError::DocumentUnreadable)?;
        generate(completer.as_ref(), &source).await
    }

    pub async fn chat(&self, credential: Option<&str>, request: &ChatRequest) -> Result<ChatAnswer, PipelineError> {
        let completer = self.authorize(credential)?;
        Ok(chat::respond(completer.as_ref(), request).await)
    }

    /// Transcript only; needs no credential since nothing is generated.
    pub async fn transcript(&self, url: &str) -> Result<SourceText, PipelineError> {
        info!("Fetching transcript for {url}");
        self.chain
            .fetch(url)
            .await
            .ok_or_else(|| PipelineError::SourceUnavailable(url.to_string()))
    }
}

async fn generate(completer: &dyn Completer, source: &SourceText) -> Result<StudyBundle, PipelineError> {
    StudyBundleGenerator::new(completer)
        .generate(source)
        .await
        .map_err(|e| PipelineError::Completion(e.marked()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::completion::CompletionError;
    use crate::error::Status;
    use crate::testing::{StubBackend, StubProvider, two_page_pdf};
    use crate::transcript::{ProviderOutcome, TranscriptProvider};

    const KEY: &str = "AIzaSyTestKey-0123456789";
    const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    struct Harness {
        service: StudyService,
        provider: StubProvider,
        backend: Arc<StubBackend>,
        scratch: tempfile::TempDir,
    }

    fn harness(outcome: ProviderOutcome, responses: Vec<crate::completion::Completion>) -> Harness {
        let provider = StubProvider::new("stub", outcome);
        let backend = Arc::new(StubBackend::new(responses));
        let scratch = tempfile::tempdir().unwrap();
        let service = StudyService::new(
            TranscriptChain::new(vec![Box::new(provider.clone()) as Box<dyn TranscriptProvider>]),
            Box::new(backend.clone()),
            scratch.path().to_path_buf(),
        );
        Harness {
            service,
            provider,
            backend,
            scratch,
        }
    }

    fn happy_responses() -> Vec<crate::completion::Completion> {
        vec![
            Ok("Summary.\n===SPLIT===\nNotes.".into()),
            Ok("===FLASHCARDS===\nFront: A | Back: B\n===QUIZ===\n".into()),
            Ok("Narration. Any questions?".into()),
        ]
    }

    fn is_empty_dir(path: &std::path::Path) -> bool {
        std::fs::read_dir(path).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_bad_credentials_rejected_before_any_work() {
        for bad in [None, Some(""), Some("null"), Some("too-short")] {
            let h = harness(ProviderOutcome::Transcript("words".into()), happy_responses());
            let chat_request = ChatRequest {
                question: "q".into(),
                ..Default::default()
            };

            let results = [
                h.service.analyze_url(bad, URL).await.err(),
                h.service.analyze_text(bad, "some text").await.err(),
                h.service.analyze_document(bad, b"%PDF").await.err(),
                h.service.chat(bad, &chat_request).await.err(),
            ];
            for err in results {
                assert_eq!(err.map(|e| e.status()), Some(Status::Unauthorized));
            }
            assert_eq!(h.provider.calls(), 0);
            assert_eq!(h.backend.connects(), 0);
            assert_eq!(h.backend.completer.calls(), 0);
            assert!(is_empty_dir(h.scratch.path()));
        }
    }

    #[tokio::test]
    async fn test_analyze_url() {
        let h = harness(ProviderOutcome::Transcript("the video words".into()), happy_responses());
        let bundle = h.service.analyze_url(Some(KEY), URL).await.unwrap();

        assert_eq!(bundle.summary, "Summary.");
        assert_eq!(bundle.notes, "Notes.");
        assert_eq!(bundle.flashcards.len(), 1);
        assert_eq!(bundle.raw_text_sample, "the video words");
        assert_eq!(h.backend.completer.calls(), 3);
    }

    #[tokio::test]
    async fn test_analyze_url_without_transcript_is_unprocessable() {
        let h = harness(ProviderOutcome::Declined("no captions".into()), happy_responses());
        let err = h.service.analyze_url(Some(KEY), URL).await.unwrap_err();

        assert_eq!(err.status(), Status::Unprocessable);
        assert_eq!(h.provider.calls(), 1);
        assert_eq!(h.backend.completer.calls(), 0);
    }

    #[tokio::test]
    async fn test_analyze_url_unrecognized_url_skips_providers() {
        let h = harness(ProviderOutcome::Transcript("words".into()), happy_responses());
        let err = h.service.analyze_url(Some(KEY), "https://example.com/page").await.unwrap_err();

        assert!(matches!(err, PipelineError::SourceUnavailable(_)));
        assert_eq!(h.provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_stage_one_failure_replaces_bundle() {
        let h = harness(
            ProviderOutcome::Transcript("words".into()),
            vec![Err(CompletionError::Transport("dns".into())), Ok("unused".into())],
        );
        let err = h.service.analyze_text(Some(KEY), "pasted notes").await.unwrap_err();

        assert_eq!(err.to_string(), "Error: request failed: dns");
        assert_eq!(err.status(), Status::UpstreamFailure);
        assert_eq!(h.backend.completer.calls(), 1);
    }

    #[tokio::test]
    async fn test_analyze_text_normalizes() {
        let h = harness(ProviderOutcome::Declined("unused".into()), happy_responses());
        let bundle = h.service.analyze_text(Some(KEY), "  pasted\n\n notes  ").await.unwrap();

        assert_eq!(bundle.raw_text_sample, "pasted notes");
        assert_eq!(h.provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_analyze_text_blank_is_bad_input() {
        let h = harness(ProviderOutcome::Declined("unused".into()), happy_responses());
        let err = h.service.analyze_text(Some(KEY), " \n ").await.unwrap_err();

        assert_eq!(err.status(), Status::BadInput);
        assert_eq!(h.backend.completer.calls(), 0);
    }

    #[tokio::test]
    async fn test_analyze_document_cleans_up_after_success() {
        let h = harness(ProviderOutcome::Declined("unused".into()), happy_responses());
        let bundle = h.service.analyze_document(Some(KEY), &two_page_pdf()).await.unwrap();

        assert_eq!(bundle.summary, "Summary.");
        assert_eq!(bundle.raw_text_sample, "Hello page one Second page text");
        assert_eq!(h.backend.completer.calls(), 3);
        assert!(h.backend.completer.prompts()[0].ends_with("Hello page one Second page text"));
        assert!(is_empty_dir(h.scratch.path()));
    }

    #[tokio::test]
    async fn test_unreadable_document_cleans_up() {
        let h = harness(ProviderOutcome::Declined("unused".into()), happy_responses());
        let err = h.service.analyze_document(Some(KEY), b"not a pdf").await.unwrap_err();

        assert!(matches!(err, PipelineError::DocumentUnreadable));
        assert_eq!(err.status(), Status::BadInput);
        assert_eq!(h.backend.completer.calls(), 0);
        assert!(is_empty_dir(h.scratch.path()));
    }

    #[tokio::test]
    async fn test_chat_passes_failure_text_through() {
        let h = harness(
            ProviderOutcome::Declined("unused".into()),
            vec![Err(CompletionError::Malformed("Gemini"))],
        );
        let request = ChatRequest {
            question: "What?".into(),
            full_content: "material".into(),
            ..Default::default()
        };
        let answer = h.service.chat(Some(KEY), &request).await.unwrap();
        assert_eq!(answer.answer, "Error: unexpected Gemini API response format");
    }
}
