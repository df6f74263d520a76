//! One-shot text completion against a hosted model.
//!
//! Callers get a typed [`Completion`]; the `"Error:"` string form only
//! exists where a failure has to be rendered into an output field.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use thiserror::Error;

use crate::config::Config;
use crate::error::PipelineError;

/// Prefix of a failure rendered as text
pub const COMPLETION_FAILURE_MARKER: &str = "Error:";

pub const MIN_CREDENTIAL_LEN: usize = 10;

/// What browsers send when the settings field was never filled in
const PLACEHOLDER_CREDENTIAL: &str = "null";

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
const OPENAI_API_BASE: &str = "https://api.openai.com";

/// An API key that passed the plausibility gate
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Reject missing, placeholder, and too-short keys before any network work.
    pub fn parse(raw: Option<&str>) -> Result<Self, PipelineError> {
        let key = raw.map(str::trim).unwrap_or_default();
        if key.is_empty() || key == PLACEHOLDER_CREDENTIAL || key.chars().count() < MIN_CREDENTIAL_LEN {
            return Err(PipelineError::Unauthorized);
        }
        Ok(Self(key.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("{backend} API returned {status}: {body}")]
    Rejected {
        backend: &'static str,
        status: u16,
        body: String,
    },

    #[error("unexpected {0} API response format")]
    Malformed(&'static str),
}

impl CompletionError {
    /// The failure as output text, e.g. `Error: request failed: ...`
    pub fn marked(&self) -> String {
        format!("{COMPLETION_FAILURE_MARKER} {self}")
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(e: reqwest::Error) -> Self {
        CompletionError::Transport(e.to_string())
    }
}

pub type Completion = Result<String, CompletionError>;

#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, prompt: &str) -> Completion;
}

/// Builds a completer for a caller-supplied credential.
pub trait CompletionBackend: Send + Sync {
    fn connect(&self, credential: Credential) -> Box<dyn Completer>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Gemini,
    Anthropic,
    OpenAi,
}

impl ModelFamily {
    pub fn for_model(model: &str) -> Self {
        if model.starts_with("claude") {
            ModelFamily::Anthropic
        } else if model.starts_with("gpt") || is_openai_reasoning_model(model) {
            ModelFamily::OpenAi
        } else {
            ModelFamily::Gemini
        }
    }

    fn name(self) -> &'static str {
        match self {
            ModelFamily::Gemini => "Gemini",
            ModelFamily::Anthropic => "Anthropic",
            ModelFamily::OpenAi => "OpenAI",
        }
    }

    fn default_base(self) -> &'static str {
        match self {
            ModelFamily::Gemini => GEMINI_API_BASE,
            ModelFamily::Anthropic => ANTHROPIC_API_BASE,
            ModelFamily::OpenAi => OPENAI_API_BASE,
        }
    }
}

// o1, o3-mini, o4-mini...
fn is_openai_reasoning_model(model: &str) -> bool {
    let mut chars = model.chars();
    chars.next() == Some('o') && chars.next().is_some_and(|c| c.is_ascii_digit())
}

/// Hosted-model backend settings shared by every request
#[derive(Debug, Clone)]
pub struct LlmBackend {
    client: reqwest::Client,
    model: String,
    max_output_tokens: u32,
    timeout: Duration,
    api_base: Option<String>,
}

impl LlmBackend {
    pub fn new(client: reqwest::Client, model: &str, max_output_tokens: u32, timeout: Duration) -> Self {
        Self {
            client,
            model: model.to_string(),
            max_output_tokens,
            timeout,
            api_base: None,
        }
    }

    pub fn from_config(client: reqwest::Client, config: &Config) -> Self {
        Self {
            api_base: config.api_base.clone(),
            ..Self::new(client, &config.model, config.max_output_tokens, config.completion_timeout())
        }
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = Some(api_base.to_string());
        self
    }

    pub fn client(&self, credential: Credential) -> LlmClient {
        let family = ModelFamily::for_model(&self.model);
        let api_base = self
            .api_base
            .clone()
            .unwrap_or_else(|| family.default_base().to_string())
            .trim_end_matches('/')
            .to_string();
        LlmClient {
            client: self.client.clone(),
            credential,
            model: self.model.clone(),
            family,
            max_output_tokens: self.max_output_tokens,
            timeout: self.timeout,
            api_base,
        }
    }
}

impl CompletionBackend for LlmBackend {
    fn connect(&self, credential: Credential) -> Box<dyn Completer> {
        Box::new(self.client(credential))
    }
}

pub struct LlmClient {
    client: reqwest::Client,
    credential: Credential,
    model: String,
    family: ModelFamily,
    max_output_tokens: u32,
    timeout: Duration,
    api_base: String,
}

#[async_trait]
impl Completer for LlmClient {
    async fn complete(&self, prompt: &str) -> Completion {
        debug!(
            "Requesting completion from {} model {} ({} prompt chars)",
            self.family.name(),
            self.model,
            prompt.len()
        );
        let request = async {
            match self.family {
                ModelFamily::Gemini => self.complete_gemini(prompt).await,
                ModelFamily::Anthropic => self.complete_anthropic(prompt).await,
                ModelFamily::OpenAi => self.complete_openai(prompt).await,
            }
        };
        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(CompletionError::Timeout(self.timeout)),
        }
    }
}

impl LlmClient {
    async fn complete_gemini(&self, prompt: &str) -> Completion {
        let url = format!("{}/v1beta/models/{}:generateContent", self.api_base, self.model);

        let body = serde_json::json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": prompt }]
                }
            ],
            "generationConfig": {
                "maxOutputTokens": self.max_output_tokens
            }
        });

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.credential.expose())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let json = read_json(resp, "Gemini").await?;
        extract_gemini_text(&json)
    }

    async fn complete_anthropic(&self, prompt: &str) -> Completion {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_output_tokens,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });

        let resp = self
            .client
            .post(format!("{}/v1/messages", self.api_base))
            .header("x-api-key", self.credential.expose())
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let json = read_json(resp, "Anthropic").await?;
        extract_anthropic_text(&json)
    }

    async fn complete_openai(&self, prompt: &str) -> Completion {
        let body = serde_json::json!({
            "model": self.model,
            "max_completion_tokens": self.max_output_tokens,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });

        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.api_base))
            .bearer_auth(self.credential.expose())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let json = read_json(resp, "OpenAI").await?;
        extract_openai_text(&json)
    }
}

async fn read_json(resp: reqwest::Response, backend: &'static str) -> Result<serde_json::Value, CompletionError> {
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(CompletionError::Rejected { backend, status, body });
    }
    resp.json().await.map_err(|_| CompletionError::Malformed(backend))
}

fn extract_gemini_text(json: &serde_json::Value) -> Completion {
    if let Some(parts) = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
    {
        let text: String = parts
            .iter()
            .filter(|part| !part.get("thought").and_then(|t| t.as_bool()).unwrap_or(false))
            .filter_map(|part| part.get("text")?.as_str())
            .collect::<Vec<_>>()
            .join("");
        if !text.is_empty() {
            return Ok(text);
        }
    }
    Err(CompletionError::Malformed("Gemini"))
}

fn extract_anthropic_text(json: &serde_json::Value) -> Completion {
    if let Some(content) = json.get("content").and_then(|c| c.as_array()) {
        let text: String = content
            .iter()
            .filter_map(|block| {
                if block.get("type")?.as_str()? == "text" {
                    block.get("text")?.as_str().map(|s| s.to_string())
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("");
        if !text.is_empty() {
            return Ok(text);
        }
    }
    Err(CompletionError::Malformed("Anthropic"))
}

fn extract_openai_text(json: &serde_json::Value) -> Completion {
    if let Some(text) = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
    {
        return Ok(text.to_string());
    }
    Err(CompletionError::Malformed("OpenAI"))
}
