use serde::Serialize;
use thiserror::Error;

/// Request-level failures surfaced to callers of the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Please provide a valid API key (x-api-key header or --api-key)")]
    Unauthorized,

    #[error("No transcript found for {0}. Paste the text manually instead.")]
    SourceUnavailable(String),

    #[error("Could not read document.")]
    DocumentUnreadable,

    #[error("No text provided.")]
    EmptyInput,

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Upload exceeds the size limit.")]
    PayloadTooLarge,

    /// Stage 1 of generation failed; carries the marker-prefixed message.
    #[error("{0}")]
    Completion(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// How a failure is classified at the request surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Unauthorized,
    Unprocessable,
    BadInput,
    PayloadTooLarge,
    UpstreamFailure,
    Internal,
}

impl Status {
    pub fn http_code(self) -> u16 {
        match self {
            Status::Unauthorized => 401,
            Status::Unprocessable => 422,
            Status::BadInput => 400,
            Status::PayloadTooLarge => 413,
            Status::UpstreamFailure => 502,
            Status::Internal => 500,
        }
    }
}

impl PipelineError {
    pub fn status(&self) -> Status {
        match self {
            PipelineError::Unauthorized => Status::Unauthorized,
            PipelineError::SourceUnavailable(_) => Status::Unprocessable,
            PipelineError::DocumentUnreadable | PipelineError::EmptyInput | PipelineError::MalformedRequest(_) => {
                Status::BadInput
            }
            PipelineError::PayloadTooLarge => Status::PayloadTooLarge,
            PipelineError::Completion(_) => Status::UpstreamFailure,
            PipelineError::Internal(_) => Status::Internal,
        }
    }

    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            error: self.to_string(),
            status: self.status(),
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        PipelineError::Internal(e.to_string())
    }
}

/// Wire shape of a failed request
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub error: String,
    pub status: Status,
}
