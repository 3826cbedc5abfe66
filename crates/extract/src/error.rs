use thiserror::Error;

/// Failure talking to the text-generation service.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("failed to reach text-generation service: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("text-generation service returned {0}")]
    Status(reqwest::StatusCode),

    #[error("failed to decode text-generation response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Why a model reply yielded no structured triplets.
#[derive(Debug, Error)]
pub enum ParseFailure {
    #[error("no bracketed array in response")]
    NoArray,

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}
