use thiserror::Error;

pub type SourceResult<T> = Result<T, SourceError>;

#[derive(Debug, Error)]
pub enum SourceError {
    /// Backend unreachable, timed out or answered with a non-success status.
    #[error("transport error: {0}")]
    Transport(String),

    /// Body is not JSON or does not have the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// Events payload is valid JSON but not a list.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(error.to_string())
    }
}
