//! Feed error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unexpected frame: {0}")]
    UnexpectedFrame(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FeedError {
    /// Short label for the dropped-tick metric.
    pub fn reason(&self) -> &'static str {
        match self {
            FeedError::ParseError(_) | FeedError::Json(_) => "parse_error",
            FeedError::UnexpectedFrame(_) => "unexpected_frame",
        }
    }
}

pub type FeedResult<T> = Result<T, FeedError>;
