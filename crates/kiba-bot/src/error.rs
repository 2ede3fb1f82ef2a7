//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{}", .0.hint())]
    Input(#[from] kiba_core::CoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Feed error: {0}")]
    Feed(#[from] kiba_feed::FeedError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] kiba_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
