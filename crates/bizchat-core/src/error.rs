//! Error types for the business-assistant chat.

use thiserror::Error;

/// Ways a round-trip to the chat backend can go wrong.
///
/// The exchange client folds every variant into the same "remote
/// unavailable" outcome; the variant only shows up in logs.
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// Connection refused, DNS failure, timeout
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Backend answered with a non-2xx status
    #[error("backend returned status {0}")]
    Status(reqwest::StatusCode),

    /// Body was not JSON or had no `response` string
    #[error("malformed backend response: {0}")]
    Malformed(String),
}

impl ExchangeError {
    /// Short label for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            ExchangeError::Transport(e) if e.is_timeout() => "timeout",
            ExchangeError::Transport(_) => "transport",
            ExchangeError::Status(_) => "status",
            ExchangeError::Malformed(_) => "malformed",
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Could not determine data directory")]
    NoDataDir,
}
