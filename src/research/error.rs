// src/research/error.rs
use thiserror::Error;

use crate::research::types::SourceId;

/// Failure inside a provider call. Never leaves an adapter: it is folded into
/// `FetchOutcome::NotFound` or `FetchOutcome::Failed` before the aggregator sees it.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("not found")]
    NotFound,

    #[error("authentication failed (HTTP {0})")]
    Unauthorized(u16),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request timed out")]
    Timeout,

    #[error("request failed: {0}")]
    Transport(String),

    #[error("malformed payload: {0}")]
    Payload(String),
}

impl ProviderError {
    /// Transient errors are worth another attempt; everything else is terminal.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Timeout | ProviderError::Transport(_) => true,
            ProviderError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return ProviderError::Timeout;
        }
        if e.is_decode() {
            return ProviderError::Payload(e.to_string());
        }
        if let Some(status) = e.status() {
            return ProviderError::Status {
                status: status.as_u16(),
                message: e.to_string(),
            };
        }
        ProviderError::Transport(e.to_string())
    }
}

/// The only failures `Aggregator::research` propagates. Provider trouble, adapter
/// panics included, never ends up here.
#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("company name must not be empty")]
    EmptyCompanyName,

    #[error("adapter task for {adapter} was cancelled")]
    AdapterCancelled { adapter: SourceId },
}
