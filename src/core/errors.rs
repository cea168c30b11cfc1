use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("Corrupt document: {0}")]
    CorruptDocument(String),
    #[error("Text is not valid UTF-8: {0}")]
    EncodingError(String),
    #[error("Completion request failed: {message}")]
    Completion { message: String, retryable: bool },
    #[error("Completion request timed out after {0:?}")]
    CompletionTimeout(Duration),
    #[error("Interview session not found: {0}")]
    SessionNotFound(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl CoreError {
    pub fn completion(message: impl Into<String>, retryable: bool) -> Self {
        CoreError::Completion {
            message: message.into(),
            retryable,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::Completion { retryable, .. } => *retryable,
            CoreError::CompletionTimeout(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_completion_failures_are_retryable() {
        assert!(CoreError::completion("503 from upstream", true).is_retryable());
        assert!(!CoreError::completion("bad api key", false).is_retryable());
        assert!(CoreError::CompletionTimeout(Duration::from_secs(5)).is_retryable());
        assert!(!CoreError::UnsupportedFormat("rtf".to_string()).is_retryable());
        assert!(!CoreError::CorruptDocument("truncated".to_string()).is_retryable());
        assert!(!CoreError::EncodingError("byte 0xff".to_string()).is_retryable());
    }
}
