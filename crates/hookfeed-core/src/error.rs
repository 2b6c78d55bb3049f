// Error types for webhook ingestion and event queries

use thiserror::Error;

/// Result type alias for feed operations
pub type Result<T> = std::result::Result<T, FeedError>;

/// Errors that can occur while ingesting or reading events.
///
/// The first four variants are correctness-affecting and reach the caller with
/// a distinguishable category. Broadcast problems never appear here: the hub
/// absorbs them.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Signature missing, malformed or not matching the shared secret
    #[error("invalid signature")]
    Unauthorized,

    /// Required delivery identifiers are missing
    #[error("validation error: {0}")]
    Validation(String),

    /// Payload for a recognized notification kind could not be parsed
    #[error("failed to parse {kind} payload: {message}")]
    Parse { kind: String, message: String },

    /// Storage failure unrelated to the dedup constraint
    #[error("storage error: {0}")]
    Storage(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl FeedError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        FeedError::Validation(msg.into())
    }

    /// Create a parse error for the given source kind
    pub fn parse(kind: impl Into<String>, msg: impl std::fmt::Display) -> Self {
        FeedError::Parse {
            kind: kind.into(),
            message: msg.to_string(),
        }
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        FeedError::Storage(msg.into())
    }

    /// Short, stable category name used in logs and error bodies
    pub fn category(&self) -> &'static str {
        match self {
            FeedError::Unauthorized => "unauthorized",
            FeedError::Validation(_) => "validation",
            FeedError::Parse { .. } => "parse",
            FeedError::Storage(_) => "storage",
            FeedError::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(FeedError::Unauthorized.category(), "unauthorized");
        assert_eq!(FeedError::validation("x").category(), "validation");
        assert_eq!(FeedError::parse("issues", "eof").category(), "parse");
        assert_eq!(FeedError::storage("down").category(), "storage");
        assert_eq!(
            FeedError::from(anyhow::anyhow!("boom")).category(),
            "internal"
        );
    }

    #[test]
    fn test_parse_error_message() {
        let err = FeedError::parse("pull_request", "expected value at line 1");
        assert_eq!(
            err.to_string(),
            "failed to parse pull_request payload: expected value at line 1"
        );
    }
}
