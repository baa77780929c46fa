//! Error types for the AI client.

use thiserror::Error;

/// Result type for AI client operations.
pub type Result<T> = std::result::Result<T, AiError>;

/// AI client errors, shared by every provider.
#[derive(Debug, Error)]
pub enum AiError {
    /// Configuration error (missing API key, invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error (connection failed, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// API error (non-2xx response, rate limit, empty completion)
    #[error("API error: {0}")]
    Api(String),

    /// Parse error (invalid JSON, unexpected response format)
    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes_the_error_kind() {
        assert_eq!(
            AiError::Config("OPENAI_API_KEY is not set".into()).to_string(),
            "Configuration error: OPENAI_API_KEY is not set"
        );
        assert_eq!(AiError::Api("HTTP 429".into()).to_string(), "API error: HTTP 429");
    }

    #[test]
    fn test_is_a_std_error() {
        let err: Box<dyn std::error::Error + Send + Sync> = Box::new(AiError::Network("timeout".into()));
        assert_eq!(err.to_string(), "Network error: timeout");
    }
}
