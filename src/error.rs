//! Error types for the WhatsApp relay.

use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Messaging channel errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send message on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Failed to build HTTP client for channel {name}: {reason}")]
    ClientBuild { name: String, reason: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Run {run_id} on provider {provider} ended with status {status}")]
    RunFailed {
        provider: String,
        run_id: String,
        status: String,
    },

    #[error("Run {run_id} on provider {provider} still pending after {waited:?}")]
    RunTimedOut {
        provider: String,
        run_id: String,
        waited: Duration,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_value_names_the_key() {
        let err = ConfigError::InvalidValue {
            key: "PORT".into(),
            message: "\"abc\": invalid digit found in string".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid configuration value for PORT: \"abc\": invalid digit found in string"
        );
    }

    #[test]
    fn run_timeout_mentions_run_id() {
        let err = LlmError::RunTimedOut {
            provider: "openai".into(),
            run_id: "run_123".into(),
            waited: Duration::from_millis(1500),
        };
        assert!(err.to_string().contains("run_123"));
    }
}
