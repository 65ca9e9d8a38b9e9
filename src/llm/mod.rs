//! LLM integration for the relay.
//!
//! Supports two OpenAI integration shapes:
//! - **Completion**: a single `chat/completions` call per message
//! - **Assistant**: thread + run flow, polled until the run is terminal
//!
//! Both talk to the API directly over `reqwest` and sit behind the
//! [`LlmProvider`] trait so the relay handler never knows which one it has.

pub mod assistant;
pub mod completion;
pub mod provider;

pub use assistant::AssistantClient;
pub use completion::CompletionClient;
pub use provider::LlmProvider;

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::config::{GenerationMode, OpenAiConfig};
use crate::error::LlmError;

/// Provider name used in errors and logs.
pub(crate) const PROVIDER: &str = "openai";

/// Create an LLM provider from configuration.
pub fn create_provider(config: &OpenAiConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match &config.mode {
        GenerationMode::Completion { model } => {
            tracing::info!("Using OpenAI chat completions (model: {})", model);
            Ok(Arc::new(CompletionClient::new(config, model)?))
        }
        GenerationMode::Assistant { assistant_id } => {
            tracing::info!("Using OpenAI assistant (id: {})", assistant_id);
            Ok(Arc::new(AssistantClient::new(config, assistant_id)?))
        }
    }
}

/// Build the shared HTTP client for OpenAI calls.
pub(crate) fn http_client(config: &OpenAiConfig) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: format!("Failed to create HTTP client: {}", e),
        })
}

/// Send a prepared request and decode a JSON body, mapping every failure.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, LlmError> {
    let response = request.send().await.map_err(|e| LlmError::RequestFailed {
        provider: PROVIDER.to_string(),
        reason: format!("HTTP request failed: {}", e),
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| LlmError::RequestFailed {
        provider: PROVIDER.to_string(),
        reason: format!("Failed to read response body: {}", e),
    })?;

    if !status.is_success() {
        return Err(LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: format!("API error {}: {}", status, body),
        });
    }

    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::time::Duration;

    use secrecy::SecretString;

    use crate::config::{GenerationMode, OpenAiConfig};

    pub fn openai_config(base_url: &str, mode: GenerationMode) -> OpenAiConfig {
        OpenAiConfig {
            api_key: SecretString::from("sk-test"),
            mode,
            base_url: base_url.to_string(),
            poll_interval: Duration::from_millis(5),
            max_polls: 5,
            timeout: Duration::from_secs(5),
        }
    }
}
