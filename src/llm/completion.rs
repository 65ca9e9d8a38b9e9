//! OpenAI chat completions client.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{LlmProvider, PROVIDER, http_client, send_json};
use crate::config::OpenAiConfig;
use crate::error::LlmError;

/// Chat completion request.
#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

/// A message in the chat conversation.
#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Single-call generator backed by `POST /chat/completions`.
pub struct CompletionClient {
    client: reqwest::Client,
    api_key: SecretString,
    endpoint: String,
    model: String,
}

impl CompletionClient {
    pub fn new(config: &OpenAiConfig, model: &str) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(config)?,
            api_key: config.api_key.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl LlmProvider for CompletionClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        debug!(model = %self.model, "Sending chat completion request");

        let response: ChatResponse = send_json(
            self.client
                .post(&self.endpoint)
                .bearer_auth(self.api_key.expose_secret())
                .json(&request),
        )
        .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: "response contained no message content".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::GenerationMode;
    use crate::llm::test_support::openai_config;

    fn client_for(server: &MockServer) -> CompletionClient {
        let config = openai_config(
            &server.uri(),
            GenerationMode::Completion {
                model: "gpt-4o-mini".into(),
            },
        );
        CompletionClient::new(&config, "gpt-4o-mini").unwrap()
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "hola"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "¡Hola! ¿En qué te ayudo?"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client_for(&server).complete("hola").await.unwrap();
        assert_eq!(reply, "¡Hola! ¿En qué te ayudo?");
    }

    #[tokio::test]
    async fn api_error_status_is_request_failed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_string(r#"{"error": {"message": "Incorrect API key"}}"#),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).complete("hola").await.unwrap_err();
        match err {
            LlmError::RequestFailed { reason, .. } => {
                assert!(reason.contains("401"), "unexpected reason: {reason}");
                assert!(reason.contains("Incorrect API key"));
            }
            other => panic!("expected RequestFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_is_invalid_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": []
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).complete("hola").await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn malformed_body_is_json_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client_for(&server).complete("hola").await.unwrap_err();
        assert!(matches!(err, LlmError::Json(_)));
    }

    #[tokio::test]
    async fn unreachable_server_is_request_failed() {
        let config = openai_config(
            "http://127.0.0.1:1",
            GenerationMode::Completion {
                model: "gpt-4o-mini".into(),
            },
        );
        let client = CompletionClient::new(&config, "gpt-4o-mini").unwrap();
        let err = client.complete("hola").await.unwrap_err();
        assert!(matches!(err, LlmError::RequestFailed { .. }));
    }
}
