//! OpenAI assistant client — thread + run flow.
//!
//! Each prompt gets a fresh thread: the user text is posted into it, a run is
//! started against the configured assistant, and the run is polled at a fixed
//! interval until it reaches a terminal status. The newest assistant message
//! on the thread is the reply. Polling is bounded by `max_polls`; a run that
//! exhausts it or stalls on `requires_action` is cancelled before giving up.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{LlmProvider, PROVIDER, http_client, send_json};
use crate::config::OpenAiConfig;
use crate::error::LlmError;

const BETA_HEADER: (&str, &str) = ("OpenAI-Beta", "assistants=v2");

/// Lifecycle status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Whether polling should stop. The relay registers no tools, so a run
    /// asking for tool outputs can never make progress.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed
                | Self::Failed
                | Self::Cancelled
                | Self::Expired
                | Self::Incomplete
                | Self::RequiresAction
        )
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
            Self::Expired => "expired",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Deserialize)]
struct Thread {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Run {
    id: String,
    status: RunStatus,
    #[serde(default)]
    last_error: Option<RunError>,
}

#[derive(Debug, Deserialize)]
struct RunError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
struct NewMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct NewRun<'a> {
    assistant_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    data: Vec<ThreadMessage>,
}

#[derive(Debug, Deserialize)]
struct ThreadMessage {
    role: String,
    #[serde(default)]
    content: Vec<MessageContent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum MessageContent {
    Text { text: TextValue },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    value: String,
}

/// Multi-step generator backed by the Assistants API.
pub struct AssistantClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    assistant_id: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl AssistantClient {
    pub fn new(config: &OpenAiConfig, assistant_id: &str) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(config)?,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            assistant_id: assistant_id.to_string(),
            poll_interval: config.poll_interval,
            max_polls: config.max_polls,
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(self.api_key.expose_secret())
            .header(BETA_HEADER.0, BETA_HEADER.1)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(self.api_key.expose_secret())
            .header(BETA_HEADER.0, BETA_HEADER.1)
    }

    async fn create_thread(&self) -> Result<Thread, LlmError> {
        send_json(self.post("/threads").json(&serde_json::json!({}))).await
    }

    async fn add_user_message(&self, thread_id: &str, text: &str) -> Result<(), LlmError> {
        let body = NewMessage {
            role: "user",
            content: text,
        };
        let _: serde_json::Value =
            send_json(self.post(&format!("/threads/{thread_id}/messages")).json(&body)).await?;
        Ok(())
    }

    async fn start_run(&self, thread_id: &str) -> Result<Run, LlmError> {
        let body = NewRun {
            assistant_id: &self.assistant_id,
        };
        send_json(self.post(&format!("/threads/{thread_id}/runs")).json(&body)).await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, LlmError> {
        send_json(self.get(&format!("/threads/{thread_id}/runs/{run_id}"))).await
    }

    /// Best-effort cancel of a run we are abandoning.
    async fn cancel_run(&self, thread_id: &str, run_id: &str) {
        let result: Result<serde_json::Value, LlmError> = send_json(
            self.post(&format!("/threads/{thread_id}/runs/{run_id}/cancel"))
                .json(&serde_json::json!({})),
        )
        .await;
        match result {
            Ok(_) => debug!(run_id, "Cancelled abandoned run"),
            Err(e) => warn!(run_id, error = %e, "Failed to cancel abandoned run"),
        }
    }

    /// Poll until the run is terminal or the poll budget runs out.
    async fn wait_for_run(&self, thread_id: &str, mut run: Run) -> Result<Run, LlmError> {
        let mut polls = 0u32;
        while !run.status.is_terminal() {
            if polls >= self.max_polls {
                return Err(LlmError::RunTimedOut {
                    provider: PROVIDER.to_string(),
                    run_id: run.id,
                    waited: self.poll_interval * polls,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
            run = self.retrieve_run(thread_id, &run.id).await?;
            polls += 1;
            debug!(run_id = %run.id, status = run.status.as_str(), polls, "Polled run");
        }
        Ok(run)
    }

    async fn latest_reply(&self, thread_id: &str) -> Result<String, LlmError> {
        let list: MessageList = send_json(
            self.get(&format!("/threads/{thread_id}/messages"))
                .query(&[("order", "desc"), ("limit", "20")]),
        )
        .await?;

        let reply = list
            .data
            .into_iter()
            .find(|m| m.role == "assistant")
            .map(|m| {
                m.content
                    .into_iter()
                    .filter_map(|c| match c {
                        MessageContent::Text { text } => Some(text.value),
                        MessageContent::Other => None,
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        if reply.trim().is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: format!("thread {thread_id} has no assistant text reply"),
            });
        }
        Ok(reply)
    }
}

#[async_trait]
impl LlmProvider for AssistantClient {
    fn model_name(&self) -> &str {
        &self.assistant_id
    }

    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let thread = self.create_thread().await?;
        self.add_user_message(&thread.id, prompt).await?;

        let run = self.start_run(&thread.id).await?;
        debug!(thread_id = %thread.id, run_id = %run.id, "Started assistant run");

        let run = match self.wait_for_run(&thread.id, run).await {
            Err(LlmError::RunTimedOut {
                provider,
                run_id,
                waited,
            }) => {
                self.cancel_run(&thread.id, &run_id).await;
                return Err(LlmError::RunTimedOut {
                    provider,
                    run_id,
                    waited,
                });
            }
            other => other?,
        };
        if run.status == RunStatus::RequiresAction {
            self.cancel_run(&thread.id, &run.id).await;
        }
        if run.status != RunStatus::Completed {
            if let Some(err) = &run.last_error {
                warn!(run_id = %run.id, error = %err.message, "Assistant run did not complete");
            }
            return Err(LlmError::RunFailed {
                provider: PROVIDER.to_string(),
                run_id: run.id,
                status: run.status.as_str().to_string(),
            });
        }

        self.latest_reply(&thread.id).await
    }
}
