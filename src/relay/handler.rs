//! Relay handler — one inbound message in, at most one reply out.
//!
//! Received → Classified → Responded → Acknowledged. Every failure along the
//! way is logged and absorbed here; the caller only learns what happened
//! through the returned [`RelayOutcome`].

use std::sync::Arc;

use tracing::{error, info, warn};

use super::canned::{FALLBACK_REPLY, UNCONFIGURED_REPLY, canned_reply};
use super::cleanup::clean_response;
use super::keywords::KeywordSet;
use crate::channels::{InboundMessage, MessageSender, OutboundReply};
use crate::llm::LlmProvider;

/// Where the reply text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    /// Keyword hit; canned text.
    Canned,
    /// LLM output after cleanup.
    Generated,
    /// LLM call failed or produced nothing usable.
    Fallback,
    /// No LLM credentials configured.
    Unconfigured,
}

/// Terminal state of one handled message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Empty body or no sender; nothing generated or sent.
    Ignored,
    Replied { source: ReplySource, delivered: bool },
}

/// Composes and delivers replies. Shared read-only across requests.
pub struct RelayHandler {
    keywords: KeywordSet,
    generator: Option<Arc<dyn LlmProvider>>,
    sender: Option<Arc<dyn MessageSender>>,
}

impl RelayHandler {
    pub fn new(
        keywords: KeywordSet,
        generator: Option<Arc<dyn LlmProvider>>,
        sender: Option<Arc<dyn MessageSender>>,
    ) -> Self {
        Self {
            keywords,
            generator,
            sender,
        }
    }

    pub fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }

    /// Run the whole pipeline for one message. Never fails.
    pub async fn handle(&self, msg: InboundMessage) -> RelayOutcome {
        info!(sender = %msg.sender_id, body = %msg.body_text, "Message received");

        if msg.body_text.trim().is_empty() {
            info!(sender = %msg.sender_id, "Empty message body, no reply sent");
            return RelayOutcome::Ignored;
        }

        if msg.sender_id.is_empty() {
            warn!("Inbound message had no sender, nothing to reply to");
            return RelayOutcome::Ignored;
        }

        let (source, text) = self.compose_reply(&msg.body_text).await;
        let delivered = self
            .deliver(&OutboundReply::new(msg.sender_id, text))
            .await;

        RelayOutcome::Replied { source, delivered }
    }

    /// Pick canned or generated text for a non-empty message.
    pub async fn compose_reply(&self, body: &str) -> (ReplySource, String) {
        if self.keywords.is_match(body) {
            info!("Informational query, sending canned reply");
            return (ReplySource::Canned, canned_reply().to_string());
        }

        let Some(generator) = &self.generator else {
            error!("OpenAI credentials are not configured, cannot generate a reply");
            return (ReplySource::Unconfigured, UNCONFIGURED_REPLY.to_string());
        };

        info!(model = generator.model_name(), "Requesting reply from OpenAI");
        match generator.complete(body).await {
            Ok(raw) => {
                let cleaned = clean_response(&raw);
                if cleaned.is_empty() {
                    warn!("OpenAI reply was empty after cleanup, using fallback");
                    (ReplySource::Fallback, FALLBACK_REPLY.to_string())
                } else {
                    info!("OpenAI reply received");
                    (ReplySource::Generated, cleaned)
                }
            }
            Err(e) => {
                error!(error = %e, "OpenAI request failed, using fallback");
                (ReplySource::Fallback, FALLBACK_REPLY.to_string())
            }
        }
    }

    /// Send a reply; returns whether the provider accepted it.
    async fn deliver(&self, reply: &OutboundReply) -> bool {
        let Some(sender) = &self.sender else {
            error!("WhatsApp client is not initialized, cannot send the message");
            return false;
        };

        match sender.send(reply).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    channel = sender.name(),
                    recipient = %reply.recipient_id,
                    error = %e,
                    "Failed to send reply"
                );
                false
            }
        }
    }
}
