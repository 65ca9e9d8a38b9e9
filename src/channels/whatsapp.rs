//! WhatsApp channel — sends replies through Twilio's Messages API.
//!
//! One form-encoded `POST /2010-04-01/Accounts/{sid}/Messages.json` per
//! chunk, authenticated with the account SID and auth token.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::channels::{MessageSender, OutboundReply, with_channel_prefix};
use crate::config::TwilioConfig;
use crate::error::ChannelError;

/// Maximum body length Twilio accepts for a WhatsApp message.
const WHATSAPP_MAX_MESSAGE_LENGTH: usize = 1600;

/// WhatsApp channel backed by the Twilio REST API.
pub struct WhatsAppChannel {
    account_sid: String,
    auth_token: SecretString,
    from_number: String,
    base_url: String,
    client: reqwest::Client,
}

impl WhatsAppChannel {
    pub fn new(config: &TwilioConfig) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ChannelError::ClientBuild {
                name: "whatsapp".into(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.phone_number.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        )
    }

    async fn send_chunk(&self, to: &str, body: &str) -> Result<(), ChannelError> {
        let from = with_channel_prefix(&self.from_number);
        let form = [("From", from.as_str()), ("To", to), ("Body", body)];

        let resp = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&form)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "whatsapp".into(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "whatsapp".into(),
                reason: format!("Messages API returned {}: {}", status, err),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl MessageSender for WhatsAppChannel {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn send(&self, reply: &OutboundReply) -> Result<(), ChannelError> {
        let to = with_channel_prefix(&reply.recipient_id);
        let chunks = split_message(&reply.text, WHATSAPP_MAX_MESSAGE_LENGTH);
        debug!(to = %to, chunks = chunks.len(), "Sending WhatsApp message");

        for chunk in &chunks {
            self.send_chunk(&to, chunk).await?;
        }

        info!("WhatsApp message sent to {}", reply.recipient_id);
        Ok(())
    }
}

/// Split text into chunks of at most `max_chars` characters, preferring to
/// break at the last newline, then the last space, before the limit.
fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        // Byte offset of the character just past the limit, if there is one.
        let limit = match remaining.char_indices().nth(max_chars) {
            Some((idx, _)) => idx,
            None => {
                chunks.push(remaining.to_string());
                break;
            }
        };

        let window = &remaining[..limit];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(limit);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}
