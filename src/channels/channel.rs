//! Channel trait and the message types that cross it.

use async_trait::async_trait;

use crate::error::ChannelError;

/// Address tag the messaging provider puts on WhatsApp identifiers.
pub const WHATSAPP_PREFIX: &str = "whatsapp:";

/// A message received from the messaging provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundMessage {
    /// Sender identifier with the channel prefix removed.
    pub sender_id: String,
    /// Message text; empty when the provider sent none.
    pub body_text: String,
}

impl InboundMessage {
    /// Build from raw provider fields. Absent fields become empty strings.
    pub fn from_raw(from: Option<&str>, body: Option<&str>) -> Self {
        Self {
            sender_id: strip_channel_prefix(from.unwrap_or_default()).to_string(),
            body_text: body.unwrap_or_default().to_string(),
        }
    }
}

/// A reply on its way back to a sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub recipient_id: String,
    pub text: String,
}

impl OutboundReply {
    pub fn new(recipient_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            text: text.into(),
        }
    }
}

/// Something that can deliver a reply to a user.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Channel name for logs.
    fn name(&self) -> &str;

    /// Deliver one reply. Only success or failure is reported.
    async fn send(&self, reply: &OutboundReply) -> Result<(), ChannelError>;
}

/// Remove a leading `whatsapp:` tag, if any.
pub fn strip_channel_prefix(address: &str) -> &str {
    let address = address.trim();
    address.strip_prefix(WHATSAPP_PREFIX).unwrap_or(address)
}

/// Add the `whatsapp:` tag unless the address already carries it.
pub fn with_channel_prefix(address: &str) -> String {
    format!("{WHATSAPP_PREFIX}{}", strip_channel_prefix(address))
}
