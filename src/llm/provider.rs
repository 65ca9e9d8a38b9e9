//! The provider seam between the relay and a text generator.

use async_trait::async_trait;

use crate::error::LlmError;

/// A text generator: one prompt in, one reply out.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Model or assistant identifier, for logging.
    fn model_name(&self) -> &str;

    /// Generate a reply for a single user message.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}
