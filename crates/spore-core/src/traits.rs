use crate::{
    context::Context,
    error::SporeError,
    message::{IncomingMessage, OutgoingMessage},
};
use async_trait::async_trait;

/// Completion provider trait.
///
/// Every LLM backend implements this trait so the gateway and the
/// greeting job can ask for text without knowing the vendor.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Send a completion request and get the generated text back.
    async fn complete(&self, context: &Context) -> Result<OutgoingMessage, SporeError>;

    /// Check if the provider is reachable with the configured credentials.
    async fn is_available(&self) -> bool;
}

/// Messaging channel trait.
///
/// Every messaging platform implements this trait to receive and send messages.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start listening for incoming messages.
    /// Returns a receiver that yields incoming messages.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<IncomingMessage>, SporeError>;

    /// Send a message through this channel.
    async fn send(&self, message: OutgoingMessage) -> Result<(), SporeError>;

    /// The bot's own user ID on this platform, once known.
    ///
    /// Used to recognise replies to the bot's earlier messages.
    async fn self_id(&self) -> Option<String> {
        None
    }

    /// Send a typing indicator to show the bot is processing.
    async fn send_typing(&self, _target: &str) -> Result<(), SporeError> {
        Ok(())
    }

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), SporeError>;
}
