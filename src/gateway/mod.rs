//! Gateway: the main event loop connecting the chat channel, the price
//! source, and the completion provider.
//!
//! Includes: message routing, the daily greeting job, bounded outbound
//! sends, and graceful shutdown.

mod greeting;
pub(crate) mod prompts;
mod routing;

#[cfg(test)]
mod tests;

pub use greeting::compute_next_fire;

use spore_core::{
    config::{Config, GreetingConfig},
    context::Context,
    message::{IncomingMessage, OutgoingMessage},
    traits::{Channel, Provider},
};
use spore_market::{PriceSource, TokenTable};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Sampling and timeout settings for outbound work.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Bot username without `@`, used for mention detection.
    pub bot_username: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub completion_timeout: Duration,
    pub send_timeout: Duration,
}

impl GatewaySettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            bot_username: cfg.bot.username.clone(),
            max_tokens: cfg.openai.max_tokens,
            temperature: cfg.openai.temperature,
            completion_timeout: Duration::from_secs(cfg.openai.timeout_secs),
            send_timeout: Duration::from_secs(cfg.telegram.send_timeout_secs),
        }
    }
}

/// The central gateway that routes messages between channels, prices, and the provider.
pub struct Gateway {
    pub(super) provider: Arc<dyn Provider>,
    pub(super) prices: Arc<dyn PriceSource>,
    pub(super) channels: HashMap<String, Arc<dyn Channel>>,
    pub(super) tokens: Arc<TokenTable>,
    /// Knowledge corpus, read-only after startup.
    pub(super) knowledge: Arc<str>,
    pub(super) settings: GatewaySettings,
    pub(super) greeting: GreetingConfig,
}

impl Gateway {
    /// Create a new gateway.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: Arc<dyn Provider>,
        prices: Arc<dyn PriceSource>,
        channels: HashMap<String, Arc<dyn Channel>>,
        tokens: Arc<TokenTable>,
        knowledge: Arc<str>,
        settings: GatewaySettings,
        greeting: GreetingConfig,
    ) -> Self {
        Self {
            provider,
            prices,
            channels,
            tokens,
            knowledge,
            settings,
            greeting,
        }
    }

    /// Run the main event loop.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        info!(
            "Spore gateway running | provider: {} | channels: {} | tokens: {} | greeting: {}",
            self.provider.name(),
            self.channels.keys().cloned().collect::<Vec<_>>().join(", "),
            self.tokens.len(),
            if self.greeting.enabled {
                "enabled"
            } else {
                "disabled"
            },
        );

        let (tx, mut rx) = mpsc::channel::<IncomingMessage>(256);

        for (name, channel) in &self.channels {
            let mut channel_rx = channel
                .start()
                .await
                .map_err(|e| anyhow::anyhow!("failed to start channel {name}: {e}"))?;
            let tx = tx.clone();
            let channel_name = name.clone();

            tokio::spawn(async move {
                while let Some(msg) = channel_rx.recv().await {
                    if tx.send(msg).await.is_err() {
                        info!("gateway receiver dropped, stopping {channel_name} forwarder");
                        break;
                    }
                }
            });

            info!("Channel started: {name}");
        }

        drop(tx);

        // Spawn the daily greeting loop.
        let greeting_handle = if self.greeting.enabled {
            let gw = self.clone();
            Some(tokio::spawn(async move {
                gw.greeting_loop().await;
            }))
        } else {
            None
        };

        // Main event loop with graceful shutdown.
        loop {
            tokio::select! {
                maybe = rx.recv() => {
                    let Some(incoming) = maybe else {
                        warn!("all channels closed");
                        break;
                    };
                    let gw = self.clone();
                    tokio::spawn(async move {
                        let outcome = gw.handle_message(incoming).await;
                        debug!("message handled: {outcome:?}");
                    });
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown(greeting_handle).await;
        Ok(())
    }

    /// Graceful shutdown: stop background tasks and channels.
    async fn shutdown(&self, greeting_handle: Option<tokio::task::JoinHandle<()>>) {
        info!("Shutting down...");

        if let Some(h) = greeting_handle {
            h.abort();
        }

        for (name, channel) in &self.channels {
            if let Err(e) = channel.stop().await {
                warn!("failed to stop channel {name}: {e}");
            }
        }

        info!("Shutdown complete.");
    }

    /// Ask the provider for text, bounded by the completion timeout.
    ///
    /// Returns `None` on failure or expiry; callers substitute a fallback.
    pub(super) async fn complete_bounded(&self, context: &Context) -> Option<String> {
        match tokio::time::timeout(
            self.settings.completion_timeout,
            self.provider.complete(context),
        )
        .await
        {
            Ok(Ok(resp)) => Some(resp.text),
            Ok(Err(e)) => {
                warn!("{} error: {e}", self.provider.name());
                None
            }
            Err(_) => {
                warn!(
                    "{} timed out after {}s",
                    self.provider.name(),
                    self.settings.completion_timeout.as_secs()
                );
                None
            }
        }
    }

    /// Deliver a message through the named channel, bounded by the send timeout.
    pub(super) async fn send_bounded(&self, channel_name: &str, msg: OutgoingMessage) -> bool {
        let Some(channel) = self.channels.get(channel_name) else {
            error!("no channel named {channel_name}");
            return false;
        };

        match tokio::time::timeout(self.settings.send_timeout, channel.send(msg)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!("failed to send message: {e}");
                false
            }
            Err(_) => {
                error!(
                    "send via {channel_name} timed out after {}s",
                    self.settings.send_timeout.as_secs()
                );
                false
            }
        }
    }

    /// Best-effort typing indicator, bounded by the send timeout.
    pub(super) async fn typing(&self, incoming: &IncomingMessage) {
        let (Some(channel), Some(target)) = (
            self.channels.get(&incoming.channel),
            incoming.reply_target.as_deref(),
        ) else {
            return;
        };
        let bounded = tokio::time::timeout(self.settings.send_timeout, channel.send_typing(target));
        match bounded.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("typing indicator failed: {e}"),
            Err(_) => debug!("typing indicator timed out"),
        }
    }
}
