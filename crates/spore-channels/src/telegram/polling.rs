//! Long-polling update loop and Channel trait implementation.

use super::types::{TgResponse, TgUpdate};
use super::{to_incoming, TelegramChannel};
use async_trait::async_trait;
use spore_core::{
    error::SporeError,
    message::{IncomingMessage, OutgoingMessage},
    traits::Channel,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<mpsc::Receiver<IncomingMessage>, SporeError> {
        if let Err(e) = self.fetch_identity().await {
            warn!("telegram: replies to the bot will not be recognised: {e}");
        }
        self.register_commands().await;

        let (tx, rx) = mpsc::channel(64);
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let last_update_id = self.last_update_id.clone();

        info!("Telegram channel starting long polling...");

        tokio::spawn(async move {
            let mut backoff_secs: u64 = 1;

            loop {
                let last = last_update_id.lock().await;
                let offset = last.map(|id| id + 1);
                drop(last);

                let mut url = format!("{base_url}/getUpdates?timeout=30");
                if let Some(off) = offset {
                    url.push_str(&format!("&offset={off}"));
                }

                let resp = match client
                    .get(&url)
                    .timeout(Duration::from_secs(35))
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        error!("telegram poll error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                let body: TgResponse<Vec<TgUpdate>> = match resp.json().await {
                    Ok(b) => b,
                    Err(e) => {
                        error!("telegram parse error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                if !body.ok {
                    error!(
                        "telegram API error (retry in {backoff_secs}s): {}",
                        body.description.unwrap_or_default()
                    );
                    tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                    backoff_secs = (backoff_secs * 2).min(60);
                    continue;
                }

                // Successful poll -- reset backoff.
                backoff_secs = 1;

                let updates = body.result.unwrap_or_default();

                if let Some(last_update) = updates.last() {
                    *last_update_id.lock().await = Some(last_update.update_id);
                }

                for update in updates {
                    let Some(msg) = update.message else {
                        continue;
                    };
                    let chat_id = msg.chat.id;
                    let Some(incoming) = to_incoming(msg) else {
                        debug!("telegram: skipping non-text update in chat {chat_id}");
                        continue;
                    };

                    if tx.send(incoming).await.is_err() {
                        info!("telegram channel receiver dropped, stopping poll");
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), SporeError> {
        let chat_id = parse_chat_id(message.reply_target.as_deref())?;
        self.send_text(
            chat_id,
            &message.text,
            message.format,
            message.reply_to_message_id,
        )
        .await
    }

    async fn self_id(&self) -> Option<String> {
        self.bot_id.lock().await.map(|id| id.to_string())
    }

    async fn send_typing(&self, target: &str) -> Result<(), SporeError> {
        let chat_id = parse_chat_id(Some(target))?;
        self.send_chat_action(chat_id, "typing").await
    }

    async fn stop(&self) -> Result<(), SporeError> {
        info!("Telegram channel stopped");
        Ok(())
    }
}

fn parse_chat_id(target: Option<&str>) -> Result<i64, SporeError> {
    let target =
        target.ok_or_else(|| SporeError::Channel("no reply_target on outgoing message".into()))?;
    target
        .parse()
        .map_err(|e| SporeError::Channel(format!("invalid telegram chat_id '{target}': {e}")))
}
