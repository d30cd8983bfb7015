//! Outbound Bot API calls: messages, chat actions, command menu, identity.

use super::types::{TgResponse, TgUser};
use super::TelegramChannel;
use spore_core::{error::SporeError, message::TextFormat};
use tracing::{debug, info, warn};

/// Telegram's maximum message length.
const MAX_MESSAGE_LEN: usize = 4096;

impl TelegramChannel {
    /// Send a text message to a chat, optionally as a reply.
    ///
    /// Markdown that Telegram cannot parse is resent as plain text.
    pub(crate) async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        format: TextFormat,
        reply_to: Option<i64>,
    ) -> Result<(), SporeError> {
        let url = format!("{}/sendMessage", self.base_url);

        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            let mut body = serde_json::json!({
                "chat_id": chat_id,
                "text": chunk,
            });
            if format == TextFormat::Markdown {
                body["parse_mode"] = "Markdown".into();
            }
            if let Some(message_id) = reply_to {
                body["reply_parameters"] = serde_json::json!({
                    "message_id": message_id,
                    "allow_sending_without_reply": true,
                });
            }

            let resp = self
                .client
                .post(&url)
                .json(&body)
                .timeout(self.request_timeout)
                .send()
                .await
                .map_err(|e| SporeError::Channel(format!("telegram send failed: {e}")))?;

            let status = resp.status();
            if status.is_success() {
                continue;
            }

            let error_text = resp.text().await.unwrap_or_default();
            if format != TextFormat::Markdown || !error_text.contains("can't parse entities") {
                return Err(SporeError::Channel(format!(
                    "telegram send got {status}: {error_text}"
                )));
            }

            debug!("Markdown parse failed, retrying as plain text");
            if let Some(obj) = body.as_object_mut() {
                obj.remove("parse_mode");
            }
            let resp = self
                .client
                .post(&url)
                .json(&body)
                .timeout(self.request_timeout)
                .send()
                .await
                .map_err(|e| SporeError::Channel(format!("telegram send (plain) failed: {e}")))?;

            let status = resp.status();
            if !status.is_success() {
                let error_text = resp.text().await.unwrap_or_default();
                return Err(SporeError::Channel(format!(
                    "telegram send (plain) got {status}: {error_text}"
                )));
            }
        }

        Ok(())
    }

    /// Send a chat action (e.g. "typing") to a chat.
    pub(crate) async fn send_chat_action(
        &self,
        chat_id: i64,
        action: &str,
    ) -> Result<(), SporeError> {
        let url = format!("{}/sendChatAction", self.base_url);
        let body = serde_json::json!({
            "chat_id": chat_id,
            "action": action,
        });

        self.client
            .post(&url)
            .json(&body)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| SporeError::Channel(format!("telegram sendChatAction failed: {e}")))?;

        Ok(())
    }

    /// Register bot commands with Telegram so users see an autocomplete menu.
    /// Best-effort: logs failures but does not propagate errors.
    pub(crate) async fn register_commands(&self) {
        let commands = serde_json::json!({
            "commands": [
                { "command": "prices", "description": "Live prices and 24h change" },
                { "command": "chatid", "description": "Show this chat's id" },
            ]
        });

        let url = format!("{}/setMyCommands", self.base_url);
        let request = self
            .client
            .post(&url)
            .json(&commands)
            .timeout(self.request_timeout);
        match request.send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("registered Telegram bot commands");
            }
            Ok(resp) => {
                let body = resp.text().await.unwrap_or_default();
                warn!("failed to register Telegram bot commands: {body}");
            }
            Err(e) => {
                warn!("failed to register Telegram bot commands: {e}");
            }
        }
    }

    /// Ask Telegram who we are and remember the bot's user id.
    pub(crate) async fn fetch_identity(&self) -> Result<i64, SporeError> {
        let url = format!("{}/getMe", self.base_url);
        let resp: TgResponse<TgUser> = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| SporeError::Channel(format!("telegram getMe failed: {e}")))?
            .json()
            .await
            .map_err(|e| SporeError::Channel(format!("telegram getMe parse failed: {e}")))?;

        let me = match resp.result {
            Some(me) if resp.ok => me,
            _ => {
                return Err(SporeError::Channel(format!(
                    "telegram getMe rejected: {}",
                    resp.description.unwrap_or_default()
                )))
            }
        };

        info!(
            "telegram: running as @{} ({})",
            me.username.as_deref().unwrap_or(&me.first_name),
            me.id
        );
        *self.bot_id.lock().await = Some(me.id);
        Ok(me.id)
    }
}

/// Split a long message into chunks that respect Telegram's limit.
///
/// Prefers newline boundaries and never splits inside a UTF-8 character.
pub(crate) fn split_message(text: &str, max_len: usize) -> Vec<&str> {
    if text.len() <= max_len {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let break_at = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .map(|i| start + i + 1)
                .unwrap_or(end)
        } else {
            end
        };
        chunks.push(&text[start..break_at]);
        start = break_at;
    }

    chunks
}
