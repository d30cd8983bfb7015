//! Telegram Bot API channel.
//!
//! Uses long polling via `getUpdates` and `sendMessage` for responses.
//! Docs: <https://core.telegram.org/bots/api>

mod polling;
pub(crate) mod send;
pub(crate) mod types;


use spore_core::{config::TelegramConfig, message::IncomingMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use types::TgMessage;

/// Telegram channel using the Bot API with long polling.
pub struct TelegramChannel {
    client: reqwest::Client,
    base_url: String,
    /// Upper bound on every call except the long poll.
    request_timeout: Duration,
    /// Tracks the last update_id to avoid reprocessing.
    last_update_id: Arc<Mutex<Option<i64>>>,
    /// The bot's own user id, learned from `getMe` on start.
    bot_id: Arc<Mutex<Option<i64>>>,
}

impl TelegramChannel {
    /// Create a new Telegram channel from config.
    pub fn new(config: TelegramConfig) -> Self {
        let base_url = format!("https://api.telegram.org/bot{}", config.bot_token);
        Self {
            client: reqwest::Client::new(),
            base_url,
            request_timeout: Duration::from_secs(config.send_timeout_secs),
            last_update_id: Arc::new(Mutex::new(None)),
            bot_id: Arc::new(Mutex::new(None)),
        }
    }
}

/// Convert a Telegram message into a channel-neutral one.
///
/// Only text messages with a known sender are kept.
pub(crate) fn to_incoming(msg: TgMessage) -> Option<IncomingMessage> {
    let text = msg.text?;
    let user = msg.from?;

    let handle = user
        .username
        .clone()
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| user.first_name.clone());

    let mentions = msg
        .entities
        .iter()
        .filter(|e| e.kind == "mention")
        .filter_map(|e| utf16_slice(&text, e.offset, e.length))
        .collect();

    let reply_to_sender_id = msg
        .reply_to_message
        .as_ref()
        .and_then(|r| r.from.as_ref())
        .map(|u| u.id.to_string());

    let mut incoming = IncomingMessage::text(
        "telegram",
        &user.id.to_string(),
        &handle,
        &msg.chat.id.to_string(),
        &text,
    );
    incoming.mentions = mentions;
    incoming.reply_to_sender_id = reply_to_sender_id;
    incoming.platform_message_id = Some(msg.message_id);
    incoming.is_group = matches!(msg.chat.chat_type.as_str(), "group" | "supergroup");
    Some(incoming)
}

/// Cut an entity span out of `text`. Telegram counts offsets in UTF-16 code units.
pub(crate) fn utf16_slice(text: &str, offset: usize, length: usize) -> Option<String> {
    let units: Vec<u16> = text.encode_utf16().collect();
    let end = offset.checked_add(length)?;
    let span = units.get(offset..end)?;
    String::from_utf16(span).ok()
}
