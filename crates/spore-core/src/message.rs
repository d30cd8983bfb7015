use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An incoming message from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Channel name (e.g. "telegram").
    pub channel: String,
    /// Platform-specific user ID.
    pub sender_id: String,
    /// Handle used when addressing the sender: username if set, else first name.
    pub sender_handle: String,
    /// Message text content.
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Text of every `@mention` entity in the message, as typed (e.g. "@SporeBot").
    #[serde(default)]
    pub mentions: Vec<String>,
    /// If this message replies to another one, the user ID of that message's author.
    #[serde(default)]
    pub reply_to_sender_id: Option<String>,
    /// Platform-specific target for routing the response (e.g. Telegram chat_id).
    #[serde(default)]
    pub reply_target: Option<String>,
    /// Platform message ID, used to thread the reply under the original message.
    #[serde(default)]
    pub platform_message_id: Option<i64>,
    /// Whether this message comes from a group chat.
    #[serde(default)]
    pub is_group: bool,
}

impl IncomingMessage {
    /// Build a plain text message from a sender in a chat.
    ///
    /// Channels fill in mentions and reply metadata afterwards.
    pub fn text(
        channel: &str,
        sender_id: &str,
        sender_handle: &str,
        chat: &str,
        text: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.to_string(),
            sender_id: sender_id.to_string(),
            sender_handle: sender_handle.to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
            mentions: Vec::new(),
            reply_to_sender_id: None,
            reply_target: Some(chat.to_string()),
            platform_message_id: None,
            is_group: true,
        }
    }
}

/// How the channel should interpret the outgoing text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextFormat {
    #[default]
    Plain,
    /// Simple markup (bold via `*text*`); channels fall back to plain on parse errors.
    Markdown,
}

/// An outgoing message to send back through a channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub text: String,
    pub metadata: MessageMetadata,
    /// Platform-specific target for routing (e.g. Telegram chat_id).
    #[serde(default)]
    pub reply_target: Option<String>,
    /// Platform message ID this message answers, if any.
    #[serde(default)]
    pub reply_to_message_id: Option<i64>,
    #[serde(default)]
    pub format: TextFormat,
}

impl OutgoingMessage {
    /// A reply threaded under `incoming`, sent to the same chat.
    pub fn reply_to(incoming: &IncomingMessage, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: MessageMetadata::default(),
            reply_target: incoming.reply_target.clone(),
            reply_to_message_id: incoming.platform_message_id,
            format: TextFormat::Plain,
        }
    }

    /// A standalone message to a chat.
    pub fn to_chat(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reply_target: Some(target.into()),
            ..Default::default()
        }
    }

    /// Switch the message to Markdown rendering.
    pub fn markdown(mut self) -> Self {
        self.format = TextFormat::Markdown;
        self
    }
}

/// Metadata about how a message was generated.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessageMetadata {
    /// Which provider produced this response.
    pub provider_used: String,
    /// Token count (if available from the provider).
    pub tokens_used: Option<u64>,
    /// Wall-clock processing time in milliseconds.
    pub processing_time_ms: u64,
    /// Model identifier (if applicable).
    pub model: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_to_threads_under_original() {
        let mut incoming = IncomingMessage::text("telegram", "42", "alice", "-100", "hi");
        incoming.platform_message_id = Some(7);

        let out = OutgoingMessage::reply_to(&incoming, "hello");
        assert_eq!(out.reply_target.as_deref(), Some("-100"));
        assert_eq!(out.reply_to_message_id, Some(7));
        assert_eq!(out.format, TextFormat::Plain);
    }

    #[test]
    fn test_to_chat_markdown() {
        let out = OutgoingMessage::to_chat("-100", "*gm*").markdown();
        assert_eq!(out.reply_target.as_deref(), Some("-100"));
        assert!(out.reply_to_message_id.is_none());
        assert_eq!(out.format, TextFormat::Markdown);
    }

    #[test]
    fn test_incoming_deserialize_without_optional_fields() {
        let json = r#"{
            "id": "00000000-0000-0000-0000-000000000000",
            "channel": "telegram",
            "sender_id": "1",
            "sender_handle": "bob",
            "text": "yo",
            "timestamp": "2024-01-01T00:00:00Z"
        }"#;
        let msg: IncomingMessage = serde_json::from_str(json).unwrap();
        assert!(msg.mentions.is_empty());
        assert!(msg.reply_to_sender_id.is_none());
        assert!(!msg.is_group);
    }
}
