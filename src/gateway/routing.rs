//! Trigger rules, intent routing, and reply composition.

use super::prompts::{
    chat_system_prompt, chat_user_prompt, price_unavailable, EMPTY_PING_PROMPT, LLM_FALLBACK,
};
use super::Gateway;
use crate::commands::{self, Command, CommandContext};
use spore_core::{
    context::Context,
    message::{IncomingMessage, OutgoingMessage, TextFormat},
};
use spore_market::{format::format_compact_line, intent::classify};
use tracing::{debug, info};

/// What the gateway did with an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Not addressed to the bot; nothing sent.
    Ignored,
    /// A built-in command answered.
    Command,
    /// At least one requested token was priced.
    PriceResponse,
    /// Tokens were recognised but none could be priced.
    PriceUnavailable,
    /// Answered by the completion provider (or its fallback text).
    LlmResponse,
}

impl Gateway {
    /// Route one inbound message and send at most one reply.
    pub(super) async fn handle_message(&self, incoming: IncomingMessage) -> Outcome {
        let username = self.settings.bot_username.as_str();

        if let Some(cmd) = Command::parse(&incoming.text, username) {
            info!("command {cmd:?} from @{}", incoming.sender_handle);
            self.run_command(cmd, &incoming).await;
            return Outcome::Command;
        }
        if incoming.text.trim_start().starts_with('/') {
            debug!("ignoring command not meant for us: {}", incoming.text);
            return Outcome::Ignored;
        }

        let mentioned = is_mentioned(&incoming.mentions, username);
        let replied = self.is_reply_to_bot(&incoming).await;
        if !mentioned && !replied {
            return Outcome::Ignored;
        }

        let stripped = strip_mention(&incoming.text, username);
        let query = if stripped.is_empty() {
            EMPTY_PING_PROMPT.to_string()
        } else {
            stripped
        };
        debug!(
            "routing message from @{} (mention: {mentioned}, reply: {replied}): {query}",
            incoming.sender_handle
        );

        if let Some(cmd) = Command::from_free_text(&query) {
            info!("command {cmd:?} from @{}", incoming.sender_handle);
            self.run_command(cmd, &incoming).await;
            return Outcome::Command;
        }

        let handle = incoming.sender_handle.as_str();
        let symbols = classify(&query, &self.tokens);
        if !symbols.is_empty() {
            self.typing(&incoming).await;
            let quotes = self.prices.fetch_quotes(&symbols).await;
            let (text, outcome) = match format_compact_line(&quotes) {
                Some(line) => (format!("@{handle} {line}"), Outcome::PriceResponse),
                None => (price_unavailable(handle), Outcome::PriceUnavailable),
            };
            info!("price query from @{handle} for {symbols:?}: {outcome:?}");
            self.send_bounded(&incoming.channel, OutgoingMessage::reply_to(&incoming, text))
                .await;
            return outcome;
        }

        self.typing(&incoming).await;
        let context = Context::new(
            &chat_system_prompt(&self.knowledge),
            &chat_user_prompt(handle, &query),
        )
        .with_max_tokens(self.settings.max_tokens)
        .with_temperature(self.settings.temperature);

        let answer = self
            .complete_bounded(&context)
            .await
            .unwrap_or_else(|| LLM_FALLBACK.to_string());
        let text = format!("@{handle} {answer}");
        self.send_bounded(&incoming.channel, OutgoingMessage::reply_to(&incoming, text))
            .await;
        Outcome::LlmResponse
    }

    async fn run_command(&self, cmd: Command, incoming: &IncomingMessage) {
        if cmd == Command::Prices {
            self.typing(incoming).await;
        }
        let ctx = CommandContext {
            prices: self.prices.as_ref(),
            tokens: &self.tokens,
            chat_id: incoming.reply_target.as_deref(),
        };
        let reply = commands::handle(cmd, &ctx).await;
        let mut out = OutgoingMessage::reply_to(incoming, reply.text);
        if reply.format == TextFormat::Markdown {
            out = out.markdown();
        }
        self.send_bounded(&incoming.channel, out).await;
    }

    /// Whether the message replies to something the bot itself sent.
    async fn is_reply_to_bot(&self, incoming: &IncomingMessage) -> bool {
        let Some(ref author) = incoming.reply_to_sender_id else {
            return false;
        };
        let Some(channel) = self.channels.get(&incoming.channel) else {
            return false;
        };
        channel.self_id().await.as_deref() == Some(author.as_str())
    }
}

/// Whether any mention entity names the bot (case-insensitive, `@` optional).
pub(super) fn is_mentioned(mentions: &[String], bot_username: &str) -> bool {
    !bot_username.is_empty()
        && mentions
            .iter()
            .any(|m| m.trim_start_matches('@').eq_ignore_ascii_case(bot_username))
}

/// Remove every `@bot_username` token from the text and trim the rest.
pub(super) fn strip_mention(text: &str, bot_username: &str) -> String {
    if bot_username.is_empty() {
        return text.trim().to_string();
    }
    let needle = format!("@{}", bot_username.to_ascii_lowercase());
    // ASCII lowercasing keeps byte offsets aligned with `text`.
    let haystack = text.to_ascii_lowercase();

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    while let Some(pos) = haystack[cursor..].find(&needle) {
        let start = cursor + pos;
        out.push_str(&text[cursor..start]);
        cursor = start + needle.len();
    }
    out.push_str(&text[cursor..]);

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
