//! Built-in bot commands: instant responses without a provider call.

use crate::gateway::prompts::MARKET_UNAVAILABLE;
use spore_core::{config::ENV_GREETING_CHAT_ID, message::TextFormat};
use spore_market::{format::format_market_block, PriceSource, TokenTable};

/// Grouped context for command execution.
pub struct CommandContext<'a> {
    pub prices: &'a dyn PriceSource,
    pub tokens: &'a TokenTable,
    /// Chat the command was issued in.
    pub chat_id: Option<&'a str>,
}

/// Known bot commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Full market snapshot.
    Prices,
    /// Report the current chat identifier.
    ChatId,
}

/// Text and rendering mode of a command reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub text: String,
    pub format: TextFormat,
}

impl Command {
    /// Parse a slash command such as `/prices` or `/prices@SporeBot`.
    ///
    /// Returns `None` for unknown commands and for commands addressed to
    /// another bot.
    pub fn parse(text: &str, bot_username: &str) -> Option<Self> {
        let token = text.split_whitespace().next()?.strip_prefix('/')?;
        let name = match token.split_once('@') {
            Some((name, target)) if target.eq_ignore_ascii_case(bot_username) => name,
            Some(_) => return None,
            None => token,
        };
        Self::from_name(&name.to_lowercase())
    }

    /// Recognise a command phrased in free text after a mention,
    /// e.g. "prices", "/prices pls" or "chat id?".
    pub fn from_free_text(query: &str) -> Option<Self> {
        let q = query.trim().trim_start_matches('/').trim().to_lowercase();
        let q = q.trim_end_matches(['?', '!', '.']);
        for (alias, cmd) in ALIASES {
            if q == *alias || q.starts_with(&format!("{alias} ")) {
                return Some(*cmd);
            }
        }
        None
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "prices" => Some(Self::Prices),
            "chatid" => Some(Self::ChatId),
            _ => None,
        }
    }
}

const ALIASES: &[(&str, Command)] = &[
    ("prices", Command::Prices),
    ("chatid", Command::ChatId),
    ("chat id", Command::ChatId),
];

/// Handle a command and return the reply.
pub async fn handle(cmd: Command, ctx: &CommandContext<'_>) -> CommandReply {
    match cmd {
        Command::Prices => handle_prices(ctx).await,
        Command::ChatId => handle_chat_id(ctx.chat_id),
    }
}

async fn handle_prices(ctx: &CommandContext<'_>) -> CommandReply {
    let prices = ctx.prices.fetch_prices().await;
    match format_market_block(ctx.tokens, &prices) {
        Some(block) => CommandReply {
            text: block,
            format: TextFormat::Markdown,
        },
        None => CommandReply {
            text: MARKET_UNAVAILABLE.to_string(),
            format: TextFormat::Plain,
        },
    }
}

fn handle_chat_id(chat_id: Option<&str>) -> CommandReply {
    let text = match chat_id {
        Some(id) => format!(
            "This chat's id is {id}\nSet {ENV_GREETING_CHAT_ID}={id} to send the daily gm here."
        ),
        None => "I can't see a chat id for this conversation.".to_string(),
    };
    CommandReply {
        text,
        format: TextFormat::Plain,
    }
}
