//! Persona, prompt templates, and canned replies.

/// Used when the bot is pinged with nothing else in the message.
pub const EMPTY_PING_PROMPT: &str =
    "They pinged you without any text. Say hi and explain what you can do.";

/// Sent when the completion service fails or times out.
pub const LLM_FALLBACK: &str = "My spores are clogged rn, try again in a bit.";

/// Sent when no price could be fetched for the full market view.
pub const MARKET_UNAVAILABLE: &str = "Could not fetch prices rn, spores are tired.";

/// Sent when the daily greeting cannot be generated.
pub const GREETING_FALLBACK: &str =
    "gm spores 🍄 another day in the mycelium. hydrate, touch grass, and be kind in the chat.";

const PERSONA: &str = "You are Spore, a semi-sentient mushroom archivist and lore keeper for an \
ERC-20i / Base Telegram community.\n\
- You speak like a friendly crypto degen (CT tone) but stay helpful and positive.\n\
- You explain the community's history, culture, key events, characters, memes, links, and tools.\n\
- Keep replies short and group-chat friendly (1–3 short paragraphs or a few lines).\n\
- If you don't know something, say you're not sure and suggest asking mods or checking official resources.";

const GREETING_PROMPT: &str = "Write a short good-morning message for the community group chat. \
One or two lines, warm, a little mushroom-themed, no hashtags, no links.";

/// System prompt for chat replies: persona plus the full knowledge corpus.
pub fn chat_system_prompt(knowledge: &str) -> String {
    format!(
        "{PERSONA}\n\n\
         Below is ALL community knowledge loaded from the knowledge folder, including history, \
         links, docs, characters, memes, FAQs, and ecosystem info:\n\n\
         {knowledge}\n\n\
         Use this knowledge when helpful. If a user asks for official links, socials, website, \
         docs, or tools, pull the answer directly from the links document."
    )
}

/// User prompt for chat replies.
pub fn chat_user_prompt(handle: &str, query: &str) -> String {
    format!(
        "Telegram user @{handle} asked or said:\n\
         {query}\n\n\
         Reply as Spore in a busy group chat. Address them directly, keep it casual and concise."
    )
}

/// Reply when a recognised token could not be priced.
pub fn price_unavailable(handle: &str) -> String {
    format!(
        "@{handle} I can't fetch live prices for those spores rn. \
         Try /prices or double-check if they're listed on CoinGecko."
    )
}

/// System and user prompt for the daily greeting.
pub fn greeting_prompts() -> (&'static str, &'static str) {
    (PERSONA, GREETING_PROMPT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_embeds_knowledge() {
        let prompt = chat_system_prompt("# From links.md\n\nsite: spore.example");
        assert!(prompt.starts_with("You are Spore"));
        assert!(prompt.contains("site: spore.example"));
    }

    #[test]
    fn test_user_prompt_embeds_handle_and_query() {
        let prompt = chat_user_prompt("alice", "who is the frog?");
        assert!(prompt.contains("@alice"));
        assert!(prompt.contains("who is the frog?"));
    }

    #[test]
    fn test_price_unavailable_addresses_sender() {
        assert!(price_unavailable("bob").starts_with("@bob "));
    }
}
