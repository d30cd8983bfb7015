use super::routing::Outcome;
use super::*;
use async_trait::async_trait;
use spore_core::{config::default_tokens, error::SporeError, message::TextFormat};
use spore_market::PriceQuote;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const BOT_ID: &str = "999";

/// Provider that returns a fixed answer or fails, recording every context.
struct FakeProvider {
    answer: Option<String>,
    delay: Duration,
    seen: Mutex<Vec<Context>>,
}

impl FakeProvider {
    fn answering(text: &str) -> Self {
        Self {
            answer: Some(text.to_string()),
            delay: Duration::ZERO,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn slow(text: &str, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::answering(text)
        }
    }

    fn failing() -> Self {
        Self {
            answer: None,
            delay: Duration::ZERO,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn complete(&self, context: &Context) -> Result<OutgoingMessage, SporeError> {
        self.seen.lock().unwrap().push(context.clone());
        tokio::time::sleep(self.delay).await;
        match &self.answer {
            Some(text) => Ok(OutgoingMessage {
                text: text.clone(),
                ..Default::default()
            }),
            None => Err(SporeError::Provider("boom".into())),
        }
    }

    async fn is_available(&self) -> bool {
        true
    }
}

/// Channel that records outbound messages.
#[derive(Default)]
struct FakeChannel {
    sent: Mutex<Vec<OutgoingMessage>>,
    typing: AtomicUsize,
    send_delay: Duration,
    typing_delay: Duration,
}

impl FakeChannel {
    fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Channel for FakeChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<mpsc::Receiver<IncomingMessage>, SporeError> {
        let (_tx, rx) = mpsc::channel(1);
        Ok(rx)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), SporeError> {
        tokio::time::sleep(self.send_delay).await;
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn self_id(&self) -> Option<String> {
        Some(BOT_ID.to_string())
    }

    async fn send_typing(&self, _target: &str) -> Result<(), SporeError> {
        self.typing.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.typing_delay).await;
        Ok(())
    }

    async fn stop(&self) -> Result<(), SporeError> {
        Ok(())
    }
}

/// Price source with a fixed snapshot.
struct FakePrices(HashMap<String, PriceQuote>);

#[async_trait]
impl PriceSource for FakePrices {
    async fn fetch_prices(&self) -> HashMap<String, PriceQuote> {
        self.0.clone()
    }
}

fn btc_snapshot() -> HashMap<String, PriceQuote> {
    let mut map = HashMap::new();
    map.insert(
        "BTC".to_string(),
        PriceQuote {
            symbol: "BTC".into(),
            label: "Bitcoin".into(),
            price: Some(65000.1234),
            change_24h: Some(2.5),
        },
    );
    map
}

struct Harness {
    gateway: Gateway,
    provider: Arc<FakeProvider>,
    channel: Arc<FakeChannel>,
}

fn harness(provider: FakeProvider, prices: HashMap<String, PriceQuote>) -> Harness {
    harness_with_greeting(provider, prices, GreetingConfig::default())
}

fn harness_with_greeting(
    provider: FakeProvider,
    prices: HashMap<String, PriceQuote>,
    greeting: GreetingConfig,
) -> Harness {
    harness_with(
        provider,
        FakeChannel::default(),
        prices,
        greeting,
        Duration::from_secs(5),
    )
}

/// Full control over the fakes and both gateway timeouts.
fn harness_with(
    provider: FakeProvider,
    channel: FakeChannel,
    prices: HashMap<String, PriceQuote>,
    greeting: GreetingConfig,
    timeout: Duration,
) -> Harness {
    let provider = Arc::new(provider);
    let channel = Arc::new(channel);
    let mut channels: HashMap<String, Arc<dyn Channel>> = HashMap::new();
    channels.insert("telegram".to_string(), channel.clone());

    let gateway = Gateway::new(
        provider.clone(),
        Arc::new(FakePrices(prices)),
        channels,
        Arc::new(TokenTable::new(&default_tokens()).unwrap()),
        Arc::from("# From lore.md\n\nthe frog came first"),
        GatewaySettings {
            bot_username: "SporeBot".to_string(),
            max_tokens: 250,
            temperature: 0.8,
            completion_timeout: timeout,
            send_timeout: timeout,
        },
        greeting,
    );

    Harness {
        gateway,
        provider,
        channel,
    }
}

fn mention(text: &str) -> IncomingMessage {
    let mut msg = IncomingMessage::text("telegram", "42", "alice", "-100123", text);
    msg.mentions = vec!["@SporeBot".to_string()];
    msg.platform_message_id = Some(77);
    msg
}

#[tokio::test]
async fn test_unaddressed_message_is_ignored() {
    let h = harness(FakeProvider::answering("hi"), btc_snapshot());
    let msg = IncomingMessage::text("telegram", "42", "alice", "-100123", "what's BTC worth");

    assert_eq!(h.gateway.handle_message(msg).await, Outcome::Ignored);
    assert!(h.channel.sent().is_empty());
    assert_eq!(h.provider.calls(), 0);
}

#[tokio::test]
async fn test_mention_of_other_user_is_ignored() {
    let h = harness(FakeProvider::answering("hi"), btc_snapshot());
    let mut msg = IncomingMessage::text("telegram", "42", "alice", "-100123", "@bob gm");
    msg.mentions = vec!["@bob".to_string()];

    assert_eq!(h.gateway.handle_message(msg).await, Outcome::Ignored);
    assert!(h.channel.sent().is_empty());
}

#[tokio::test]
async fn test_btc_price_reply() {
    let h = harness(FakeProvider::answering("unused"), btc_snapshot());

    let outcome = h.gateway.handle_message(mention("@SporeBot what's BTC worth")).await;
    assert_eq!(outcome, Outcome::PriceResponse);

    let sent = h.channel.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text, "@alice 🟢 BTC: $65,000.12 (+2.50%)");
    assert_eq!(sent[0].reply_target.as_deref(), Some("-100123"));
    assert_eq!(sent[0].reply_to_message_id, Some(77));
    assert_eq!(h.provider.calls(), 0);
    assert_eq!(h.channel.typing.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unknown_token_falls_through_to_llm() {
    let h = harness(FakeProvider::answering("no idea fren"), btc_snapshot());

    let outcome = h
        .gateway
        .handle_message(mention("@SporeBot what's the price of doge"))
        .await;
    assert_eq!(outcome, Outcome::LlmResponse);

    let sent = h.channel.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text, "@alice no idea fren");

    let seen = h.provider.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].system_prompt.contains("the frog came first"));
    assert!(seen[0].current_message.contains("@alice"));
    assert!(seen[0].current_message.contains("what's the price of doge"));
    assert_eq!(seen[0].max_tokens, Some(250));
    assert_eq!(seen[0].temperature, Some(0.8));
}

#[tokio::test]
async fn test_known_token_without_quote_apologises() {
    let h = harness(FakeProvider::answering("unused"), btc_snapshot());

    let outcome = h
        .gateway
        .handle_message(mention("@SporeBot how much is jelli"))
        .await;
    assert_eq!(outcome, Outcome::PriceUnavailable);

    let sent = h.channel.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.starts_with("@alice I can't fetch live prices"));
    assert_eq!(h.provider.calls(), 0);
}

#[tokio::test]
async fn test_llm_failure_sends_fallback() {
    let h = harness(FakeProvider::failing(), HashMap::new());

    let outcome = h.gateway.handle_message(mention("@SporeBot who made you")).await;
    assert_eq!(outcome, Outcome::LlmResponse);

    let sent = h.channel.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text, format!("@alice {}", prompts::LLM_FALLBACK));
}

#[tokio::test]
async fn test_reply_to_bot_triggers_without_mention() {
    let h = harness(FakeProvider::answering("gm gm"), HashMap::new());
    let mut msg = IncomingMessage::text("telegram", "42", "alice", "-100123", "and you?");
    msg.reply_to_sender_id = Some(BOT_ID.to_string());

    assert_eq!(h.gateway.handle_message(msg).await, Outcome::LlmResponse);
    assert_eq!(h.channel.sent()[0].text, "@alice gm gm");
}

#[tokio::test]
async fn test_reply_to_someone_else_is_ignored() {
    let h = harness(FakeProvider::answering("gm"), HashMap::new());
    let mut msg = IncomingMessage::text("telegram", "42", "alice", "-100123", "lol");
    msg.reply_to_sender_id = Some("5".to_string());

    assert_eq!(h.gateway.handle_message(msg).await, Outcome::Ignored);
}

#[tokio::test]
async fn test_bare_mention_uses_canned_prompt() {
    let h = harness(FakeProvider::answering("hey, I'm Spore"), HashMap::new());

    let outcome = h.gateway.handle_message(mention("@SporeBot")).await;
    assert_eq!(outcome, Outcome::LlmResponse);

    let seen = h.provider.seen.lock().unwrap();
    assert!(seen[0].current_message.contains(prompts::EMPTY_PING_PROMPT));
}

#[tokio::test]
async fn test_slash_command_needs_no_mention() {
    let h = harness(FakeProvider::answering("unused"), btc_snapshot());
    let msg = IncomingMessage::text("telegram", "42", "alice", "-100123", "/prices");

    assert_eq!(h.gateway.handle_message(msg).await, Outcome::Command);
    let sent = h.channel.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].format, TextFormat::Markdown);
    assert!(sent[0].text.contains("🟢 *Bitcoin* (BTC): $65,000.12  (+2.50%)"));
    assert_eq!(h.provider.calls(), 0);
}

#[tokio::test]
async fn test_free_text_command_after_mention() {
    let h = harness(FakeProvider::answering("unused"), HashMap::new());

    let outcome = h.gateway.handle_message(mention("@SporeBot chat id?")).await;
    assert_eq!(outcome, Outcome::Command);
    assert!(h.channel.sent()[0].text.contains("-100123"));
}

#[tokio::test]
async fn test_greeting_without_chat_is_noop() {
    let h = harness(FakeProvider::answering("gm"), HashMap::new());

    assert!(!h.gateway.fire_greeting().await);
    assert!(h.channel.sent().is_empty());
    assert_eq!(h.provider.calls(), 0);
}

#[tokio::test]
async fn test_greeting_posts_to_configured_chat() {
    let greeting = GreetingConfig {
        chat_id: -100555,
        ..Default::default()
    };
    let h = harness_with_greeting(FakeProvider::answering("gm spores"), HashMap::new(), greeting);

    assert!(h.gateway.fire_greeting().await);
    let sent = h.channel.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text, "gm spores");
    assert_eq!(sent[0].reply_target.as_deref(), Some("-100555"));

    let seen = h.provider.seen.lock().unwrap();
    assert_eq!(seen[0].max_tokens, Some(60));
    assert_eq!(seen[0].temperature, Some(1.0));
}

#[tokio::test]
async fn test_greeting_falls_back_on_provider_failure() {
    let greeting = GreetingConfig {
        chat_id: 7,
        ..Default::default()
    };
    let h = harness_with_greeting(FakeProvider::failing(), HashMap::new(), greeting);

    assert!(h.gateway.fire_greeting().await);
    assert_eq!(h.channel.sent()[0].text, prompts::GREETING_FALLBACK);
}

#[tokio::test]
async fn test_foreign_slash_commands_are_ignored_even_when_mentioned() {
    let h = harness(FakeProvider::answering("llm answered"), btc_snapshot());

    let start = h.gateway.handle_message(mention("/start @SporeBot hi")).await;
    let other_bot = h
        .gateway
        .handle_message(mention("/prices@OtherBot @SporeBot"))
        .await;

    assert_eq!(start, Outcome::Ignored);
    assert_eq!(other_bot, Outcome::Ignored);
    assert!(h.channel.sent().is_empty());
    assert_eq!(h.provider.calls(), 0);
}

#[tokio::test]
async fn test_prices_command_shows_typing() {
    let h = harness(FakeProvider::answering("unused"), btc_snapshot());
    let msg = IncomingMessage::text("telegram", "42", "alice", "-100123", "/prices");

    assert_eq!(h.gateway.handle_message(msg).await, Outcome::Command);
    assert_eq!(h.channel.typing.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_slow_completion_sends_fallback() {
    let h = harness_with(
        FakeProvider::slow("too late", Duration::from_secs(2)),
        FakeChannel::default(),
        HashMap::new(),
        GreetingConfig::default(),
        Duration::from_millis(50),
    );

    let outcome = h.gateway.handle_message(mention("@SporeBot tell me lore")).await;
    assert_eq!(outcome, Outcome::LlmResponse);

    let sent = h.channel.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text, format!("@alice {}", prompts::LLM_FALLBACK));
}

#[tokio::test]
async fn test_slow_send_gives_up() {
    let channel = FakeChannel {
        send_delay: Duration::from_secs(2),
        ..Default::default()
    };
    let h = harness_with(
        FakeProvider::answering("gm"),
        channel,
        HashMap::new(),
        GreetingConfig::default(),
        Duration::from_millis(50),
    );

    let delivered = h
        .gateway
        .send_bounded("telegram", OutgoingMessage::to_chat("-100123", "gm"))
        .await;
    assert!(!delivered);
    assert!(h.channel.sent().is_empty());
}

#[tokio::test]
async fn test_hung_typing_indicator_does_not_block_reply() {
    let channel = FakeChannel {
        typing_delay: Duration::from_secs(3),
        ..Default::default()
    };
    let h = harness_with(
        FakeProvider::answering("unused"),
        channel,
        btc_snapshot(),
        GreetingConfig::default(),
        Duration::from_millis(100),
    );

    let outcome = tokio::time::timeout(
        Duration::from_secs(1),
        h.gateway.handle_message(mention("@SporeBot what's BTC worth")),
    )
    .await
    .expect("handler stalled on the typing indicator");

    assert_eq!(outcome, Outcome::PriceResponse);
    assert_eq!(h.channel.sent()[0].text, "@alice 🟢 BTC: $65,000.12 (+2.50%)");
}
