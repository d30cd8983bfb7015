use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::SporeError;

/// Top-level Spore configuration.
///
/// Read from `config.toml` (every section optional), then overridden by
/// environment variables, then validated once at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub greeting: GreetingConfig,
    #[serde(default)]
    pub market: MarketConfig,
}

/// General bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Bot username without the leading `@` (e.g. "SporeLoreBot").
    #[serde(default)]
    pub username: String,
    /// Directory holding the `.md` knowledge documents.
    #[serde(default = "default_knowledge_dir")]
    pub knowledge_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// When set, logs are also written to a daily rolling file here.
    #[serde(default)]
    pub log_dir: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            knowledge_dir: default_knowledge_dir(),
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

/// Telegram channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Upper bound on a single outbound send.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            send_timeout_secs: default_send_timeout_secs(),
        }
    }
}

/// OpenAI-compatible completion provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    /// Output bound for chat replies.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature for chat replies.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Upper bound on a single completion call; expiry yields the fallback reply.
    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_completion_timeout_secs(),
        }
    }
}

/// Daily greeting job configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreetingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Target chat. Zero means unconfigured: firing is a no-op.
    #[serde(default)]
    pub chat_id: i64,
    /// First UTC hour of the window (inclusive).
    #[serde(default = "default_greeting_start")]
    pub start_hour: u32,
    /// Last UTC hour of the window (exclusive).
    #[serde(default = "default_greeting_end")]
    pub end_hour: u32,
}

impl Default for GreetingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chat_id: 0,
            start_hour: default_greeting_start(),
            end_hour: default_greeting_end(),
        }
    }
}

/// Market-data configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    #[serde(default = "default_market_base_url")]
    pub base_url: String,
    #[serde(default = "default_market_timeout_secs")]
    pub timeout_secs: u64,
    /// Priced tokens, in display order.
    #[serde(default = "default_tokens")]
    pub tokens: Vec<TokenSpec>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            base_url: default_market_base_url(),
            timeout_secs: default_market_timeout_secs(),
            tokens: default_tokens(),
        }
    }
}

/// One priced token: canonical symbol, provider id, label, and chat aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSpec {
    pub symbol: String,
    /// The market-data provider's id for this asset (e.g. "bitcoin").
    pub id: String,
    /// Display name; defaults to the symbol.
    #[serde(default)]
    pub label: String,
    /// Lowercase substrings that identify the token in free text.
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl TokenSpec {
    fn new(symbol: &str, id: &str, label: &str, aliases: &[&str]) -> Self {
        Self {
            symbol: symbol.to_string(),
            id: id.to_string(),
            label: label.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }
}

// --- Defaults ---

fn default_knowledge_dir() -> String {
    "knowledge".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_send_timeout_secs() -> u64 {
    15
}
fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_openai_model() -> String {
    "gpt-4.1-mini".to_string()
}
fn default_max_tokens() -> u32 {
    250
}
fn default_temperature() -> f32 {
    0.8
}
fn default_completion_timeout_secs() -> u64 {
    30
}
fn default_true() -> bool {
    true
}
fn default_greeting_start() -> u32 {
    14
}
fn default_greeting_end() -> u32 {
    15
}
fn default_market_base_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}
fn default_market_timeout_secs() -> u64 {
    10
}

/// The community's default token table.
pub fn default_tokens() -> Vec<TokenSpec> {
    vec![
        TokenSpec::new("BTC", "bitcoin", "Bitcoin", &["btc", "$btc", "bitcoin"]),
        TokenSpec::new("ETH", "ethereum", "Ethereum", &["eth", "$eth", "ethereum"]),
        TokenSpec::new("FUNGI", "fungi", "Fungi", &["fungi", "$fungi"]),
        TokenSpec::new("FROGGI", "froggi", "Froggi", &["froggi", "$froggi"]),
        TokenSpec::new("PEPI", "pepi-2", "Pepi", &["pepi", "$pepi"]),
        TokenSpec::new("JELLI", "jelli", "Jelli", &["jelli", "$jelli"]),
    ]
}

// --- Environment overrides ---

/// Environment variables read on top of the config file.
pub const ENV_TELEGRAM_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_OPENAI_KEY: &str = "OPENAI_API_KEY";
pub const ENV_BOT_USERNAME: &str = "BOT_USERNAME";
pub const ENV_GREETING_CHAT_ID: &str = "GREETING_CHAT_ID";
pub const ENV_GREETING_START: &str = "GREETING_START_HOUR";
pub const ENV_GREETING_END: &str = "GREETING_END_HOUR";
pub const ENV_OPENAI_MODEL: &str = "OPENAI_MODEL";
pub const ENV_KNOWLEDGE_DIR: &str = "KNOWLEDGE_DIR";

impl Config {
    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), SporeError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), SporeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get(ENV_TELEGRAM_TOKEN) {
            self.telegram.bot_token = v;
        }
        if let Some(v) = get(ENV_OPENAI_KEY) {
            self.openai.api_key = v;
        }
        if let Some(v) = get(ENV_BOT_USERNAME) {
            self.bot.username = v;
        }
        if let Some(v) = get(ENV_OPENAI_MODEL) {
            self.openai.model = v;
        }
        if let Some(v) = get(ENV_KNOWLEDGE_DIR) {
            self.bot.knowledge_dir = v;
        }
        if let Some(v) = get(ENV_GREETING_CHAT_ID) {
            self.greeting.chat_id = parse_env(ENV_GREETING_CHAT_ID, &v)?;
        }
        if let Some(v) = get(ENV_GREETING_START) {
            self.greeting.start_hour = parse_env(ENV_GREETING_START, &v)?;
        }
        if let Some(v) = get(ENV_GREETING_END) {
            self.greeting.end_hour = parse_env(ENV_GREETING_END, &v)?;
        }

        self.bot.username = self.bot.username.trim_start_matches('@').to_string();
        Ok(())
    }

    /// Names of required settings that are still empty.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.telegram.bot_token.is_empty() {
            missing.push(ENV_TELEGRAM_TOKEN);
        }
        if self.openai.api_key.is_empty() {
            missing.push(ENV_OPENAI_KEY);
        }
        if self.bot.username.is_empty() {
            missing.push(ENV_BOT_USERNAME);
        }
        missing
    }

    /// Check everything the agent needs before it starts.
    pub fn validate(&self) -> Result<(), SporeError> {
        let missing = self.missing_required();
        if !missing.is_empty() {
            return Err(SporeError::Config(format!(
                "missing required settings: {} (set them in config.toml or the environment)",
                missing.join(", ")
            )));
        }
        self.greeting.validate()
    }
}

impl GreetingConfig {
    /// Reject windows that cannot be placed inside one UTC day.
    pub fn validate(&self) -> Result<(), SporeError> {
        if self.start_hour > 23 {
            return Err(SporeError::Config(format!(
                "greeting start_hour must be 0-23, got {}",
                self.start_hour
            )));
        }
        if self.end_hour > 24 {
            return Err(SporeError::Config(format!(
                "greeting end_hour must be 0-24, got {}",
                self.end_hour
            )));
        }
        if self.start_hour > self.end_hour {
            return Err(SporeError::Config(format!(
                "greeting window starts after it ends ({} > {})",
                self.start_hour, self.end_hour
            )));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, SporeError>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| SporeError::Config(format!("invalid {key} '{value}': {e}")))
}

/// Where [`load`] got its values from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    File,
    /// The file was missing; every value is a default.
    Defaults,
}

/// Load configuration from a TOML file. A missing file yields defaults.
pub fn load(path: &str) -> Result<(Config, ConfigSource), SporeError> {
    let path = Path::new(path);
    if !path.exists() {
        return Ok((Config::default(), ConfigSource::Defaults));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| SporeError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config = toml::from_str(&content)
        .map_err(|e| SporeError::Config(format!("failed to parse config: {}", e)))?;
    Ok((config, ConfigSource::File))
}
