mod commands;
mod gateway;

use clap::{Parser, Subcommand};
use gateway::prompts::{chat_system_prompt, chat_user_prompt, MARKET_UNAVAILABLE};
use spore_channels::telegram::TelegramChannel;
use spore_core::{
    config::{self, Config, ConfigSource},
    context::Context,
    knowledge::load_knowledge,
    traits::{Channel, Provider},
};
use spore_market::{format::format_market_block, CoinGecko, PriceSource, TokenTable};
use spore_providers::OpenAiProvider;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "spore",
    version,
    about = "🍄 Spore — community lore keeper and price bot for Telegram"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot.
    Start,
    /// Print the effective configuration and check the provider.
    Status,
    /// Print the full market snapshot once.
    Prices,
    /// Ask Spore a one-shot question.
    Ask {
        /// The message to send.
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,
    },
    /// Print when the next daily greeting would fire.
    NextGreeting,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut cfg, source) = config::load(&cli.config)?;
    cfg.apply_env()?;
    let _log_guard = init_logging(&cfg)?;
    if source == ConfigSource::Defaults {
        tracing::info!("Config file not found at {}, using defaults", cli.config);
    }

    match cli.command {
        Commands::Start => {
            if let Err(e) = cfg.validate() {
                anyhow::bail!("{e}");
            }

            let tokens = Arc::new(TokenTable::new(&cfg.market.tokens)?);
            let knowledge: Arc<str> =
                Arc::from(load_knowledge(Path::new(&cfg.bot.knowledge_dir)));

            let provider: Arc<dyn Provider> = Arc::new(OpenAiProvider::from_config(&cfg.openai));
            let prices: Arc<dyn PriceSource> =
                Arc::new(CoinGecko::from_config(&cfg.market, tokens.clone()));

            let mut channels: HashMap<String, Arc<dyn Channel>> = HashMap::new();
            let telegram = TelegramChannel::new(cfg.telegram.clone());
            channels.insert(telegram.name().to_string(), Arc::new(telegram));

            if cfg.greeting.enabled && cfg.greeting.chat_id == 0 {
                tracing::warn!(
                    "greeting: no chat id configured; use /chatid in the group and set {}",
                    config::ENV_GREETING_CHAT_ID
                );
            }

            println!("🍄 Spore — Starting as @{}...", cfg.bot.username);
            let gw = gateway::Gateway::new(
                provider,
                prices,
                channels,
                tokens,
                knowledge,
                gateway::GatewaySettings::from_config(&cfg),
                cfg.greeting.clone(),
            );
            Arc::new(gw).run().await?;
        }
        Commands::Status => {
            print_status(&cli.config, &cfg).await;
        }
        Commands::Prices => {
            let tokens = Arc::new(TokenTable::new(&cfg.market.tokens)?);
            let source = CoinGecko::from_config(&cfg.market, tokens.clone());
            let prices = source.fetch_prices().await;
            match format_market_block(&tokens, &prices) {
                Some(block) => println!("{block}"),
                None => anyhow::bail!("{MARKET_UNAVAILABLE}"),
            }
        }
        Commands::Ask { message } => {
            if message.is_empty() {
                anyhow::bail!("no message provided. Usage: spore ask <message>");
            }
            if cfg.openai.api_key.is_empty() {
                anyhow::bail!("{} is not set", config::ENV_OPENAI_KEY);
            }

            let query = message.join(" ");
            let knowledge = load_knowledge(Path::new(&cfg.bot.knowledge_dir));
            let provider = OpenAiProvider::from_config(&cfg.openai);

            let context = Context::new(
                &chat_system_prompt(&knowledge),
                &chat_user_prompt("cli", &query),
            )
            .with_max_tokens(cfg.openai.max_tokens)
            .with_temperature(cfg.openai.temperature);
            let response = provider.complete(&context).await?;
            println!("{}", response.text);
        }
        Commands::NextGreeting => {
            cfg.greeting.validate()?;
            let now = chrono::Utc::now();
            let next = gateway::compute_next_fire(
                now,
                cfg.greeting.start_hour,
                cfg.greeting.end_hour,
                &mut rand::thread_rng(),
            );
            println!(
                "Next greeting: {} (window {:02}:00-{:02}:00 UTC, chat {})",
                next.format("%Y-%m-%d %H:%M UTC"),
                cfg.greeting.start_hour,
                cfg.greeting.end_hour,
                cfg.greeting.chat_id
            );
        }
    }

    Ok(())
}

/// Install the tracing subscriber: stderr always, plus a daily file when configured.
///
/// The returned guard must live until exit so buffered file lines are flushed.
fn init_logging(cfg: &Config) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.bot.log_level))?;

    let (file_layer, guard) = match cfg.bot.log_dir.as_deref() {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, "spore.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn print_status(config_path: &str, cfg: &Config) {
    println!("🍄 Spore — Status Check\n");
    println!("Config: {config_path}");
    println!(
        "Bot: @{}",
        if cfg.bot.username.is_empty() {
            "(unset)"
        } else {
            cfg.bot.username.as_str()
        }
    );
    println!("Knowledge dir: {}", cfg.bot.knowledge_dir);
    println!("Model: {}", cfg.openai.model);
    println!(
        "Greeting: {} ({:02}:00-{:02}:00 UTC, chat {})",
        if cfg.greeting.enabled { "enabled" } else { "disabled" },
        cfg.greeting.start_hour,
        cfg.greeting.end_hour,
        cfg.greeting.chat_id
    );
    println!();

    match TokenTable::new(&cfg.market.tokens) {
        Ok(table) => {
            let symbols: Vec<&str> = table.iter().map(|t| t.symbol.as_str()).collect();
            println!("  tokens: {}", symbols.join(", "));
        }
        Err(e) => println!("  tokens: invalid ({e})"),
    }

    let missing = cfg.missing_required();
    if missing.is_empty() {
        println!("  settings: complete");
    } else {
        println!("  settings: missing {}", missing.join(", "));
    }

    if cfg.openai.api_key.is_empty() {
        println!("  openai: no api key");
    } else {
        let provider = OpenAiProvider::from_config(&cfg.openai);
        println!(
            "  openai: {}",
            if provider.is_available().await {
                "available"
            } else {
                "unreachable"
            }
        );
    }
}
