//! # spore-market
//!
//! Everything price-related: the configured token table, natural-language
//! price intent detection, the CoinGecko fetcher, and chat formatting.

pub mod coingecko;
pub mod format;
pub mod intent;
pub mod tokens;

pub use coingecko::{CoinGecko, PriceQuote, PriceSource};
pub use tokens::TokenTable;
