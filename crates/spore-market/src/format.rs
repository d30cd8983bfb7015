//! Chat rendering of price quotes.

use std::collections::HashMap;

use crate::coingecko::PriceQuote;
use crate::tokens::TokenTable;

pub const MARKER_UP: &str = "🟢";
pub const MARKER_DOWN: &str = "🔴";
pub const MARKER_FLAT: &str = "➖";

/// Header of the full market view (Markdown).
pub const MARKET_HEADER: &str = "📊 *Market Spores* (USD, 24h change)";

/// `$1,234.56` for prices of at least one dollar, `$0.000123` below.
pub fn format_price(price: f64) -> String {
    if price >= 1.0 {
        format!("${}", group_thousands(&format!("{price:.2}")))
    } else {
        format!("${price:.6}")
    }
}

/// Marker and signed percentage for a 24h change; `n/a` when unknown.
pub fn format_change(change: Option<f64>) -> (&'static str, String) {
    match change {
        None => (MARKER_FLAT, "n/a".to_string()),
        Some(c) if c >= 0.0 => (MARKER_UP, format!("{:+.2}%", c.abs())),
        Some(c) => (MARKER_DOWN, format!("{c:+.2}%")),
    }
}

/// `🟢 BTC: $65,000.12 (+2.50%)`. `None` when the quote has no price.
pub fn format_quote_line(symbol: &str, quote: &PriceQuote) -> Option<String> {
    let price = format_price(quote.price?);
    let (marker, change) = format_change(quote.change_24h);
    Some(format!("{marker} {}: {price} ({change})", symbol.to_uppercase()))
}

/// Single-line form for chat replies: quote lines joined by ` | `.
pub fn format_compact_line(quotes: &[PriceQuote]) -> Option<String> {
    let parts: Vec<String> = quotes
        .iter()
        .filter_map(|q| format_quote_line(&q.symbol, q))
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" | "))
    }
}

/// Multi-line Markdown market view, one labelled line per priced token in table order.
pub fn format_market_block(
    table: &TokenTable,
    prices: &HashMap<String, PriceQuote>,
) -> Option<String> {
    let lines: Vec<String> = table
        .iter()
        .filter_map(|token| {
            let quote = prices.get(&token.symbol)?;
            let price = format_price(quote.price?);
            let (marker, change) = format_change(quote.change_24h);
            Some(format!(
                "{marker} *{}* ({}): {price}  ({change})",
                quote.label, token.symbol
            ))
        })
        .collect();

    if lines.is_empty() {
        return None;
    }
    Some(format!("{MARKET_HEADER}\n\n{}", lines.join("\n")))
}

/// Insert `,` every three digits of the integer part of a decimal string.
fn group_thousands(number: &str) -> String {
    let (int_part, frac_part) = match number.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (number, None),
    };

    let digits = int_part.len();
    let mut grouped = String::with_capacity(digits + digits / 3 + 4);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (digits - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }
    grouped
}
