//! Natural-language price intent detection.

use crate::tokens::TokenTable;

/// Phrases that mark a message as a price question.
pub const PRICE_KEYWORDS: &[&str] = &[
    "price",
    "how much",
    "worth",
    "cost",
    "trading at",
    "going for",
    "quote",
];

/// Whether the text contains any price keyword (case-insensitive).
pub fn has_price_keyword(text: &str) -> bool {
    let text = text.to_lowercase();
    PRICE_KEYWORDS.iter().any(|k| text.contains(k))
}

/// Canonical symbols a message asks the price of.
///
/// Empty unless a price keyword is present. Each symbol appears once, in
/// table order, when any of its aliases occurs in the text. A keyword with
/// no recognised token also yields an empty result.
pub fn classify(text: &str, table: &TokenTable) -> Vec<String> {
    let text = text.to_lowercase();
    if !PRICE_KEYWORDS.iter().any(|k| text.contains(k)) {
        return Vec::new();
    }

    table
        .iter()
        .filter(|token| token.aliases.iter().any(|alias| text.contains(alias.as_str())))
        .map(|token| token.symbol.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use spore_core::config::default_tokens;

    fn table() -> TokenTable {
        TokenTable::new(&default_tokens()).unwrap()
    }

    #[test]
    fn test_no_keyword_means_no_intent() {
        let t = table();
        assert!(classify("fungi to the moon, btc and eth too", &t).is_empty());
        assert!(classify("", &t).is_empty());
    }

    #[test]
    fn test_case_insensitive_aliases() {
        let t = table();
        assert_eq!(classify("What's FUNGI worth?", &t), vec!["FUNGI"]);
        assert_eq!(classify("what's fungi worth?", &t), vec!["FUNGI"]);
    }

    #[test]
    fn test_symbol_reported_once() {
        let t = table();
        assert_eq!(classify("price of $btc aka bitcoin aka btc", &t), vec!["BTC"]);
    }

    #[test]
    fn test_result_follows_table_order() {
        let t = table();
        assert_eq!(
            classify("how much are jelli, pepi and eth going for", &t),
            vec!["ETH", "PEPI", "JELLI"]
        );
    }

    #[test]
    fn test_keyword_without_known_token_is_empty() {
        let t = table();
        assert!(has_price_keyword("what's the price of doge"));
        assert!(classify("what's the price of doge", &t).is_empty());
    }

    #[test]
    fn test_every_keyword_gates() {
        let t = table();
        for keyword in PRICE_KEYWORDS {
            let text = format!("froggi {keyword}");
            assert_eq!(classify(&text, &t), vec!["FROGGI"], "keyword {keyword}");
        }
    }

    #[test]
    fn test_never_reports_unknown_symbols() {
        let t = table();
        let found = classify("price of btc eth fungi froggi pepi jelli sol doge", &t);
        assert!(found.iter().all(|s| t.get(s).is_some()));
        assert_eq!(found.len(), 6);
    }
}
