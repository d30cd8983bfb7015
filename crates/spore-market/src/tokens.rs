//! Validated, ordered table of priced tokens.

use spore_core::{config::TokenSpec, error::SporeError};
use std::collections::HashSet;

/// The priced tokens, in configuration order.
///
/// Symbols are unique and uppercase; aliases are lowercase. Iteration
/// order is the order of the config and drives every rendered list.
#[derive(Debug, Clone)]
pub struct TokenTable {
    tokens: Vec<TokenSpec>,
}

impl TokenTable {
    /// Build a table from config entries, normalising case.
    ///
    /// A token without aliases is matched by its lowercased symbol.
    pub fn new(specs: &[TokenSpec]) -> Result<Self, SporeError> {
        let mut seen = HashSet::new();
        let mut tokens = Vec::with_capacity(specs.len());

        for spec in specs {
            let symbol = spec.symbol.trim().to_uppercase();
            if symbol.is_empty() {
                return Err(SporeError::Config("token with empty symbol".into()));
            }
            if spec.id.trim().is_empty() {
                return Err(SporeError::Config(format!("token {symbol} has no provider id")));
            }
            if !seen.insert(symbol.clone()) {
                return Err(SporeError::Config(format!("duplicate token symbol {symbol}")));
            }

            let mut aliases: Vec<String> = spec
                .aliases
                .iter()
                .map(|a| a.trim().to_lowercase())
                .filter(|a| !a.is_empty())
                .collect();
            if aliases.is_empty() {
                aliases.push(symbol.to_lowercase());
            }

            let label = if spec.label.trim().is_empty() {
                symbol.clone()
            } else {
                spec.label.trim().to_string()
            };

            tokens.push(TokenSpec {
                symbol,
                id: spec.id.trim().to_string(),
                label,
                aliases,
            });
        }

        Ok(Self { tokens })
    }

    pub fn iter(&self) -> impl Iterator<Item = &TokenSpec> {
        self.tokens.iter()
    }

    pub fn get(&self, symbol: &str) -> Option<&TokenSpec> {
        self.tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Comma-joined provider ids, as the market endpoint expects them.
    pub fn provider_ids(&self) -> String {
        self.tokens
            .iter()
            .map(|t| t.id.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}
