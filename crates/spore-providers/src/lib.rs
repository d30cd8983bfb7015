//! # spore-providers
//!
//! Completion provider implementations for Spore.

pub mod openai;

pub use openai::OpenAiProvider;
