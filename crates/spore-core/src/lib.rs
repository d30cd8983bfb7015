//! # spore-core
//!
//! Core types, traits, configuration, and error handling for the Spore agent.

pub mod config;
pub mod context;
pub mod error;
pub mod knowledge;
pub mod message;
pub mod traits;
