//! # spore-channels
//!
//! Messaging platform integrations for Spore.

pub mod telegram;
