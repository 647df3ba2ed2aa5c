//! Multi-service Telegram assistant bot.
//!
//! Routes inbound commands and media uploads to dedicated upstream APIs
//! (Gemini, Google Vision, YouTube Data, TMDB, remove.bg) and formats the
//! results back into Telegram-safe replies.

/// Media-analysis aggregator with structured-vision/generative fallback
pub mod analysis;
/// Telegram command and message handlers
pub mod bot;
/// Configuration and settings management
pub mod config;
/// Upstream API adapters
pub mod services;
/// Text formatting and truncation helpers
pub mod utils;
