//! Discord bot integration.
//!
//! This module provides the serenity client, the `Transport` implementation
//! the bridge posts through, and the text commands.

pub mod client;
pub mod commands;
pub mod convert;
pub mod transport;

// Re-export main types for external use
pub use client::{build_http_client, DiscordBotBuilder};
pub use commands::CommandHandler;
pub use transport::SerenityTransport;
