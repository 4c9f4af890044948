//! Discord text commands (!bridges, !help).
//!
//! Handles command parsing and execution for Discord commands.

use serenity::model::channel::Message;
use serenity::prelude::*;
use tracing::{debug, info};

use crate::bridge::diagnostics::{describe_guild_routes, format_route_listing};
use crate::bridge::payload::truncate_chars;
use crate::bridge::transport::Transport;
use crate::bridge::BridgeOrchestrator;

/// Discord's limit on message length.
const MAX_REPLY_CHARS: usize = 2000;

/// Commands understood by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    /// List the bridges of the current server (!bridges).
    Bridges,
    /// Show the command list (!help).
    Help,
}

/// Parse a command, if `content` is one.
pub fn parse_command(prefix: &str, content: &str) -> Option<BotCommand> {
    let content = content.trim();
    if content.len() > 100 {
        return None;
    }
    let rest = content.strip_prefix(prefix)?;
    let command = rest.split_whitespace().next()?.to_lowercase();

    match command.as_str() {
        "bridges" | "bridge_links" => Some(BotCommand::Bridges),
        "help" => Some(BotCommand::Help),
        _ => None,
    }
}

/// Command handler for Discord bot.
pub struct CommandHandler {
    prefix: String,
}

impl CommandHandler {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Parse and execute a command from Discord.
    ///
    /// Returns `true` if the message was a command, `false` otherwise.
    pub async fn handle_command<T: Transport>(
        &self,
        ctx: &Context,
        msg: &Message,
        bridge: &BridgeOrchestrator<T>,
    ) -> anyhow::Result<bool> {
        if msg.author.bot {
            return Ok(false);
        }
        let Some(command) = parse_command(&self.prefix, &msg.content) else {
            return Ok(false);
        };

        debug!("Processing command: {:?}", command);

        match command {
            BotCommand::Bridges => self.handle_bridges(ctx, msg, bridge).await?,
            BotCommand::Help => self.handle_help(ctx, msg).await?,
        }
        Ok(true)
    }

    /// Handle !bridges command.
    async fn handle_bridges<T: Transport>(
        &self,
        ctx: &Context,
        msg: &Message,
        bridge: &BridgeOrchestrator<T>,
    ) -> anyhow::Result<()> {
        let Some(guild_id) = msg.guild_id else {
            msg.channel_id
                .say(&ctx.http, "This command only works inside a server.")
                .await?;
            return Ok(());
        };

        info!("!bridges command from {} in guild {}", msg.author.name, guild_id);

        let descriptions =
            describe_guild_routes(bridge.transport().as_ref(), bridge.routes(), guild_id.get())
                .await;
        let listing = truncate_chars(
            &format_route_listing(&descriptions),
            MAX_REPLY_CHARS,
            MAX_REPLY_CHARS - 30,
            "\n...(truncated)",
        );

        msg.channel_id.say(&ctx.http, listing).await?;
        Ok(())
    }

    /// Handle !help command.
    async fn handle_help(&self, ctx: &Context, msg: &Message) -> anyhow::Result<()> {
        let help_text = format!(
            "**Available Commands:**\n\
             • `{0}bridges` - List the channel bridges configured for this server\n\
             • `{0}help` - Show this help message",
            self.prefix
        );

        msg.channel_id.say(&ctx.http, help_text).await?;
        Ok(())
    }
}
