//! Discord bot client abstraction.
//!
//! Serenity callbacks are forwarded into one channel and handled strictly one
//! at a time, so the bridge never sees two events concurrently.

use std::sync::Arc;
use std::time::Duration;

use backon::BackoffBuilder;
use serenity::async_trait;
use serenity::http::HttpBuilder;
use serenity::model::channel::{Message, Reaction};
use serenity::model::gateway::Ready;
use serenity::model::id::{ChannelId, GuildId, MessageId};
use serenity::prelude::*;
use serenity::Client;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::bridge::BridgeOrchestrator;
use crate::common::messages::BridgeEvent;
use crate::discord::commands::CommandHandler;
use crate::discord::convert::{inbound_message, reaction_event};
use crate::discord::transport::SerenityTransport;

/// Bridge running on the serenity transport.
pub type DiscordBridge = BridgeOrchestrator<SerenityTransport>;

const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub enum DiscordBotEvent {
    /// Bot connected and ready.
    Ready { context: Context, ready: Ready },
    /// Message received.
    Message { context: Context, message: Message },
    /// Reaction added or removed.
    Reaction {
        context: Context,
        reaction: Reaction,
        added: bool,
    },
    /// Message deleted.
    MessageDeleted {
        channel_id: ChannelId,
        message_id: MessageId,
        guild_id: Option<GuildId>,
    },
    Disconnected,
}

struct DiscordBotEvents {
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
}

impl DiscordBotEvents {
    fn new(discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>) -> Self {
        Self { discord_events_tx }
    }

    fn forward(&self, event: DiscordBotEvent) {
        if let Err(error) = self.discord_events_tx.send(event) {
            warn!("Failed to process discord event: {}", error);
        }
    }
}

#[async_trait]
impl EventHandler for DiscordBotEvents {
    async fn ready(&self, context: Context, ready: Ready) {
        self.forward(DiscordBotEvent::Ready { context, ready });
    }

    async fn message(&self, context: Context, message: Message) {
        self.forward(DiscordBotEvent::Message { context, message });
    }

    async fn reaction_add(&self, context: Context, reaction: Reaction) {
        self.forward(DiscordBotEvent::Reaction {
            context,
            reaction,
            added: true,
        });
    }

    async fn reaction_remove(&self, context: Context, reaction: Reaction) {
        self.forward(DiscordBotEvent::Reaction {
            context,
            reaction,
            added: false,
        });
    }

    async fn message_delete(
        &self,
        _context: Context,
        channel_id: ChannelId,
        message_id: MessageId,
        guild_id: Option<GuildId>,
    ) {
        self.forward(DiscordBotEvent::MessageDeleted {
            channel_id,
            message_id,
            guild_id,
        });
    }
}

/// Build the reqwest client shared by serenity and attachment downloads.
pub fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .connect_timeout(Duration::from_secs(10))
        .build()
}

/// Builder for creating the Discord bot.
pub struct DiscordBotBuilder {
    token: String,
    http_client: reqwest::Client,
    bridge: Arc<DiscordBridge>,
    commands: CommandHandler,
    shutdown_rx: watch::Receiver<bool>,
}

impl DiscordBotBuilder {
    /// Create a new Discord bot builder.
    pub fn new(
        token: String,
        http_client: reqwest::Client,
        bridge: Arc<DiscordBridge>,
        commands: CommandHandler,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            token,
            http_client,
            bridge,
            commands,
            shutdown_rx,
        }
    }

    /// Build the Discord bot.
    pub async fn build(self) -> anyhow::Result<DiscordBot> {
        let (discord_events_tx, discord_events_rx) = mpsc::unbounded_channel::<DiscordBotEvent>();

        let client = build_client(&self.token, &self.http_client, discord_events_tx.clone()).await?;

        Ok(DiscordBot {
            client: Some(client),
            token: self.token,
            http_client: self.http_client,
            bridge: self.bridge,
            commands: self.commands,
            discord_events_rx,
            discord_events_tx,
            shutdown_rx: self.shutdown_rx,
        })
    }
}

async fn build_client(
    token: &str,
    http_client: &reqwest::Client,
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
) -> anyhow::Result<Client> {
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MESSAGE_REACTIONS;

    // Build the Serenity HTTP client with our custom reqwest client
    let http = HttpBuilder::new(token).client(http_client.clone()).build();

    let events = DiscordBotEvents::new(discord_events_tx);
    let client = serenity::client::ClientBuilder::new_with_http(http, intents)
        .event_handler(events)
        .await?;
    Ok(client)
}

/// Create an exponential backoff iterator for Discord reconnection.
/// 5s initial, 5min max, factor 1.1, with jitter, unlimited retries.
fn discord_backoff() -> impl Iterator<Item = Duration> {
    backon::ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(5))
        .with_max_delay(MAX_RECONNECT_DELAY)
        .with_factor(1.1)
        .with_jitter()
        .without_max_times()
        .build()
}

pub struct DiscordBot {
    client: Option<Client>,
    token: String,
    http_client: reqwest::Client,
    bridge: Arc<DiscordBridge>,
    commands: CommandHandler,
    discord_events_rx: mpsc::UnboundedReceiver<DiscordBotEvent>,
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
    shutdown_rx: watch::Receiver<bool>,
}

impl DiscordBot {
    pub async fn run(mut self) {
        // Extract shard manager before we move client into run_connection
        let shard_manager = self.client.as_ref().map(|c| c.shard_manager.clone());
        let client = &mut self.client;
        let discord_events_rx = &mut self.discord_events_rx;
        let mut shutdown_rx = self.shutdown_rx.clone();

        tokio::select! {
            _ = Self::run_connection(client, &self.token, &self.http_client, &self.discord_events_tx) => {},
            _ = Self::process_events(discord_events_rx, &self.bridge, &self.commands, &mut self.shutdown_rx) => {},
            _ = async {
                // Wait for shutdown signal
                loop {
                    if shutdown_rx.changed().await.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                // Gracefully shutdown Discord gateway
                if let Some(ref manager) = shard_manager {
                    info!("Initiating graceful Discord shutdown...");
                    manager.shutdown_all().await;
                    info!("Discord shutdown complete");
                }
            } => {}
        }
        info!("Discord task ended");
    }

    async fn run_connection(
        client: &mut Option<Client>,
        token: &str,
        http_client: &reqwest::Client,
        discord_events_tx: &mpsc::UnboundedSender<DiscordBotEvent>,
    ) {
        let mut backoff = discord_backoff();

        loop {
            info!("Connecting to Discord...");

            let mut client = match client.take() {
                Some(client) => client,
                None => {
                    // serenity mostly handles reconnections itself.
                    match build_client(token, http_client, discord_events_tx.clone()).await {
                        Ok(client) => {
                            backoff = discord_backoff();
                            client
                        }
                        Err(e) => {
                            error!("Failed to rebuild Discord client: {}", e);
                            let delay = backoff.next().unwrap_or(MAX_RECONNECT_DELAY);
                            warn!("Retrying in {:.1}s...", delay.as_secs_f64());
                            sleep(delay).await;
                            continue;
                        }
                    }
                }
            };

            // Run the client
            match client.start().await {
                Ok(()) => {
                    info!("Discord client disconnected normally");
                    if let Err(error) = discord_events_tx.send(DiscordBotEvent::Disconnected) {
                        warn!("Failed to process discord event: {}", error);
                    }
                    break;
                }
                Err(e) => {
                    error!("Discord client error: {}", e);
                    let delay = backoff.next().unwrap_or(MAX_RECONNECT_DELAY);
                    warn!(
                        "Discord disconnected. Reconnecting in {:.1}s...",
                        delay.as_secs_f64(),
                    );
                    if let Err(error) = discord_events_tx.send(DiscordBotEvent::Disconnected) {
                        warn!("Failed to process discord event: {}", error);
                    }
                    sleep(delay).await;
                }
            }
        }
    }

    async fn process_events(
        discord_events_rx: &mut mpsc::UnboundedReceiver<DiscordBotEvent>,
        bridge: &DiscordBridge,
        commands: &CommandHandler,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                // Discord events
                event = discord_events_rx.recv() => {
                    match event {
                        Some(event) => Self::handle_event(event, bridge, commands).await,
                        None => {
                            debug!("Discord events channel closed.");
                            break;
                        }
                    }
                }

                // Shutdown signal
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping event processing");
                        break;
                    }
                }
            }
        }
    }

    async fn handle_event(event: DiscordBotEvent, bridge: &DiscordBridge, commands: &CommandHandler) {
        match event {
            DiscordBotEvent::Ready { context, ready } => {
                info!(
                    guilds = ready.guilds.len(),
                    "Discord bot connected as {}", ready.user.name
                );
                bridge.transport().attach(context, &ready);
            }
            DiscordBotEvent::Message { context, message } => {
                match commands.handle_command(&context, &message, bridge).await {
                    Ok(true) => return,
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Failed to answer command: {}", e);
                        return;
                    }
                }
                bridge
                    .handle(BridgeEvent::MessageReceived(inbound_message(&message)))
                    .await;
            }
            DiscordBotEvent::Reaction {
                context,
                reaction,
                added,
            } => {
                let user_is_bot = reaction
                    .member
                    .as_ref()
                    .map(|member| member.user.bot)
                    .or_else(|| {
                        reaction
                            .user_id
                            .and_then(|id| context.cache.user(id).map(|user| user.bot))
                    })
                    .unwrap_or(false);

                match reaction_event(&reaction, user_is_bot) {
                    Some(reaction) => {
                        bridge
                            .handle(BridgeEvent::ReactionChanged { reaction, added })
                            .await
                    }
                    None => debug!("Ignoring reaction with unsupported emoji"),
                }
            }
            DiscordBotEvent::MessageDeleted {
                channel_id,
                message_id,
                guild_id,
            } => {
                bridge
                    .handle(BridgeEvent::MessageDeleted {
                        message_id: message_id.get(),
                        guild_id: guild_id.map(|id| id.get()),
                        channel_id: channel_id.get(),
                    })
                    .await;
            }
            DiscordBotEvent::Disconnected => {
                bridge.transport().detach();
            }
        }
    }
}
