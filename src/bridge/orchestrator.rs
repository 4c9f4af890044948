//! Bridge orchestrator that relays messages, reactions and deletions.
//!
//! Events are handled one at a time through [`BridgeOrchestrator::handle`].
//! Messages fan out along the route table; reactions and deletions follow the
//! link graph to every copy of a message.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::bridge::links::{LinkGraph, LinkMetadata};
use crate::bridge::payload::{
    collect_attachments, jump_url, render_mirror, reply_annotation, sticker_annotation,
    PERSONA_FAILED_NOTE,
};
use crate::bridge::persona::PersonaGenerator;
use crate::bridge::routes::RouteTable;
use crate::bridge::transport::Transport;
use crate::common::messages::{BridgeEvent, InboundMessage, ReactionEvent};
use crate::common::types::{ChannelEndpoint, MessageId, MessageLocation};

/// Owns the relay state and applies inbound events to it.
pub struct BridgeOrchestrator<T> {
    transport: Arc<T>,
    routes: RouteTable,
    personas: PersonaGenerator,
    links: LinkGraph,
}

impl<T: Transport> BridgeOrchestrator<T> {
    pub fn new(
        transport: Arc<T>,
        routes: RouteTable,
        personas: PersonaGenerator,
        links: LinkGraph,
    ) -> Self {
        info!(routes = routes.len(), "Channel bridge ready");
        Self {
            transport,
            routes,
            personas,
            links,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn links(&self) -> &LinkGraph {
        &self.links
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Apply one inbound event.
    pub async fn handle(&self, event: BridgeEvent) {
        match event {
            BridgeEvent::MessageReceived(message) => self.handle_message(message).await,
            BridgeEvent::ReactionChanged { reaction, added } => {
                self.handle_reaction(reaction, added).await
            }
            BridgeEvent::MessageDeleted {
                message_id,
                channel_id,
                ..
            } => self.handle_delete(message_id, channel_id).await,
        }
    }

    async fn handle_message(&self, message: InboundMessage) {
        if self.transport.bot_user_id() == Some(message.author_id) || message.author_is_bot {
            return;
        }
        let Some(guild_id) = message.guild_id else {
            return;
        };
        if self.links.is_destination(message.id).await {
            debug!(message_id = message.id, "Ignoring mirrored message");
            return;
        }

        let source = ChannelEndpoint::new(guild_id, message.channel_id);
        let routes = self.routes.routes_from(&source);
        if routes.is_empty() {
            return;
        }
        self.links
            .record_location(message.id, MessageLocation::new(Some(guild_id), message.channel_id))
            .await;

        let attachments = collect_attachments(self.transport.as_ref(), &message.attachments).await;

        for route in routes {
            let destination = match self.transport.resolve_channel(route.dst.channel).await {
                Ok(channel) => channel,
                Err(e) => {
                    warn!(
                        message_id = message.id,
                        "Bridge destination {} unavailable: {}", route.dst, e
                    );
                    continue;
                }
            };

            let seed = format!("{}-{}-{}", message.id, route.dst.guild, route.dst.channel);
            let (persona, dicebear_failed) = match self.personas.generate(&seed) {
                Ok(persona) => (persona, false),
                Err(e) => {
                    warn!(message_id = message.id, "Falling back to default persona: {}", e);
                    (PersonaGenerator::fallback(&self.transport.bot_avatar_url()), true)
                }
            };

            let mut annotations = Vec::new();
            if let Some(reply) = self.reply_line(&message, &route.dst).await {
                annotations.push(reply);
            }
            if dicebear_failed {
                annotations.push(PERSONA_FAILED_NOTE.to_string());
            }
            annotations.extend(message.stickers.iter().map(|name| sticker_annotation(name)));
            annotations.extend(attachments.summary.notes.iter().cloned());

            let outgoing = render_mirror(&message.content, &persona, &annotations, &attachments);
            let mirror_id = match self.transport.send_message(destination.id, outgoing).await {
                Ok(id) => id,
                Err(e) => {
                    warn!(
                        message_id = message.id,
                        "Failed to bridge message to {}: {}", route.dst, e
                    );
                    continue;
                }
            };

            self.links
                .record_location(
                    mirror_id,
                    MessageLocation::new(Some(route.dst.guild), destination.id),
                )
                .await;

            let metadata = LinkMetadata {
                persona,
                dicebear_failed,
                attachments: attachments.summary.clone(),
            };
            match self
                .links
                .link_with_metadata(message.id, mirror_id, metadata)
                .await
            {
                Ok(true) => {}
                Ok(false) => {
                    self.links.forget_location(mirror_id).await;
                    continue;
                }
                Err(e) => {
                    error!(
                        message_id = message.id,
                        mirror_id, "Failed to persist bridge link: {}", e
                    );
                    self.links.forget_location(mirror_id).await;
                    continue;
                }
            }

            debug!(
                message_id = message.id,
                mirror_id,
                "Bridged message to {}", route.dst
            );
        }

        if self.links.linked_ids(message.id).await.is_empty() {
            self.links.forget_location(message.id).await;
        }
    }

    /// "Reply to" line pointing at the copy of the referenced message that
    /// lives in the target channel, or at the original when there is none.
    async fn reply_line(&self, message: &InboundMessage, target: &ChannelEndpoint) -> Option<String> {
        let reference = message.reference?;
        let (Some(guild_id), Some(channel_id), Some(referenced)) =
            (reference.guild_id, reference.channel_id, reference.message_id)
        else {
            return None;
        };

        let url = match self
            .links
            .resolve_mirror_in_target_channel(referenced, target)
            .await
        {
            Some(copy) => jump_url(target.guild, target.channel, copy),
            None => jump_url(guild_id, channel_id, referenced),
        };
        Some(reply_annotation(&url))
    }

    async fn handle_reaction(&self, reaction: ReactionEvent, added: bool) {
        if reaction.user_is_bot
            || (reaction.user_id.is_some() && reaction.user_id == self.transport.bot_user_id())
        {
            return;
        }

        let linked = self.links.linked_ids(reaction.message_id).await;
        if linked.is_empty() {
            return;
        }
        self.links
            .record_location(
                reaction.message_id,
                MessageLocation::new(reaction.guild_id, reaction.channel_id),
            )
            .await;

        for linked_id in linked {
            let Some(location) = self.links.location_of(linked_id).await else {
                debug!(message_id = linked_id, "Dropping link with unknown location");
                self.unlink(reaction.message_id, linked_id).await;
                continue;
            };

            let channel = match self.transport.resolve_channel(location.channel).await {
                Ok(channel) => channel,
                Err(e) => {
                    warn!(
                        message_id = linked_id,
                        channel_id = location.channel,
                        "Dropping link, channel unavailable: {}", e
                    );
                    self.unlink(reaction.message_id, linked_id).await;
                    continue;
                }
            };

            match self.transport.fetch_message(channel.id, linked_id).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    debug!(message_id = linked_id, "Linked message is gone");
                    self.unlink(reaction.message_id, linked_id).await;
                    continue;
                }
                Err(e) => {
                    warn!(message_id = linked_id, "Failed to fetch bridged message: {}", e);
                    continue;
                }
            }

            let result = if added {
                self.transport
                    .add_reaction(channel.id, linked_id, &reaction.emoji)
                    .await
            } else {
                self.transport
                    .remove_own_reaction(channel.id, linked_id, &reaction.emoji)
                    .await
            };
            if let Err(e) = result {
                warn!(message_id = linked_id, "Failed to sync reaction: {}", e);
            }
        }
    }

    async fn unlink(&self, a: MessageId, b: MessageId) {
        match self.links.unlink_pair(a, b).await {
            Ok(true) => debug!(message_id = a, linked_id = b, "Dropped stale bridge link"),
            Ok(false) => {}
            Err(e) => error!(message_id = a, linked_id = b, "Failed to drop bridge link: {}", e),
        }
    }

    async fn handle_delete(&self, message_id: MessageId, channel_id: u64) {
        match self.links.delete_source(message_id).await {
            Ok(true) => debug!(message_id, channel_id, "Dropped links of deleted message"),
            Ok(false) => {}
            Err(e) => error!(message_id, "Failed to drop links of deleted message: {}", e),
        }

        if let Some(source) = self.links.find_source_for(message_id).await {
            if source != message_id {
                if let Err(e) = self.links.unlink(source, message_id).await {
                    error!(message_id, source_id = source, "Failed to drop mirror link: {}", e);
                }
            }
        }

        self.links.forget_location(message_id).await;
    }
}
