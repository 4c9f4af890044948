//! Canonical event and payload types for bridge communication.
//!
//! Inbound types describe what the transport delivers to the bridge; outbound
//! types describe what the bridge asks the transport to send. Neither side
//! carries serenity types so the core stays framework-agnostic.

use serde::{Deserialize, Serialize};

use crate::common::types::MessageId;

/// An attachment on an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundAttachment {
    pub filename: String,
    pub url: String,
    pub content_type: Option<String>,
}

/// Pointer to the message an inbound message replies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageReference {
    pub guild_id: Option<u64>,
    pub channel_id: Option<u64>,
    pub message_id: Option<MessageId>,
}

/// A message posted somewhere the bot can see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub id: MessageId,
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    pub author_id: u64,
    /// Whether the author is a bot account.
    pub author_is_bot: bool,
    pub content: String,
    pub attachments: Vec<InboundAttachment>,
    /// Sticker names.
    pub stickers: Vec<String>,
    pub reference: Option<MessageReference>,
}

/// Emoji used in a reaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReactionEmoji {
    Unicode(String),
    Custom {
        id: u64,
        name: Option<String>,
        animated: bool,
    },
}

/// A reaction added to or removed from a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    pub message_id: MessageId,
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    /// User who reacted, when the platform reports one.
    pub user_id: Option<u64>,
    pub user_is_bot: bool,
    pub emoji: ReactionEmoji,
}

/// Closed set of inbound events the bridge reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    MessageReceived(InboundMessage),
    ReactionChanged { reaction: ReactionEvent, added: bool },
    MessageDeleted {
        message_id: MessageId,
        guild_id: Option<u64>,
        channel_id: u64,
    },
}

/// A file re-uploaded alongside a mirrored message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingFile {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Structured preview block of a mirrored message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorEmbed {
    pub title: String,
    pub description: Option<String>,
    pub author_name: String,
    pub author_icon_url: String,
    /// Name of an uploaded file rendered inline as the preview image.
    pub image_filename: Option<String>,
}

/// Everything the transport needs to post one mirror.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutgoingMessage {
    pub embed: Option<MirrorEmbed>,
    pub content: Option<String>,
    pub files: Vec<OutgoingFile>,
}
