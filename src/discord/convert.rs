//! Conversions between serenity models and the bridge's own types.

use serenity::model::channel::{
    Channel, ChannelType, GuildChannel, Message, Reaction, ReactionType,
};
use serenity::model::id::EmojiId;

use crate::bridge::transport::ChannelInfo;
use crate::common::messages::{
    InboundAttachment, InboundMessage, MessageReference, ReactionEmoji, ReactionEvent,
};

pub fn inbound_message(message: &Message) -> InboundMessage {
    InboundMessage {
        id: message.id.get(),
        guild_id: message.guild_id.map(|id| id.get()),
        channel_id: message.channel_id.get(),
        author_id: message.author.id.get(),
        author_is_bot: message.author.bot,
        content: message.content.clone(),
        attachments: message
            .attachments
            .iter()
            .map(|attachment| InboundAttachment {
                filename: attachment.filename.clone(),
                url: attachment.url.clone(),
                content_type: attachment.content_type.clone(),
            })
            .collect(),
        stickers: message
            .sticker_items
            .iter()
            .map(|sticker| sticker.name.clone())
            .collect(),
        reference: message
            .message_reference
            .as_ref()
            .map(|reference| MessageReference {
                guild_id: reference.guild_id.map(|id| id.get()),
                channel_id: Some(reference.channel_id.get()),
                message_id: reference.message_id.map(|id| id.get()),
            }),
    }
}

/// Convert a reaction. Returns `None` for emoji kinds the bridge cannot replay.
pub fn reaction_event(reaction: &Reaction, user_is_bot: bool) -> Option<ReactionEvent> {
    Some(ReactionEvent {
        message_id: reaction.message_id.get(),
        guild_id: reaction.guild_id.map(|id| id.get()),
        channel_id: reaction.channel_id.get(),
        user_id: reaction.user_id.map(|id| id.get()),
        user_is_bot,
        emoji: reaction_emoji(&reaction.emoji)?,
    })
}

pub fn reaction_emoji(reaction: &ReactionType) -> Option<ReactionEmoji> {
    match reaction {
        ReactionType::Unicode(emoji) => Some(ReactionEmoji::Unicode(emoji.clone())),
        ReactionType::Custom { animated, id, name } => Some(ReactionEmoji::Custom {
            id: id.get(),
            name: name.clone(),
            animated: *animated,
        }),
        _ => None,
    }
}

pub fn reaction_type(emoji: &ReactionEmoji) -> ReactionType {
    match emoji {
        ReactionEmoji::Unicode(emoji) => ReactionType::Unicode(emoji.clone()),
        ReactionEmoji::Custom { id, name, animated } => ReactionType::Custom {
            animated: *animated,
            id: EmojiId::new(*id),
            name: name.clone(),
        },
    }
}

pub fn guild_channel_info(channel: &GuildChannel) -> ChannelInfo {
    ChannelInfo {
        id: channel.id.get(),
        guild_id: Some(channel.guild_id.get()),
        name: channel.name.clone(),
        is_thread: matches!(
            channel.kind,
            ChannelType::PublicThread | ChannelType::PrivateThread | ChannelType::NewsThread
        ),
    }
}

pub fn channel_info(channel: &Channel) -> Option<ChannelInfo> {
    match channel {
        Channel::Guild(channel) => Some(guild_channel_info(channel)),
        Channel::Private(channel) => Some(ChannelInfo {
            id: channel.id.get(),
            guild_id: None,
            name: channel.name(),
            is_thread: false,
        }),
        _ => None,
    }
}
