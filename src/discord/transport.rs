//! [`Transport`] implementation on top of serenity.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serenity::builder::{
    CreateAllowedMentions, CreateAttachment, CreateEmbed, CreateEmbedAuthor, CreateMessage,
};
use serenity::cache::Cache;
use serenity::client::Context;
use serenity::model::gateway::Ready;
use serenity::model::id::{ChannelId, GuildId, MessageId as DiscordMessageId};
use tracing::debug;

use crate::bridge::transport::{ChannelInfo, Transport};
use crate::common::error::TransportError;
use crate::common::messages::{InboundAttachment, OutgoingMessage, ReactionEmoji};
use crate::common::types::MessageId;
use crate::discord::convert::{channel_info, guild_channel_info, reaction_type};

/// Gateway session the transport talks through.
#[derive(Clone)]
struct Session {
    context: Context,
    bot_user_id: u64,
    bot_avatar_url: String,
}

/// Serenity-backed transport. Calls fail as transient until a session is attached.
pub struct SerenityTransport {
    session: RwLock<Option<Session>>,
    downloader: reqwest::Client,
}

impl SerenityTransport {
    pub fn new(downloader: reqwest::Client) -> Self {
        Self {
            session: RwLock::new(None),
            downloader,
        }
    }

    /// Start using a freshly established gateway session.
    pub fn attach(&self, context: Context, ready: &Ready) {
        let session = Session {
            context,
            bot_user_id: ready.user.id.get(),
            bot_avatar_url: ready.user.face(),
        };
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    pub fn detach(&self) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn session(&self) -> Result<Session, TransportError> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| TransportError::Transient("Discord is not connected".to_string()))
    }
}

/// Map a serenity error onto the bridge's failure kinds by HTTP status.
pub fn classify(error: serenity::Error) -> TransportError {
    let status = match &error {
        serenity::Error::Http(http_error) => http_error.status_code().map(|s| s.as_u16()),
        _ => None,
    };
    classify_status(status, error.to_string())
}

fn classify_status(status: Option<u16>, message: String) -> TransportError {
    match status {
        Some(404) => TransportError::NotFound(message),
        Some(403) => TransportError::Forbidden(message),
        _ => TransportError::Transient(message),
    }
}

/// Find a channel or thread in the cached guilds.
fn cached_channel(cache: &Cache, id: ChannelId) -> Option<ChannelInfo> {
    cache.guilds().into_iter().find_map(|guild_id| {
        let guild = cache.guild(guild_id)?;
        guild
            .channels
            .get(&id)
            .or_else(|| guild.threads.iter().find(|thread| thread.id == id))
            .map(guild_channel_info)
    })
}

fn build_message(message: OutgoingMessage) -> CreateMessage {
    let mut builder = CreateMessage::new().allowed_mentions(CreateAllowedMentions::new());

    if let Some(embed) = message.embed {
        let mut create = CreateEmbed::new()
            .title(embed.title)
            .author(CreateEmbedAuthor::new(embed.author_name).icon_url(embed.author_icon_url));
        if let Some(description) = embed.description {
            create = create.description(description);
        }
        if let Some(filename) = embed.image_filename {
            create = create.image(format!("attachment://{}", filename));
        }
        builder = builder.embed(create);
    }
    if let Some(content) = message.content {
        builder = builder.content(content);
    }
    for file in message.files {
        builder = builder.add_file(CreateAttachment::bytes(file.data, file.filename));
    }

    builder
}

#[async_trait]
impl Transport for SerenityTransport {
    fn bot_user_id(&self) -> Option<u64> {
        self.session().ok().map(|session| session.bot_user_id)
    }

    fn bot_avatar_url(&self) -> String {
        self.session()
            .map(|session| session.bot_avatar_url)
            .unwrap_or_default()
    }

    async fn resolve_channel(&self, channel_id: u64) -> Result<ChannelInfo, TransportError> {
        let session = self.session()?;
        let id = ChannelId::new(channel_id);

        if let Some(info) = cached_channel(&session.context.cache, id) {
            return Ok(info);
        }

        debug!(channel_id, "Channel not cached, fetching");
        let channel = session.context.http.get_channel(id).await.map_err(classify)?;
        channel_info(&channel)
            .ok_or_else(|| TransportError::NotFound(format!("unsupported channel {}", channel_id)))
    }

    async fn send_message(
        &self,
        channel_id: u64,
        message: OutgoingMessage,
    ) -> Result<MessageId, TransportError> {
        let session = self.session()?;
        let sent = ChannelId::new(channel_id)
            .send_message(&session.context.http, build_message(message))
            .await
            .map_err(classify)?;
        Ok(sent.id.get())
    }

    async fn fetch_message(
        &self,
        channel_id: u64,
        message_id: MessageId,
    ) -> Result<(), TransportError> {
        let session = self.session()?;
        session
            .context
            .http
            .get_message(ChannelId::new(channel_id), DiscordMessageId::new(message_id))
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn add_reaction(
        &self,
        channel_id: u64,
        message_id: MessageId,
        emoji: &ReactionEmoji,
    ) -> Result<(), TransportError> {
        let session = self.session()?;
        session
            .context
            .http
            .create_reaction(
                ChannelId::new(channel_id),
                DiscordMessageId::new(message_id),
                &reaction_type(emoji),
            )
            .await
            .map_err(classify)
    }

    async fn remove_own_reaction(
        &self,
        channel_id: u64,
        message_id: MessageId,
        emoji: &ReactionEmoji,
    ) -> Result<(), TransportError> {
        let session = self.session()?;
        session
            .context
            .http
            .delete_reaction_me(
                ChannelId::new(channel_id),
                DiscordMessageId::new(message_id),
                &reaction_type(emoji),
            )
            .await
            .map_err(classify)
    }

    async fn download_attachment(
        &self,
        attachment: &InboundAttachment,
    ) -> Result<Vec<u8>, TransportError> {
        let response = self
            .downloader
            .get(&attachment.url)
            .send()
            .await
            .map_err(|e| TransportError::Transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(
                Some(status.as_u16()),
                format!("download of {} failed with {}", attachment.filename, status),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Transient(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn guild_name(&self, guild_id: u64) -> Result<String, TransportError> {
        let session = self.session()?;
        let id = GuildId::new(guild_id);

        let cached = session.context.cache.guild(id).map(|guild| guild.name.clone());
        if let Some(name) = cached {
            return Ok(name);
        }

        let guild = session.context.http.get_guild(id).await.map_err(classify)?;
        Ok(guild.name)
    }
}
