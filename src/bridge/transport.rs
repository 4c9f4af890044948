//! The narrow interface the bridge core needs from a chat platform.

use async_trait::async_trait;

use crate::common::error::TransportError;
use crate::common::messages::{InboundAttachment, OutgoingMessage, ReactionEmoji};
use crate::common::types::MessageId;

/// A channel as seen by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: u64,
    pub guild_id: Option<u64>,
    pub name: String,
    pub is_thread: bool,
}

/// Operations the orchestrator performs against the chat platform.
///
/// Implementations classify failures into [`TransportError`] kinds; the
/// caller decides per kind whether a link is stale or the failure is
/// temporary.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Id of the account the bridge posts as.
    fn bot_user_id(&self) -> Option<u64>;

    /// Avatar of the bridge account, used by the fallback persona.
    fn bot_avatar_url(&self) -> String;

    /// Resolve a channel, from cache when possible.
    async fn resolve_channel(&self, channel_id: u64) -> Result<ChannelInfo, TransportError>;

    /// Post a message and return the new message's id.
    async fn send_message(
        &self,
        channel_id: u64,
        message: OutgoingMessage,
    ) -> Result<MessageId, TransportError>;

    /// Check that a message still exists.
    async fn fetch_message(&self, channel_id: u64, message_id: MessageId)
        -> Result<(), TransportError>;

    async fn add_reaction(
        &self,
        channel_id: u64,
        message_id: MessageId,
        emoji: &ReactionEmoji,
    ) -> Result<(), TransportError>;

    /// Remove the reaction the bridge account itself placed.
    async fn remove_own_reaction(
        &self,
        channel_id: u64,
        message_id: MessageId,
        emoji: &ReactionEmoji,
    ) -> Result<(), TransportError>;

    async fn download_attachment(
        &self,
        attachment: &InboundAttachment,
    ) -> Result<Vec<u8>, TransportError>;

    async fn guild_name(&self, guild_id: u64) -> Result<String, TransportError>;
}

#[cfg(test)]
pub mod mock {
    //! Recording transport for orchestrator and diagnostics tests.

    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Send {
            channel_id: u64,
            message: OutgoingMessage,
        },
        Fetch {
            channel_id: u64,
            message_id: MessageId,
        },
        AddReaction {
            channel_id: u64,
            message_id: MessageId,
            emoji: ReactionEmoji,
        },
        RemoveReaction {
            channel_id: u64,
            message_id: MessageId,
            emoji: ReactionEmoji,
        },
    }

    pub const BOT_ID: u64 = 999;
    pub const BOT_AVATAR: &str = "https://cdn.example/bot.png";

    #[derive(Default)]
    pub struct MockTransport {
        pub channels: Mutex<HashMap<u64, ChannelInfo>>,
        pub guilds: Mutex<HashMap<u64, String>>,
        pub calls: Mutex<Vec<Call>>,
        pub next_id: Mutex<MessageId>,
        pub failing_sends: Mutex<HashSet<u64>>,
        pub fetch_failures: Mutex<HashMap<MessageId, TransportError>>,
        pub attachments: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self {
                next_id: Mutex::new(1000),
                ..Default::default()
            }
        }

        pub fn with_channel(self, guild_id: u64, channel_id: u64, name: &str) -> Self {
            self.channels.lock().unwrap().insert(
                channel_id,
                ChannelInfo {
                    id: channel_id,
                    guild_id: Some(guild_id),
                    name: name.to_string(),
                    is_thread: false,
                },
            );
            self
        }

        pub fn with_guild(self, guild_id: u64, name: &str) -> Self {
            self.guilds.lock().unwrap().insert(guild_id, name.to_string());
            self
        }

        pub fn with_attachment(self, url: &str, data: &[u8]) -> Self {
            self.attachments
                .lock()
                .unwrap()
                .insert(url.to_string(), data.to_vec());
            self
        }

        pub fn fail_sends_to(&self, channel_id: u64) {
            self.failing_sends.lock().unwrap().insert(channel_id);
        }

        pub fn delete_message(&self, message_id: MessageId) {
            self.fail_fetch(
                message_id,
                TransportError::NotFound(format!("message {}", message_id)),
            );
        }

        /// Make fetching `message_id` fail with `error`.
        pub fn fail_fetch(&self, message_id: MessageId, error: TransportError) {
            self.fetch_failures.lock().unwrap().insert(message_id, error);
        }

        pub fn remove_channel(&self, channel_id: u64) {
            self.channels.lock().unwrap().remove(&channel_id);
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn sends(&self) -> Vec<(u64, OutgoingMessage)> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    Call::Send {
                        channel_id,
                        message,
                    } => Some((channel_id, message)),
                    _ => None,
                })
                .collect()
        }

        pub fn clear_calls(&self) {
            self.calls.lock().unwrap().clear();
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        fn bot_user_id(&self) -> Option<u64> {
            Some(BOT_ID)
        }

        fn bot_avatar_url(&self) -> String {
            BOT_AVATAR.to_string()
        }

        async fn resolve_channel(&self, channel_id: u64) -> Result<ChannelInfo, TransportError> {
            self.channels
                .lock()
                .unwrap()
                .get(&channel_id)
                .cloned()
                .ok_or_else(|| TransportError::NotFound(format!("channel {}", channel_id)))
        }

        async fn send_message(
            &self,
            channel_id: u64,
            message: OutgoingMessage,
        ) -> Result<MessageId, TransportError> {
            self.record(Call::Send {
                channel_id,
                message,
            });
            if self.failing_sends.lock().unwrap().contains(&channel_id) {
                return Err(TransportError::Forbidden(format!("channel {}", channel_id)));
            }
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            Ok(*next)
        }

        async fn fetch_message(
            &self,
            channel_id: u64,
            message_id: MessageId,
        ) -> Result<(), TransportError> {
            self.record(Call::Fetch {
                channel_id,
                message_id,
            });
            match self.fetch_failures.lock().unwrap().get(&message_id) {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            }
        }

        async fn add_reaction(
            &self,
            channel_id: u64,
            message_id: MessageId,
            emoji: &ReactionEmoji,
        ) -> Result<(), TransportError> {
            self.record(Call::AddReaction {
                channel_id,
                message_id,
                emoji: emoji.clone(),
            });
            Ok(())
        }

        async fn remove_own_reaction(
            &self,
            channel_id: u64,
            message_id: MessageId,
            emoji: &ReactionEmoji,
        ) -> Result<(), TransportError> {
            self.record(Call::RemoveReaction {
                channel_id,
                message_id,
                emoji: emoji.clone(),
            });
            Ok(())
        }

        async fn download_attachment(
            &self,
            attachment: &InboundAttachment,
        ) -> Result<Vec<u8>, TransportError> {
            self.attachments
                .lock()
                .unwrap()
                .get(&attachment.url)
                .cloned()
                .ok_or_else(|| TransportError::Transient(format!("download {}", attachment.url)))
        }

        async fn guild_name(&self, guild_id: u64) -> Result<String, TransportError> {
            self.guilds
                .lock()
                .unwrap()
                .get(&guild_id)
                .cloned()
                .ok_or_else(|| TransportError::NotFound(format!("guild {}", guild_id)))
        }
    }
}
