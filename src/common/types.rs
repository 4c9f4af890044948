//! Shared identifier types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Platform-wide unique message identifier.
pub type MessageId = u64;

/// A channel inside a community (Discord guild).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelEndpoint {
    pub guild: u64,
    pub channel: u64,
}

impl ChannelEndpoint {
    pub fn new(guild: u64, channel: u64) -> Self {
        Self { guild, channel }
    }

    /// Index key used by the route table.
    pub fn key(&self) -> (u64, u64) {
        (self.guild, self.channel)
    }

    /// Whether a cached message location points at this endpoint.
    pub fn contains(&self, location: &MessageLocation) -> bool {
        location.guild == Some(self.guild) && location.channel == self.channel
    }
}

impl fmt::Display for ChannelEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "guild={} channel={}", self.guild, self.channel)
    }
}

/// Where a message was observed. The guild is absent for direct messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageLocation {
    pub guild: Option<u64>,
    pub channel: u64,
}

impl MessageLocation {
    pub fn new(guild: Option<u64>, channel: u64) -> Self {
        Self { guild, channel }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_contains_location() {
        let endpoint = ChannelEndpoint::new(1, 2);
        assert!(endpoint.contains(&MessageLocation::new(Some(1), 2)));
        assert!(!endpoint.contains(&MessageLocation::new(None, 2)));
        assert!(!endpoint.contains(&MessageLocation::new(Some(1), 3)));
    }

    #[test]
    fn test_endpoint_display() {
        assert_eq!(ChannelEndpoint::new(10, 20).to_string(), "guild=10 channel=20");
    }
}
