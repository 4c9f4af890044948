//! Human-readable listing of a guild's bridge routes.

use std::collections::HashMap;

use tracing::debug;

use crate::bridge::routes::RouteTable;
use crate::bridge::transport::Transport;
use crate::common::types::ChannelEndpoint;

/// Display labels of one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointLabels {
    pub guild: String,
    pub channel: String,
}

/// One route with both endpoints resolved to labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescription {
    pub src: EndpointLabels,
    pub dst: EndpointLabels,
}

/// Describe every route whose source lives in `guild`, in load order.
///
/// Each endpoint is looked up once per call; lookups that fail produce an
/// "unavailable" label instead of an error.
pub async fn describe_guild_routes<T>(
    transport: &T,
    table: &RouteTable,
    guild: u64,
) -> Vec<RouteDescription>
where
    T: Transport + ?Sized,
{
    let mut cache: HashMap<ChannelEndpoint, EndpointLabels> = HashMap::new();
    let mut descriptions = Vec::new();

    for route in table.routes_from_guild(guild) {
        let src = resolve_labels(transport, &mut cache, route.src).await;
        let dst = resolve_labels(transport, &mut cache, route.dst).await;
        descriptions.push(RouteDescription { src, dst });
    }

    descriptions
}

async fn resolve_labels<T>(
    transport: &T,
    cache: &mut HashMap<ChannelEndpoint, EndpointLabels>,
    endpoint: ChannelEndpoint,
) -> EndpointLabels
where
    T: Transport + ?Sized,
{
    if let Some(labels) = cache.get(&endpoint) {
        return labels.clone();
    }

    let guild = match transport.guild_name(endpoint.guild).await {
        Ok(name) => format!("{} (ID: {})", name, endpoint.guild),
        Err(e) => {
            debug!(guild_id = endpoint.guild, "Guild lookup failed: {}", e);
            format!("(unavailable: Guild ID {})", endpoint.guild)
        }
    };

    let channel = match transport.resolve_channel(endpoint.channel).await {
        Ok(info) if info.is_thread => format!("{} (Thread, ID: {})", info.name, info.id),
        Ok(info) => format!("{} (ID: {})", info.name, info.id),
        Err(e) => {
            debug!(channel_id = endpoint.channel, "Channel lookup failed: {}", e);
            format!("(unavailable: Channel ID {})", endpoint.channel)
        }
    };

    let labels = EndpointLabels { guild, channel };
    cache.insert(endpoint, labels.clone());
    labels
}

/// Render descriptions as a numbered listing.
pub fn format_route_listing(descriptions: &[RouteDescription]) -> String {
    if descriptions.is_empty() {
        return "No channel bridges are configured for this server.".to_string();
    }

    let lines: Vec<String> = descriptions
        .iter()
        .enumerate()
        .map(|(i, d)| {
            format!(
                "{}. From: {} / {}\n   To: {} / {}",
                i + 1,
                d.src.guild,
                d.src.channel,
                d.dst.guild,
                d.dst.channel
            )
        })
        .collect();

    format!("🔗 Configured channel bridges\n{}", lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::transport::mock::MockTransport;
    use crate::bridge::transport::ChannelInfo;

    fn table() -> RouteTable {
        RouteTable::from_json(
            r#"[
                {"src": {"guild": 1, "channel": 10}, "dst": {"guild": 2, "channel": 20}},
                {"src": {"guild": 2, "channel": 20}, "dst": {"guild": 1, "channel": 10}},
                {"src": {"guild": 1, "channel": 10}, "dst": {"guild": 3, "channel": 30}}
            ]"#,
            true,
            false,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_describe_guild_routes() {
        let transport = MockTransport::new()
            .with_guild(1, "Home")
            .with_guild(2, "Away")
            .with_channel(1, 10, "general")
            .with_channel(2, 20, "lobby");
        transport.channels.lock().unwrap().insert(
            30,
            ChannelInfo {
                id: 30,
                guild_id: Some(3),
                name: "side-thread".to_string(),
                is_thread: true,
            },
        );

        let descriptions = describe_guild_routes(&transport, &table(), 1).await;

        assert_eq!(descriptions.len(), 2);
        assert_eq!(
            descriptions[0],
            RouteDescription {
                src: EndpointLabels {
                    guild: "Home (ID: 1)".to_string(),
                    channel: "general (ID: 10)".to_string(),
                },
                dst: EndpointLabels {
                    guild: "Away (ID: 2)".to_string(),
                    channel: "lobby (ID: 20)".to_string(),
                },
            }
        );
        assert_eq!(descriptions[1].dst.guild, "(unavailable: Guild ID 3)");
        assert_eq!(descriptions[1].dst.channel, "side-thread (Thread, ID: 30)");
    }

    #[tokio::test]
    async fn test_unavailable_channel() {
        let transport = MockTransport::new().with_guild(2, "Away");

        let descriptions = describe_guild_routes(&transport, &table(), 2).await;

        assert_eq!(descriptions.len(), 1);
        assert_eq!(descriptions[0].src.channel, "(unavailable: Channel ID 20)");
        assert_eq!(descriptions[0].dst.guild, "(unavailable: Guild ID 1)");
    }

    #[test]
    fn test_format_route_listing() {
        let labels = |g: &str, c: &str| EndpointLabels {
            guild: g.to_string(),
            channel: c.to_string(),
        };
        let listing = format_route_listing(&[RouteDescription {
            src: labels("Home (ID: 1)", "general (ID: 10)"),
            dst: labels("Away (ID: 2)", "lobby (ID: 20)"),
        }]);

        assert_eq!(
            listing,
            "🔗 Configured channel bridges\n\
             1. From: Home (ID: 1) / general (ID: 10)\n   To: Away (ID: 2) / lobby (ID: 20)"
        );
        assert_eq!(
            format_route_listing(&[]),
            "No channel bridges are configured for this server."
        );
    }
}
