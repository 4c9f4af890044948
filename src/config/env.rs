//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `HERALD_DISCORD_TOKEN` - Discord bot token (falls back to `DISCORD_BOT_TOKEN`)
//! - `HERALD_DATA_DIR` - Directory for route and document files
//! - `HERALD_BRIDGE_ROUTES_FILE` - Route file path
//! - `HERALD_BRIDGE_ROUTES_ENABLED` - Read routes from `HERALD_BRIDGE_ROUTES_JSON`
//! - `HERALD_BRIDGE_ROUTES_JSON` - Inline route payload
//! - `HERALD_BRIDGE_ROUTES_REQUIRE_RECIPROCAL` - Require reverse routes
//! - `HERALD_BRIDGE_ROUTES_STRICT` - Fail on malformed or duplicate routes
//! - `HERALD_LINK_RETENTION_DAYS` - Link record retention
//! - `HERALD_PURGE_INTERVAL_HOURS` - Pruning interval

use std::env;

use tracing::warn;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "HERALD";

/// Token variable understood for compatibility with plain `.env` deployments.
const LEGACY_TOKEN_VAR: &str = "DISCORD_BOT_TOKEN";

/// Apply environment variable overrides to a config.
pub fn apply_env_overrides(config: Config) -> Config {
    apply_overrides_from(config, |name| env::var(name).ok())
}

/// Apply overrides using an arbitrary variable lookup.
pub fn apply_overrides_from<F>(mut config: Config, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    let var = |suffix: &str| lookup(&format!("{}_{}", ENV_PREFIX, suffix));

    if let Some(token) = var("DISCORD_TOKEN").or_else(|| lookup(LEGACY_TOKEN_VAR)) {
        config.discord.token = token.trim().to_string();
    }

    if let Some(dir) = var("DATA_DIR") {
        config.bridge.data_dir = dir;
    }
    if let Some(path) = var("BRIDGE_ROUTES_FILE") {
        config.bridge.routes_file = Some(path);
    }

    let routes = &mut config.bridge.routes;
    if let Some(value) = var("BRIDGE_ROUTES_ENABLED") {
        override_flag("BRIDGE_ROUTES_ENABLED", &value, &mut routes.enabled);
    }
    if let Some(json) = var("BRIDGE_ROUTES_JSON") {
        routes.json = Some(json);
    }
    if let Some(value) = var("BRIDGE_ROUTES_REQUIRE_RECIPROCAL") {
        override_flag(
            "BRIDGE_ROUTES_REQUIRE_RECIPROCAL",
            &value,
            &mut routes.require_reciprocal,
        );
    }
    if let Some(value) = var("BRIDGE_ROUTES_STRICT") {
        override_flag("BRIDGE_ROUTES_STRICT", &value, &mut routes.strict);
    }

    if let Some(days) = var("LINK_RETENTION_DAYS") {
        match days.trim().parse() {
            Ok(days) => config.bridge.link_retention_days = days,
            Err(_) => warn!("Ignoring {}_LINK_RETENTION_DAYS={:?}: not a number", ENV_PREFIX, days),
        }
    }
    if let Some(hours) = var("PURGE_INTERVAL_HOURS") {
        match hours.trim().parse() {
            Ok(hours) => config.bridge.purge_interval_hours = hours,
            Err(_) => warn!("Ignoring {}_PURGE_INTERVAL_HOURS={:?}: not a number", ENV_PREFIX, hours),
        }
    }

    config
}

/// Parse a boolean flag the way `.env` files usually spell them.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn override_flag(name: &str, value: &str, target: &mut bool) {
    match parse_flag(value) {
        Some(flag) => *target = flag,
        None => warn!("Ignoring {}_{}={:?}: not a boolean", ENV_PREFIX, name, value),
    }
}

/// Get the config file path from environment or use default.
///
/// Checks `HERALD_CONFIG` environment variable, otherwise returns "herald.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "herald.conf".to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_env_prefix() {
        assert_eq!(ENV_PREFIX, "HERALD");
    }

    #[test]
    fn test_no_vars_leaves_config_unchanged() {
        let mut config = Config::default();
        config.discord.token = "file_token".to_string();

        let result = apply_overrides_from(config, lookup_from(&[]));

        assert_eq!(result.discord.token, "file_token");
        assert!(!result.bridge.routes.enabled);
        assert_eq!(result.bridge.link_retention_days, 30);
    }

    #[test]
    fn test_route_flags_override() {
        let result = apply_overrides_from(
            Config::default(),
            lookup_from(&[
                ("HERALD_BRIDGE_ROUTES_ENABLED", "true"),
                ("HERALD_BRIDGE_ROUTES_JSON", "[]"),
                ("HERALD_BRIDGE_ROUTES_REQUIRE_RECIPROCAL", "1"),
                ("HERALD_BRIDGE_ROUTES_STRICT", "yes"),
                ("HERALD_DATA_DIR", "/srv/herald"),
            ]),
        );

        let routes = &result.bridge.routes;
        assert!(routes.enabled);
        assert_eq!(routes.json.as_deref(), Some("[]"));
        assert!(routes.require_reciprocal);
        assert!(routes.strict);
        assert_eq!(result.bridge.data_dir, "/srv/herald");
    }

    #[test]
    fn test_legacy_token_fallback() {
        let result = apply_overrides_from(
            Config::default(),
            lookup_from(&[("DISCORD_BOT_TOKEN", "  legacy  ")]),
        );
        assert_eq!(result.discord.token, "legacy");

        let result = apply_overrides_from(
            Config::default(),
            lookup_from(&[("DISCORD_BOT_TOKEN", "legacy"), ("HERALD_DISCORD_TOKEN", "new")]),
        );
        assert_eq!(result.discord.token, "new");
    }

    #[test]
    fn test_invalid_values_are_ignored() {
        let result = apply_overrides_from(
            Config::default(),
            lookup_from(&[
                ("HERALD_BRIDGE_ROUTES_STRICT", "maybe"),
                ("HERALD_LINK_RETENTION_DAYS", "forever"),
            ]),
        );

        assert!(!result.bridge.routes.strict);
        assert_eq!(result.bridge.link_retention_days, 30);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("2"), None);
    }
}
