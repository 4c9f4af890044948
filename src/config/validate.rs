//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.

use crate::common::error::ConfigError;
use crate::config::types::Config;

const TOKEN_PLACEHOLDER: &str = "YOUR_DISCORD_TOKEN_HERE";

/// About a century.
pub const MAX_LINK_RETENTION_DAYS: u32 = 36_500;
/// One year.
pub const MAX_PURGE_INTERVAL_HOURS: u64 = 8_760;

/// Validate a configuration and return detailed errors.
///
/// Route payload contents are checked later, when the route table is loaded.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    // Validate Discord config
    if config.discord.token.is_empty() {
        errors.push("discord.token is required (or set HERALD_DISCORD_TOKEN)".to_string());
    }
    if config.discord.token == TOKEN_PLACEHOLDER {
        errors.push("discord.token has not been configured (still using placeholder)".to_string());
    }
    if config.discord.command_prefix.trim().is_empty() {
        errors.push("discord.command_prefix must not be empty".to_string());
    }

    // Validate bridge config
    let bridge = &config.bridge;
    if bridge.data_dir.trim().is_empty() {
        errors.push("bridge.data_dir must not be empty".to_string());
    }
    if bridge.link_retention_days == 0 {
        errors.push("bridge.link_retention_days must be non-zero".to_string());
    } else if bridge.link_retention_days > MAX_LINK_RETENTION_DAYS {
        errors.push(format!(
            "bridge.link_retention_days must be at most {}",
            MAX_LINK_RETENTION_DAYS
        ));
    }
    if bridge.purge_interval_hours == 0 {
        errors.push("bridge.purge_interval_hours must be non-zero".to_string());
    } else if bridge.purge_interval_hours > MAX_PURGE_INTERVAL_HOURS {
        errors.push(format!(
            "bridge.purge_interval_hours must be at most {}",
            MAX_PURGE_INTERVAL_HOURS
        ));
    }
    if bridge.routes.enabled
        && bridge
            .routes
            .json
            .as_deref()
            .map_or(true, |json| json.trim().is_empty())
    {
        errors.push(
            "bridge.routes.json is required when bridge.routes.enabled is set".to_string(),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}
