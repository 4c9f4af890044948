//! Configuration type definitions.

use std::path::PathBuf;

use serde::Deserialize;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
}

/// Discord bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub token: String,
    /// Prefix of the text commands (`!bridges`, `!help`).
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            command_prefix: default_command_prefix(),
        }
    }
}

/// Channel bridge settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Directory holding the route file and the persisted documents.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Route file; defaults to `<data_dir>/channel_routes.json`.
    #[serde(default)]
    pub routes_file: Option<String>,
    /// Link records untouched for longer than this are pruned.
    #[serde(default = "default_link_retention_days")]
    pub link_retention_days: u32,
    /// How often the pruning task runs.
    #[serde(default = "default_purge_interval_hours")]
    pub purge_interval_hours: u64,
    #[serde(default)]
    pub routes: RoutesConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            routes_file: None,
            link_retention_days: default_link_retention_days(),
            purge_interval_hours: default_purge_interval_hours(),
            routes: RoutesConfig::default(),
        }
    }
}

impl BridgeConfig {
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn routes_path(&self) -> PathBuf {
        match &self.routes_file {
            Some(path) => PathBuf::from(path),
            None => self.data_path().join("channel_routes.json"),
        }
    }

    pub fn link_store_path(&self) -> PathBuf {
        self.data_path().join("bridge_messages.json")
    }

    pub fn persona_store_path(&self) -> PathBuf {
        self.data_path().join("bridge_profiles.json")
    }
}

/// Route loading switches, usually supplied through the environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoutesConfig {
    /// When set, routes come from `json` instead of the route file.
    #[serde(default)]
    pub enabled: bool,
    /// Inline JSON route payload.
    #[serde(default)]
    pub json: Option<String>,
    /// Every route must have its reverse route configured.
    #[serde(default)]
    pub require_reciprocal: bool,
    /// Fail the whole load on a malformed or duplicate entry instead of skipping it.
    #[serde(default)]
    pub strict: bool,
}

fn default_command_prefix() -> String {
    "!".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_link_retention_days() -> u32 {
    30
}

fn default_purge_interval_hours() -> u64 {
    6
}
