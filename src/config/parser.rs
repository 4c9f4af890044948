//! Configuration file parsing (HOCON format).

use std::path::Path;

use hocon::HoconLoader;
use tracing::info;

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Load configuration from a HOCON file.
///
/// A missing file is not an error: the bridge can be configured entirely
/// through the environment, so defaults are returned instead.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    if !path.exists() {
        info!("No config file at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    HoconLoader::new()
        .load_file(path)
        .map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        })?
        .resolve()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_config_str(content: &str) -> Result<Config, ConfigError> {
        HoconLoader::new()
            .load_str(content)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })?
            .resolve()
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
    }

    #[test]
    fn test_load_config_str() {
        let config = load_config_str(
            r#"
            discord {
                token = "abc"
            }
            bridge {
                data_dir = "/var/lib/herald"
                link_retention_days = 7
                routes {
                    strict = true
                }
            }
            "#,
        )
        .unwrap();

        assert_eq!(config.discord.token, "abc");
        assert_eq!(config.discord.command_prefix, "!");
        assert_eq!(config.bridge.data_dir, "/var/lib/herald");
        assert_eq!(config.bridge.link_retention_days, 7);
        assert_eq!(config.bridge.purge_interval_hours, 6);
        assert!(config.bridge.routes.strict);
        assert!(!config.bridge.routes.require_reciprocal);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path().join("absent.conf")).unwrap();

        assert!(config.discord.token.is_empty());
        assert_eq!(config.bridge.data_dir, "data");
        assert_eq!(
            config.bridge.routes_path(),
            std::path::PathBuf::from("data").join("channel_routes.json")
        );
    }
}
