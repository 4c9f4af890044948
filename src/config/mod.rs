//! Configuration parsing and types.

pub mod env;
pub mod parser;
pub mod types;
pub mod validate;

use std::path::Path;

use tracing::info;

use crate::common::error::ConfigError;

pub use env::{apply_env_overrides, get_config_path};
pub use parser::load_config;
pub use types::*;
pub use validate::validate_config;

/// Load the config file, apply environment overrides and validate the result.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let config = apply_env_overrides(load_config(path)?);
    validate_config(&config)?;

    info!(
        data_dir = %config.bridge.data_dir,
        inline_routes = config.bridge.routes.enabled,
        strict = config.bridge.routes.strict,
        "Configuration loaded from {}",
        path.display()
    );
    Ok(config)
}
