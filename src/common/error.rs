//! Error types for the application.

use thiserror::Error;

use crate::common::types::ChannelEndpoint;

/// Configuration-related errors.
///
/// Route table problems are reported here too since a bridge cannot run with
/// an invalid routing table.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid route entry #{index}: {message}")]
    InvalidRoute { index: usize, message: String },

    #[error("Duplicate route {src} -> {dst}")]
    DuplicateRoute {
        src: ChannelEndpoint,
        dst: ChannelEndpoint,
    },

    #[error("Route {src} -> {dst} has no reciprocal route")]
    MissingReciprocal {
        src: ChannelEndpoint,
        dst: ChannelEndpoint,
    },
}

/// Outcome kinds of a failed transport call.
///
/// The orchestrator matches on the kind: `NotFound` means the target is gone
/// and its link can be dropped, everything else is left for a later event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("transient failure: {0}")]
    Transient(String),
}

impl TransportError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::NotFound(_))
    }
}

/// Persona generation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersonaError {
    #[error("persona dictionary has no {list}")]
    EmptyDictionary { list: &'static str },
}

/// Document store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access store file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to (de)serialize store document: {0}")]
    Serialization(#[from] serde_json::Error),
}
