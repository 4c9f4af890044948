//! Common types shared between the bridge core and the Discord adapter.

pub mod error;
pub mod messages;
pub mod types;
