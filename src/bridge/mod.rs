//! Channel bridge relay engine.
//!
//! ## Module Structure
//!
//! - `routes`: Route table loading and lookups
//! - `persona`: Deterministic disguised personas
//! - `store`: JSON document tables
//! - `links`: Source-to-mirror link graph (`LinkGraph`)
//! - `transport`: The `Transport` trait the core talks through
//! - `payload`: Mirror rendering and attachment handling
//! - `orchestrator`: Event handling (`BridgeOrchestrator`)
//! - `diagnostics`: Route listing for a guild

pub mod diagnostics;
pub mod links;
pub mod orchestrator;
pub mod payload;
pub mod persona;
pub mod routes;
pub mod store;
pub mod transport;

// Re-export the types the binary wires together
pub use links::LinkGraph;
pub use orchestrator::BridgeOrchestrator;
pub use persona::{PersonaDictionary, PersonaGenerator};
pub use routes::load_routes;
pub use store::DocumentTable;
