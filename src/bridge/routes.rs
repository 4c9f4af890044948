//! Channel route table.
//!
//! Routes are directed `(src, dst)` channel pairs. The table keeps them in load
//! order and indexes them by source endpoint for per-message lookups.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::common::error::ConfigError;
use crate::common::types::ChannelEndpoint;
use crate::config::types::RoutesConfig;

/// A directed relay from one channel to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    pub src: ChannelEndpoint,
    pub dst: ChannelEndpoint,
}

impl Route {
    pub fn new(src: ChannelEndpoint, dst: ChannelEndpoint) -> Self {
        Self { src, dst }
    }

    pub fn reversed(&self) -> Self {
        Self {
            src: self.dst,
            dst: self.src,
        }
    }
}

/// Indexed, validated set of routes.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    /// All routes in load order.
    routes: Vec<Route>,
    /// Index: source (guild, channel) -> positions in `routes`.
    by_source: HashMap<(u64, u64), Vec<usize>>,
}

impl PartialEq for RouteTable {
    fn eq(&self, other: &Self) -> bool {
        self.routes == other.routes
    }
}

impl Eq for RouteTable {}

impl RouteTable {
    /// Build a table from already validated routes. Duplicates are dropped.
    pub fn new(routes: impl IntoIterator<Item = Route>) -> Self {
        let mut table = Self::default();
        for route in routes {
            table.insert(route);
        }
        table
    }

    /// Parse a JSON route payload.
    ///
    /// In strict mode any malformed or duplicate entry fails the load; otherwise
    /// such entries are skipped with a warning. A payload that is not a JSON
    /// array always fails.
    pub fn from_json(
        payload: &str,
        strict: bool,
        require_reciprocal: bool,
    ) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(payload).map_err(|e| ConfigError::ParseError {
            message: format!("route payload is not valid JSON: {}", e),
        })?;
        let Value::Array(entries) = value else {
            return Err(ConfigError::ParseError {
                message: "route payload must be a JSON array".to_string(),
            });
        };

        let mut table = Self::default();
        for (index, entry) in entries.iter().enumerate() {
            let route = match parse_route(index, entry) {
                Ok(route) => route,
                Err(e) if strict => return Err(e),
                Err(e) => {
                    warn!("Skipping route entry: {}", e);
                    continue;
                }
            };

            if !table.insert(route) {
                let e = ConfigError::DuplicateRoute {
                    src: route.src,
                    dst: route.dst,
                };
                if strict {
                    return Err(e);
                }
                warn!("Skipping route entry #{}: {}", index, e);
            }
        }

        if require_reciprocal {
            table.check_reciprocal()?;
        }

        Ok(table)
    }

    /// Insert a route, returning false when the pair is already present.
    fn insert(&mut self, route: Route) -> bool {
        let indices = self.by_source.entry(route.src.key()).or_default();
        if indices.iter().any(|&i| self.routes[i].dst == route.dst) {
            return false;
        }
        indices.push(self.routes.len());
        self.routes.push(route);
        true
    }

    fn check_reciprocal(&self) -> Result<(), ConfigError> {
        let present: HashSet<&Route> = self.routes.iter().collect();
        match self
            .routes
            .iter()
            .find(|route| !present.contains(&route.reversed()))
        {
            Some(route) => Err(ConfigError::MissingReciprocal {
                src: route.src,
                dst: route.dst,
            }),
            None => Ok(()),
        }
    }

    /// Routes leaving the given channel, in load order.
    pub fn routes_from(&self, endpoint: &ChannelEndpoint) -> Vec<&Route> {
        self.by_source
            .get(&endpoint.key())
            .map(|indices| indices.iter().map(|&i| &self.routes[i]).collect())
            .unwrap_or_default()
    }

    /// Routes whose source channel is in the given guild, in load order.
    pub fn routes_from_guild(&self, guild: u64) -> Vec<&Route> {
        self.routes.iter().filter(|r| r.src.guild == guild).collect()
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn parse_route(index: usize, entry: &Value) -> Result<Route, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidRoute { index, message };

    let src = parse_endpoint(entry.get("src")).map_err(|e| invalid(format!("src: {}", e)))?;
    let dst = parse_endpoint(entry.get("dst")).map_err(|e| invalid(format!("dst: {}", e)))?;
    Ok(Route::new(src, dst))
}

fn parse_endpoint(value: Option<&Value>) -> Result<ChannelEndpoint, String> {
    let value = value.ok_or("missing endpoint")?;
    if !value.is_object() {
        return Err("endpoint must be an object".to_string());
    }
    Ok(ChannelEndpoint::new(
        parse_id(value, "guild")?,
        parse_id(value, "channel")?,
    ))
}

/// Ids are positive integers, given either as JSON numbers or numeric strings.
fn parse_id(endpoint: &Value, field: &str) -> Result<u64, String> {
    let id = match endpoint.get(field) {
        None | Some(Value::Null) => return Err(format!("missing {}", field)),
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        Some(_) => None,
    };

    match id {
        Some(id) if id > 0 => Ok(id),
        _ => Err(format!("{} must be a positive integer", field)),
    }
}

/// Routes written to an empty installation as a starting point.
pub fn sample_routes() -> Vec<Route> {
    let a = ChannelEndpoint::new(111111111111111111, 222222222222222222);
    let b = ChannelEndpoint::new(333333333333333333, 444444444444444444);
    vec![Route::new(a, b), Route::new(b, a)]
}

/// Load the route table according to the routing configuration.
///
/// An inline payload wins when enabled. Otherwise the route file is read; if
/// it does not exist a sample is written in its place and the table is empty.
pub fn load_routes(path: &Path, config: &RoutesConfig) -> Result<RouteTable, ConfigError> {
    if config.enabled {
        let payload = config
            .json
            .as_deref()
            .ok_or_else(|| ConfigError::MissingField {
                field: "bridge.routes.json".to_string(),
            })?;
        let table = RouteTable::from_json(payload, config.strict, config.require_reciprocal)?;
        info!(routes = table.len(), "Loaded channel routes from inline payload");
        return Ok(table);
    }

    if !path.exists() {
        write_sample(path)?;
        warn!(
            "Channel route file not found, sample written to {}",
            path.display()
        );
        return Ok(RouteTable::default());
    }

    let payload = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
        path: path.display().to_string(),
        source,
    })?;
    let table = RouteTable::from_json(&payload, config.strict, config.require_reciprocal)?;
    for route in table.routes() {
        info!("Loaded channel route: {} -> {}", route.src, route.dst);
    }
    Ok(table)
}

fn write_sample(path: &Path) -> Result<(), ConfigError> {
    let io_error = |source| ConfigError::IoError {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let content =
        serde_json::to_string_pretty(&sample_routes()).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
    fs::write(path, content).map_err(io_error)
}
