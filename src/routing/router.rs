//! Route lookup.
//!
//! # Responsibilities
//! - Store the configured host entries in declaration order
//! - Resolve a hostname to a destination port
//! - Apply the default policy when nothing matches
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) exact lookup via HashMap, then an ordered pattern scan
//! - Exact keys always beat patterns; among patterns the earliest declared wins
//! - Loop prevention is enforced by the constructor, never at lookup time

use std::collections::HashMap;

use serde::{de, Deserialize, Deserializer};
use thiserror::Error;

use crate::routing::matcher::HostPattern;

/// What to do with a request whose host matches no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "behaviour", rename_all = "lowercase")]
pub enum DefaultPolicy {
    /// Answer with 404 Not Found.
    #[default]
    Error,
    /// Forward to a fixed port.
    Bounce {
        #[serde(deserialize_with = "deserialize_port")]
        port: u16,
    },
}

/// Deserialize a port from any whole JSON number, so `9001.0` reads as 9001.
pub(crate) fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    port_from_number(&number).ok_or_else(|| de::Error::custom(format!("{} is not a valid port", number)))
}

pub(crate) fn port_from_number(number: &serde_json::Number) -> Option<u16> {
    let whole = match number.as_u64() {
        Some(n) => n,
        None => {
            let n = number.as_f64()?;
            if n.fract() != 0.0 || !(0.0..=f64::from(u16::MAX)).contains(&n) {
                return None;
            }
            n as u64
        }
    };
    u16::try_from(whole).ok()
}

/// A route or default policy that points back at the proxy itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoopDetected {
    #[error("Loop detected, host {host} points to the server port ({port})")]
    Host { host: String, port: u16 },

    #[error("Loop detected, default bounce points to the server port ({port})")]
    DefaultBounce { port: u16 },
}

/// One `hosts` entry.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub pattern: HostPattern,
    pub port: u16,
}

/// Outcome of resolving a hostname against a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// A `hosts` entry matched.
    Matched(u16),
    /// Nothing matched, the default policy bounces.
    Default(u16),
    /// Nothing matched, the default policy is `Error`.
    NotFound,
}

impl RouteDecision {
    /// Destination port, if the request is to be bounced.
    pub fn port(&self) -> Option<u16> {
        match self {
            RouteDecision::Matched(port) | RouteDecision::Default(port) => Some(*port),
            RouteDecision::NotFound => None,
        }
    }
}

/// Immutable host → port table.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    exact: HashMap<String, u16>,
    entries: Vec<RouteEntry>,
    default: DefaultPolicy,
}

impl RoutingTable {
    /// A table with no entries that answers everything with not-found.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from entries in declaration order.
    ///
    /// Fails if any entry, or a bouncing default, targets `listen_port`.
    pub fn new<I, S>(entries: I, default: DefaultPolicy, listen_port: u16) -> Result<Self, LoopDetected>
    where
        I: IntoIterator<Item = (S, u16)>,
        S: Into<String>,
    {
        let mut exact = HashMap::new();
        let mut routes: Vec<RouteEntry> = Vec::new();

        for (host, port) in entries {
            let host = host.into();
            if port == listen_port {
                return Err(LoopDetected::Host { host, port });
            }
            // A repeated key keeps its first position and takes the later port.
            if let Some(existing) = routes.iter_mut().find(|e| e.pattern.as_str() == host) {
                existing.port = port;
            } else {
                routes.push(RouteEntry {
                    pattern: HostPattern::parse(host.clone()),
                    port,
                });
            }
            exact.insert(host, port);
        }

        if let DefaultPolicy::Bounce { port } = default {
            if port == listen_port {
                return Err(LoopDetected::DefaultBounce { port });
            }
        }

        Ok(Self {
            exact,
            entries: routes,
            default,
        })
    }

    /// Resolve `hostname` to a port from the entries alone.
    pub fn lookup(&self, hostname: &str) -> Option<u16> {
        if hostname.is_empty() {
            return None;
        }
        if let Some(port) = self.exact.get(hostname) {
            return Some(*port);
        }
        self.entries
            .iter()
            .find(|entry| entry.pattern.matches(hostname))
            .map(|entry| entry.port)
    }

    /// Resolve `hostname`, falling back to the default policy.
    pub fn resolve(&self, hostname: &str) -> RouteDecision {
        match self.lookup(hostname) {
            Some(port) => RouteDecision::Matched(port),
            None => match self.default {
                DefaultPolicy::Bounce { port } => RouteDecision::Default(port),
                DefaultPolicy::Error => RouteDecision::NotFound,
            },
        }
    }

    pub fn default_policy(&self) -> DefaultPolicy {
        self.default
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
