//! Serde data structures for the slackmux configuration file.
//!
//! Contains [`Config`] (the root), [`MuxConfig`] with its three lookup
//! tables, [`Endpoint`], [`MuxDirective`], [`Destination`], and
//! [`Defaults`]. Field names under `mux` keep their camelCase spelling
//! (`sourceEndpoints`, `muxTo`, ...) so existing config files load
//! unchanged. All structs use `deny_unknown_fields` for strict parsing.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Shallow key/value map merged over an inbound payload.
pub type Override = Map<String, Value>;

fn is_default_defaults(v: &Defaults) -> bool {
    v.timeout.is_none() && v.fanout == FanoutMode::Sequential
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub mux: MuxConfig,

    #[serde(
        default,
        rename = "unixSocket",
        skip_serializing_if = "Option::is_none"
    )]
    pub unix_socket: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "is_default_defaults")]
    pub defaults: Defaults,
}

impl Config {
    #[must_use]
    pub fn total_directives(&self) -> usize {
        self.mux
            .source_endpoints
            .values()
            .map(|e| e.mux_to.len())
            .sum()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct MuxConfig {
    #[serde(default)]
    pub source_endpoints: BTreeMap<String, Endpoint>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub source_tokens: BTreeMap<String, String>,

    #[serde(default)]
    pub destinations: BTreeMap<String, Destination>,
}

impl MuxConfig {
    #[must_use]
    pub fn endpoint(&self, name: &str) -> Option<&Endpoint> {
        self.source_endpoints.get(name)
    }

    #[must_use]
    pub fn destination(&self, name: &str) -> Option<&Destination> {
        self.destinations.get(name)
    }

    /// Secret value for a token name, as referenced by [`Endpoint::token`].
    #[must_use]
    pub fn token_value(&self, token_name: &str) -> Option<&str> {
        self.source_tokens.get(token_name).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Endpoint {
    /// Name of an entry in `sourceTokens`, not the secret itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default)]
    pub mux_to: Vec<MuxDirective>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MuxDirective {
    pub dest: String,

    #[serde(default, rename = "override", skip_serializing_if = "Option::is_none")]
    pub overrides: Option<Override>,
}

impl MuxDirective {
    #[must_use]
    pub fn to(dest: impl Into<String>) -> Self {
        Self {
            dest: dest.into(),
            overrides: None,
        }
    }

    #[must_use]
    pub fn with_override(mut self, overrides: Override) -> Self {
        self.overrides = Some(overrides);
        self
    }
}

/// A destination is either a bare URL or a table with a per-delivery timeout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Destination {
    Url(String),
    Detailed(DestinationSpec),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DestinationSpec {
    pub url: String,

    /// Delivery timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl Destination {
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Detailed(spec) => &spec.url,
        }
    }

    #[must_use]
    pub const fn timeout_ms(&self) -> Option<u64> {
        match self {
            Self::Url(_) => None,
            Self::Detailed(spec) => spec.timeout,
        }
    }

    /// Effective timeout: destination value first, then the global default.
    #[must_use]
    pub fn timeout(&self, defaults: &Defaults) -> Option<Duration> {
        self.timeout_ms()
            .or(defaults.timeout)
            .map(Duration::from_millis)
    }
}

impl From<&str> for Destination {
    fn from(url: &str) -> Self {
        Self::Url(url.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FanoutMode {
    /// One delivery at a time, in configured order.
    #[default]
    Sequential,
    /// All deliveries in flight at once, joined before the response.
    Concurrent,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    /// Delivery timeout in milliseconds; absent means wait indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    #[serde(default)]
    pub fanout: FanoutMode,
}
