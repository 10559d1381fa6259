//! Connector configuration.
//!
//! [`ConnectorConfig`] collects the endpoint, the ordered node identifiers
//! and an optional per-call timeout. It is built with chained `with_*`
//! methods or deserialized from JSON.
//!
//! # Example
//!
//! ```
//! use opcua_bridge::ConnectorConfig;
//! use std::time::Duration;
//!
//! let config = ConnectorConfig::new("opc.tcp://localhost:4840")?
//!     .with_node("ns=2;i=2")?
//!     .with_node("ns=2;i=4")?
//!     .with_timeout(Duration::from_secs(5));
//!
//! assert_eq!(config.node_ids().len(), 2);
//! # Ok::<(), opcua_bridge::BridgeError>(())
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::node::NodeId;

/// Endpoint used when none is configured (local test server).
pub const DEFAULT_ENDPOINT: &str = "opc.tcp://localhost:4840";

/// Default per-call timeout. `None` leaves timing to the client library.
pub const DEFAULT_TIMEOUT: Option<Duration> = None;

/// Address of the remote server, e.g. `opc.tcp://localhost:4840`.
///
/// Treated as opaque; only emptiness is checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint(String);

impl Endpoint {
    /// Creates an endpoint.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::InvalidConfig` if `url` is empty or blank.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(BridgeError::invalid_config(
                "endpoint",
                "endpoint must not be empty",
            ));
        }
        Ok(Self(url))
    }

    /// Returns the endpoint URL.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self(DEFAULT_ENDPOINT.to_string())
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Endpoint {
    type Error = BridgeError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.0
    }
}

/// Configuration for creating a [`Connector`](crate::Connector).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Server endpoint.
    pub endpoint: Endpoint,
    /// Node identifiers; position defines the index used by callers.
    #[serde(rename = "nodes")]
    pub node_ids: Vec<NodeId>,
    /// Timeout applied to every client call, if set.
    #[serde(with = "timeout_millis", rename = "timeout_ms")]
    pub timeout: Option<Duration>,
}

impl ConnectorConfig {
    /// Creates a configuration for `endpoint` with no nodes.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::InvalidConfig` if the endpoint is empty.
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Ok(Self {
            endpoint: Endpoint::new(endpoint)?,
            node_ids: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Appends one node identifier.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::InvalidConfig` if the identifier is empty.
    pub fn with_node(mut self, node_id: impl Into<String>) -> Result<Self> {
        self.node_ids.push(NodeId::new(node_id)?);
        Ok(self)
    }

    /// Appends several node identifiers, keeping their order.
    ///
    /// # Example
    ///
    /// ```
    /// use opcua_bridge::ConnectorConfig;
    ///
    /// let config = ConnectorConfig::new("opc.tcp://localhost:4840")?
    ///     .with_nodes(["ns=2;i=3", "ns=2;i=4"])?;
    /// assert_eq!(config.node_ids()[1].as_str(), "ns=2;i=4");
    /// # Ok::<(), opcua_bridge::BridgeError>(())
    /// ```
    pub fn with_nodes<I, S>(mut self, node_ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in node_ids {
            self.node_ids.push(NodeId::new(id)?);
        }
        Ok(self)
    }

    /// Sets a timeout applied to every client call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Parses a configuration from JSON.
    ///
    /// ```
    /// use opcua_bridge::ConnectorConfig;
    ///
    /// let config = ConnectorConfig::from_json(
    ///     r#"{"endpoint": "opc.tcp://plc:4840", "nodes": ["ns=2;i=2"], "timeout_ms": 500}"#,
    /// )?;
    /// assert_eq!(config.endpoint.as_str(), "opc.tcp://plc:4840");
    /// # Ok::<(), opcua_bridge::BridgeError>(())
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns the node identifiers in index order.
    pub fn node_ids(&self) -> &[NodeId] {
        &self.node_ids
    }
}

mod timeout_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
