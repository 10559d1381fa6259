//! Node identifiers, handles and the per-connector node registry.
//!
//! A [`NodeId`] is the stable key a caller configures (for example
//! `ns=2;i=3`). Once a session is open, the client resolves each id into a
//! [`NodeHandle`]; the [`NodeRegistry`] keeps those handles in identifier
//! order so callers can address nodes by index.
//!
//! # Example
//!
//! ```
//! use opcua_bridge::NodeId;
//!
//! let id = NodeId::new("ns=2;i=3").unwrap();
//! assert_eq!(id.namespace(), Some(2));
//! assert_eq!(id.identifier(), "i=3");
//! assert_eq!(id.to_string(), "ns=2;i=3");
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Opaque identifier of a variable on the server.
///
/// Any non-empty string is accepted; the `ns=<index>;<type>=<value>` form
/// is understood by [`NodeId::namespace`] and [`NodeId::identifier`] but not
/// required.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(String);

impl NodeId {
    /// Creates a node identifier.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::InvalidConfig` if `id` is empty or blank.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(BridgeError::invalid_config(
                "node_id",
                "node identifier must not be empty",
            ));
        }
        Ok(Self(id))
    }

    /// Returns the identifier as given.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the namespace index for `ns=<n>;...` identifiers.
    ///
    /// Identifiers without a namespace prefix live in namespace 0.
    ///
    /// ```
    /// use opcua_bridge::NodeId;
    ///
    /// assert_eq!(NodeId::new("ns=3;s=Counter").unwrap().namespace(), Some(3));
    /// assert_eq!(NodeId::new("i=2253").unwrap().namespace(), Some(0));
    /// assert_eq!(NodeId::new("ns=x;i=1").unwrap().namespace(), None);
    /// ```
    pub fn namespace(&self) -> Option<u16> {
        match self.0.split_once(';') {
            Some((prefix, _)) => prefix.strip_prefix("ns=")?.parse().ok(),
            None => Some(0),
        }
    }

    /// Returns the part after the namespace prefix (`i=3` for `ns=2;i=3`).
    pub fn identifier(&self) -> &str {
        match self.0.split_once(';') {
            Some((prefix, rest)) if prefix.starts_with("ns=") => rest,
            _ => &self.0,
        }
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for NodeId {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for NodeId {
    type Error = BridgeError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for NodeId {
    type Error = BridgeError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

/// Reference to a resolved node, issued by an [`OpcUaClient`](crate::OpcUaClient).
///
/// Only meaningful while the session it was resolved in is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHandle {
    node_id: NodeId,
    token: u64,
}

impl NodeHandle {
    /// Creates a handle. Called by client implementations while resolving.
    pub fn new(node_id: NodeId, token: u64) -> Self {
        Self { node_id, token }
    }

    /// Returns the identifier this handle was resolved from.
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Returns the client-specific token.
    pub fn token(&self) -> u64 {
        self.token
    }
}

/// Resolved handles, stored in identifier order.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    handles: Vec<NodeHandle>,
}

impl NodeRegistry {
    pub(crate) fn from_handles(handles: Vec<NodeHandle>) -> Self {
        Self { handles }
    }

    /// Returns the handle at `index`, if resolved.
    pub fn select(&self, index: usize) -> Option<&NodeHandle> {
        self.handles.get(index)
    }

    /// Number of resolved handles.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns `true` if nothing has been resolved.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Iterates over the handles in identifier order.
    pub fn iter(&self) -> std::slice::Iter<'_, NodeHandle> {
        self.handles.iter()
    }
}
