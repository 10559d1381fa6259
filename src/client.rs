//! Seam to the underlying OPC UA client library.
//!
//! This module defines the [`OpcUaClient`] trait, the only surface through
//! which the bridge talks to a server. Session establishment, security, and
//! the wire protocol all stay inside the implementation; the bridge only
//! opens a session, resolves node identifiers, and reads or writes values.
//!
//! # Design
//!
//! - **Protocol agnostic** - the bridge knows sessions, handles and values,
//!   never bytes
//! - **Async** - every call may suspend while the server answers
//! - **Simple** - one call produces one round trip; no retries, no caching
//!
//! [`MemoryClient`](crate::MemoryClient) is an in-memory implementation used
//! for tests and demos.

use std::io;

use async_trait::async_trait;
use thiserror::Error;

use crate::node::{NodeHandle, NodeId};
use crate::value::Variant;
use crate::Endpoint;

/// Identifier of an open session, issued by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// Errors reported by an [`OpcUaClient`] implementation.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server did not answer in time.
    #[error("Request timed out")]
    Timeout,

    /// The session is not open (never opened, or already closed).
    #[error("Session is closed")]
    SessionClosed,

    /// The server has no node with this identifier.
    #[error("Unknown node '{0}'")]
    UnknownNode(String),

    /// The server refused the request (permission, type mismatch, ...).
    #[error("Request rejected: {reason}")]
    Rejected {
        /// Status or description returned by the server.
        reason: String,
    },

    /// Transport-level I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ClientError {
    /// Creates a new `Rejected` error.
    ///
    /// # Example
    ///
    /// ```
    /// use opcua_bridge::ClientError;
    ///
    /// let err = ClientError::rejected("BadNotWritable");
    /// assert_eq!(err.to_string(), "Request rejected: BadNotWritable");
    /// ```
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

/// Operations the bridge needs from an OPC UA client library.
///
/// Implementations must be shareable across concurrently running writes,
/// so every method takes `&self`.
#[async_trait]
pub trait OpcUaClient: Send + Sync {
    /// Opens a session with the server at `endpoint`.
    async fn open_session(&self, endpoint: &Endpoint) -> Result<SessionId, ClientError>;

    /// Closes a session. May fail on a session that is already closed.
    async fn close_session(&self, session: SessionId) -> Result<(), ClientError>;

    /// Resolves a node identifier into a handle usable for reads and writes.
    async fn resolve(&self, session: SessionId, node: &NodeId) -> Result<NodeHandle, ClientError>;

    /// Reads the current value of a node.
    async fn read_value(&self, handle: &NodeHandle) -> Result<Variant, ClientError>;

    /// Writes a value to a node.
    async fn write_value(&self, handle: &NodeHandle, value: Variant) -> Result<(), ClientError>;
}

#[async_trait]
impl<T: OpcUaClient + ?Sized> OpcUaClient for std::sync::Arc<T> {
    async fn open_session(&self, endpoint: &Endpoint) -> Result<SessionId, ClientError> {
        (**self).open_session(endpoint).await
    }

    async fn close_session(&self, session: SessionId) -> Result<(), ClientError> {
        (**self).close_session(session).await
    }

    async fn resolve(&self, session: SessionId, node: &NodeId) -> Result<NodeHandle, ClientError> {
        (**self).resolve(session, node).await
    }

    async fn read_value(&self, handle: &NodeHandle) -> Result<Variant, ClientError> {
        (**self).read_value(handle).await
    }

    async fn write_value(&self, handle: &NodeHandle, value: Variant) -> Result<(), ClientError> {
        (**self).write_value(handle, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_display() {
        assert_eq!(SessionId(3).to_string(), "session#3");
    }

    #[test]
    fn test_client_error_display() {
        assert_eq!(ClientError::Timeout.to_string(), "Request timed out");
        assert_eq!(
            ClientError::UnknownNode("ns=2;i=9".to_string()).to_string(),
            "Unknown node 'ns=2;i=9'"
        );
    }
}
