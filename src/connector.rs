//! Session and node-registry owner.
//!
//! This module provides the [`Connector`] struct: one session with one OPC UA
//! server plus the ordered set of variables reachable through it.
//!
//! # Overview
//!
//! - Construction stores the endpoint and node identifiers and never touches
//!   the network.
//! - [`Connector::connect`] opens the session and only then resolves every
//!   identifier, in order, into a [`NodeHandle`].
//! - Reads and writes address nodes by index and are checked before any call
//!   reaches the client.
//! - [`Connector::disconnect`] is best-effort. A connector is not reusable
//!   after it.
//!
//! Each read or write is exactly one uncached round trip. No retries, no
//! reconnection.
//!
//! # Example
//!
//! ```
//! use opcua_bridge::{Connector, ConnectorConfig, MemoryClient};
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! # rt.block_on(async {
//! let client = MemoryClient::new().with_node("ns=2;i=3", 0).with_node("ns=2;i=4", 0);
//! let config = ConnectorConfig::new("opc.tcp://localhost:4840")?
//!     .with_nodes(["ns=2;i=3", "ns=2;i=4"])?;
//! let mut connector = Connector::with_client(client, config);
//!
//! let value = connector
//!     .session(|c| {
//!         Box::pin(async move {
//!             c.write_value(1, "new message").await?;
//!             c.read_value(1).await
//!         })
//!     })
//!     .await?;
//! assert_eq!(value.as_str(), Some("new message"));
//! assert!(!connector.is_connected());
//! # Ok::<(), opcua_bridge::BridgeError>(())
//! # }).unwrap();
//! ```
//!
//! # Thread Safety
//!
//! After `connect` the registry is read-only, so reads and writes take
//! `&self` and may run concurrently from one task or many.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::client::{ClientError, OpcUaClient, SessionId};
use crate::config::{ConnectorConfig, Endpoint};
use crate::error::{BridgeError, Result};
use crate::node::{NodeHandle, NodeId, NodeRegistry};
use crate::value::Variant;

/// Future returned by the body of a [`Connector::session`] call.
pub type SessionFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Lifecycle of a [`Connector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Constructed, never connected.
    Idle,
    /// Session open and nodes resolved.
    Connected,
    /// Disconnected; cannot be connected again.
    Disconnected,
}

/// One session with an OPC UA server and the nodes addressed through it.
pub struct Connector<C> {
    client: C,
    endpoint: Endpoint,
    node_ids: Vec<NodeId>,
    timeout: Option<Duration>,
    registry: NodeRegistry,
    session: Option<SessionId>,
    state: ConnectionState,
}

impl<C: OpcUaClient + Default> Connector<C> {
    /// Creates a connector with a default-constructed client.
    pub fn new(config: ConnectorConfig) -> Self {
        Self::with_client(C::default(), config)
    }
}

impl<C: OpcUaClient> Connector<C> {
    /// Creates a connector that talks through `client`.
    ///
    /// Does not contact the server.
    pub fn with_client(client: C, config: ConnectorConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint,
            node_ids: config.node_ids,
            timeout: config.timeout,
            registry: NodeRegistry::default(),
            session: None,
            state: ConnectionState::Idle,
        }
    }

    /// Applies the configured timeout to one client call.
    async fn call<T>(
        &self,
        request: impl Future<Output = std::result::Result<T, ClientError>>,
    ) -> std::result::Result<T, ClientError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .unwrap_or_else(|_| Err(ClientError::Timeout)),
            None => request.await,
        }
    }

    /// Connects to the server and resolves every node.
    ///
    /// Returns `true` on success. On failure the error is logged, the
    /// connector stays unconnected, and `false` is returned.
    pub async fn connect(&mut self) -> bool {
        match self.try_connect().await {
            Ok(()) => true,
            Err(e) => {
                error!(endpoint = %self.endpoint, error = %e, "client did not connect");
                false
            }
        }
    }

    /// Connects to the server and resolves every node, returning the cause
    /// on failure.
    ///
    /// Connecting an already connected connector is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::ConnectionFailure` if the session cannot be
    /// opened, a node cannot be resolved, or the connector was already
    /// disconnected. A session opened before a resolution failure is closed
    /// again.
    pub async fn try_connect(&mut self) -> Result<()> {
        match self.state {
            ConnectionState::Connected => {
                debug!(endpoint = %self.endpoint, "already connected");
                return Ok(());
            }
            ConnectionState::Disconnected => {
                return Err(BridgeError::connection_failure(
                    self.endpoint.as_str(),
                    "connector was disconnected and cannot be reused",
                ));
            }
            ConnectionState::Idle => {}
        }

        let session = self
            .call(self.client.open_session(&self.endpoint))
            .await
            .map_err(|e| BridgeError::connection_failure(self.endpoint.as_str(), e.to_string()))?;
        debug!(endpoint = %self.endpoint, %session, "session opened");

        let mut handles = Vec::with_capacity(self.node_ids.len());
        for id in &self.node_ids {
            match self.call(self.client.resolve(session, id)).await {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    if let Err(close_err) = self.call(self.client.close_session(session)).await {
                        warn!(%session, error = %close_err, "failed to close session after resolve error");
                    }
                    return Err(BridgeError::connection_failure(
                        self.endpoint.as_str(),
                        format!("cannot resolve node {id}: {e}"),
                    ));
                }
            }
        }

        self.registry = NodeRegistry::from_handles(handles);
        self.session = Some(session);
        self.state = ConnectionState::Connected;
        info!(endpoint = %self.endpoint, nodes = self.registry.len(), "client connected");
        Ok(())
    }

    /// Closes the session.
    ///
    /// Returns `true` on success. Failures, including a redundant second
    /// call, are logged and reported as `false`.
    pub async fn disconnect(&mut self) -> bool {
        match self.try_disconnect().await {
            Ok(()) => true,
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "client did not disconnect");
                false
            }
        }
    }

    /// Closes the session, returning the cause on failure.
    ///
    /// The connector counts as disconnected afterwards even if the client
    /// reported an error. Resolved handles are kept but no longer usable.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::ConnectionFailure` if no session was ever opened
    /// or the client fails to close it.
    pub async fn try_disconnect(&mut self) -> Result<()> {
        let Some(session) = self.session else {
            return Err(BridgeError::connection_failure(
                self.endpoint.as_str(),
                "no session to close",
            ));
        };
        self.state = ConnectionState::Disconnected;

        self.call(self.client.close_session(session))
            .await
            .map_err(|e| BridgeError::connection_failure(self.endpoint.as_str(), e.to_string()))?;
        info!(endpoint = %self.endpoint, %session, "client disconnected");
        Ok(())
    }

    /// Runs `body` inside a session: connects, runs it, then always
    /// disconnects.
    ///
    /// # Errors
    ///
    /// Returns the connect error if the session cannot be established,
    /// otherwise whatever `body` returns. A failed disconnect is logged but
    /// does not replace the body's result.
    pub async fn session<T, F>(&mut self, body: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a Connector<C>) -> SessionFuture<'a, T>,
    {
        self.try_connect().await?;
        let outcome = body(&*self).await;
        self.disconnect().await;
        outcome
    }

    /// Checks the index and connection state and returns the node's handle.
    fn checked(&self, operation: &'static str, index: usize) -> Result<&NodeHandle> {
        let len = self.node_ids.len();
        let out_of_range = BridgeError::IndexOutOfRange {
            operation,
            index,
            len,
        };
        if index >= len {
            return Err(out_of_range);
        }
        if self.state != ConnectionState::Connected {
            return Err(BridgeError::NotConnected { operation });
        }
        self.registry.select(index).ok_or(out_of_range)
    }

    /// Returns the resolved handle for the node at `index`.
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange` if `index` has no identifier, `NotConnected` if the
    /// connector is not connected.
    pub fn select(&self, index: usize) -> Result<&NodeHandle> {
        self.checked("select node", index)
    }

    /// Reads the current value of the node at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `index` is out of range (`IndexOutOfRange`)
    /// - the connector is not connected (`NotConnected`)
    /// - the client rejects the read (`RemoteReadFailure`)
    ///
    /// Precondition failures make no client call.
    pub async fn read_value(&self, index: usize) -> Result<Variant> {
        let handle = self.checked("read value", index)?;
        let value = self
            .call(self.client.read_value(handle))
            .await
            .map_err(|source| BridgeError::RemoteReadFailure {
                index,
                node: handle.node_id().to_string(),
                source,
            })?;
        debug!(index, node = %handle.node_id(), %value, "read value");
        Ok(value)
    }

    /// Writes `value` to the node at `index`.
    ///
    /// # Errors
    ///
    /// Same preconditions as [`Connector::read_value`]; `RemoteWriteFailure`
    /// if the client rejects the write.
    pub async fn write_value(&self, index: usize, value: impl Into<Variant>) -> Result<()> {
        let handle = self.checked("write value", index)?;
        let value = value.into();
        debug!(index, node = %handle.node_id(), %value, "write value");
        self.call(self.client.write_value(handle, value))
            .await
            .map_err(|source| BridgeError::RemoteWriteFailure {
                index,
                node: handle.node_id().to_string(),
                source,
            })
    }
}

impl<C> Connector<C> {
    /// Returns the server endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns the node identifiers in index order.
    pub fn node_ids(&self) -> &[NodeId] {
        &self.node_ids
    }

    /// Number of configured nodes.
    pub fn len(&self) -> usize {
        self.node_ids.len()
    }

    /// Returns `true` if no nodes are configured.
    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns `true` while a session is open.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Returns the resolved handles. Empty until the first successful
    /// connect; kept after disconnect.
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C> std::fmt::Debug for Connector<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("endpoint", &self.endpoint)
            .field("node_ids", &self.node_ids)
            .field("state", &self.state)
            .field("session", &self.session)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::mock::MemoryClient;
    use crate::DEFAULT_ENDPOINT;

    fn two_nodes() -> MemoryClient {
        MemoryClient::new()
            .with_node("ns=2;i=2", "abcxyz")
            .with_node("ns=2;i=4", "12345")
    }

    fn config(ids: &[&str]) -> ConnectorConfig {
        ConnectorConfig::new(DEFAULT_ENDPOINT)
            .unwrap()
            .with_nodes(ids.iter().copied())
            .unwrap()
    }

    fn connector(client: MemoryClient) -> Connector<MemoryClient> {
        Connector::with_client(client, config(&["ns=2;i=2", "ns=2;i=4"]))
    }

    #[test]
    fn test_construction_does_not_contact_server() {
        let c = connector(two_nodes());

        assert_eq!(c.state(), ConnectionState::Idle);
        assert_eq!(c.len(), 2);
        assert_eq!(c.endpoint().as_str(), DEFAULT_ENDPOINT);
        assert_eq!(c.client().sessions_opened(), 0);
        assert_eq!(c.client().total_calls(), 0);
    }

    #[test]
    fn test_new_with_default_client() {
        let c: Connector<MemoryClient> = Connector::new(config(&[]));
        assert!(c.is_empty());
        assert!(!c.is_connected());
    }

    #[test_log::test(tokio::test)]
    async fn test_connect_resolves_in_order() {
        let client = MemoryClient::new().with_node("b", 2).with_node("a", 1);
        let mut c = Connector::with_client(client, config(&["a", "b"]));

        assert!(c.connect().await);
        assert!(c.is_connected());
        assert_eq!(c.client().resolve_calls(), 2);
        assert_eq!(c.select(0).unwrap().node_id().as_str(), "a");
        assert_eq!(c.select(1).unwrap().node_id().as_str(), "b");
        assert_eq!(c.read_value(1).await.unwrap(), Variant::Int64(2));
    }

    #[test_log::test(tokio::test)]
    async fn test_connect_then_disconnect_leaves_no_session() {
        let mut c = connector(two_nodes());

        assert!(c.connect().await);
        assert_eq!(c.client().open_sessions(), 1);
        assert!(c.disconnect().await);
        assert_eq!(c.client().open_sessions(), 0);
        assert_eq!(c.state(), ConnectionState::Disconnected);
        assert_eq!(c.registry().len(), 2);

        // Redundant teardown is reported, not fatal.
        assert!(!c.disconnect().await);
        assert_eq!(c.client().sessions_closed(), 1);
        assert_eq!(c.client().open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_connect_twice_is_noop() {
        let mut c = connector(two_nodes());

        assert!(c.connect().await);
        assert!(c.connect().await);
        assert_eq!(c.client().sessions_opened(), 1);
    }

    #[tokio::test]
    async fn test_connect_after_disconnect_fails() {
        let mut c = connector(two_nodes());
        assert!(c.connect().await);
        assert!(c.disconnect().await);

        let err = c.try_connect().await.unwrap_err();
        assert!(matches!(err, BridgeError::ConnectionFailure { .. }));
        assert_eq!(c.client().sessions_opened(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_connect_failure_is_reported() {
        let client = two_nodes().refusing_sessions("BadTcpEndpointUrlInvalid");
        let mut c = connector(client);

        assert!(!c.connect().await);
        assert_eq!(c.state(), ConnectionState::Idle);

        let err = c.try_connect().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Connection failure on opc.tcp://localhost:4840: Request rejected: BadTcpEndpointUrlInvalid"
        );
    }

    #[tokio::test]
    async fn test_unresolvable_node_closes_session() {
        let mut c = Connector::with_client(two_nodes(), config(&["ns=2;i=2", "ns=2;i=99"]));

        let err = c.try_connect().await.unwrap_err();
        assert!(err.to_string().contains("cannot resolve node ns=2;i=99"));
        assert!(!c.is_connected());
        assert_eq!(c.client().open_sessions(), 0);
        assert!(matches!(
            c.read_value(0).await,
            Err(BridgeError::NotConnected { .. })
        ));
    }

    #[tokio::test]
    async fn test_disconnect_before_connect_reports_failure() {
        let mut c = connector(two_nodes());
        assert!(!c.disconnect().await);
        assert_eq!(c.client().sessions_closed(), 0);
    }

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let mut c = connector(two_nodes());
        assert!(c.connect().await);

        for index in 0..c.len() {
            let value = Variant::Int64(100 * (index as i64 + 1));
            c.write_value(index, value.clone()).await.unwrap();
            assert_eq!(c.read_value(index).await.unwrap(), value);
        }
        assert_eq!(c.client().value_of("ns=2;i=4"), Some(Variant::Int64(200)));
    }

    #[tokio::test]
    async fn test_out_of_range_makes_no_client_call() {
        let mut c = connector(two_nodes());
        assert!(c.connect().await);
        let calls = c.client().total_calls();

        for index in [2, 3, usize::MAX] {
            assert!(matches!(
                c.read_value(index).await,
                Err(BridgeError::IndexOutOfRange { index: i, len: 2, .. }) if i == index
            ));
            assert!(matches!(
                c.write_value(index, 1).await,
                Err(BridgeError::IndexOutOfRange { .. })
            ));
        }
        assert!(matches!(
            c.select(2),
            Err(BridgeError::IndexOutOfRange { .. })
        ));
        assert_eq!(c.client().total_calls(), calls);
    }

    #[tokio::test]
    async fn test_io_before_connect_is_not_connected() {
        let c = connector(two_nodes());

        assert!(matches!(
            c.read_value(0).await,
            Err(BridgeError::NotConnected { operation: "read value" })
        ));
        assert!(matches!(
            c.write_value(1, 5).await,
            Err(BridgeError::NotConnected { operation: "write value" })
        ));
        assert!(matches!(c.select(0), Err(BridgeError::NotConnected { .. })));
        assert_eq!(c.client().total_calls(), 0);
    }

    #[tokio::test]
    async fn test_io_after_disconnect_is_not_connected() {
        let mut c = connector(two_nodes());
        assert!(c.connect().await);
        assert!(c.disconnect().await);
        let calls = c.client().total_calls();

        assert!(matches!(
            c.write_value(0, 5).await,
            Err(BridgeError::NotConnected { .. })
        ));
        assert_eq!(c.client().total_calls(), calls);
    }

    #[tokio::test]
    async fn test_remote_write_failure_names_node() {
        let client = MemoryClient::new()
            .with_node("ns=2;i=2", 0)
            .with_read_only_node("ns=2;i=4", 0);
        let mut c = connector(client);
        assert!(c.connect().await);

        let err = c.write_value(1, 9).await.unwrap_err();
        assert_eq!(err.index(), Some(1));
        assert_eq!(
            err.to_string(),
            "Write to node ns=2;i=4 (index 1) failed: Request rejected: BadNotWritable"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_maps_to_remote_failure() {
        let client = two_nodes().with_latency("ns=2;i=2", Duration::from_secs(10));
        let mut c = Connector::with_client(
            client,
            config(&["ns=2;i=2", "ns=2;i=4"]).with_timeout(Duration::from_secs(1)),
        );
        assert!(c.connect().await);

        let err = c.read_value(0).await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::RemoteReadFailure {
                index: 0,
                source: ClientError::Timeout,
                ..
            }
        ));
        assert_eq!(c.read_value(1).await.unwrap(), Variant::from("12345"));
    }

    #[tokio::test]
    async fn test_session_always_disconnects() {
        let mut c = connector(two_nodes());

        let result: Result<()> = c
            .session(|c| {
                Box::pin(async move {
                    c.write_value(0, 1).await?;
                    c.write_value(7, 1).await
                })
            })
            .await;

        assert!(matches!(result, Err(BridgeError::IndexOutOfRange { .. })));
        assert_eq!(c.state(), ConnectionState::Disconnected);
        assert_eq!(c.client().open_sessions(), 0);
        assert_eq!(c.client().value_of("ns=2;i=2"), Some(Variant::Int64(1)));
    }

    #[tokio::test]
    async fn test_session_connect_failure_skips_body() {
        let mut c = connector(two_nodes().refusing_sessions("down"));

        let result = c
            .session(|c| Box::pin(async move { c.read_value(0).await }))
            .await;

        assert!(matches!(result, Err(BridgeError::ConnectionFailure { .. })));
        assert_eq!(c.client().read_calls(), 0);
    }

    #[tokio::test]
    async fn test_shared_client_through_arc() {
        let client = Arc::new(two_nodes());
        let mut c = Connector::with_client(Arc::clone(&client), config(&["ns=2;i=2", "ns=2;i=4"]));

        assert!(c.connect().await);
        c.write_value(0, true).await.unwrap();
        assert_eq!(client.value_of("ns=2;i=2"), Some(Variant::Boolean(true)));
        assert!(c.disconnect().await);
        assert_eq!(client.open_sessions(), 0);
    }

    #[test]
    fn test_connector_debug() {
        let c = connector(two_nodes());
        let debug_str = format!("{:?}", c);
        assert!(debug_str.contains("Connector"));
        assert!(debug_str.contains("ns=2;i=4"));
    }
}
