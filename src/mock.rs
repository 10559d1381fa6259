//! In-memory [`OpcUaClient`] for tests and demos.
//!
//! [`MemoryClient`] behaves like a small local server with a fixed set of
//! writable variables. Written values are stored and read back verbatim,
//! every call is counted, and failures or latency can be injected per node.
//!
//! # Example
//!
//! ```
//! use opcua_bridge::{Connector, ConnectorConfig, MemoryClient};
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! # rt.block_on(async {
//! let client = MemoryClient::new()
//!     .with_node("ns=2;i=2", "abcxyz")
//!     .with_node("ns=2;i=4", "12345");
//! let config = ConnectorConfig::new("opc.tcp://localhost:4840")?
//!     .with_nodes(["ns=2;i=2", "ns=2;i=4"])?;
//!
//! let mut connector = Connector::with_client(client, config);
//! assert!(connector.connect().await);
//! connector.write_value(0, 100).await?;
//! assert_eq!(connector.read_value(0).await?.as_i64(), Some(100));
//! connector.disconnect().await;
//! # Ok::<(), opcua_bridge::BridgeError>(())
//! # }).unwrap();
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::client::{ClientError, OpcUaClient, SessionId};
use crate::node::{NodeHandle, NodeId};
use crate::value::Variant;
use crate::Endpoint;

#[derive(Debug)]
struct Variable {
    id: String,
    value: Variant,
    writable: bool,
    reject_writes: Option<String>,
    latency: Option<Duration>,
}

#[derive(Debug, Default)]
struct State {
    variables: Vec<Variable>,
    open_sessions: HashSet<u64>,
    next_session: u64,
    write_log: Vec<String>,
}

/// Deterministic in-memory OPC UA client.
#[derive(Debug, Default)]
pub struct MemoryClient {
    state: Mutex<State>,
    refuse_sessions: Option<String>,
    sessions_opened: AtomicUsize,
    sessions_closed: AtomicUsize,
    resolves: AtomicUsize,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryClient {
    /// Creates a client with no variables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a writable variable with an initial value.
    pub fn with_node(self, id: &str, initial: impl Into<Variant>) -> Self {
        self.add_variable(id, initial.into(), true)
    }

    /// Adds a variable whose writes fail with `BadNotWritable`.
    pub fn with_read_only_node(self, id: &str, initial: impl Into<Variant>) -> Self {
        self.add_variable(id, initial.into(), false)
    }

    /// Makes writes to `id` fail with the given reason.
    pub fn failing_writes(self, id: &str, reason: &str) -> Self {
        self.update(id, |var| var.reject_writes = Some(reason.to_string()))
    }

    /// Delays every read and write of `id`.
    pub fn with_latency(self, id: &str, latency: Duration) -> Self {
        self.update(id, |var| var.latency = Some(latency))
    }

    /// Makes every `open_session` call fail with the given reason.
    pub fn refusing_sessions(mut self, reason: &str) -> Self {
        self.refuse_sessions = Some(reason.to_string());
        self
    }

    fn add_variable(self, id: &str, value: Variant, writable: bool) -> Self {
        self.lock().variables.push(Variable {
            id: id.to_string(),
            value,
            writable,
            reject_writes: None,
            latency: None,
        });
        self
    }

    fn update(self, id: &str, f: impl FnOnce(&mut Variable)) -> Self {
        if let Some(var) = self.lock().variables.iter_mut().find(|v| v.id == id) {
            f(var);
        }
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the stored value of `id`.
    pub fn value_of(&self, id: &str) -> Option<Variant> {
        self.lock()
            .variables
            .iter()
            .find(|v| v.id == id)
            .map(|v| v.value.clone())
    }

    /// Node ids in the order their writes completed.
    pub fn write_log(&self) -> Vec<String> {
        self.lock().write_log.clone()
    }

    /// Number of sessions currently open.
    pub fn open_sessions(&self) -> usize {
        self.lock().open_sessions.len()
    }

    /// Number of successful `open_session` calls.
    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened.load(Ordering::SeqCst)
    }

    /// Number of successful `close_session` calls.
    pub fn sessions_closed(&self) -> usize {
        self.sessions_closed.load(Ordering::SeqCst)
    }

    /// Number of `resolve` calls.
    pub fn resolve_calls(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }

    /// Number of `read_value` calls.
    pub fn read_calls(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `write_value` calls.
    pub fn write_calls(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Total number of calls of any kind, excluding session teardown.
    pub fn total_calls(&self) -> usize {
        self.resolve_calls() + self.read_calls() + self.write_calls()
    }

    /// Looks up a handle's variable, checking that a session is open.
    fn latency_for(&self, handle: &NodeHandle) -> Result<Option<Duration>, ClientError> {
        let state = self.lock();
        if state.open_sessions.is_empty() {
            return Err(ClientError::SessionClosed);
        }
        state
            .variables
            .get(handle.token() as usize)
            .map(|v| v.latency)
            .ok_or_else(|| ClientError::UnknownNode(handle.node_id().to_string()))
    }
}

#[async_trait]
impl OpcUaClient for MemoryClient {
    async fn open_session(&self, _endpoint: &Endpoint) -> Result<SessionId, ClientError> {
        if let Some(reason) = &self.refuse_sessions {
            return Err(ClientError::rejected(reason.clone()));
        }
        let mut state = self.lock();
        state.next_session += 1;
        let id = state.next_session;
        state.open_sessions.insert(id);
        self.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(SessionId(id))
    }

    async fn close_session(&self, session: SessionId) -> Result<(), ClientError> {
        if !self.lock().open_sessions.remove(&session.0) {
            return Err(ClientError::SessionClosed);
        }
        self.sessions_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn resolve(&self, session: SessionId, node: &NodeId) -> Result<NodeHandle, ClientError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        let state = self.lock();
        if !state.open_sessions.contains(&session.0) {
            return Err(ClientError::SessionClosed);
        }
        state
            .variables
            .iter()
            .position(|v| v.id == node.as_str())
            .map(|pos| NodeHandle::new(node.clone(), pos as u64))
            .ok_or_else(|| ClientError::UnknownNode(node.to_string()))
    }

    async fn read_value(&self, handle: &NodeHandle) -> Result<Variant, ClientError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency_for(handle)? {
            tokio::time::sleep(latency).await;
        }
        self.lock()
            .variables
            .get(handle.token() as usize)
            .map(|v| v.value.clone())
            .ok_or_else(|| ClientError::UnknownNode(handle.node_id().to_string()))
    }

    async fn write_value(&self, handle: &NodeHandle, value: Variant) -> Result<(), ClientError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency_for(handle)? {
            tokio::time::sleep(latency).await;
        }
        let mut state = self.lock();
        let var = state
            .variables
            .get_mut(handle.token() as usize)
            .ok_or_else(|| ClientError::UnknownNode(handle.node_id().to_string()))?;
        if !var.writable {
            return Err(ClientError::rejected("BadNotWritable"));
        }
        if let Some(reason) = &var.reject_writes {
            return Err(ClientError::rejected(reason.clone()));
        }
        var.value = value;
        let id = var.id.clone();
        state.write_log.push(id);
        Ok(())
    }
}
