//! # OPC UA Model Bridge
//!
//! A Rust library for writing application model outputs (classification
//! results, counts, coordinates) onto variables of an OPC UA server.
//!
//! This is a **synchronization core** only. The wire protocol, security
//! handshake, and sessions belong to an OPC UA client library plugged in
//! through the [`OpcUaClient`] trait. Each read or write produces exactly one
//! client call. No automatic retries, caching, or reconnection.
//!
//! ## Features
//!
//! - **Connector** - one session plus an indexed registry of nodes, resolved
//!   only after the session is open
//! - **Model** - sends one value to one node, or a list of values to a list
//!   of nodes concurrently
//! - **Explicit errors** - every failure is a distinct [`BridgeError`] naming
//!   the operation and node
//! - **Testable** - [`MemoryClient`] stands in for a server in tests and demos
//!
//! ## Quick Start
//!
//! ```
//! use opcua_bridge::{Connector, ConnectorConfig, MemoryClient, Model};
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! # rt.block_on(async {
//! let client = MemoryClient::new()
//!     .with_node("ns=2;i=2", "abcxyz")
//!     .with_node("ns=2;i=4", "12345");
//!
//! let config = ConnectorConfig::new("opc.tcp://localhost:4840")?
//!     .with_nodes(["ns=2;i=2", "ns=2;i=4"])?;
//! let mut connector = Connector::with_client(client, config);
//!
//! if connector.connect().await {
//!     let model = Model::attached("CC", &connector);
//!
//!     // One value to one node
//!     model.send(100, 0).await?;
//!
//!     // Two values to two nodes, written concurrently
//!     model.send(vec![100, 200], [0, 1]).await?;
//!
//!     println!("ns=2;i=4 = {}", connector.read_value(1).await?);
//! }
//! connector.disconnect().await;
//! # Ok::<(), opcua_bridge::BridgeError>(())
//! # }).unwrap();
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, BridgeError>`](Result). Precondition
//! failures are reported before any call reaches the server:
//!
//! ```
//! use opcua_bridge::{BridgeError, Connector, ConnectorConfig, MemoryClient};
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! # rt.block_on(async {
//! let config = ConnectorConfig::new("opc.tcp://localhost:4840")?.with_node("ns=2;i=2")?;
//! let connector = Connector::with_client(MemoryClient::new(), config);
//!
//! match connector.read_value(0).await {
//!     Err(BridgeError::NotConnected { operation }) => println!("cannot {operation} yet"),
//!     Err(BridgeError::IndexOutOfRange { index, len, .. }) => {
//!         println!("index {index} outside 0..{len}")
//!     }
//!     Err(e) => println!("Error: {e}"),
//!     Ok(value) => println!("Value: {value}"),
//! }
//! # Ok::<(), BridgeError>(())
//! # }).unwrap();
//! ```
//!
//! ## Logging
//!
//! The library emits [`tracing`] events (session lifecycle at `info`,
//! individual reads/writes at `debug`, failures at `warn`/`error`) and never
//! installs a subscriber itself.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod client;
mod config;
mod connector;
mod error;
mod mock;
mod model;
mod node;
pub mod payload;
mod value;

// Public re-exports
pub use client::{ClientError, OpcUaClient, SessionId};
pub use config::{ConnectorConfig, Endpoint, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
pub use connector::{ConnectionState, Connector, SessionFuture};
pub use error::{BridgeError, Result};
pub use mock::MemoryClient;
pub use model::Model;
pub use node::{NodeHandle, NodeId, NodeRegistry};
pub use payload::OutputRecord;
pub use value::{Message, Target, Variant};
