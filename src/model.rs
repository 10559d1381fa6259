//! Mapping of model outputs onto node writes.
//!
//! A [`Model`] borrows a [`Connector`] and turns a [`Message`] plus a
//! [`Target`] into indexed writes:
//!
//! | Message | Target | Result |
//! |---------|--------|--------|
//! | scalar | one index | one write |
//! | sequence of N | N indices | N concurrent writes, awaited together |
//! | sequence of N | M != N indices | `LengthMismatch`, no writes |
//! | anything | unspecified | `InvalidArity`, no writes |
//!
//! All shape and index checks happen before the first write is issued.
//! Batch writes are not transactional: when some fail, the ones that
//! succeeded stay written and the error lists the failed indices.

use std::collections::HashSet;

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::client::OpcUaClient;
use crate::connector::Connector;
use crate::error::{BridgeError, Result};
use crate::value::{Message, Target, Variant};

/// Application model whose outputs are written to OPC UA nodes.
///
/// The name is only used for labelling and logs.
pub struct Model<'c, C> {
    name: String,
    connector: Option<&'c Connector<C>>,
}

impl<'c, C: OpcUaClient> Model<'c, C> {
    /// Creates a model, optionally attached to a connector.
    ///
    /// Without a connector every [`Model::send`] fails with `NoConnector`.
    pub fn new(name: impl Into<String>, connector: Option<&'c Connector<C>>) -> Self {
        Self {
            name: name.into(),
            connector,
        }
    }

    /// Creates a model attached to `connector`.
    pub fn attached(name: impl Into<String>, connector: &'c Connector<C>) -> Self {
        Self::new(name, Some(connector))
    }

    /// Creates a model with no connector.
    pub fn detached(name: impl Into<String>) -> Self {
        Self::new(name, None)
    }

    /// Sends `message` to the node(s) in `target`.
    ///
    /// A scalar goes to a single index. A sequence goes pairwise to an
    /// equally long list of indices; the writes run concurrently and this
    /// call returns once every one of them has settled.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the model has no connector (`NoConnector`)
    /// - `target` is unspecified or its shape does not match the message
    ///   (`InvalidArity`)
    /// - value and index counts differ (`LengthMismatch`)
    /// - an index is out of range or repeated (`IndexOutOfRange`,
    ///   `DuplicateIndex`)
    /// - the connector is not connected (`NotConnected`)
    /// - a single write fails (`RemoteWriteFailure`) or any write of a batch
    ///   fails (`BatchFailure`)
    ///
    /// # Example
    ///
    /// ```
    /// use opcua_bridge::{Connector, ConnectorConfig, MemoryClient, Model};
    ///
    /// # let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    /// # rt.block_on(async {
    /// let client = MemoryClient::new().with_node("ns=2;i=2", 0).with_node("ns=2;i=4", 0);
    /// let config = ConnectorConfig::new("opc.tcp://localhost:4840")?
    ///     .with_nodes(["ns=2;i=2", "ns=2;i=4"])?;
    /// let mut connector = Connector::with_client(client, config);
    /// assert!(connector.connect().await);
    ///
    /// let model = Model::attached("CC", &connector);
    /// model.send(vec![100, 200], [0, 1]).await?;
    /// model.send(7, 1).await?;
    ///
    /// assert_eq!(connector.read_value(1).await?.as_i64(), Some(7));
    /// # Ok::<(), opcua_bridge::BridgeError>(())
    /// # }).unwrap();
    /// ```
    pub async fn send(&self, message: impl Into<Message>, target: impl Into<Target>) -> Result<()> {
        let connector = self.connector.ok_or_else(|| BridgeError::NoConnector {
            model: self.name.clone(),
        })?;

        match (message.into(), target.into()) {
            (_, Target::Unspecified) => Err(BridgeError::invalid_arity(
                "send",
                "an explicit node index",
                Target::Unspecified.describe(),
            )),
            (Message::Scalar(value), Target::Index(index)) => {
                debug!(model = %self.name, index, %value, "sending value");
                connector.write_value(index, value).await
            }
            (Message::Sequence(values), Target::Indices(indices)) => {
                self.send_batch(connector, values, indices).await
            }
            (message, target) => Err(BridgeError::invalid_arity(
                "send",
                "a scalar with one index, or a sequence with a sequence of indices",
                format!("{} with {}", message.describe(), target.describe()),
            )),
        }
    }

    async fn send_batch(
        &self,
        connector: &Connector<C>,
        values: Vec<Variant>,
        indices: Vec<usize>,
    ) -> Result<()> {
        if values.len() != indices.len() {
            return Err(BridgeError::LengthMismatch {
                values: values.len(),
                indices: indices.len(),
            });
        }

        let len = connector.len();
        let mut seen = HashSet::with_capacity(indices.len());
        for &index in &indices {
            if index >= len {
                return Err(BridgeError::IndexOutOfRange {
                    operation: "send",
                    index,
                    len,
                });
            }
            if !seen.insert(index) {
                return Err(BridgeError::DuplicateIndex { index });
            }
        }
        if !connector.is_connected() {
            return Err(BridgeError::NotConnected { operation: "send" });
        }

        debug!(model = %self.name, writes = indices.len(), "sending batch");
        let writes = values
            .into_iter()
            .zip(indices)
            .map(|(value, index)| connector.write_value(index, value));

        let failures: Vec<BridgeError> = join_all(writes)
            .await
            .into_iter()
            .filter_map(|outcome| outcome.err())
            .collect();

        if failures.is_empty() {
            return Ok(());
        }
        let err = BridgeError::BatchFailure { failures };
        warn!(model = %self.name, failed = ?err.failed_indices(), "batch write incomplete");
        Err(err)
    }

    /// Sends a coordinate pair to two nodes.
    ///
    /// # Errors
    ///
    /// `InvalidArity` unless `coordinate` is a sequence of exactly two values
    /// and `indices` holds exactly two indices; otherwise as [`Model::send`].
    pub async fn send_coord(
        &self,
        coordinate: impl Into<Message>,
        indices: impl Into<Target>,
    ) -> Result<()> {
        let coordinate = coordinate.into();
        let indices = indices.into();

        if !matches!(&coordinate, Message::Sequence(values) if values.len() == 2) {
            return Err(BridgeError::invalid_arity(
                "send coordinate",
                "a sequence of 2 values",
                coordinate.describe(),
            ));
        }
        if !matches!(&indices, Target::Indices(i) if i.len() == 2) {
            return Err(BridgeError::invalid_arity(
                "send coordinate",
                "a sequence of 2 indices",
                indices.describe(),
            ));
        }
        self.send(coordinate, indices).await
    }

    /// Returns the model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the attached connector, if any.
    pub fn connector(&self) -> Option<&'c Connector<C>> {
        self.connector
    }
}

impl<C> std::fmt::Debug for Model<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("connector", &self.connector.map(|c| c.endpoint().as_str()))
            .finish()
    }
}
