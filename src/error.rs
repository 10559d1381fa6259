//! Error types for the bridge.
//!
//! Every failure names the operation it belongs to and, where one exists,
//! the node index or identifier it concerns. Precondition failures
//! ([`BridgeError::NotConnected`], [`BridgeError::IndexOutOfRange`],
//! [`BridgeError::LengthMismatch`], [`BridgeError::InvalidArity`],
//! [`BridgeError::DuplicateIndex`], [`BridgeError::NoConnector`]) are always
//! returned before any call reaches the OPC UA client.

use std::io;
use thiserror::Error;

use crate::client::ClientError;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors that can occur while synchronizing values with an OPC UA server.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Session establishment or teardown failed.
    #[error("Connection failure on {endpoint}: {reason}")]
    ConnectionFailure {
        /// Endpoint the session was opened against.
        endpoint: String,
        /// Description of what went wrong.
        reason: String,
    },

    /// An operation needing an active session ran before `connect` succeeded
    /// or after `disconnect`.
    #[error("Not connected: cannot {operation}")]
    NotConnected {
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// A node index has no corresponding node identifier.
    #[error("Index out of range in {operation}: index {index}, node count {len}")]
    IndexOutOfRange {
        /// Operation that was attempted.
        operation: &'static str,
        /// Requested index.
        index: usize,
        /// Number of configured nodes.
        len: usize,
    },

    /// Value and index sequences have different lengths.
    #[error("Length mismatch: {values} values for {indices} indices")]
    LengthMismatch {
        /// Number of values supplied.
        values: usize,
        /// Number of indices supplied.
        indices: usize,
    },

    /// Wrong number or shape of values/indices for an operation.
    #[error("Invalid arity in {operation}: expected {expected}, found {found}")]
    InvalidArity {
        /// Operation that was attempted.
        operation: &'static str,
        /// Description of the expected shape.
        expected: String,
        /// Description of what was supplied.
        found: String,
    },

    /// The same node index appears more than once in one batch.
    #[error("Duplicate index {index} in batch write")]
    DuplicateIndex {
        /// Repeated index.
        index: usize,
    },

    /// A model attempted I/O without a connector.
    #[error("Model '{model}' has no connector")]
    NoConnector {
        /// Name of the model.
        model: String,
    },

    /// The client rejected a read on a resolved, in-range node.
    #[error("Read of node {node} (index {index}) failed: {source}")]
    RemoteReadFailure {
        /// Node index.
        index: usize,
        /// Node identifier.
        node: String,
        /// Underlying client error.
        #[source]
        source: ClientError,
    },

    /// The client rejected a write on a resolved, in-range node.
    #[error("Write to node {node} (index {index}) failed: {source}")]
    RemoteWriteFailure {
        /// Node index.
        index: usize,
        /// Node identifier.
        node: String,
        /// Underlying client error.
        #[source]
        source: ClientError,
    },

    /// One or more writes of a concurrent batch failed.
    ///
    /// Writes that succeeded are not rolled back.
    #[error("Batch write failed for {}", summarize(failures))]
    BatchFailure {
        /// The individual failures, in launch order.
        failures: Vec<BridgeError>,
    },

    /// Invalid configuration value.
    #[error("Invalid config '{parameter}': {reason}")]
    InvalidConfig {
        /// Name of the offending parameter.
        parameter: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The output payload document could not be interpreted.
    #[error("Invalid payload: {reason}")]
    Payload {
        /// Description of the problem.
        reason: String,
    },

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error while reading or writing a payload file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn summarize(failures: &[BridgeError]) -> String {
    failures
        .iter()
        .map(|f| match f.index() {
            Some(index) => format!("index {index}"),
            None => f.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl BridgeError {
    /// Creates a new `ConnectionFailure` error.
    ///
    /// # Example
    ///
    /// ```
    /// use opcua_bridge::BridgeError;
    ///
    /// let err = BridgeError::connection_failure("opc.tcp://localhost:4840", "refused");
    /// assert!(err.to_string().contains("opc.tcp://localhost:4840"));
    /// ```
    pub fn connection_failure(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConnectionFailure {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `InvalidArity` error.
    pub fn invalid_arity(
        operation: &'static str,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::InvalidArity {
            operation,
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Creates a new `InvalidConfig` error.
    ///
    /// # Example
    ///
    /// ```
    /// use opcua_bridge::BridgeError;
    ///
    /// let err = BridgeError::invalid_config("endpoint", "must not be empty");
    /// ```
    pub fn invalid_config(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `Payload` error.
    pub fn payload(reason: impl Into<String>) -> Self {
        Self::Payload {
            reason: reason.into(),
        }
    }

    /// Returns the node index this error concerns, if any.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::IndexOutOfRange { index, .. }
            | Self::DuplicateIndex { index }
            | Self::RemoteReadFailure { index, .. }
            | Self::RemoteWriteFailure { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Returns the indices that failed in a `BatchFailure`, in launch order.
    ///
    /// Empty for every other variant.
    pub fn failed_indices(&self) -> Vec<usize> {
        match self {
            Self::BatchFailure { failures } => failures.iter().filter_map(Self::index).collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_failure_display() {
        let err = BridgeError::connection_failure("opc.tcp://localhost:4840", "refused");
        assert_eq!(
            err.to_string(),
            "Connection failure on opc.tcp://localhost:4840: refused"
        );
    }

    #[test]
    fn test_index_out_of_range_display() {
        let err = BridgeError::IndexOutOfRange {
            operation: "read value",
            index: 5,
            len: 2,
        };
        assert_eq!(
            err.to_string(),
            "Index out of range in read value: index 5, node count 2"
        );
        assert_eq!(err.index(), Some(5));
    }

    #[test]
    fn test_remote_write_failure_names_node() {
        let err = BridgeError::RemoteWriteFailure {
            index: 1,
            node: "ns=2;i=4".to_string(),
            source: ClientError::rejected("BadNotWritable"),
        };
        assert_eq!(
            err.to_string(),
            "Write to node ns=2;i=4 (index 1) failed: Request rejected: BadNotWritable"
        );
    }

    #[test]
    fn test_batch_failure_lists_indices() {
        let err = BridgeError::BatchFailure {
            failures: vec![
                BridgeError::RemoteWriteFailure {
                    index: 0,
                    node: "a".to_string(),
                    source: ClientError::Timeout,
                },
                BridgeError::RemoteWriteFailure {
                    index: 2,
                    node: "c".to_string(),
                    source: ClientError::Timeout,
                },
            ],
        };
        assert_eq!(err.failed_indices(), vec![0, 2]);
        assert_eq!(err.to_string(), "Batch write failed for index 0, index 2");
    }

    #[test]
    fn test_failed_indices_empty_for_other_variants() {
        let err = BridgeError::NoConnector {
            model: "CC".to_string(),
        };
        assert!(err.failed_indices().is_empty());
        assert_eq!(err.to_string(), "Model 'CC' has no connector");
    }
}
