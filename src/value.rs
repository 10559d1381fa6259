//! Values written to and read from nodes, and the shapes a model sends.
//!
//! - [`Variant`] is one scalar node value.
//! - [`Message`] is what a model sends: a single value or an ordered list.
//! - [`Target`] says which node index (or indices) a message goes to.
//!
//! # Example
//!
//! ```
//! use opcua_bridge::{Message, Target, Variant};
//!
//! let single = Message::from(42);
//! assert_eq!(single, Message::Scalar(Variant::Int64(42)));
//!
//! let pair = Message::from(vec![100, 200]);
//! assert_eq!(pair.len(), 2);
//!
//! assert_eq!(Target::from([0, 1]), Target::Indices(vec![0, 1]));
//! assert_eq!(Target::from(None), Target::Unspecified);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// A scalar node value.
///
/// Serializes as a bare JSON scalar (`true`, `3`, `2.5`, `"abc"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Variant {
    /// Boolean value.
    Boolean(bool),
    /// Signed 64-bit integer.
    Int64(i64),
    /// 64-bit float.
    Double(f64),
    /// UTF-8 string.
    String(String),
}

impl Variant {
    /// Returns the name of the variant's data type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Variant::Boolean(_) => "Boolean",
            Variant::Int64(_) => "Int64",
            Variant::Double(_) => "Double",
            Variant::String(_) => "String",
        }
    }

    /// Returns the value as `i64` if it is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Variant::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as `f64` if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Variant::Int64(v) => Some(*v as f64),
            Variant::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as `&str` if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::String(v) => Some(v),
            _ => None,
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Variant::Boolean(v) => write!(f, "{v}"),
            Variant::Int64(v) => write!(f, "{v}"),
            Variant::Double(v) => write!(f, "{v}"),
            Variant::String(v) => write!(f, "{v:?}"),
        }
    }
}

impl TryFrom<serde_json::Value> for Variant {
    type Error = BridgeError;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        use serde_json::Value;

        match value {
            Value::Bool(b) => Ok(Variant::Boolean(b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Variant::Int64(i)),
                None => n
                    .as_f64()
                    .map(Variant::Double)
                    .ok_or_else(|| BridgeError::payload(format!("unsupported number {n}"))),
            },
            Value::String(s) => Ok(Variant::String(s)),
            Value::Null => Err(BridgeError::payload("null is not a node value")),
            Value::Array(_) => Err(BridgeError::payload("nested arrays are not node values")),
            Value::Object(_) => Err(BridgeError::payload("objects are not node values")),
        }
    }
}

/// Values a model sends in one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    /// One value, written to one node.
    Scalar(Variant),
    /// Ordered values, written pairwise to an equally long list of nodes.
    Sequence(Vec<Variant>),
}

impl Message {
    /// Number of values carried.
    pub fn len(&self) -> usize {
        match self {
            Message::Scalar(_) => 1,
            Message::Sequence(values) => values.len(),
        }
    }

    /// Returns `true` for an empty sequence.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            Message::Scalar(_) => "a scalar value".to_string(),
            Message::Sequence(values) => format!("a sequence of {} values", values.len()),
        }
    }
}

impl From<Variant> for Message {
    fn from(value: Variant) -> Self {
        Message::Scalar(value)
    }
}

impl From<Vec<Variant>> for Message {
    fn from(values: Vec<Variant>) -> Self {
        Message::Sequence(values)
    }
}

/// Decodes a model output document value.
///
/// Scalars become [`Message::Scalar`], arrays of scalars become
/// [`Message::Sequence`]. `null`, objects, and nested arrays are rejected.
impl TryFrom<serde_json::Value> for Message {
    type Error = BridgeError;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(Variant::try_from)
                .collect::<Result<Vec<_>>>()
                .map(Message::Sequence),
            other => Variant::try_from(other).map(Message::Scalar),
        }
    }
}

macro_rules! scalar_conversions {
    ($($ty:ty => $variant:ident as $as:ty),* $(,)?) => {
        $(
            impl From<$ty> for Variant {
                fn from(value: $ty) -> Self {
                    Variant::$variant(value as $as)
                }
            }

            impl From<$ty> for Message {
                fn from(value: $ty) -> Self {
                    Message::Scalar(Variant::from(value))
                }
            }

            impl From<Vec<$ty>> for Message {
                fn from(values: Vec<$ty>) -> Self {
                    Message::Sequence(values.into_iter().map(Variant::from).collect())
                }
            }
        )*
    };
}

scalar_conversions! {
    bool => Boolean as bool,
    i16 => Int64 as i64,
    i32 => Int64 as i64,
    i64 => Int64 as i64,
    u16 => Int64 as i64,
    u32 => Int64 as i64,
    f32 => Double as f64,
    f64 => Double as f64,
}

impl From<String> for Variant {
    fn from(value: String) -> Self {
        Variant::String(value)
    }
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::String(value.to_string())
    }
}

impl From<String> for Message {
    fn from(value: String) -> Self {
        Message::Scalar(Variant::String(value))
    }
}

impl From<&str> for Message {
    fn from(value: &str) -> Self {
        Message::Scalar(Variant::from(value))
    }
}

impl From<Vec<String>> for Message {
    fn from(values: Vec<String>) -> Self {
        Message::Sequence(values.into_iter().map(Variant::String).collect())
    }
}

impl From<Vec<&str>> for Message {
    fn from(values: Vec<&str>) -> Self {
        Message::Sequence(values.into_iter().map(Variant::from).collect())
    }
}

/// Node index or indices a message is sent to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Target {
    /// No index given. Always rejected by [`Model::send`](crate::Model::send).
    #[default]
    Unspecified,
    /// A single node index.
    Index(usize),
    /// Ordered node indices, one per message value.
    Indices(Vec<usize>),
}

impl Target {
    pub(crate) fn describe(&self) -> String {
        match self {
            Target::Unspecified => "no index".to_string(),
            Target::Index(_) => "a single index".to_string(),
            Target::Indices(indices) => format!("a sequence of {} indices", indices.len()),
        }
    }
}

impl From<usize> for Target {
    fn from(index: usize) -> Self {
        Target::Index(index)
    }
}

impl From<Option<usize>> for Target {
    fn from(index: Option<usize>) -> Self {
        index.map_or(Target::Unspecified, Target::Index)
    }
}

impl From<Vec<usize>> for Target {
    fn from(indices: Vec<usize>) -> Self {
        Target::Indices(indices)
    }
}

impl From<&[usize]> for Target {
    fn from(indices: &[usize]) -> Self {
        Target::Indices(indices.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Target {
    fn from(indices: [usize; N]) -> Self {
        Target::Indices(indices.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_variant_conversions() {
        assert_eq!(Variant::from(true), Variant::Boolean(true));
        assert_eq!(Variant::from(7u16), Variant::Int64(7));
        assert_eq!(Variant::from(-3i32), Variant::Int64(-3));
        assert_eq!(Variant::from(1.5f32), Variant::Double(1.5));
        assert_eq!(Variant::from("abc"), Variant::String("abc".to_string()));
    }

    #[test]
    fn test_variant_accessors() {
        assert_eq!(Variant::Int64(4).as_f64(), Some(4.0));
        assert_eq!(Variant::Double(2.5).as_i64(), None);
        assert_eq!(Variant::from("x").as_str(), Some("x"));
        assert_eq!(Variant::Boolean(false).type_name(), "Boolean");
    }

    #[test]
    fn test_variant_display() {
        assert_eq!(Variant::Int64(100).to_string(), "100");
        assert_eq!(Variant::from("new message").to_string(), "\"new message\"");
    }

    #[test]
    fn test_variant_serializes_bare() {
        assert_eq!(serde_json::to_value(Variant::Int64(3)).unwrap(), json!(3));
        assert_eq!(
            serde_json::from_value::<Variant>(json!(2.25)).unwrap(),
            Variant::Double(2.25)
        );
        assert_eq!(
            serde_json::from_value::<Variant>(json!("abcxyz")).unwrap(),
            Variant::from("abcxyz")
        );
    }

    #[test]
    fn test_message_from_json() {
        assert_eq!(
            Message::try_from(json!(1)).unwrap(),
            Message::Scalar(Variant::Int64(1))
        );
        assert_eq!(
            Message::try_from(json!([100, 200])).unwrap(),
            Message::from(vec![100i64, 200])
        );
        assert_eq!(
            Message::try_from(json!([0.5, "a", true])).unwrap(),
            Message::Sequence(vec![
                Variant::Double(0.5),
                Variant::from("a"),
                Variant::Boolean(true)
            ])
        );
    }

    #[test]
    fn test_message_from_json_rejects_non_scalars() {
        for value in [json!(null), json!({"a": 1}), json!([[1, 2]]), json!([1, null])] {
            assert!(
                matches!(Message::try_from(value), Err(BridgeError::Payload { .. })),
                "should reject"
            );
        }
    }

    #[test]
    fn test_message_len() {
        assert_eq!(Message::from("x").len(), 1);
        assert_eq!(Message::from(vec![1, 2, 3]).len(), 3);
        assert!(Message::Sequence(Vec::new()).is_empty());
    }

    #[test]
    fn test_target_conversions() {
        assert_eq!(Target::from(2), Target::Index(2));
        assert_eq!(Target::from(Some(1)), Target::Index(1));
        assert_eq!(Target::default(), Target::Unspecified);
        assert_eq!(Target::from(&[3usize, 4][..]), Target::Indices(vec![3, 4]));
    }
}
