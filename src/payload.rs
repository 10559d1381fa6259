//! Staged model output documents.
//!
//! A model's output is staged as a flat JSON object:
//!
//! ```json
//! {"modelID": "CC", "output": [100, 200]}
//! ```
//!
//! [`retrieve_output`] reads one field back and [`retrieve_message`] decodes
//! it into a [`Message`] ready for [`Model::send`](crate::Model::send).

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BridgeError, Result};
use crate::value::Message;

/// File written by [`dump_output`] when no path is given.
pub const DEFAULT_OUTPUT_PATH: &str = "output.json";

/// Field read by [`retrieve_output`] when no field is given.
pub const DEFAULT_OUTPUT_FIELD: &str = "output";

/// One staged model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    /// Name of the model that produced the output.
    #[serde(rename = "modelID")]
    pub model_id: String,
    /// The output value: a scalar or a list of scalars.
    pub output: serde_json::Value,
}

impl OutputRecord {
    /// Creates a record.
    ///
    /// # Example
    ///
    /// ```
    /// use opcua_bridge::OutputRecord;
    ///
    /// let record = OutputRecord::new("CC", vec![100, 200]);
    /// assert_eq!(
    ///     serde_json::to_string(&record).unwrap(),
    ///     r#"{"modelID":"CC","output":[100,200]}"#
    /// );
    /// ```
    pub fn new(model_id: impl Into<String>, output: impl Into<serde_json::Value>) -> Self {
        Self {
            model_id: model_id.into(),
            output: output.into(),
        }
    }

    /// Decodes the output into a [`Message`].
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Payload` if the output is not a scalar or a flat
    /// list of scalars.
    pub fn message(&self) -> Result<Message> {
        Message::try_from(self.output.clone())
    }
}

/// Writes a model output document.
///
/// Writes to [`DEFAULT_OUTPUT_PATH`] when `path` is `None`, replacing any
/// existing file.
///
/// # Errors
///
/// Returns an I/O or JSON error if the file cannot be written.
pub fn dump_output(
    model_id: &str,
    output: impl Into<serde_json::Value>,
    path: Option<&Path>,
) -> Result<()> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_OUTPUT_PATH));
    let record = OutputRecord::new(model_id, output);

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, &record)?;
    writer.flush()?;
    debug!(path = %path.display(), model_id, "output staged");
    Ok(())
}

/// Reads one top-level field of an output document.
///
/// Reads [`DEFAULT_OUTPUT_FIELD`] when `field` is `None`.
///
/// # Errors
///
/// Returns an I/O or JSON error if the file cannot be read or parsed, and
/// `BridgeError::Payload` if the document is not an object or lacks the
/// field.
pub fn retrieve_output(path: &Path, field: Option<&str>) -> Result<serde_json::Value> {
    let field = field.unwrap_or(DEFAULT_OUTPUT_FIELD);
    let document: serde_json::Value = serde_json::from_reader(BufReader::new(File::open(path)?))?;

    let serde_json::Value::Object(mut fields) = document else {
        return Err(BridgeError::payload(format!(
            "{} is not a JSON object",
            path.display()
        )));
    };
    fields.remove(field).ok_or_else(|| {
        BridgeError::payload(format!("field '{field}' missing in {}", path.display()))
    })
}

/// Reads one field of an output document and decodes it into a [`Message`].
///
/// # Errors
///
/// As [`retrieve_output`], plus `BridgeError::Payload` if the value is not a
/// scalar or a flat list of scalars.
pub fn retrieve_message(path: &Path, field: Option<&str>) -> Result<Message> {
    Message::try_from(retrieve_output(path, field)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Variant;
    use serde_json::json;

    #[test]
    fn test_dump_and_retrieve() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.json");

        dump_output("CC", vec![100, 200], Some(&path)).unwrap();

        assert_eq!(retrieve_output(&path, None).unwrap(), json!([100, 200]));
        assert_eq!(retrieve_output(&path, Some("modelID")).unwrap(), json!("CC"));
        assert_eq!(
            retrieve_message(&path, None).unwrap(),
            Message::from(vec![100i64, 200])
        );
    }

    #[test]
    fn test_dump_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.json");

        dump_output("CC", 1, Some(&path)).unwrap();
        dump_output("CC", "done", Some(&path)).unwrap();

        assert_eq!(
            retrieve_message(&path, None).unwrap(),
            Message::Scalar(Variant::from("done"))
        );
    }

    #[test]
    fn test_record_parses_document() {
        let record: OutputRecord =
            serde_json::from_str(r#"{"modelID": "Tip", "output": [1.5, 2.5]}"#).unwrap();

        assert_eq!(record.model_id, "Tip");
        assert_eq!(
            record.message().unwrap(),
            Message::Sequence(vec![Variant::Double(1.5), Variant::Double(2.5)])
        );
    }

    #[test]
    fn test_retrieve_missing_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.json");
        dump_output("CC", 1, Some(&path)).unwrap();

        let err = retrieve_output(&path, Some("count")).unwrap_err();
        assert!(matches!(err, BridgeError::Payload { .. }));
        assert!(err.to_string().contains("field 'count' missing"));
    }

    #[test]
    fn test_retrieve_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        assert!(matches!(
            retrieve_output(&path, None),
            Err(BridgeError::Payload { .. })
        ));
    }

    #[test]
    fn test_retrieve_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            retrieve_output(&dir.path().join("absent.json"), None),
            Err(BridgeError::Io(_))
        ));
    }

    #[test]
    fn test_null_output_is_not_a_message() {
        let record = OutputRecord::new("CC", serde_json::Value::Null);
        assert!(matches!(record.message(), Err(BridgeError::Payload { .. })));
    }
}
