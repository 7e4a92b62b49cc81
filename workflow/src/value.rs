use std::{io, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A value bound to an output field of a task or workflow.
///
/// The variant order is the order in which writers should prefer an encoding:
/// readable text first, an opaque snapshot last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum OutputValue {
    Text(String),
    Mapping(Map<String, Value>),
    Artifact(Artifact),
    Stream(Readable),
    Opaque(Value),
}

impl OutputValue {
    /// Classifies a JSON value produced by a task.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            Value::Object(mapping) => Self::Mapping(mapping),
            other => Self::Opaque(other),
        }
    }

    /// JSON view used when the value feeds another task or a summary file.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.clone()),
            Self::Mapping(mapping) => Value::Object(mapping.clone()),
            Self::Artifact(artifact) => artifact.to_json(),
            Self::Stream(readable) => Value::String(readable.read().to_string()),
            Self::Opaque(value) => value.clone(),
        }
    }
}

/// A file produced by a task, kept byte for byte so binary outputs survive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    content: Vec<u8>,
}

impl Artifact {
    pub fn new(content: Vec<u8>) -> Self {
        Self { content }
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Writes the artifact to `base`.
    pub fn put(&self, base: &Path) -> io::Result<()> {
        std::fs::write(base, &self.content)
    }

    /// Text files become a string, anything else the list of bytes.
    fn to_json(&self) -> Value {
        match std::str::from_utf8(&self.content) {
            Ok(text) => Value::String(text.to_string()),
            Err(_) => Value::from(self.content.clone()),
        }
    }
}

/// Captured output of a job, exposed through [`Readable::read`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Readable {
    buffer: String,
}

impl Readable {
    pub fn new(buffer: String) -> Self {
        Self { buffer }
    }

    pub fn read(&self) -> &str {
        &self.buffer
    }
}

#[test]
fn json_values_are_classified_by_shape() {
    assert_eq!(
        OutputValue::from_json(Value::String("hello".into())),
        OutputValue::Text("hello".into())
    );
    assert!(matches!(
        OutputValue::from_json(serde_json::json!({"a": 1})),
        OutputValue::Mapping(_)
    ));
    assert_eq!(
        OutputValue::from_json(serde_json::json!([1.5, 2.5])),
        OutputValue::Opaque(serde_json::json!([1.5, 2.5]))
    );
}

#[test]
fn binary_artifact_is_put_unchanged() {
    let directory = tempfile::tempdir().unwrap();
    let base = directory.path().join("out.pkl");
    let bytes = vec![0x80, 0x04, 0x95, 0x00, 0xff];
    let artifact = Artifact::new(bytes.clone());
    artifact.put(&base).unwrap();
    assert_eq!(std::fs::read(&base).unwrap(), bytes);
    assert_eq!(
        OutputValue::Artifact(artifact).to_json(),
        serde_json::json!([0x80, 0x04, 0x95, 0x00, 0xff])
    );
}

#[test]
fn text_artifact_feeds_tasks_as_string() {
    let artifact = Artifact::new(b"MODEL 1\n".to_vec());
    assert_eq!(
        OutputValue::Artifact(artifact).to_json(),
        Value::String("MODEL 1\n".to_string())
    );
}
