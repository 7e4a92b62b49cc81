use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::JobShapeError;

/// Keys that identify where a molecule comes from. A job description carries
/// exactly one of them.
pub const DISCRIMINATORS: [&str; 5] = ["filename", "smiles", "iupac", "inchi", "pdb"];

/// Companion of `filename`, holding the raw file text.
pub const CONTENT_KEY: &str = "content";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discriminator {
    Filename,
    Smiles,
    Iupac,
    Inchi,
    Pdb,
}

impl Discriminator {
    fn from_key(key: &str) -> Option<Self> {
        match key {
            "filename" => Some(Self::Filename),
            "smiles" => Some(Self::Smiles),
            "iupac" => Some(Self::Iupac),
            "inchi" => Some(Self::Inchi),
            "pdb" => Some(Self::Pdb),
            _ => None,
        }
    }
}

/// Canonical description of the molecule a job starts from.
///
/// The mapping is kept as loaded; [`JobDescription::discriminator`] checks the
/// key set when the application needs it.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct JobDescription(Map<String, Value>);

impl JobDescription {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Description of a data file read verbatim.
    pub fn from_file_content(filename: &str, content: String) -> Self {
        let mut fields = Map::new();
        fields.insert("filename".to_string(), Value::String(filename.to_string()));
        fields.insert(CONTENT_KEY.to_string(), Value::String(content));
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn discriminator(&self) -> Result<Discriminator, JobShapeError> {
        let found = self
            .0
            .keys()
            .filter_map(|key| Discriminator::from_key(key).map(|d| (key.clone(), d)))
            .collect::<BTreeMap<_, _>>();
        let discriminator = match found.len() {
            0 => return Err(JobShapeError::NoDiscriminator),
            1 => found.values().copied().next().ok_or(JobShapeError::NoDiscriminator)?,
            _ => {
                return Err(JobShapeError::SeveralDiscriminators(
                    found.keys().cloned().collect(),
                ))
            }
        };
        for key in self.0.keys() {
            if Discriminator::from_key(key).is_some() {
                continue;
            }
            if key == CONTENT_KEY && discriminator == Discriminator::Filename {
                continue;
            }
            return Err(JobShapeError::UnexpectedKey(key.clone()));
        }
        Ok(discriminator)
    }
}

impl From<Map<String, Value>> for JobDescription {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

#[test]
fn single_discriminator_is_accepted() {
    let job: JobDescription = serde_json::from_str(r#"{"smiles": "CCO"}"#).unwrap();
    assert_eq!(job.discriminator().unwrap(), Discriminator::Smiles);
}

#[test]
fn filename_takes_content_along() {
    let job = JobDescription::from_file_content("benzene.xyz", "12\n".to_string());
    assert_eq!(job.discriminator().unwrap(), Discriminator::Filename);
}

#[test]
fn content_needs_filename() {
    let job: JobDescription =
        serde_json::from_str(r#"{"smiles": "CCO", "content": "x"}"#).unwrap();
    assert!(matches!(
        job.discriminator(),
        Err(JobShapeError::UnexpectedKey(key)) if key == "content"
    ));
}

#[test]
fn wrong_key_sets_are_rejected() {
    let empty = JobDescription::default();
    assert!(matches!(empty.discriminator(), Err(JobShapeError::NoDiscriminator)));
    let both: JobDescription =
        serde_json::from_str(r#"{"smiles": "CCO", "pdb": "3aid"}"#).unwrap();
    assert!(matches!(
        both.discriminator(),
        Err(JobShapeError::SeveralDiscriminators(keys)) if keys == ["pdb", "smiles"]
    ));
}
