use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
};

use serde::Serialize;
use serde_json::ser::Formatter;
use workflow::OutputValue;

use crate::{
    blob,
    error::{Error, Result},
};

/// Compact JSON with a space after `,` and `:`, the layout `json.dump` gives
/// and the one downstream tooling reads.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

pub fn to_spaced_json<T: Serialize + ?Sized>(value: &T) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut bytes, SpacedFormatter);
    value.serialize(&mut serializer)?;
    Ok(bytes)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut path = OsString::from(path.as_os_str());
    path.push(suffix);
    PathBuf::from(path)
}

/// Writes one output value under `outdir`, choosing the file layout from the
/// kind of value. Returns the path written.
pub fn write_output(name: &str, value: &OutputValue, outdir: &Path) -> Result<PathBuf> {
    let filebase = outdir.join(name);
    let written = match value {
        OutputValue::Text(text) => std::fs::write(&filebase, text).map(|_| filebase),
        OutputValue::Mapping(mapping) => {
            let path = with_suffix(&filebase, ".json");
            to_spaced_json(mapping)
                .and_then(|bytes| std::fs::write(&path, bytes))
                .map(|_| path)
        }
        OutputValue::Artifact(artifact) => artifact.put(&filebase).map(|_| filebase),
        OutputValue::Stream(readable) => {
            std::fs::write(&filebase, readable.read()).map(|_| filebase)
        }
        OutputValue::Opaque(value) => {
            let path = with_suffix(&filebase, ".json.zst");
            blob::write(&path, value).map(|_| path)
        }
    };
    written.map_err(|source| Error::OutputWrite {
        name: name.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use workflow::{Artifact, Readable};

    #[test]
    fn text_is_written_verbatim() {
        let outdir = tempfile::tempdir().unwrap();
        let value = OutputValue::Text("hello".into());
        let path = write_output("greeting", &value, outdir.path()).unwrap();
        assert_eq!(path, outdir.path().join("greeting"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello");
    }

    #[test]
    fn mapping_is_written_as_json() {
        let outdir = tempfile::tempdir().unwrap();
        let Value::Object(mapping) = json!({"a": 1}) else {
            unreachable!()
        };
        write_output("result", &OutputValue::Mapping(mapping), outdir.path()).unwrap();
        assert_eq!(
            std::fs::read_to_string(outdir.path().join("result.json")).unwrap(),
            r#"{"a": 1}"#
        );
    }

    #[test]
    fn nested_json_keeps_spacing() {
        let bytes = to_spaced_json(&json!({"a": [1, 2], "b": {"c": null}})).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"a": [1, 2], "b": {"c": null}}"#
        );
    }

    #[test]
    fn artifact_puts_itself() {
        let outdir = tempfile::tempdir().unwrap();
        let artifact = Artifact::new(b"MODEL 1\nENDMDL\n".to_vec());
        write_output("trajectory.pdb", &OutputValue::Artifact(artifact), outdir.path()).unwrap();
        assert_eq!(
            std::fs::read_to_string(outdir.path().join("trajectory.pdb")).unwrap(),
            "MODEL 1\nENDMDL\n"
        );
    }

    #[test]
    fn stream_contents_are_read() {
        let outdir = tempfile::tempdir().unwrap();
        let value = OutputValue::Stream(Readable::new("step 1\n".to_string()));
        write_output("run.log", &value, outdir.path()).unwrap();
        assert_eq!(
            std::fs::read_to_string(outdir.path().join("run.log")).unwrap(),
            "step 1\n"
        );
    }

    #[test]
    fn opaque_values_fall_back_to_blob() {
        let outdir = tempfile::tempdir().unwrap();
        let value = json!([-76.02, -75.91]);
        let path =
            write_output("energies", &OutputValue::Opaque(value.clone()), outdir.path()).unwrap();
        assert_eq!(path, outdir.path().join("energies.json.zst"));
        assert_eq!(blob::read::<Value>(&path).unwrap(), value);
    }

    #[test]
    fn opaque_float_reads_back_bit_for_bit() {
        let outdir = tempfile::tempdir().unwrap();
        let energy = 1.0715660391465826e-75_f64;
        let value = OutputValue::Opaque(json!([energy]));
        let path = write_output("energies", &value, outdir.path()).unwrap();
        let read = blob::read::<Value>(&path).unwrap();
        let read = read[0].as_f64().unwrap();
        assert_eq!(read.to_bits(), energy.to_bits());
    }

    #[test]
    fn failed_write_names_the_output() {
        let outdir = tempfile::tempdir().unwrap();
        let missing = outdir.path().join("missing");
        let result = write_output("greeting", &OutputValue::Text("hello".into()), &missing);
        assert!(matches!(result, Err(Error::OutputWrite { name, .. }) if name == "greeting"));
    }
}
