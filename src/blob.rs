//! Opaque snapshots: zstd-compressed JSON, written through a temporary file so
//! an interrupted write never leaves a truncated blob behind.

use std::{
    io::{self, Write},
    path::Path,
};

use serde::{de::DeserializeOwned, Serialize};
use tempfile::NamedTempFile;

const COMPRESSION_LEVEL: i32 = 3;

pub fn encode<T: Serialize>(value: &T) -> io::Result<Vec<u8>> {
    compress(&serde_json::to_vec(value)?)
}

pub fn compress(bytes: &[u8]) -> io::Result<Vec<u8>> {
    zstd::encode_all(bytes, COMPRESSION_LEVEL)
}

pub fn decompress(bytes: &[u8]) -> io::Result<Vec<u8>> {
    zstd::decode_all(bytes)
}

/// Replaces whatever is at `path` with `bytes`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(directory)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|err| err.error)?;
    Ok(())
}

pub fn write<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    write_atomic(path, &encode(value)?)
}

pub fn read<T: DeserializeOwned>(path: &Path) -> io::Result<T> {
    let json = decompress(&std::fs::read(path)?)?;
    Ok(serde_json::from_slice(&json)?)
}

#[test]
fn blob_round_trips() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("energies.json.zst");
    let value = serde_json::json!([[-1.25, -1.5], null, true]);
    write(&path, &value).unwrap();
    assert_eq!(read::<serde_json::Value>(&path).unwrap(), value);
}

#[test]
fn blob_overwrites_previous_content() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("state.json.zst");
    write(&path, &1).unwrap();
    write(&path, &2).unwrap();
    assert_eq!(read::<i32>(&path).unwrap(), 2);
}

#[test]
fn floats_are_read_back_exactly() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("vde.json.zst");
    let vde = 1.0715660391465826e-75_f64;
    write(&path, &vde).unwrap();
    assert_eq!(read::<f64>(&path).unwrap().to_bits(), vde.to_bits());
}
