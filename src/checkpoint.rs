use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;
use workflow::Runner;

use crate::{blob, error::CheckpointError};

/// Name of the checkpoint inside an output directory.
pub const STATE_FILE: &str = "workflow_state.json.zst";

/// Bumped whenever the serialized runner layout changes incompatibly.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct CheckpointRef<'a> {
    version: u32,
    runner: &'a Runner,
}

#[derive(Deserialize)]
struct Header {
    version: u32,
}

#[derive(Deserialize)]
struct Checkpoint {
    runner: Runner,
}

pub fn state_path(outdir: &Path) -> PathBuf {
    outdir.join(STATE_FILE)
}

/// Writes the whole runner (tasks, backend handle, application, job) to
/// `path`, replacing any earlier checkpoint there.
pub fn save(runner: &Runner, path: &Path) -> Result<(), CheckpointError> {
    let checkpoint = CheckpointRef {
        version: FORMAT_VERSION,
        runner,
    };
    let json = serde_json::to_vec(&checkpoint).map_err(CheckpointError::Encode)?;
    let bytes = blob::compress(&json)
        .map_err(|err| CheckpointError::Write(path.to_path_buf(), err))?;
    blob::write_atomic(path, &bytes)
        .map_err(|err| CheckpointError::Write(path.to_path_buf(), err))?;
    info!(path = ?path, workflow = %runner.workflow.name, "checkpoint written");
    Ok(())
}

pub fn load(path: &Path) -> Result<Runner, CheckpointError> {
    let bytes =
        std::fs::read(path).map_err(|err| CheckpointError::Read(path.to_path_buf(), err))?;
    let json =
        blob::decompress(&bytes).map_err(|err| CheckpointError::Read(path.to_path_buf(), err))?;
    let header: Header = serde_json::from_slice(&json)
        .map_err(|err| CheckpointError::Decode(path.to_path_buf(), err))?;
    if header.version != FORMAT_VERSION {
        return Err(CheckpointError::Version {
            path: path.to_path_buf(),
            found: header.version,
            expected: FORMAT_VERSION,
        });
    }
    let checkpoint: Checkpoint = serde_json::from_slice(&json)
        .map_err(|err| CheckpointError::Decode(path.to_path_buf(), err))?;
    Ok(checkpoint.runner)
}
