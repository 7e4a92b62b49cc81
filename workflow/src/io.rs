use std::{
    collections::BTreeMap,
    fs::File,
    io::Write,
    path::Path,
    process::{Command, Stdio},
};

use tempfile::{tempdir, TempDir};
use tracing::debug;

use crate::{
    engine::{Job, JobResult},
    error::EngineError,
};

/// Scratch directory holding a job's input files while it runs and its
/// output files once it is done. Removed on drop.
pub struct JobDirectory {
    directory: TempDir,
}

impl JobDirectory {
    pub fn stage(job: &Job) -> Result<Self, EngineError> {
        let directory = tempdir().map_err(EngineError::TempDirCreate)?;
        for (filename, content) in &job.inputs {
            let filepath = directory.path().join(filename);
            File::create(&filepath)
                .and_then(|mut file| file.write_all(content.as_bytes()))
                .map_err(|err| EngineError::FileWrite(filepath.clone(), err))?;
        }
        debug!(directory = ?directory.path(), files = job.inputs.len(), "staged job inputs");
        Ok(Self { directory })
    }

    pub fn path(&self) -> &Path {
        self.directory.path()
    }

    /// Runs `command` to completion, capturing stdout and stderr.
    pub fn execute(&self, mut command: Command) -> Result<(String, String), EngineError> {
        let program = command.get_program().to_string_lossy().to_string();
        let output = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| EngineError::Spawn { program, source })?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !output.status.success() {
            return Err(EngineError::ExitStatus {
                status: output.status,
                stderr,
            });
        }
        Ok((stdout, stderr))
    }

    pub fn collect(
        &self,
        job: &Job,
        stdout: String,
        stderr: String,
    ) -> Result<JobResult, EngineError> {
        let files = job
            .output_files
            .iter()
            .map(|filename| {
                let filepath = self.path().join(filename);
                std::fs::read(&filepath)
                    .map(|content| (filename.clone(), content))
                    .map_err(|err| EngineError::FileRead(filepath, err))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(JobResult {
            files,
            stdout,
            stderr,
        })
    }
}
