//! Places where a task's program can run.
//!
//! Every engine takes a [`Job`] (image, command line, input files) and hands
//! back the files the job was asked to produce.

use std::{collections::BTreeMap, process::Command};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{error::EngineError, io::JobDirectory};

/// Working directory of a job inside its container.
const CONTAINER_WORKDIR: &str = "/workdir";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub image: String,
    pub command: Vec<String>,
    /// File name to text content, staged in the job's working directory.
    pub inputs: BTreeMap<String, String>,
    /// Files collected from the working directory once the job exits.
    pub output_files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    /// Requested output files, read back as raw bytes.
    pub files: BTreeMap<String, Vec<u8>>,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
}

pub trait Engine {
    fn launch(&self, job: &Job) -> Result<JobResult, EngineError>;
}

/// Runs the job's command directly on this machine; the image is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct Subprocess;

impl Engine for Subprocess {
    fn launch(&self, job: &Job) -> Result<JobResult, EngineError> {
        let (program, arguments) = job.command.split_first().ok_or(EngineError::EmptyCommand)?;
        let directory = JobDirectory::stage(job)?;
        let mut command = Command::new(program);
        command.args(arguments).current_dir(directory.path());
        let (stdout, stderr) = directory.execute(command)?;
        directory.collect(job, stdout, stderr)
    }
}

/// Handle to an execution backend. Serializable so a checkpointed runner
/// keeps track of where it was running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backend {
    /// Docker daemon reachable from this machine, `host` as passed to `docker -H`.
    Docker { host: Option<String> },
    /// A CloudComputeCannon server at `server` (`host:port`).
    CloudComputeCannon { server: String },
}

impl Backend {
    pub fn docker() -> Self {
        Self::Docker { host: None }
    }

    pub fn cloud_compute_cannon<S: Into<String>>(server: S) -> Self {
        Self::CloudComputeCannon {
            server: server.into(),
        }
    }

    fn launch_docker(&self, host: Option<&str>, job: &Job) -> Result<JobResult, EngineError> {
        if job.command.is_empty() {
            return Err(EngineError::EmptyCommand);
        }
        let directory = JobDirectory::stage(job)?;
        let mut command = Command::new("docker");
        if let Some(host) = host {
            command.args(["-H", host]);
        }
        command
            .args(["run", "--rm", "-v"])
            .arg(format!("{}:{}", directory.path().display(), CONTAINER_WORKDIR))
            .args(["-w", CONTAINER_WORKDIR])
            .arg(&job.image)
            .args(&job.command);
        let (stdout, stderr) = directory.execute(command)?;
        directory.collect(job, stdout, stderr)
    }

    fn launch_remote(&self, server: &str, job: &Job) -> Result<JobResult, EngineError> {
        let http_error = |source| EngineError::Http {
            server: server.to_string(),
            source,
        };
        let response = reqwest::blocking::Client::new()
            .post(format!("http://{}/api/rpc/run", server))
            .json(job)
            .send()
            .map_err(http_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Rejected {
                server: server.to_string(),
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }
        response.json::<JobResult>().map_err(http_error)
    }
}

impl Engine for Backend {
    fn launch(&self, job: &Job) -> Result<JobResult, EngineError> {
        info!(image = %job.image, command = ?job.command, backend = ?self, "launching job");
        match self {
            Self::Docker { host } => self.launch_docker(host.as_deref(), job),
            Self::CloudComputeCannon { server } => self.launch_remote(server, job),
        }
    }
}

#[test]
fn empty_command_is_rejected() {
    let job = Job {
        image: "toolkit".to_string(),
        command: vec![],
        inputs: BTreeMap::new(),
        output_files: vec![],
    };
    assert!(matches!(Subprocess.launch(&job), Err(EngineError::EmptyCommand)));
    assert!(matches!(
        Backend::docker().launch(&job),
        Err(EngineError::EmptyCommand)
    ));
}

#[cfg(unix)]
#[test]
fn subprocess_collects_requested_files() {
    let job = Job {
        image: "ignored".to_string(),
        command: ["sh", "-c", "cp inputs.json outputs.json && echo done"]
            .iter()
            .map(|arg| arg.to_string())
            .collect(),
        inputs: BTreeMap::from([("inputs.json".to_string(), r#"{"a": 1}"#.to_string())]),
        output_files: vec!["outputs.json".to_string()],
    };
    let result = Subprocess.launch(&job).unwrap();
    assert_eq!(result.files["outputs.json"], br#"{"a": 1}"#);
    assert_eq!(result.stdout, "done\n");
}

#[cfg(unix)]
#[test]
fn failing_subprocess_reports_stderr() {
    let job = Job {
        image: "ignored".to_string(),
        command: ["sh", "-c", "echo broken >&2; exit 3"]
            .iter()
            .map(|arg| arg.to_string())
            .collect(),
        inputs: BTreeMap::new(),
        output_files: vec![],
    };
    assert!(matches!(
        Subprocess.launch(&job),
        Err(EngineError::ExitStatus { stderr, .. }) if stderr == "broken\n"
    ));
}
