use std::{io, path::PathBuf};

use thiserror::Error;
use workflow::{JobShapeError, RunError, RunnerKind};

#[derive(Debug, Error)]
pub enum InputError {
    #[error("unable to read input file {0:?}")]
    Unreadable(PathBuf, #[source] io::Error),
    #[error("unable to parse {0:?} as JSON or YAML")]
    Unparsable(PathBuf, #[source] serde_yaml::Error),
    #[error("{0:?} does not describe a mapping")]
    NotMapping(PathBuf),
    #[error("invalid job description")]
    JobShape(#[from] JobShapeError),
    #[error("output directive \"{0}\" is not of the form taskname=outputfile")]
    MalformedDirective(String),
    #[error("unable to read output file {path:?} for task \"{task}\"")]
    InjectionUnreadable {
        task: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("output file {path:?} for task \"{task}\" is not valid JSON")]
    InjectionUnparsable {
        task: String,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot supply output for task \"{task}\"")]
    Injection {
        task: String,
        #[source]
        source: RunError,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("--localdocker and --here cannot be used together")]
    ConflictingBackends,
    #[error("unknown application \"{name}\", expected one of: {known}")]
    UnknownApplication { name: String, known: String },
    #[error("checkpoint was written by a {saved}, but this invocation selects a {selected}")]
    IncompatibleRunner {
        saved: RunnerKind,
        selected: RunnerKind,
    },
    #[error("unable to create output directory {0:?}")]
    OutputDirectory(PathBuf, #[source] io::Error),
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("unable to write checkpoint {0:?}")]
    Write(PathBuf, #[source] io::Error),
    #[error("unable to read checkpoint {0:?}")]
    Read(PathBuf, #[source] io::Error),
    #[error("unable to encode checkpoint")]
    Encode(#[source] serde_json::Error),
    #[error("{0:?} is not a workflow checkpoint")]
    Decode(PathBuf, #[source] serde_json::Error),
    #[error("checkpoint {path:?} has format version {found}, expected {expected}")]
    Version {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Execution(#[from] RunError),
    #[error("unable to write output \"{name}\"")]
    OutputWrite {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}

impl Error {
    /// Process exit status for this kind of failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Input(_) => 2,
            Self::Config(_) => 3,
            Self::Execution(_) => 4,
            Self::OutputWrite { .. } => 5,
            Self::Checkpoint(_) => 6,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
