use std::{io, path::PathBuf, process::ExitStatus};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobShapeError {
    #[error(
        "job description names no molecule source, \
         expected one of filename, smiles, iupac, inchi, pdb"
    )]
    NoDiscriminator,
    #[error("job description names several molecule sources: {0:?}")]
    SeveralDiscriminators(Vec<String>),
    #[error("unexpected key \"{0}\" in job description")]
    UnexpectedKey(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unable to create temporary job directory")]
    TempDirCreate(#[source] io::Error),
    #[error("unable to write job file {0:?}")]
    FileWrite(PathBuf, #[source] io::Error),
    #[error("unable to read job file {0:?}")]
    FileRead(PathBuf, #[source] io::Error),
    #[error("failed to start {program}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("job command is empty")]
    EmptyCommand,
    #[error("job exited with {status}: {stderr}")]
    ExitStatus { status: ExitStatus, stderr: String },
    #[error("request to compute server {server} failed")]
    Http {
        server: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("compute server {server} rejected the job with status {status}: {body}")]
    Rejected {
        server: String,
        status: u16,
        body: String,
    },
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("task \"{0}\" not found in workflow")]
    NoSuchTask(String),
    #[error("workflow has no output field named \"{0}\"")]
    NoSuchOutput(String),
    #[error("task \"{task}\" has not produced its outputs yet")]
    TaskNotFinished { task: String },
    #[error("task \"{task}\" has no output named \"{field}\"")]
    MissingTaskOutput { task: String, field: String },
    #[error(
        "front-end task \"{task}\" needs its output supplied ({prompt}), \
         rerun with --setoutput {task}=<output.json>"
    )]
    AwaitingInput { task: String, prompt: String },
    #[error("workflow \"{0}\" has no preprocessing stage")]
    NoPreprocessStage(String),
    #[error("output supplied for task \"{0}\" must be a JSON object")]
    InjectedOutputNotMapping(String),
    #[error("task \"{task}\" wrote invalid outputs.json")]
    InvalidTaskOutput {
        task: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("outputs.json of task \"{0}\" is not a JSON object")]
    TaskOutputNotMapping(String),
    #[error("task \"{task}\" failed")]
    Engine {
        task: String,
        #[source]
        source: EngineError,
    },
}
