use std::{path::PathBuf, str::FromStr};

use crate::error::InputError;

/// Environment variable naming the default remote compute server.
pub const SERVER_ENV: &str = "CCC";

/// `taskname=outputfile`, the output to supply for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDirective {
    pub task: String,
    pub file: PathBuf,
}

impl FromStr for OutputDirective {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((task, file)) if !task.is_empty() && !file.is_empty() && !file.contains('=') => {
                Ok(Self {
                    task: task.to_string(),
                    file: PathBuf::from(file),
                })
            }
            _ => Err(InputError::MalformedDirective(s.to_string())),
        }
    }
}

/// Where tasks should run, as requested on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendFlags {
    pub localdocker: bool,
    pub here: bool,
    /// Value of `$CCC` when the process started.
    pub server: Option<String>,
}

/// Everything one invocation was asked to do. Built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub appname: String,
    pub inputfile: String,
    pub outputdir: Option<PathBuf>,
    pub restart: bool,
    pub preprocess: bool,
    pub setoutput: Vec<OutputDirective>,
    pub backend: BackendFlags,
}

impl RunConfig {
    /// Reads the server address from the environment; nothing deeper in the
    /// call stack looks at it again.
    pub fn server_from_env() -> Option<String> {
        std::env::var(SERVER_ENV)
            .ok()
            .filter(|server| !server.trim().is_empty())
    }
}

#[test]
fn directive_splits_on_equals() {
    let directive: OutputDirective = "confirm_molecule=answer.json".parse().unwrap();
    assert_eq!(directive.task, "confirm_molecule");
    assert_eq!(directive.file, PathBuf::from("answer.json"));
}

#[test]
fn directive_needs_both_sides() {
    for raw in ["confirm_molecule", "=answer.json", "confirm_molecule=", "a=b=c"] {
        assert!(matches!(
            raw.parse::<OutputDirective>(),
            Err(InputError::MalformedDirective(_))
        ));
    }
}
