//! Applications the driver knows how to run, keyed by the name given on the
//! command line.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use workflow::{TaskSpec, Workflow};

use crate::error::ConfigError;

pub mod minimize;
pub mod vde;

/// Container image holding the task programs.
pub const TOOLKIT_IMAGE: &str = "chemworkflows/toolkit:0.1.0";
/// Entry point of the task programs, first argument names the task.
pub const TASK_PROGRAM: &str = "chemworkflows-task";

/// Compute task running `TASK_PROGRAM <name>` in the toolkit image.
fn toolkit_task(name: &str) -> TaskSpec {
    TaskSpec::compute(name, TOOLKIT_IMAGE, &[TASK_PROGRAM, name])
}

pub trait Application: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// Builds a fresh task graph for one run.
    fn workflow(&self) -> Workflow;
}

lazy_static! {
    static ref APPLICATIONS: BTreeMap<&'static str, Box<dyn Application>> = {
        let applications: Vec<Box<dyn Application>> =
            vec![Box::new(minimize::Minimization), Box::new(vde::Vde)];
        applications
            .into_iter()
            .map(|application| (application.name(), application))
            .collect()
    };
}

/// Every registered application, ordered by name.
pub fn all() -> impl Iterator<Item = &'static dyn Application> {
    APPLICATIONS.values().map(|application| application.as_ref())
}

pub fn names() -> Vec<&'static str> {
    APPLICATIONS.keys().copied().collect()
}

pub fn lookup(name: &str) -> Result<&'static dyn Application, ConfigError> {
    APPLICATIONS
        .get(name)
        .map(|application| application.as_ref())
        .ok_or_else(|| ConfigError::UnknownApplication {
            name: name.to_string(),
            known: names().join(", "),
        })
}
