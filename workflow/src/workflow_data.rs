use serde::{Deserialize, Serialize};

use crate::task::TaskSpec;

/// Binds a declared workflow output to one output of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputField {
    pub name: String,
    pub task: String,
    pub field: String,
}

/// Static description of an application: its tasks in execution order and
/// the outputs it promises.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    pub tasks: Vec<TaskSpec>,
    pub outputs: Vec<OutputField>,
    /// Last task of the preprocessing stage, if the workflow has one.
    #[serde(default)]
    pub preprocess: Option<String>,
}

impl Workflow {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            tasks: vec![],
            outputs: vec![],
            preprocess: None,
        }
    }

    pub fn task(mut self, spec: TaskSpec) -> Self {
        self.tasks.push(spec);
        self
    }

    /// Marks the most recently added task as the end of preprocessing.
    pub fn preprocess_here(mut self) -> Self {
        self.preprocess = self.tasks.last().map(|spec| spec.name.clone());
        self
    }

    pub fn output(mut self, name: &str, task: &str, field: &str) -> Self {
        self.outputs.push(OutputField {
            name: name.to_string(),
            task: task.to_string(),
            field: field.to_string(),
        });
        self
    }

    pub fn outputfields(&self) -> impl Iterator<Item = &str> {
        self.outputs.iter().map(|field| field.name.as_str())
    }

    pub fn output_field(&self, name: &str) -> Option<&OutputField> {
        self.outputs.iter().find(|field| field.name == name)
    }
}
