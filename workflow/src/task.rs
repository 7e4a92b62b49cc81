use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{error::RunError, value::OutputValue};

/// Where a task input comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Binding {
    /// The job description the workflow was started with.
    Job,
    /// An output of a task declared earlier in the workflow.
    Output { task: String, field: String },
    Value(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskKind {
    /// A program run by the execution backend. It reads `inputs.json` from
    /// its working directory and writes `outputs.json`, plus the listed
    /// artifact files.
    Compute {
        image: String,
        command: Vec<String>,
        #[serde(default)]
        artifacts: Vec<String>,
    },
    /// A task whose output is supplied by a person, never computed.
    FrontEnd { prompt: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub name: String,
    pub kind: TaskKind,
    #[serde(default)]
    pub inputs: BTreeMap<String, Binding>,
}

impl TaskSpec {
    pub fn compute<S: Into<String>>(name: S, image: &str, command: &[&str]) -> Self {
        Self {
            name: name.into(),
            kind: TaskKind::Compute {
                image: image.to_string(),
                command: command.iter().map(|arg| arg.to_string()).collect(),
                artifacts: vec![],
            },
            inputs: BTreeMap::new(),
        }
    }

    pub fn front_end<S: Into<String>>(name: S, prompt: &str) -> Self {
        Self {
            name: name.into(),
            kind: TaskKind::FrontEnd {
                prompt: prompt.to_string(),
            },
            inputs: BTreeMap::new(),
        }
    }

    pub fn input(mut self, name: &str, binding: Binding) -> Self {
        self.inputs.insert(name.to_string(), binding);
        self
    }

    pub fn output_of(self, name: &str, task: &str, field: &str) -> Self {
        self.input(
            name,
            Binding::Output {
                task: task.to_string(),
                field: field.to_string(),
            },
        )
    }

    pub fn artifact(mut self, filename: &str) -> Self {
        if let TaskKind::Compute { artifacts, .. } = &mut self.kind {
            artifacts.push(filename.to_string());
        }
        self
    }

    pub fn is_front_end(&self) -> bool {
        matches!(self.kind, TaskKind::FrontEnd { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum TaskState {
    #[default]
    Pending,
    Completed { outputs: BTreeMap<String, OutputValue> },
    /// Outputs supplied from outside the workflow, as a person answering a
    /// front-end task would.
    Injected { outputs: BTreeMap<String, OutputValue> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub spec: TaskSpec,
    #[serde(default)]
    pub state: TaskState,
}

impl Task {
    pub fn new(spec: TaskSpec) -> Self {
        Self {
            spec,
            state: TaskState::Pending,
        }
    }

    /// A stand-in front-end task that reports `output` as its result. The
    /// original spec is kept so inputs and name stay recognizable.
    pub fn mock_ui(spec: TaskSpec, output: Value) -> Result<Self, RunError> {
        let Value::Object(output) = output else {
            return Err(RunError::InjectedOutputNotMapping(spec.name.clone()));
        };
        let outputs = output
            .into_iter()
            .map(|(field, value)| (field, OutputValue::from_json(value)))
            .collect();
        Ok(Self {
            spec,
            state: TaskState::Injected { outputs },
        })
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self.state, TaskState::Pending)
    }

    pub fn outputs(&self) -> Option<&BTreeMap<String, OutputValue>> {
        match &self.state {
            TaskState::Pending => None,
            TaskState::Completed { outputs } | TaskState::Injected { outputs } => Some(outputs),
        }
    }

    pub fn getoutput(&self, field: &str) -> Result<&OutputValue, RunError> {
        self.outputs()
            .ok_or_else(|| RunError::TaskNotFinished {
                task: self.spec.name.clone(),
            })?
            .get(field)
            .ok_or_else(|| RunError::MissingTaskOutput {
                task: self.spec.name.clone(),
                field: field.to_string(),
            })
    }

    /// All outputs as one JSON object.
    pub fn output_json(&self) -> Result<Map<String, Value>, RunError> {
        Ok(self
            .outputs()
            .ok_or_else(|| RunError::TaskNotFinished {
                task: self.spec.name.clone(),
            })?
            .iter()
            .map(|(field, value)| (field.clone(), value.to_json()))
            .collect())
    }
}

#[test]
fn injected_output_replaces_computation() {
    let spec = TaskSpec::compute("minimization", "toolkit", &["minimize"]);
    let task = Task::mock_ui(spec, serde_json::json!({"x": 1})).unwrap();
    assert!(task.is_finished());
    assert_eq!(
        Value::Object(task.output_json().unwrap()),
        serde_json::json!({"x": 1})
    );
}

#[test]
fn injected_output_must_be_an_object() {
    let spec = TaskSpec::front_end("confirm_molecule", "Check the structure");
    assert!(matches!(
        Task::mock_ui(spec, serde_json::json!([1, 2])),
        Err(RunError::InjectedOutputNotMapping(name)) if name == "confirm_molecule"
    ));
}

#[test]
fn pending_task_has_no_outputs() {
    let task = Task::new(TaskSpec::front_end("confirm_molecule", "Check the structure"));
    assert!(matches!(
        task.getoutput("charge"),
        Err(RunError::TaskNotFinished { .. })
    ));
}
