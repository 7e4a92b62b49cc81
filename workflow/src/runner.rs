use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::{
    engine::{Backend, Engine, Job, JobResult, Subprocess},
    error::RunError,
    input_data::JobDescription,
    task::{Binding, Task, TaskKind, TaskSpec, TaskState},
    value::{Artifact, OutputValue, Readable},
    workflow_data::Workflow,
};

/// File a compute task reads its resolved inputs from.
pub const INPUTS_FILE: &str = "inputs.json";
/// File a compute task must leave its outputs in, as a JSON object.
pub const OUTPUTS_FILE: &str = "outputs.json";
/// Output under which every compute task exposes its standard output.
pub const STDOUT_FIELD: &str = "stdout";

/// How a runner gets its tasks executed. Checkpoints can only be resumed by a
/// runner of the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunnerKind {
    /// Tasks are submitted one at a time to a container backend.
    SerialCloudCompute,
    /// Tasks run one at a time as processes on this machine.
    SerialRuntime,
}

impl std::fmt::Display for RunnerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SerialCloudCompute => write!(f, "serial cloud-compute runner"),
            Self::SerialRuntime => write!(f, "serial local runtime runner"),
        }
    }
}

/// One workflow instance bound to one backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Runner {
    pub kind: RunnerKind,
    pub engine: Option<Backend>,
    pub application: String,
    pub job: JobDescription,
    pub workflow: Workflow,
    pub tasks: BTreeMap<String, Task>,
}

impl Runner {
    pub fn new(
        kind: RunnerKind,
        engine: Option<Backend>,
        application: &str,
        workflow: Workflow,
        job: JobDescription,
    ) -> Self {
        let tasks = workflow
            .tasks
            .iter()
            .map(|spec| (spec.name.clone(), Task::new(spec.clone())))
            .collect();
        Self {
            kind,
            engine,
            application: application.to_string(),
            job,
            workflow,
            tasks,
        }
    }

    /// Runs every pending task in declaration order. Finished tasks, computed
    /// or injected, are left alone, so a completed runner does no work.
    pub fn run(&mut self) -> Result<(), RunError> {
        let order = self.task_order();
        self.run_tasks(&order)
    }

    /// Runs the tasks up to and including the workflow's preprocessing task
    /// and returns that task.
    pub fn preprocess(&mut self) -> Result<&Task, RunError> {
        let last = self
            .workflow
            .preprocess
            .clone()
            .ok_or_else(|| RunError::NoPreprocessStage(self.workflow.name.clone()))?;
        let order = self.task_order();
        let stop = order
            .iter()
            .position(|name| name == &last)
            .ok_or_else(|| RunError::NoSuchTask(last.clone()))?;
        self.run_tasks(&order[..=stop])?;
        self.tasks.get(&last).ok_or(RunError::NoSuchTask(last))
    }

    pub fn getoutput(&self, name: &str) -> Result<OutputValue, RunError> {
        let field = self
            .workflow
            .output_field(name)
            .ok_or_else(|| RunError::NoSuchOutput(name.to_string()))?;
        let task = self
            .tasks
            .get(&field.task)
            .ok_or_else(|| RunError::NoSuchTask(field.task.clone()))?;
        task.getoutput(&field.field).cloned()
    }

    /// Replaces the named task with a mock front-end task reporting `output`.
    pub fn set_output(&mut self, task_name: &str, output: Value) -> Result<(), RunError> {
        let task = self
            .tasks
            .get(task_name)
            .ok_or_else(|| RunError::NoSuchTask(task_name.to_string()))?;
        if !task.spec.is_front_end() {
            warn!(task = task_name, "supplying the output of a compute task, it will not run");
        }
        let mock = Task::mock_ui(task.spec.clone(), output)?;
        self.tasks.insert(task_name.to_string(), mock);
        Ok(())
    }

    fn task_order(&self) -> Vec<String> {
        self.workflow
            .tasks
            .iter()
            .map(|spec| spec.name.clone())
            .collect()
    }

    fn run_tasks(&mut self, names: &[String]) -> Result<(), RunError> {
        for name in names {
            let task = self
                .tasks
                .get(name)
                .ok_or_else(|| RunError::NoSuchTask(name.clone()))?;
            if task.is_finished() {
                continue;
            }
            let spec = task.spec.clone();
            let outputs = match &spec.kind {
                TaskKind::FrontEnd { prompt } => {
                    return Err(RunError::AwaitingInput {
                        task: name.clone(),
                        prompt: prompt.clone(),
                    })
                }
                TaskKind::Compute {
                    image,
                    command,
                    artifacts,
                } => {
                    info!(task = %name, workflow = %self.workflow.name, "running task");
                    let job = Job {
                        image: image.clone(),
                        command: command.clone(),
                        inputs: BTreeMap::from([(
                            INPUTS_FILE.to_string(),
                            Value::Object(self.resolve_inputs(&spec)?).to_string(),
                        )]),
                        output_files: [OUTPUTS_FILE.to_string()]
                            .into_iter()
                            .chain(artifacts.iter().cloned())
                            .collect(),
                    };
                    let result = self.launch(&job).map_err(|source| RunError::Engine {
                        task: name.clone(),
                        source,
                    })?;
                    task_outputs(name, artifacts, result)?
                }
            };
            if let Some(task) = self.tasks.get_mut(name) {
                task.state = TaskState::Completed { outputs };
            }
        }
        Ok(())
    }

    fn launch(&self, job: &Job) -> Result<JobResult, crate::error::EngineError> {
        match (self.kind, &self.engine) {
            (RunnerKind::SerialCloudCompute, Some(engine)) => engine.launch(job),
            _ => Subprocess.launch(job),
        }
    }

    fn resolve_inputs(&self, spec: &TaskSpec) -> Result<Map<String, Value>, RunError> {
        spec.inputs
            .iter()
            .map(|(input, binding)| {
                let value = match binding {
                    Binding::Job => self.job.to_value(),
                    Binding::Value(value) => value.clone(),
                    Binding::Output { task, field } => self
                        .tasks
                        .get(task)
                        .ok_or_else(|| RunError::NoSuchTask(task.clone()))?
                        .getoutput(field)?
                        .to_json(),
                };
                Ok((input.clone(), value))
            })
            .collect()
    }
}

fn task_outputs(
    task: &str,
    artifacts: &[String],
    mut result: JobResult,
) -> Result<BTreeMap<String, OutputValue>, RunError> {
    let raw = result.files.remove(OUTPUTS_FILE).unwrap_or_default();
    let parsed: Value =
        serde_json::from_slice(&raw).map_err(|source| RunError::InvalidTaskOutput {
            task: task.to_string(),
            source,
        })?;
    let Value::Object(parsed) = parsed else {
        return Err(RunError::TaskOutputNotMapping(task.to_string()));
    };
    let mut outputs = parsed
        .into_iter()
        .map(|(field, value)| (field, OutputValue::from_json(value)))
        .collect::<BTreeMap<_, _>>();
    for filename in artifacts {
        if let Some(content) = result.files.remove(filename) {
            outputs.insert(filename.clone(), OutputValue::Artifact(Artifact::new(content)));
        }
    }
    if outputs.contains_key(STDOUT_FIELD) {
        warn!(task, field = STDOUT_FIELD, "task reports its own stdout field, keeping it");
    } else {
        outputs.insert(
            STDOUT_FIELD.to_string(),
            OutputValue::Stream(Readable::new(result.stdout)),
        );
    }
    Ok(outputs)
}
