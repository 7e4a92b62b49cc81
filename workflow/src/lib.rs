pub mod engine;
pub mod error;
pub mod input_data;
pub mod io;
pub mod runner;
pub mod task;
pub mod value;
pub mod workflow_data;

pub use engine::{Backend, Engine, Job, JobResult, Subprocess};
pub use error::{EngineError, JobShapeError, RunError};
pub use input_data::JobDescription;
pub use runner::{Runner, RunnerKind};
pub use task::{Binding, Task, TaskKind, TaskSpec, TaskState};
pub use value::{Artifact, OutputValue, Readable};
pub use workflow_data::{OutputField, Workflow};
