pub mod apps;
pub mod backend;
pub mod blob;
pub mod checkpoint;
pub mod config;
pub mod driver;
pub mod error;
pub mod input;
pub mod outdir;
pub mod output;

pub use config::{BackendFlags, OutputDirective, RunConfig};
pub use driver::{main_flow, Phase, WorkflowDriver};
pub use error::{Error, Result};
