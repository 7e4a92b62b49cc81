use std::{
    fs::File,
    path::{Path, PathBuf},
};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use workflow::Runner;

use crate::{
    apps,
    backend::execution_env,
    checkpoint,
    config::{OutputDirective, RunConfig},
    error::{ConfigError, Error, InputError, Result},
    input::process_input_file,
    outdir::make_output_dir,
    output::{to_spaced_json, write_output},
};

/// Output of the preprocessing task holding the prepared structure.
pub const PDB_FIELD: &str = "pdbstring";
pub const PREP_PDB_FILE: &str = "prep.pdb";
pub const PREP_JSON_FILE: &str = "prep.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Fresh,
    Preprocessed,
    Running,
    Completed,
    Restarted,
}

/// Owns the runner for one invocation and checkpoints it after each stage.
pub struct WorkflowDriver {
    runner: Runner,
    outdir: PathBuf,
    phase: Phase,
}

impl WorkflowDriver {
    pub fn new(runner: Runner, outdir: PathBuf, phase: Phase) -> Self {
        info!(workflow = %runner.workflow.name, phase = ?phase, "workflow driver ready");
        Self {
            runner,
            outdir,
            phase,
        }
    }

    /// Builds a runner for `config.appname` around the job described by
    /// `config.inputfile`.
    pub fn fresh(config: &RunConfig, outdir: PathBuf) -> Result<Self> {
        let application = apps::lookup(&config.appname)?;
        let (engine, kind) = execution_env(&config.backend)?;
        let job = process_input_file(&config.inputfile)?;
        job.discriminator().map_err(InputError::from)?;
        let runner = Runner::new(
            kind,
            engine,
            application.name(),
            application.workflow(),
            job,
        );
        Ok(Self::new(runner, outdir, Phase::Fresh))
    }

    /// Loads the checkpoint named by `config.inputfile` and rebinds it to the
    /// backend this invocation selects. The runner kind has to match.
    pub fn restart(config: &RunConfig, outdir: PathBuf) -> Result<Self> {
        let mut runner = checkpoint::load(Path::new(&config.inputfile))?;
        let (engine, kind) = execution_env(&config.backend)?;
        if runner.kind != kind {
            return Err(ConfigError::IncompatibleRunner {
                saved: runner.kind,
                selected: kind,
            }
            .into());
        }
        if runner.application != config.appname {
            warn!(
                saved = %runner.application,
                requested = %config.appname,
                "checkpoint belongs to another application, resuming it anyway"
            );
        }
        runner.engine = engine;
        println!(
            " ----   RESTARTING WORKFLOW \"{}\"   ----\n",
            runner.workflow.name
        );
        Ok(Self::new(runner, outdir, Phase::Restarted))
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn outdir(&self) -> &Path {
        &self.outdir
    }

    fn transition(&mut self, next: Phase) {
        info!(from = ?self.phase, to = ?next, "workflow phase");
        self.phase = next;
    }

    fn save_checkpoint(&self) -> Result<()> {
        checkpoint::save(&self.runner, &checkpoint::state_path(&self.outdir))?;
        Ok(())
    }

    fn absolute_outdir(&self) -> PathBuf {
        std::fs::canonicalize(&self.outdir).unwrap_or_else(|_| self.outdir.clone())
    }

    /// Sets the outputs of front-end tasks from `taskname=file.json`
    /// directives, before anything runs.
    pub fn set_ui_outputs(&mut self, directives: &[OutputDirective]) -> Result<()> {
        for OutputDirective { task, file } in directives {
            if !self.runner.tasks.contains_key(task) {
                return Err(InputError::Injection {
                    task: task.clone(),
                    source: workflow::RunError::NoSuchTask(task.clone()),
                }
                .into());
            }
            let reader = File::open(file).map_err(|source| InputError::InjectionUnreadable {
                task: task.clone(),
                path: file.clone(),
                source,
            })?;
            let output: Value = serde_json::from_reader(reader).map_err(|source| {
                InputError::InjectionUnparsable {
                    task: task.clone(),
                    path: file.clone(),
                    source,
                }
            })?;
            println!(
                "Setting output of UI task \"{}\" to contents of {}",
                task,
                file.display()
            );
            self.runner
                .set_output(task, output)
                .map_err(|source| InputError::Injection {
                    task: task.clone(),
                    source,
                })?;
        }
        if !directives.is_empty() {
            println!();
        }
        Ok(())
    }

    /// Runs the workflow to the end, writes every declared output and
    /// checkpoints the finished runner.
    pub fn run_workflow(&mut self) -> Result<()> {
        self.transition(Phase::Running);
        self.runner.run()?;

        println!("DONE. Output directory:");
        println!("     {}", self.absolute_outdir().display());

        let written = self.write_outputs();
        let saved = self.save_checkpoint();
        written?;
        saved?;
        self.transition(Phase::Completed);
        Ok(())
    }

    fn write_outputs(&self) -> Result<()> {
        for name in self.runner.workflow.outputfields() {
            let value = self.runner.getoutput(name)?;
            let path = write_output(name, &value, &self.outdir)?;
            debug!(output = name, path = ?path, "output written");
        }
        Ok(())
    }

    /// Runs only the preprocessing stage. The prepared structure goes to
    /// `prep.pdb`, every other output of the stage to `prep.json`.
    pub fn run_preprocessing(&mut self) -> Result<()> {
        let task = self.runner.preprocess()?.clone();

        println!("FINISHED preprocessing. Output directory:");
        println!("     {}", self.absolute_outdir().display());

        let written = self.write_prep_outputs(&task);
        let saved = self.save_checkpoint();
        written?;
        saved?;
        self.transition(Phase::Preprocessed);
        Ok(())
    }

    fn write_prep_outputs(&self, task: &workflow::Task) -> Result<()> {
        let write_error = |name: &str| {
            let name = name.to_string();
            move |source| Error::OutputWrite { name, source }
        };
        let mut resultjson = Map::new();
        for (field, value) in task.outputs().into_iter().flatten() {
            if field == PDB_FIELD {
                let pdbstring = match value.to_json() {
                    Value::String(text) => text,
                    other => other.to_string(),
                };
                std::fs::write(self.outdir.join(PREP_PDB_FILE), pdbstring)
                    .map_err(write_error(PREP_PDB_FILE))?;
            } else {
                resultjson.insert(field.clone(), value.to_json());
            }
        }
        to_spaced_json(&resultjson)
            .and_then(|bytes| std::fs::write(self.outdir.join(PREP_JSON_FILE), bytes))
            .map_err(write_error(PREP_JSON_FILE))?;
        Ok(())
    }
}

/// Whole command: output directory, fresh or restarted runner, injected
/// outputs, then either preprocessing or a full run. Returns the output
/// directory.
pub fn main_flow(config: &RunConfig) -> Result<PathBuf> {
    let outdir = make_output_dir(config)?;

    let mut driver = if config.restart {
        if config.preprocess {
            warn!("--preprocess is ignored when restarting a workflow");
        }
        WorkflowDriver::restart(config, outdir)?
    } else {
        WorkflowDriver::fresh(config, outdir)?
    };

    driver.set_ui_outputs(&config.setoutput)?;

    if config.preprocess && !config.restart {
        driver.run_preprocessing()?;
    } else {
        driver.run_workflow()?;
    }
    Ok(driver.outdir)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::BackendFlags;
    use workflow::{Binding, OutputValue, RunError, RunnerKind, TaskSpec, Workflow};

    fn emit(name: &str, json: &str) -> TaskSpec {
        let script = format!("printf '%s' '{}' > outputs.json && echo {} finished", json, name);
        TaskSpec::compute(name, "toolkit", &["sh", "-c", &script])
    }

    fn test_workflow() -> Workflow {
        Workflow::new("Vertical detachment energy")
            .task(
                emit("prep_molecule", r#"{"pdbstring": "HETATM    1  O", "charge": -1}"#)
                    .input("description", Binding::Job),
            )
            .preprocess_here()
            .task(TaskSpec::front_end("confirm_molecule", "Confirm the structure"))
            .task(
                emit(
                    "vde_calculation",
                    r#"{"label": "phenoxide", "results": {"vde": 2.25}, "vde": 2.25}"#,
                )
                .output_of("charge", "confirm_molecule", "charge"),
            )
            .output("label", "vde_calculation", "label")
            .output("results", "vde_calculation", "results")
            .output("vde", "vde_calculation", "vde")
            .output("vde.log", "vde_calculation", "stdout")
    }

    fn test_runner(kind: RunnerKind) -> Runner {
        let job = serde_json::from_str(r#"{"smiles": "[O-]c1ccccc1"}"#).unwrap();
        Runner::new(kind, None, "vde", test_workflow(), job)
    }

    fn restart_config(checkpoint: &Path, backend: BackendFlags) -> RunConfig {
        RunConfig {
            appname: "vde".to_string(),
            inputfile: checkpoint.to_str().unwrap().to_string(),
            outputdir: None,
            restart: true,
            preprocess: false,
            setoutput: vec![],
            backend,
        }
    }

    fn confirmation(directory: &Path) -> OutputDirective {
        let file = directory.join("confirm.json");
        std::fs::write(&file, r#"{"charge": -1, "multiplicity": 1}"#).unwrap();
        OutputDirective {
            task: "confirm_molecule".to_string(),
            file,
        }
    }

    #[test]
    fn preprocessing_splits_structure_from_data() {
        let outdir = tempfile::tempdir().unwrap();
        let mut driver = WorkflowDriver::new(
            test_runner(RunnerKind::SerialRuntime),
            outdir.path().to_path_buf(),
            Phase::Fresh,
        );
        driver.run_preprocessing().unwrap();
        assert_eq!(driver.phase(), Phase::Preprocessed);
        assert_eq!(
            std::fs::read_to_string(outdir.path().join(PREP_PDB_FILE)).unwrap(),
            "HETATM    1  O"
        );
        let prep = std::fs::read_to_string(outdir.path().join(PREP_JSON_FILE)).unwrap();
        let prep: Value = serde_json::from_str(&prep).unwrap();
        assert_eq!(prep["charge"], -1);
        assert!(prep.get(PDB_FIELD).is_none());
        let saved = checkpoint::load(&checkpoint::state_path(outdir.path())).unwrap();
        assert!(saved.tasks["prep_molecule"].is_finished());
        assert!(!saved.tasks["vde_calculation"].is_finished());
    }

    #[test]
    fn full_run_writes_outputs_and_checkpoint() {
        let outdir = tempfile::tempdir().unwrap();
        let mut driver = WorkflowDriver::new(
            test_runner(RunnerKind::SerialRuntime),
            outdir.path().to_path_buf(),
            Phase::Fresh,
        );
        driver.set_ui_outputs(&[confirmation(outdir.path())]).unwrap();
        driver.run_workflow().unwrap();
        assert_eq!(driver.phase(), Phase::Completed);
        let read = |name: &str| std::fs::read_to_string(outdir.path().join(name)).unwrap();
        assert_eq!(read("label"), "phenoxide");
        assert_eq!(read("results.json"), r#"{"vde": 2.25}"#);
        assert_eq!(read("vde.log"), "vde_calculation finished\n");
        assert_eq!(
            crate::blob::read::<Value>(&outdir.path().join("vde.json.zst")).unwrap(),
            serde_json::json!(2.25)
        );
        let saved = checkpoint::load(&checkpoint::state_path(outdir.path())).unwrap();
        assert_eq!(&saved, driver.runner());
    }

    #[test]
    fn injected_output_wins_over_computation() {
        let outdir = tempfile::tempdir().unwrap();
        let file = outdir.path().join("out.json");
        std::fs::write(&file, r#"{"x": 1}"#).unwrap();
        let mut driver = WorkflowDriver::new(
            test_runner(RunnerKind::SerialRuntime),
            outdir.path().to_path_buf(),
            Phase::Fresh,
        );
        driver
            .set_ui_outputs(&[OutputDirective {
                task: "prep_molecule".to_string(),
                file,
            }])
            .unwrap();
        let task = &driver.runner().tasks["prep_molecule"];
        assert_eq!(Value::Object(task.output_json().unwrap()), serde_json::json!({"x": 1}));
        driver.run_preprocessing().unwrap();
        assert_eq!(
            driver.runner().tasks["prep_molecule"].getoutput("x").unwrap(),
            &OutputValue::Opaque(serde_json::json!(1))
        );
        assert!(!outdir.path().join(PREP_PDB_FILE).exists());
    }

    #[test]
    fn unknown_task_cannot_be_injected() {
        let outdir = tempfile::tempdir().unwrap();
        let mut driver = WorkflowDriver::new(
            test_runner(RunnerKind::SerialRuntime),
            outdir.path().to_path_buf(),
            Phase::Fresh,
        );
        let directive = OutputDirective {
            task: "select_atoms".to_string(),
            file: outdir.path().join("never-read.json"),
        };
        assert!(matches!(
            driver.set_ui_outputs(&[directive]),
            Err(Error::Input(InputError::Injection { task, .. })) if task == "select_atoms"
        ));
    }

    #[test]
    fn failed_run_keeps_previous_checkpoint() {
        let outdir = tempfile::tempdir().unwrap();
        let mut driver = WorkflowDriver::new(
            test_runner(RunnerKind::SerialRuntime),
            outdir.path().to_path_buf(),
            Phase::Fresh,
        );
        driver.run_preprocessing().unwrap();
        let state = checkpoint::state_path(outdir.path());
        let before = std::fs::read(&state).unwrap();
        assert!(matches!(
            driver.run_workflow(),
            Err(Error::Execution(RunError::AwaitingInput { task, prompt }))
                if task == "confirm_molecule" && prompt == "Confirm the structure"
        ));
        assert_eq!(std::fs::read(&state).unwrap(), before);
    }

    #[test]
    fn restart_resumes_with_compatible_backend() {
        let previous = tempfile::tempdir().unwrap();
        let mut driver = WorkflowDriver::new(
            test_runner(RunnerKind::SerialRuntime),
            previous.path().to_path_buf(),
            Phase::Fresh,
        );
        driver.run_preprocessing().unwrap();

        let outdir = tempfile::tempdir().unwrap();
        let config = restart_config(
            &checkpoint::state_path(previous.path()),
            BackendFlags {
                here: true,
                ..Default::default()
            },
        );
        let mut driver = WorkflowDriver::restart(&config, outdir.path().to_path_buf()).unwrap();
        assert_eq!(driver.phase(), Phase::Restarted);
        assert!(driver.runner().tasks["prep_molecule"].is_finished());
        driver.set_ui_outputs(&[confirmation(outdir.path())]).unwrap();
        driver.run_workflow().unwrap();
        assert!(outdir.path().join("results.json").exists());
    }

    #[test]
    fn restart_rejects_other_runner_kind() {
        let previous = tempfile::tempdir().unwrap();
        let state = checkpoint::state_path(previous.path());
        checkpoint::save(&test_runner(RunnerKind::SerialRuntime), &state).unwrap();

        let config = restart_config(
            &state,
            BackendFlags {
                localdocker: true,
                ..Default::default()
            },
        );
        let outdir = tempfile::tempdir().unwrap();
        assert!(matches!(
            WorkflowDriver::restart(&config, outdir.path().to_path_buf()),
            Err(Error::Config(ConfigError::IncompatibleRunner {
                saved: RunnerKind::SerialRuntime,
                selected: RunnerKind::SerialCloudCompute,
            }))
        ));
    }
}
