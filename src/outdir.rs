use std::path::{Path, PathBuf};

use crate::{config::RunConfig, error::ConfigError};

/// Creates a local output directory to hold the results.
///
/// Without an explicit directory a new `<appname>.out.<n>` is always created,
/// so earlier results are never overwritten. An explicit directory is created
/// if needed and otherwise reused as is.
pub fn make_output_dir(config: &RunConfig) -> Result<PathBuf, ConfigError> {
    let outdir = match &config.outputdir {
        Some(outdir) => {
            if !outdir.exists() {
                std::fs::create_dir_all(outdir)
                    .map_err(|err| ConfigError::OutputDirectory(outdir.clone(), err))?;
            }
            outdir.clone()
        }
        None => next_output_dir(Path::new(""), &config.appname)?,
    };
    println!(
        "Running workflow \"{}\" with input \"{}\".\nOutputs will be written to \"{}\".",
        config.appname,
        config.inputfile,
        outdir.display()
    );
    Ok(outdir)
}

/// Creates the first unused `<appname>.out.<n>` under `parent`.
pub fn next_output_dir(parent: &Path, appname: &str) -> Result<PathBuf, ConfigError> {
    let mut index = 0;
    loop {
        let candidate = parent.join(format!("{}.out.{}", appname, index));
        if !candidate.exists() {
            std::fs::create_dir(&candidate)
                .map_err(|err| ConfigError::OutputDirectory(candidate.clone(), err))?;
            return Ok(candidate);
        }
        index += 1;
    }
}

#[test]
fn repeated_runs_get_distinct_directories() {
    let parent = tempfile::tempdir().unwrap();
    let first = next_output_dir(parent.path(), "minimize").unwrap();
    let second = next_output_dir(parent.path(), "minimize").unwrap();
    assert_eq!(first, parent.path().join("minimize.out.0"));
    assert_eq!(second, parent.path().join("minimize.out.1"));
    assert!(first.is_dir() && second.is_dir());
}

#[test]
fn explicit_directory_is_reused() {
    let parent = tempfile::tempdir().unwrap();
    let outdir = parent.path().join("results").join("run");
    let config = RunConfig {
        appname: "vde".to_string(),
        inputfile: "job.json".to_string(),
        outputdir: Some(outdir.clone()),
        restart: false,
        preprocess: false,
        setoutput: vec![],
        backend: Default::default(),
    };
    std::fs::create_dir_all(&outdir).unwrap();
    std::fs::write(outdir.join("results.json"), "{}").unwrap();
    assert_eq!(make_output_dir(&config).unwrap(), outdir);
    assert!(outdir.join("results.json").exists());
}
