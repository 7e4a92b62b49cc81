//! Runs the chemworkflows binary end to end. None of these reach a compute
//! backend, they stop at the first failing stage and check its exit status.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn chemworkflows_cmd(workdir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("chemworkflows").unwrap();
    cmd.current_dir(workdir.path()).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_flags() {
    let workdir = TempDir::new().unwrap();
    chemworkflows_cmd(&workdir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--restart"))
        .stdout(predicate::str::contains("--setoutput"))
        .stdout(predicate::str::contains("--localdocker"))
        .stdout(predicate::str::contains("--preprocess"))
        .stdout(predicate::str::contains(
            "Vertical detachment energy of an anionic molecule",
        ))
        .stdout(predicate::str::contains(
            "Energy minimization with an assigned force field",
        ));
}

#[test]
fn test_unknown_application_is_rejected() {
    let workflow_dir = TempDir::new().unwrap();
    chemworkflows_cmd(&workflow_dir)
        .args(["md", r#"{"smiles": "C"}"#])
        .assert()
        .failure()
        .stderr(predicate::str::contains("minimize"))
        .stderr(predicate::str::contains("vde"));
    assert!(fs::read_dir(workflow_dir.path()).unwrap().next().is_none());
}

#[test]
fn test_conflicting_backends() {
    let workdir = TempDir::new().unwrap();
    chemworkflows_cmd(&workdir)
        .args(["minimize", r#"{"smiles": "C"}"#, "--localdocker", "--here"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains(
            "--localdocker and --here cannot be used together",
        ));
}

#[test]
fn test_output_directory_is_numbered() {
    let workdir = TempDir::new().unwrap();
    chemworkflows_cmd(&workdir)
        .args(["vde", r#"{"smiles": "C"}"#, "--localdocker", "--here"])
        .assert()
        .code(3)
        .stdout(predicate::str::contains("Outputs will be written to \"vde.out.0\""));
    assert!(workdir.path().join("vde.out.0").is_dir());
}

#[test]
fn test_missing_input_file() {
    let workdir = TempDir::new().unwrap();
    chemworkflows_cmd(&workdir)
        .args(["minimize", "missing.yml", "--here"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unable to read input file"));
}

#[test]
fn test_several_discriminators() {
    let workdir = TempDir::new().unwrap();
    chemworkflows_cmd(&workdir)
        .args(["minimize", r#"{"smiles": "C", "pdb": "3aid"}"#, "--here"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid job description"));
}

#[test]
fn test_malformed_setoutput() {
    let workdir = TempDir::new().unwrap();
    chemworkflows_cmd(&workdir)
        .args([
            "vde",
            r#"{"smiles": "C"}"#,
            "--here",
            "--setoutput",
            "confirm_molecule",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("taskname=outputfile"));
}

#[test]
fn test_restart_from_plain_file() {
    let workdir = TempDir::new().unwrap();
    let checkpoint = workdir.path().join("workflow_state.json.zst");
    fs::write(&checkpoint, "not a checkpoint").unwrap();
    chemworkflows_cmd(&workdir)
        .args(["vde", "workflow_state.json.zst", "--restart", "--here"])
        .assert()
        .code(6)
        .stderr(predicate::str::contains("checkpoint"));
}

#[test]
fn test_yaml_input_reaches_execution() {
    let workdir = TempDir::new().unwrap();
    fs::write(workdir.path().join("ethanol.yml"), "smiles: CCO\n").unwrap();
    chemworkflows_cmd(&workdir)
        .env("PATH", workdir.path())
        .args(["minimize", "ethanol.yml", "--here", "--preprocess", "--outputdir", "out"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("read_molecule"));
    assert!(workdir.path().join("out").is_dir());
    assert!(!workdir.path().join("out").join("workflow_state.json.zst").exists());
}
