use tracing::warn;
use workflow::{Backend, RunnerKind};

use crate::{config::BackendFlags, error::ConfigError};

/// Used when `$CCC` is not set.
pub const DEFAULT_SERVER: &str = "ccc.bionano.autodesk.com:9000";

/// Figures out where the workflow will run and how we'll run it.
pub fn execution_env(flags: &BackendFlags) -> Result<(Option<Backend>, RunnerKind), ConfigError> {
    if flags.localdocker {
        if flags.here {
            return Err(ConfigError::ConflictingBackends);
        }
        Ok((Some(Backend::docker()), RunnerKind::SerialCloudCompute))
    } else if flags.here {
        Ok((None, RunnerKind::SerialRuntime))
    } else {
        let server = match &flags.server {
            Some(server) => server.clone(),
            None => {
                warn!("no CCC server set in environment variable $CCC, using default");
                DEFAULT_SERVER.to_string()
            }
        };
        println!("Using CCC server: {}", server);
        Ok((
            Some(Backend::cloud_compute_cannon(server)),
            RunnerKind::SerialCloudCompute,
        ))
    }
}

#[test]
fn local_docker_uses_cloud_compute_runner() {
    let flags = BackendFlags {
        localdocker: true,
        ..Default::default()
    };
    assert_eq!(
        execution_env(&flags).unwrap(),
        (Some(Backend::docker()), RunnerKind::SerialCloudCompute)
    );
}

#[test]
fn here_runs_without_backend() {
    let flags = BackendFlags {
        here: true,
        server: Some("example.org:9000".to_string()),
        ..Default::default()
    };
    assert_eq!(execution_env(&flags).unwrap(), (None, RunnerKind::SerialRuntime));
}

#[test]
fn docker_and_here_conflict() {
    let flags = BackendFlags {
        localdocker: true,
        here: true,
        server: None,
    };
    assert!(matches!(
        execution_env(&flags),
        Err(ConfigError::ConflictingBackends)
    ));
}

#[test]
fn remote_server_falls_back_to_default() {
    let (backend, kind) = execution_env(&BackendFlags::default()).unwrap();
    assert_eq!(backend, Some(Backend::cloud_compute_cannon(DEFAULT_SERVER)));
    assert_eq!(kind, RunnerKind::SerialCloudCompute);

    let flags = BackendFlags {
        server: Some("localhost:9000".to_string()),
        ..Default::default()
    };
    let (backend, _) = execution_env(&flags).unwrap();
    assert_eq!(backend, Some(Backend::cloud_compute_cannon("localhost:9000")));
}
