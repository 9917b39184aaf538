//! Result submission: a real Pyxis submitter and a no-op stand-in.

use std::path::{Path, PathBuf};

use preflight_domain::RunConfiguration;
use preflight_types::{RESULTS_FILENAME, UserResponse};
use tracing::{info, warn};

use crate::context::RunContext;
use crate::pyxis::{ArtifactUpload, PyxisClient, PyxisError};

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("no artifacts writer bound to the run context")]
    NoArtifactsWriter,

    #[error("could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a valid results document: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Pyxis(#[from] PyxisError),
}

pub trait ResultSubmitter {
    fn submit(&self, ctx: &RunContext) -> Result<(), SubmitError>;

    /// Whether [`ResultSubmitter::submit`] sends anything anywhere.
    fn submits(&self) -> bool {
        false
    }
}

/// Submits nothing. Logs why when asked to.
#[derive(Debug, Clone, Default)]
pub struct NoopSubmitter {
    emit_log: bool,
    reason: Option<String>,
}

impl NoopSubmitter {
    pub fn new(emit_log: bool, reason: Option<String>) -> Self {
        Self { emit_log, reason }
    }
}

impl ResultSubmitter for NoopSubmitter {
    fn submit(&self, _ctx: &RunContext) -> Result<(), SubmitError> {
        if self.emit_log {
            let reason = self
                .reason
                .as_deref()
                .unwrap_or("set the --submit flag to submit");
            info!(reason, "results are not being submitted");
        }
        Ok(())
    }
}

/// Sends the JSON results and the log file to Pyxis.
#[derive(Debug)]
pub struct PyxisSubmitter {
    client: PyxisClient,
    docker_config: String,
    log_file: PathBuf,
}

impl PyxisSubmitter {
    pub fn new(client: PyxisClient, docker_config: impl Into<String>, log_file: PathBuf) -> Self {
        Self {
            client,
            docker_config: docker_config.into(),
            log_file,
        }
    }

    fn read_results(&self, artifacts: &Path) -> Result<UserResponse, SubmitError> {
        let path = artifacts.join(format!("{RESULTS_FILENAME}.json"));
        let raw = std::fs::read(&path).map_err(|source| SubmitError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_slice(&raw).map_err(|source| SubmitError::Parse { path, source })
    }
}

impl ResultSubmitter for PyxisSubmitter {
    fn submit(&self, ctx: &RunContext) -> Result<(), SubmitError> {
        let artifacts = ctx
            .artifacts_writer()
            .ok_or(SubmitError::NoArtifactsWriter)?
            .path()
            .to_path_buf();

        let project = self.client.get_project()?;
        info!(
            project = %self.client.project_id(),
            name = %project.name,
            status = %project.project_status,
            "submitting results"
        );
        if self.docker_config.is_empty() {
            warn!("no docker config provided; image is assumed to be publicly pullable");
        }

        let response = self.read_results(&artifacts)?;
        self.client.submit_test_results(&response)?;

        match std::fs::read(&self.log_file) {
            Ok(raw) => {
                let filename = self
                    .log_file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "preflight.log".to_string());
                let upload =
                    ArtifactUpload::new(self.client.project_id(), &filename, "text/plain", &raw);
                self.client.upload_artifact(&upload)?;
            }
            Err(e) => warn!("log file {} not uploaded: {e}", self.log_file.display()),
        }

        info!(
            "results submitted for certification project {}",
            self.client.project_id()
        );
        Ok(())
    }

    fn submits(&self) -> bool {
        true
    }
}

/// A client is only possible with both a project id and a token.
pub fn new_pyxis_client(cfg: &RunConfiguration) -> Option<PyxisClient> {
    if cfg.certification_project_id.is_empty() || cfg.pyxis_api_token.is_empty() {
        return None;
    }
    Some(PyxisClient::new(
        cfg.pyxis_host.clone(),
        cfg.pyxis_api_token.clone(),
        cfg.certification_project_id.clone(),
    ))
}

/// Pick the submitter for this run. Never fails: anything short of a
/// submitting configuration with a usable client gets a [`NoopSubmitter`].
pub fn resolve_submitter(
    client: Option<PyxisClient>,
    cfg: &RunConfiguration,
) -> Box<dyn ResultSubmitter> {
    match client {
        Some(client) if cfg.submit => Box::new(PyxisSubmitter::new(
            client,
            cfg.docker_config.clone(),
            cfg.log_file.clone(),
        )),
        Some(_) => Box::new(NoopSubmitter::new(true, None)),
        None => Box::new(NoopSubmitter::new(
            cfg.submit,
            Some("certification project id and pyxis api token are required".to_string()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use preflight_domain::Settings;
    use preflight_types::{ApiToken, ConfigKey, RawValue};
    use tempfile::TempDir;

    fn config(submit: bool, id: &str, token: &str) -> RunConfiguration {
        let mut settings = Settings::new();
        settings.set(ConfigKey::Submit, RawValue::Bool(submit));
        settings.set(ConfigKey::CertificationProjectId, RawValue::Str(id.to_string()));
        settings.set(ConfigKey::PyxisApiToken, RawValue::Str(token.to_string()));
        RunConfiguration::from_settings(&settings).unwrap()
    }

    #[test]
    fn client_needs_id_and_token() {
        assert!(new_pyxis_client(&config(true, "", "t")).is_none());
        assert!(new_pyxis_client(&config(true, "1", "")).is_none());
        let c = new_pyxis_client(&config(true, "1", "t")).unwrap();
        assert_eq!(c.project_id(), "1");
        assert_eq!(
            c.host(),
            "catalog.redhat.com/api/containers",
            "default pyxis_env is prod"
        );
    }

    #[test]
    fn noop_always_succeeds() {
        let s = NoopSubmitter::new(true, Some("testing".to_string()));
        assert!(s.submit(&RunContext::new()).is_ok());
    }

    #[test]
    fn read_results_reports_missing_and_invalid_files() {
        let td = TempDir::new().unwrap();
        let s = PyxisSubmitter::new(
            PyxisClient::new("h", ApiToken::new("t"), "1"),
            "",
            td.path().join("preflight.log"),
        );
        assert!(matches!(
            s.read_results(td.path()),
            Err(SubmitError::Read { .. })
        ));

        std::fs::write(td.path().join("results.json"), "not json").unwrap();
        assert!(matches!(
            s.read_results(td.path()),
            Err(SubmitError::Parse { .. })
        ));
    }

    #[test]
    fn pyxis_submitter_needs_a_bound_writer() {
        let s = PyxisSubmitter::new(
            PyxisClient::new("h", ApiToken::new("t"), "1"),
            "",
            PathBuf::from("preflight.log"),
        );
        assert!(matches!(
            s.submit(&RunContext::new()),
            Err(SubmitError::NoArtifactsWriter)
        ));
    }

    #[test]
    fn full_credentials_without_submit_resolve_to_noop() {
        let cfg = config(false, "123", "tok");
        let client = new_pyxis_client(&cfg);
        assert!(client.is_some());
        assert!(!resolve_submitter(client, &cfg).submits());
    }

    #[test]
    fn submit_with_credentials_resolves_to_pyxis() {
        let cfg = config(true, "123", "tok");
        assert!(resolve_submitter(new_pyxis_client(&cfg), &cfg).submits());
    }

    #[test]
    fn submit_without_client_resolves_to_noop() {
        let cfg = config(true, "", "tok");
        assert!(!resolve_submitter(new_pyxis_client(&cfg), &cfg).submits());
    }
}
