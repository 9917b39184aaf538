//! The check engine contract and the container check implementation.

use std::time::Instant;

use preflight_domain::CheckOption;
use preflight_types::{ApiToken, CheckResult, Results};
use tracing::{debug, info, warn};

use crate::checks::{default_checks, Check, CheckTarget, Verdict};
use crate::context::RunContext;
use crate::reference::{ImageReference, ReferenceError};

/// Name of the artifact holding the parsed image reference.
pub const REFERENCE_ARTIFACT: &str = "image-reference.json";

#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("cancelled")]
    Cancelled,

    #[error("invalid image reference {image:?}: {source}")]
    InvalidReference {
        image: String,
        #[source]
        source: ReferenceError,
    },

    #[error("no artifacts writer bound to the run context")]
    NoArtifactsWriter,

    #[error("could not encode artifact {name}: {source}")]
    Encode {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not write artifact {name}: {source}")]
    Artifact {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

fn encode_artifact<T: serde::Serialize>(
    name: &'static str,
    value: &T,
) -> Result<Vec<u8>, CheckError> {
    serde_json::to_vec_pretty(value).map_err(|source| CheckError::Encode { name, source })
}

/// Something that evaluates an image and reports [`Results`].
pub trait CheckEngine {
    fn run(&self, ctx: &RunContext) -> Result<Results, CheckError>;
}

/// Settings the container check runs with, built by applying [`CheckOption`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineSettings {
    pub certification_project_id: String,
    pub pyxis_api_token: ApiToken,
    pub docker_config: String,
    pub pyxis_host: String,
    pub platform: String,
    pub insecure: bool,
}

impl EngineSettings {
    pub fn from_options(opts: impl IntoIterator<Item = CheckOption>) -> Self {
        let mut s = Self::default();
        for opt in opts {
            s.apply(opt);
        }
        s
    }

    pub fn apply(&mut self, opt: CheckOption) {
        match opt {
            CheckOption::CertificationProject { id, token } => {
                self.certification_project_id = id;
                self.pyxis_api_token = token;
            }
            CheckOption::DockerConfigJsonFromFile(path) => self.docker_config = path,
            CheckOption::PyxisHost(host) => self.pyxis_host = host,
            CheckOption::Platform(platform) => self.platform = platform,
            CheckOption::InsecureConnection => self.insecure = true,
        }
    }
}

/// Runs a set of [`Check`]s against one container image.
pub struct ContainerCheck {
    image: String,
    settings: EngineSettings,
    checks: Vec<Box<dyn Check>>,
}

impl ContainerCheck {
    pub fn new(image: impl Into<String>, opts: impl IntoIterator<Item = CheckOption>) -> Self {
        Self {
            image: image.into(),
            settings: EngineSettings::from_options(opts),
            checks: default_checks(),
        }
    }

    /// Replace the default check list.
    pub fn with_checks(mut self, checks: Vec<Box<dyn Check>>) -> Self {
        self.checks = checks;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}

impl CheckEngine for ContainerCheck {
    fn run(&self, ctx: &RunContext) -> Result<Results, CheckError> {
        if ctx.is_cancelled() {
            return Err(CheckError::Cancelled);
        }

        let reference =
            ImageReference::parse(&self.image).map_err(|source| CheckError::InvalidReference {
                image: self.image.clone(),
                source,
            })?;
        info!(image = %reference, platform = %self.settings.platform, "target image");
        if self.settings.insecure {
            warn!("registry connection is insecure");
        }

        let writer = ctx.artifacts_writer().ok_or(CheckError::NoArtifactsWriter)?;
        let json = encode_artifact(REFERENCE_ARTIFACT, &reference)?;
        writer
            .write_file(REFERENCE_ARTIFACT, &json)
            .map_err(|source| CheckError::Artifact {
                name: REFERENCE_ARTIFACT,
                source,
            })?;

        let mut results = Results::empty(&self.image, &self.settings.platform);
        results.tested_on = chrono::Utc::now().to_rfc3339();

        let target = CheckTarget {
            reference: &reference,
            settings: &self.settings,
        };

        for check in &self.checks {
            if ctx.is_cancelled() {
                return Err(CheckError::Cancelled);
            }

            let started = Instant::now();
            let outcome = check.validate(&target);
            let elapsed_ms = started.elapsed().as_millis() as u64;

            let mut result = CheckResult {
                name: check.name().to_string(),
                description: check.description().to_string(),
                help: check.help().to_string(),
                elapsed_ms,
                reason: String::new(),
            };

            match outcome {
                Ok(Verdict::Pass) => {
                    debug!(check = check.name(), "passed");
                    results.passed.push(result);
                }
                Ok(Verdict::Fail(reason)) => {
                    info!(check = check.name(), %reason, "failed");
                    result.reason = reason;
                    results.failed.push(result);
                }
                Err(reason) => {
                    warn!(check = check.name(), %reason, "could not be evaluated");
                    result.reason = reason;
                    results.errors.push(result);
                }
            }
        }

        results.passed_overall = results.failed.is_empty() && results.errors.is_empty();
        Ok(results)
    }
}
