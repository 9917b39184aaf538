//! Set up everything a container check run needs, then hand over to the
//! run function.

use std::sync::Arc;

use preflight_domain::{RunConfiguration, Settings, generate_container_check_options};
use tracing::{debug, info};

use crate::artifacts::FilesystemWriter;
use crate::context::RunContext;
use crate::engine::ContainerCheck;
use crate::error::RunError;
use crate::formatters::new_by_name;
use crate::run::{CheckConfig, RunOutcome, RunPreflightFn};
use crate::submit::{new_pyxis_client, resolve_submitter};
use crate::writer::ResultWriterFile;

/// Check one container image with validated `settings`.
///
/// Stages run in order and the first failure is returned: logging context,
/// configuration, artifacts directory, formatter, options, submitter, then
/// `run` itself.
pub fn check_container_run(
    ctx: &RunContext,
    image: &str,
    settings: &Settings,
    run: &RunPreflightFn,
) -> Result<RunOutcome, RunError> {
    ctx.logger()
        .ok_or(RunError::Context("invalid logging configuration"))?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        "certification library version"
    );

    let mut cfg = RunConfiguration::from_settings(settings)?;

    let artifacts = FilesystemWriter::new(&cfg.artifacts).map_err(|source| {
        RunError::Artifacts {
            path: cfg.artifacts.clone(),
            source,
        }
    })?;
    let ctx = ctx.with_artifacts_writer(Arc::new(artifacts));

    let formatter = new_by_name(&cfg.response_format)?;

    let opts = generate_container_check_options(&mut cfg);
    let engine = ContainerCheck::new(image, opts);

    let submitter = resolve_submitter(new_pyxis_client(&cfg), &cfg);
    debug!(
        submit = cfg.submit,
        submits = submitter.submits(),
        "submitter resolved"
    );

    run(
        &ctx,
        &engine,
        CheckConfig {
            include_junit_results: cfg.write_junit,
            submit_results: cfg.submit,
        },
        formatter.as_ref(),
        &ResultWriterFile,
        submitter.as_ref(),
    )
}
