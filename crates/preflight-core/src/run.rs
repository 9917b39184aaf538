//! Drive one check run: execute, format, persist, submit.

use std::io::Write;
use std::path::{Path, PathBuf};

use preflight_types::{JUNIT_RESULTS_FILENAME, RESULTS_FILENAME};
use tracing::{debug, info};

use crate::context::RunContext;
use crate::engine::{CheckEngine, CheckError};
use crate::error::RunError;
use crate::formatters::{JsonFormatter, JunitFormatter, ResponseFormatter};
use crate::submit::ResultSubmitter;
use crate::writer::ResultWriter;

/// What to do after the checks ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckConfig {
    pub include_junit_results: bool,
    pub submit_results: bool,
}

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// The formatted results, as written to `results_path`.
    pub output: Vec<u8>,
    pub results_path: PathBuf,
    pub passed: bool,
}

/// Signature of [`run_preflight`], so callers can substitute it in tests.
pub type RunPreflightFn = dyn Fn(
    &RunContext,
    &dyn CheckEngine,
    CheckConfig,
    &dyn ResponseFormatter,
    &dyn ResultWriter,
    &dyn ResultSubmitter,
) -> Result<RunOutcome, RunError>;

/// Run the checks and deal with their results.
///
/// Results are always persisted before anything is submitted. The first
/// failing stage stops the run; side effects of earlier stages are kept.
pub fn run_preflight(
    ctx: &RunContext,
    engine: &dyn CheckEngine,
    cfg: CheckConfig,
    formatter: &dyn ResponseFormatter,
    writer: &dyn ResultWriter,
    submitter: &dyn ResultSubmitter,
) -> Result<RunOutcome, RunError> {
    let artifacts = ctx
        .artifacts_writer()
        .ok_or(RunError::Context("no artifacts writer bound"))?
        .path()
        .to_path_buf();

    let results = engine.run(ctx).map_err(|e| match e {
        CheckError::Cancelled => RunError::Cancelled,
        other if ctx.is_cancelled() => {
            debug!("engine failed after cancellation: {other}");
            RunError::Cancelled
        }
        other => RunError::CheckExecution(other),
    })?;

    let output = formatter.format(&results)?;
    let results_path = results_file(&artifacts, formatter.file_extension());
    persist(writer, &results_path, &output)?;
    debug!("results written to {}", results_path.display());

    // The submitter reads the JSON document regardless of the display format.
    if cfg.submit_results && formatter.file_extension() != "json" {
        let json = JsonFormatter.format(&results)?;
        persist(writer, &results_file(&artifacts, "json"), &json)?;
    }

    if cfg.include_junit_results {
        let junit = JunitFormatter.format(&results)?;
        let path = artifacts.join(JUNIT_RESULTS_FILENAME);
        persist(writer, &path, &junit)?;
        debug!("junit results written to {}", path.display());
    }

    if cfg.submit_results {
        submitter.submit(ctx)?;
    }

    let verdict = if results.passed_overall {
        "PASSED"
    } else {
        "FAILED"
    };
    info!(
        image = %results.tested_image,
        "preflight result: {verdict}; artifacts in {}",
        artifacts.display()
    );

    Ok(RunOutcome {
        output,
        results_path,
        passed: results.passed_overall,
    })
}

fn results_file(artifacts: &Path, extension: &str) -> PathBuf {
    artifacts.join(format!("{RESULTS_FILENAME}.{extension}"))
}

fn persist(writer: &dyn ResultWriter, path: &Path, contents: &[u8]) -> Result<(), RunError> {
    let to_err = |source| RunError::Persistence {
        path: path.to_path_buf(),
        source,
    };
    let mut file = writer.open_file(path).map_err(to_err)?;
    file.write_all(contents).map_err(to_err)?;
    file.flush().map_err(to_err)
}
