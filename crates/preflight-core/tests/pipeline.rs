//! Stage ordering and failure propagation of a preflight run.

use std::cell::RefCell;
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use preflight_core::{
    CancellationToken, CheckConfig, CheckEngine, CheckError, LogContext, MemoryWriter,
    NoopSubmitter, ResponseFormatter, ResultSubmitter, ResultWriter, RunContext, RunError,
    SubmitError, check_container_run, new_by_name, run_preflight,
};
use preflight_domain::{FlagSnapshot, FlagValue, Settings, validate_positional_args};
use preflight_testkit::sample_results;
use preflight_types::{ConfigKey, RawValue, Results};
use tempfile::TempDir;

// =========================================================================
// Recording collaborators
// =========================================================================

type Events = Rc<RefCell<Vec<String>>>;

struct FakeEngine {
    outcome: Result<Results, fn() -> CheckError>,
}

impl FakeEngine {
    fn passing() -> Self {
        Self {
            outcome: Ok(sample_results::passing()),
        }
    }

    fn failing_with(err: fn() -> CheckError) -> Self {
        Self { outcome: Err(err) }
    }
}

impl CheckEngine for FakeEngine {
    fn run(&self, _ctx: &RunContext) -> Result<Results, CheckError> {
        match &self.outcome {
            Ok(r) => Ok(r.clone()),
            Err(make) => Err(make()),
        }
    }
}

struct RecordingWriter {
    events: Events,
    fail: bool,
}

struct Sink {
    name: String,
    events: Events,
    buf: Vec<u8>,
}

impl Write for Sink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.events
            .borrow_mut()
            .push(format!("wrote {} ({} bytes)", self.name, self.buf.len()));
        Ok(())
    }
}

impl ResultWriter for RecordingWriter {
    fn open_file(&self, path: &Path) -> io::Result<Box<dyn Write>> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Box::new(Sink {
            name,
            events: self.events.clone(),
            buf: Vec::new(),
        }))
    }
}

struct RecordingSubmitter {
    events: Events,
    fail: bool,
}

impl ResultSubmitter for RecordingSubmitter {
    fn submit(&self, _ctx: &RunContext) -> Result<(), SubmitError> {
        self.events.borrow_mut().push("submit".to_string());
        if self.fail {
            Err(SubmitError::NoArtifactsWriter)
        } else {
            Ok(())
        }
    }
}

struct Harness {
    events: Events,
    ctx: RunContext,
}

impl Harness {
    fn new() -> Self {
        let ctx = RunContext::new()
            .with_logger(LogContext::new(None))
            .with_artifacts_writer(Arc::new(MemoryWriter::new("/artifacts")));
        Self {
            events: Rc::default(),
            ctx,
        }
    }

    fn writer(&self, fail: bool) -> RecordingWriter {
        RecordingWriter {
            events: self.events.clone(),
            fail,
        }
    }

    fn submitter(&self, fail: bool) -> RecordingSubmitter {
        RecordingSubmitter {
            events: self.events.clone(),
            fail,
        }
    }

    fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }
}

fn json() -> Box<dyn ResponseFormatter> {
    new_by_name("json").unwrap()
}

fn submitting() -> CheckConfig {
    CheckConfig {
        include_junit_results: false,
        submit_results: true,
    }
}

// =========================================================================
// run_preflight
// =========================================================================

#[test]
fn results_are_persisted_before_submission() {
    let h = Harness::new();
    let outcome = run_preflight(
        &h.ctx,
        &FakeEngine::passing(),
        submitting(),
        json().as_ref(),
        &h.writer(false),
        &h.submitter(false),
    )
    .unwrap();

    assert!(outcome.passed);
    assert_eq!(outcome.results_path, Path::new("/artifacts/results.json"));
    let events = h.events();
    assert_eq!(events.len(), 2);
    assert!(events[0].starts_with("wrote results.json"));
    assert_eq!(events[1], "submit");
}

#[test]
fn no_submission_when_not_submitting() {
    let h = Harness::new();
    run_preflight(
        &h.ctx,
        &FakeEngine::passing(),
        CheckConfig::default(),
        json().as_ref(),
        &h.writer(false),
        &h.submitter(false),
    )
    .unwrap();
    assert!(!h.events().iter().any(|e| e == "submit"));
}

#[test]
fn junit_results_are_written_when_requested() {
    let h = Harness::new();
    run_preflight(
        &h.ctx,
        &FakeEngine::passing(),
        CheckConfig {
            include_junit_results: true,
            submit_results: false,
        },
        json().as_ref(),
        &h.writer(false),
        &h.submitter(false),
    )
    .unwrap();
    let events = h.events();
    assert!(events[0].starts_with("wrote results.json"));
    assert!(events[1].starts_with("wrote results-junit.xml"));
}

#[test]
fn non_json_format_still_leaves_json_for_the_submitter() {
    let h = Harness::new();
    let text = new_by_name("text").unwrap();
    let outcome = run_preflight(
        &h.ctx,
        &FakeEngine::passing(),
        submitting(),
        text.as_ref(),
        &h.writer(false),
        &h.submitter(false),
    )
    .unwrap();
    assert!(String::from_utf8(outcome.output).unwrap().starts_with("## preflight: PASSED"));
    let events = h.events();
    assert!(events[0].starts_with("wrote results.txt"));
    assert!(events[1].starts_with("wrote results.json"));
    assert_eq!(events[2], "submit");
}

#[test]
fn engine_failure_stops_before_persistence() {
    let h = Harness::new();
    let err = run_preflight(
        &h.ctx,
        &FakeEngine::failing_with(|| CheckError::NoArtifactsWriter),
        submitting(),
        json().as_ref(),
        &h.writer(false),
        &h.submitter(false),
    )
    .unwrap_err();
    assert!(matches!(err, RunError::CheckExecution(_)));
    assert!(h.events().is_empty());
}

#[test]
fn cancellation_is_distinct_from_execution_failure() {
    let h = Harness::new();
    let err = run_preflight(
        &h.ctx,
        &FakeEngine::failing_with(|| CheckError::Cancelled),
        CheckConfig::default(),
        json().as_ref(),
        &h.writer(false),
        &h.submitter(false),
    )
    .unwrap_err();
    assert!(matches!(err, RunError::Cancelled));
}

#[test]
fn persistence_failure_prevents_submission() {
    let h = Harness::new();
    let err = run_preflight(
        &h.ctx,
        &FakeEngine::passing(),
        submitting(),
        json().as_ref(),
        &h.writer(true),
        &h.submitter(false),
    )
    .unwrap_err();
    assert!(matches!(err, RunError::Persistence { .. }));
    assert!(h.events().is_empty());
}

#[test]
fn submission_failure_is_reported_after_persisting() {
    let h = Harness::new();
    let err = run_preflight(
        &h.ctx,
        &FakeEngine::passing(),
        submitting(),
        json().as_ref(),
        &h.writer(false),
        &h.submitter(true),
    )
    .unwrap_err();
    assert!(matches!(err, RunError::Submission(_)));
    assert_eq!(h.events().len(), 2);
}

#[test]
fn unbound_artifacts_writer_is_a_context_error() {
    let h = Harness::new();
    let err = run_preflight(
        &RunContext::new(),
        &FakeEngine::passing(),
        CheckConfig::default(),
        json().as_ref(),
        &h.writer(false),
        &h.submitter(false),
    )
    .unwrap_err();
    assert!(matches!(err, RunError::Context(_)));
}

// =========================================================================
// check_container_run
// =========================================================================

fn settings_in(dir: &Path) -> Settings {
    let mut s = Settings::new();
    s.set(
        ConfigKey::Artifacts,
        RawValue::Str(dir.join("artifacts").display().to_string()),
    );
    s.set(ConfigKey::Platform, RawValue::Str("amd64".to_string()));
    s
}

fn logged() -> RunContext {
    RunContext::new().with_logger(LogContext::new(None))
}

#[test]
fn missing_logger_is_a_context_error() {
    let td = TempDir::new().unwrap();
    let err = check_container_run(
        &RunContext::new(),
        "quay.io/r/n:v",
        &settings_in(td.path()),
        &run_preflight,
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid execution context: invalid logging configuration"
    );
    assert!(!td.path().join("artifacts").exists());
}

#[test]
fn unparseable_setting_is_a_configuration_error() {
    let td = TempDir::new().unwrap();
    let mut s = settings_in(td.path());
    s.set(ConfigKey::Submit, RawValue::Str("maybe".to_string()));
    let err = check_container_run(&logged(), "quay.io/r/n:v", &s, &run_preflight).unwrap_err();
    assert!(matches!(err, RunError::Configuration(_)));
}

#[test]
fn unknown_formatter_fails_after_artifacts_are_prepared() {
    let td = TempDir::new().unwrap();
    let mut s = settings_in(td.path());
    s.set(ConfigKey::ResponseFormat, RawValue::Str("yaml".to_string()));
    let err = check_container_run(&logged(), "quay.io/r/n:v", &s, &run_preflight).unwrap_err();
    assert!(matches!(err, RunError::Formatter(_)));
    assert!(td.path().join("artifacts").is_dir());
}

#[test]
fn artifacts_path_that_is_a_file_is_an_artifacts_error() {
    let td = TempDir::new().unwrap();
    std::fs::write(td.path().join("artifacts"), "taken").unwrap();
    let err = check_container_run(
        &logged(),
        "quay.io/r/n:v",
        &settings_in(td.path()),
        &run_preflight,
    )
    .unwrap_err();
    assert!(matches!(err, RunError::Artifacts { .. }));
}

#[test]
fn cancelled_context_surfaces_as_cancelled() {
    let td = TempDir::new().unwrap();
    let token = CancellationToken::new();
    token.cancel();
    let ctx = logged().with_cancellation(token);
    let err = check_container_run(
        &ctx,
        "quay.io/r/n:v",
        &settings_in(td.path()),
        &run_preflight,
    )
    .unwrap_err();
    assert!(matches!(err, RunError::Cancelled));
}

#[test]
fn end_to_end_run_writes_results_and_reference() {
    let td = TempDir::new().unwrap();
    let outcome = check_container_run(
        &logged(),
        "quay.io/repo-name/container-name:version",
        &settings_in(td.path()),
        &run_preflight,
    )
    .unwrap();

    assert!(outcome.passed);
    let artifacts = td.path().join("artifacts");
    assert_eq!(outcome.results_path, artifacts.join("results.json"));
    let written: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&outcome.results_path).unwrap()).unwrap();
    assert_eq!(written["image"], "quay.io/repo-name/container-name:version");
    assert_eq!(written["passed"], true);
    assert!(artifacts.join("image-reference.json").is_file());
}

#[test]
fn insecure_run_never_submits() {
    let td = TempDir::new().unwrap();
    let mut s = settings_in(td.path());
    s.set(ConfigKey::Insecure, RawValue::Bool(true));
    s.set(ConfigKey::Submit, RawValue::Bool(true));
    s.set(ConfigKey::CertificationProjectId, RawValue::Str("123".to_string()));
    s.set(ConfigKey::PyxisApiToken, RawValue::Str("tok".to_string()));

    let submitted = Rc::new(RefCell::new(None));
    let seen = submitted.clone();
    let spy = move |ctx: &RunContext,
                    engine: &dyn CheckEngine,
                    cfg: CheckConfig,
                    f: &dyn ResponseFormatter,
                    w: &dyn ResultWriter,
                    sub: &dyn ResultSubmitter| {
        *seen.borrow_mut() = Some(cfg.submit_results);
        run_preflight(ctx, engine, cfg, f, w, sub)
    };

    check_container_run(&logged(), "quay.io/r/n:v", &s, &spy).unwrap();
    assert_eq!(*submitted.borrow(), Some(false));
}

#[test]
fn embedded_submit_marker_reaches_the_run() {
    let td = TempDir::new().unwrap();
    let mut s = settings_in(td.path());
    s.set_flag(ConfigKey::PyxisEnv, RawValue::Str("qa--submit".to_string()));
    s.load_env(|name| match name {
        "PFLT_CERTIFICATION_PROJECT_ID" => Some("123".to_string()),
        "PFLT_PYXIS_API_TOKEN" => Some("tok".to_string()),
        _ => None,
    });
    let flags = FlagSnapshot::new(vec![FlagValue::changed("pyxis-env", "qa--submit")]);
    let image = vec!["quay.io/r/n:v".to_string()];
    validate_positional_args(&image, &flags, &mut s).unwrap();

    let seen = Rc::new(RefCell::new(None));
    let record = seen.clone();
    let spy = move |ctx: &RunContext,
                    engine: &dyn CheckEngine,
                    cfg: CheckConfig,
                    f: &dyn ResponseFormatter,
                    w: &dyn ResultWriter,
                    sub: &dyn ResultSubmitter| {
        *record.borrow_mut() = Some((cfg.submit_results, sub.submits()));
        // Stay offline: swap in a submitter that sends nothing.
        run_preflight(ctx, engine, cfg, f, w, &NoopSubmitter::default())
    };

    check_container_run(&logged(), &image[0], &s, &spy).unwrap();
    assert_eq!(*seen.borrow(), Some((true, true)));
}
