//! The execution context threaded through a run.
//!
//! It carries the logging handle, cancellation, an optional deadline and,
//! once the orchestrator binds it, the artifacts writer.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::artifacts::ArtifactsWriter;

/// Proof that logging was initialized, and where the log file lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogContext {
    log_file: Option<PathBuf>,
}

impl LogContext {
    pub fn new(log_file: Option<PathBuf>) -> Self {
        Self { log_file }
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Default)]
pub struct RunContext {
    logger: Option<LogContext>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
    artifacts: Option<Arc<dyn ArtifactsWriter>>,
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("logger", &self.logger)
            .field("cancelled", &self.is_cancelled())
            .field("deadline", &self.deadline)
            .field(
                "artifacts",
                &self.artifacts.as_ref().map(|w| w.path().to_path_buf()),
            )
            .finish()
    }
}

impl RunContext {
    /// A context with no logger, no deadline and a fresh cancellation token.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_logger(mut self, logger: LogContext) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// A child context with `writer` bound. The parent is left untouched, so
    /// the binding lives exactly as long as the child.
    pub fn with_artifacts_writer(&self, writer: Arc<dyn ArtifactsWriter>) -> Self {
        Self {
            artifacts: Some(writer),
            ..self.clone()
        }
    }

    pub fn logger(&self) -> Option<&LogContext> {
        self.logger.as_ref()
    }

    pub fn artifacts_writer(&self) -> Option<&dyn ArtifactsWriter> {
        self.artifacts.as_deref()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancelled explicitly or past the deadline.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}
