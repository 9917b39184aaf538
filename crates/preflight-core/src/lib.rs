//! Run orchestration for preflight.
//!
//! Given validated settings this crate builds the run configuration, prepares
//! the artifacts directory, runs the container check engine, formats and
//! persists results and optionally submits them to Pyxis.

pub mod artifacts;
pub mod check_container;
pub mod checks;
pub mod context;
pub mod engine;
pub mod error;
pub mod formatters;
pub mod pyxis;
pub mod reference;
pub mod run;
pub mod submit;
pub mod writer;

pub use artifacts::{ArtifactsWriter, FilesystemWriter, MemoryWriter};
pub use check_container::check_container_run;
pub use checks::{Check, CheckTarget, Verdict};
pub use context::{CancellationToken, LogContext, RunContext};
pub use engine::{CheckEngine, CheckError, ContainerCheck, EngineSettings};
pub use error::RunError;
pub use formatters::{FormatterError, ResponseFormatter, new_by_name};
pub use pyxis::{PyxisClient, PyxisError};
pub use reference::{ImageReference, ReferenceError};
pub use run::{CheckConfig, RunOutcome, RunPreflightFn, run_preflight};
pub use submit::{
    NoopSubmitter, PyxisSubmitter, ResultSubmitter, SubmitError, new_pyxis_client,
    resolve_submitter,
};
pub use writer::{ResultWriter, ResultWriterFile};
