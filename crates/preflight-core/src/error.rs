use std::path::PathBuf;

use preflight_domain::ConfigurationError;

use crate::engine::CheckError;
use crate::formatters::FormatterError;
use crate::submit::SubmitError;

/// Everything that can stop a run once validation has passed.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("invalid execution context: {0}")]
    Context(&'static str),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("could not prepare artifacts directory {}: {source}", .path.display())]
    Artifacts {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Formatter(#[from] FormatterError),

    #[error("check execution failed: {0}")]
    CheckExecution(#[source] CheckError),

    #[error("check execution was cancelled")]
    Cancelled,

    #[error("could not write results to {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not submit results: {0}")]
    Submission(#[from] SubmitError),
}
