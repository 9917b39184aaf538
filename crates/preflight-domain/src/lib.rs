//! Domain logic: configuration layering, input validation, identifier
//! normalization and check option assembly.
//!
//! This crate is designed to be I/O-free and highly testable. Environment
//! variables and config files are read by the caller and handed in.

pub mod config;
pub mod flags;
pub mod options;
pub mod project_id;
pub mod settings;
pub mod validate;

pub use config::{host_platform, pyxis_host_lookup, ConfigurationError, RunConfiguration};
pub use flags::{embedded_submit_marker, FlagSnapshot, FlagValue};
pub use options::{generate_container_check_options, CheckOption};
pub use project_id::{normalize_project_id, validate_certification_project_id};
pub use settings::{Layer, Settings};
pub use validate::{
    check_submission_prerequisites, submit_requested, validate_flag_groups,
    validate_positional_args, Credential, ValidatedArgs, ValidationError,
};
