//! Pre-run input validation.
//!
//! Everything here runs before any network or filesystem side effect. The
//! first failing rule wins; failures are never aggregated.

use std::fmt;

use preflight_types::{ConfigKey, RawValue, FLAG_PREFIX};
use tracing::debug;

use crate::config::ConfigurationError;
use crate::flags::{embedded_submit_marker, FlagSnapshot};
use crate::settings::Settings;

/// A credential required for submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    CertificationProjectId,
    PyxisApiToken,
}

impl Credential {
    pub fn key(self) -> ConfigKey {
        match self {
            Credential::CertificationProjectId => ConfigKey::CertificationProjectId,
            Credential::PyxisApiToken => ConfigKey::PyxisApiToken,
        }
    }

    fn flag_name(self) -> &'static str {
        match self {
            Credential::CertificationProjectId => "certification-project-id",
            Credential::PyxisApiToken => "pyxis-api-token",
        }
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Credential::CertificationProjectId => "certification project id",
            Credential::PyxisApiToken => "pyxis api token",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("a container image positional argument is required (got {got})")]
    PositionalArgs { got: usize },

    #[error("--{first} and --{second} cannot be used together")]
    MutuallyExclusive {
        first: &'static str,
        second: &'static str,
    },

    #[error("{0} must be specified when --submit is present")]
    MissingCredential(Credential),

    #[error("{0} cannot be empty when --submit is present")]
    EmptyCredential(Credential),

    #[error("pyxis api token and certification project id are required when --submit is present")]
    MalformedCredential,

    #[error(
        "certification project id: {id} is improperly formatted, see help command for instructions on obtaining proper value"
    )]
    MalformedProjectId { id: String },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Outcome of a successful positional-argument check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedArgs {
    pub image: String,
    /// Submission was requested directly or through an embedded marker.
    pub submit_requested: bool,
}

/// Require exactly one image argument, then the submission prerequisites if
/// submission was requested.
///
/// Accepted submission intent is recorded as an override of `submit`, so a
/// marker-only request reaches the run as well.
pub fn validate_positional_args(
    args: &[String],
    flags: &FlagSnapshot,
    settings: &mut Settings,
) -> Result<ValidatedArgs, ValidationError> {
    let [image] = args else {
        return Err(ValidationError::PositionalArgs { got: args.len() });
    };

    let submit_requested = submit_requested(flags, settings)?;
    if submit_requested {
        check_submission_prerequisites(flags, settings)?;
        settings.set(ConfigKey::Submit, RawValue::Bool(true));
    }

    Ok(ValidatedArgs {
        image: image.clone(),
        submit_requested,
    })
}

/// Submission intent from the resolved `submit` key or the embedded marker rule.
pub fn submit_requested(
    flags: &FlagSnapshot,
    settings: &Settings,
) -> Result<bool, ValidationError> {
    if settings.get_bool(ConfigKey::Submit)? {
        return Ok(true);
    }
    if embedded_submit_marker(flags) {
        debug!("found --submit embedded in a flag value, treating as submission");
        return Ok(true);
    }
    Ok(false)
}

/// The credential checks, in their required evaluation order.
pub fn check_submission_prerequisites(
    flags: &FlagSnapshot,
    settings: &Settings,
) -> Result<(), ValidationError> {
    const CREDENTIALS: [Credential; 2] =
        [Credential::CertificationProjectId, Credential::PyxisApiToken];

    // Not on the command line and not from any other source.
    for cred in CREDENTIALS {
        if !flags.changed(cred.flag_name()) && !settings.is_set(cred.key()) {
            return Err(ValidationError::MissingCredential(cred));
        }
    }

    // Typed on the command line, but empty.
    for cred in CREDENTIALS {
        if flags.changed(cred.flag_name()) && settings.get_text(cred.key()).is_empty() {
            return Err(ValidationError::EmptyCredential(cred));
        }
    }

    // A value that is itself a flag means the parser swallowed the next flag.
    if CREDENTIALS
        .iter()
        .any(|c| settings.get_text(c.key()).starts_with(FLAG_PREFIX))
    {
        return Err(ValidationError::MalformedCredential);
    }

    Ok(())
}

/// `--submit` and `--insecure` may not both be given on the command line.
pub fn validate_flag_groups(flags: &FlagSnapshot) -> Result<(), ValidationError> {
    if flags.changed("submit") && flags.changed("insecure") {
        return Err(ValidationError::MutuallyExclusive {
            first: "submit",
            second: "insecure",
        });
    }
    Ok(())
}
