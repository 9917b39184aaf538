//! The typed run configuration rendered from [`Settings`].

use std::path::PathBuf;

use preflight_types::{ApiToken, ConfigKey, PyxisEnv};
use tracing::debug;

use crate::settings::Settings;

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("invalid configuration: {key} must be a boolean, got {value:?}")]
    NotABool { key: ConfigKey, value: String },

    #[error("invalid configuration: {key} must not be empty")]
    Empty { key: ConfigKey },
}

/// Everything one invocation needs, resolved from all configuration sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfiguration {
    pub certification_project_id: String,
    pub pyxis_api_token: ApiToken,
    /// Always populated: either the explicit override or the host of `pyxis_env`.
    pub pyxis_host: String,
    pub pyxis_env: String,
    pub platform: String,
    pub submit: bool,
    pub insecure: bool,
    pub docker_config: String,
    pub artifacts: PathBuf,
    pub log_file: PathBuf,
    pub log_level: String,
    pub write_junit: bool,
    pub response_format: String,
}

impl RunConfiguration {
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigurationError> {
        let pyxis_env = settings.get_text(ConfigKey::PyxisEnv);
        let pyxis_host = pyxis_host_lookup(&pyxis_env, &settings.get_text(ConfigKey::PyxisHost));

        let artifacts = settings.get_text(ConfigKey::Artifacts);
        if artifacts.is_empty() {
            return Err(ConfigurationError::Empty {
                key: ConfigKey::Artifacts,
            });
        }

        Ok(Self {
            certification_project_id: settings.get_text(ConfigKey::CertificationProjectId),
            pyxis_api_token: ApiToken::new(settings.get_text(ConfigKey::PyxisApiToken)),
            pyxis_host,
            pyxis_env,
            platform: settings.get_text(ConfigKey::Platform),
            submit: settings.get_bool(ConfigKey::Submit)?,
            insecure: settings.get_bool(ConfigKey::Insecure)?,
            docker_config: settings.get_text(ConfigKey::DockerConfig),
            artifacts: PathBuf::from(artifacts),
            log_file: PathBuf::from(settings.get_text(ConfigKey::LogFile)),
            log_level: settings.get_text(ConfigKey::LogLevel),
            write_junit: settings.get_bool(ConfigKey::Junit)?,
            response_format: settings.get_text(ConfigKey::ResponseFormat),
        })
    }
}

/// Resolve the Pyxis host: an explicit override wins, otherwise the host of
/// the named environment, falling back to production for unknown names.
pub fn pyxis_host_lookup(pyxis_env: &str, host_override: &str) -> String {
    if !host_override.is_empty() {
        return host_override.to_string();
    }

    match PyxisEnv::from_name(pyxis_env) {
        Some(env) => env.host().to_string(),
        None => {
            debug!(pyxis_env, "unknown pyxis environment, using prod");
            PyxisEnv::Prod.host().to_string()
        }
    }
}

/// The architecture of the running host, spelled the way image platforms are.
pub fn host_platform() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64le",
        "x86" => "386",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use preflight_types::RawValue;

    #[test]
    fn host_override_wins() {
        assert_eq!(pyxis_host_lookup("qa", "pyxis.example.com/api"), "pyxis.example.com/api");
    }

    #[test]
    fn host_follows_env() {
        assert_eq!(
            pyxis_host_lookup("stage", ""),
            "catalog.stage.redhat.com/api/containers"
        );
        assert_eq!(
            pyxis_host_lookup("nope", ""),
            "catalog.redhat.com/api/containers"
        );
    }

    #[test]
    fn renders_defaults() {
        let cfg = RunConfiguration::from_settings(&Settings::new()).unwrap();
        assert!(!cfg.submit);
        assert!(!cfg.insecure);
        assert_eq!(cfg.pyxis_env, "prod");
        assert_eq!(cfg.pyxis_host, "catalog.redhat.com/api/containers");
        assert_eq!(cfg.platform, host_platform());
        assert_eq!(cfg.artifacts, PathBuf::from("artifacts"));
        assert_eq!(cfg.log_file, PathBuf::from("preflight.log"));
        assert_eq!(cfg.response_format, "json");
    }

    #[test]
    fn type_mismatch_is_reported() {
        let mut s = Settings::new();
        s.set_flag(ConfigKey::Junit, RawValue::Str("yes please".to_string()));
        let err = RunConfiguration::from_settings(&s).unwrap_err();
        assert!(err.to_string().contains("junit must be a boolean"));
    }

    #[test]
    fn debug_output_hides_token() {
        let mut s = Settings::new();
        s.set_flag(
            ConfigKey::PyxisApiToken,
            RawValue::Str("hunter2-token".to_string()),
        );
        let cfg = RunConfiguration::from_settings(&s).unwrap();
        assert!(!format!("{cfg:?}").contains("hunter2"));
    }
}
