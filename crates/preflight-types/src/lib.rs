//! Data types (config + results) for preflight.
//!
//! This crate is intentionally "dumb": pure DTOs with serde + schemars, plus the
//! frozen vocabulary of configuration keys shared by every other crate.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

// ── Schema Identifiers ─────────────────────────────────────────
pub const RESULTS_SCHEMA_V1: &str = "preflight.results.v1";

// ── Defaults ───────────────────────────────────────────────────
pub const ENV_PREFIX: &str = "PFLT_";
pub const DEFAULT_PYXIS_ENV: &str = "prod";
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";
pub const DEFAULT_LOGFILE: &str = "preflight.log";
pub const DEFAULT_LOGLEVEL: &str = "info";
pub const DEFAULT_RESPONSE_FORMAT: &str = "json";
pub const DEFAULT_CONFIG_FILE: &str = "preflight.toml";

/// File stem of the formatted results written into the artifacts directory.
pub const RESULTS_FILENAME: &str = "results";
pub const JUNIT_RESULTS_FILENAME: &str = "results-junit.xml";

/// First part of a legacy two-part certification project identifier.
pub const LEGACY_PROJECT_ID_PREFIX: &str = "ospid";

/// Textual marker of submission intent, scanned for in other flag values.
pub const SUBMIT_MARKER: &str = "--submit";

/// Prefix that identifies a token which is itself a command-line flag.
pub const FLAG_PREFIX: &str = "--";

// ── Configuration Keys ─────────────────────────────────────────

/// Every configuration key preflight recognizes.
///
/// Each key has three spellings: the canonical snake_case name used in the
/// config file, the kebab-case flag name (when it is exposed as a flag), and
/// the `PFLT_` environment variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigKey {
    Submit,
    Insecure,
    PyxisApiToken,
    PyxisHost,
    PyxisEnv,
    CertificationProjectId,
    Platform,
    DockerConfig,
    Artifacts,
    LogFile,
    LogLevel,
    Junit,
    ResponseFormat,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 13] = [
        ConfigKey::Submit,
        ConfigKey::Insecure,
        ConfigKey::PyxisApiToken,
        ConfigKey::PyxisHost,
        ConfigKey::PyxisEnv,
        ConfigKey::CertificationProjectId,
        ConfigKey::Platform,
        ConfigKey::DockerConfig,
        ConfigKey::Artifacts,
        ConfigKey::LogFile,
        ConfigKey::LogLevel,
        ConfigKey::Junit,
        ConfigKey::ResponseFormat,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::Submit => "submit",
            ConfigKey::Insecure => "insecure",
            ConfigKey::PyxisApiToken => "pyxis_api_token",
            ConfigKey::PyxisHost => "pyxis_host",
            ConfigKey::PyxisEnv => "pyxis_env",
            ConfigKey::CertificationProjectId => "certification_project_id",
            ConfigKey::Platform => "platform",
            ConfigKey::DockerConfig => "docker_config",
            ConfigKey::Artifacts => "artifacts",
            ConfigKey::LogFile => "logfile",
            ConfigKey::LogLevel => "loglevel",
            ConfigKey::Junit => "junit",
            ConfigKey::ResponseFormat => "response_format",
        }
    }

    /// The command-line flag bound to this key, if any.
    pub fn flag_name(self) -> Option<&'static str> {
        match self {
            ConfigKey::Submit => Some("submit"),
            ConfigKey::Insecure => Some("insecure"),
            ConfigKey::PyxisApiToken => Some("pyxis-api-token"),
            ConfigKey::PyxisHost => Some("pyxis-host"),
            ConfigKey::PyxisEnv => Some("pyxis-env"),
            ConfigKey::CertificationProjectId => Some("certification-project-id"),
            ConfigKey::Platform => Some("platform"),
            _ => None,
        }
    }

    pub fn env_var(self) -> String {
        match self {
            // Kept without the underscore for compatibility with existing CI setups.
            ConfigKey::DockerConfig => format!("{ENV_PREFIX}DOCKERCONFIG"),
            other => format!("{ENV_PREFIX}{}", other.as_str().to_ascii_uppercase()),
        }
    }

    pub fn from_flag_name(flag: &str) -> Option<ConfigKey> {
        Self::ALL.into_iter().find(|k| k.flag_name() == Some(flag))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Pyxis Environments ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PyxisEnv {
    Prod,
    Uat,
    Qa,
    Stage,
}

impl PyxisEnv {
    pub fn as_str(self) -> &'static str {
        match self {
            PyxisEnv::Prod => "prod",
            PyxisEnv::Uat => "uat",
            PyxisEnv::Qa => "qa",
            PyxisEnv::Stage => "stage",
        }
    }

    pub fn from_name(name: &str) -> Option<PyxisEnv> {
        match name {
            "prod" => Some(PyxisEnv::Prod),
            "uat" => Some(PyxisEnv::Uat),
            "qa" => Some(PyxisEnv::Qa),
            "stage" => Some(PyxisEnv::Stage),
            _ => None,
        }
    }

    /// Host and API path of the Pyxis instance for this environment.
    pub fn host(self) -> &'static str {
        match self {
            PyxisEnv::Prod => "catalog.redhat.com/api/containers",
            PyxisEnv::Uat => "catalog.uat.redhat.com/api/containers",
            PyxisEnv::Qa => "catalog.qa.redhat.com/api/containers",
            PyxisEnv::Stage => "catalog.stage.redhat.com/api/containers",
        }
    }
}

// ── Secrets ────────────────────────────────────────────────────

/// A Pyxis API token.
///
/// Never printed: `Debug` and `Display` both render `[REDACTED]`. The backing
/// memory is zeroized on drop. Use [`ApiToken::expose_secret`] at the single
/// point where the value has to leave the process (the HTTP header).
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Drop for ApiToken {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken([REDACTED])")
    }
}

impl fmt::Display for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

// ── Config File ────────────────────────────────────────────────

/// The on-disk configuration file (`preflight.toml`).
///
/// Every field is optional; unset fields fall through to lower-precedence
/// sources.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Include other config files. Paths are relative to this config file's directory.
    /// Later definitions override earlier ones key by key.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pyxis_api_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pyxis_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pyxis_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certification_project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_config: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logfile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loglevel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub junit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<String>,
}

/// A value as it arrives from one configuration layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Bool(bool),
    Str(String),
}

impl RawValue {
    pub fn as_text(&self) -> String {
        match self {
            RawValue::Bool(b) => b.to_string(),
            RawValue::Str(s) => s.clone(),
        }
    }
}

impl ConfigFile {
    /// Flatten the file into `(key, value)` pairs for the settings layer.
    pub fn entries(&self) -> Vec<(ConfigKey, RawValue)> {
        let mut out = Vec::new();
        let mut push_bool = |key, v: Option<bool>| {
            if let Some(v) = v {
                out.push((key, RawValue::Bool(v)));
            }
        };
        push_bool(ConfigKey::Submit, self.submit);
        push_bool(ConfigKey::Insecure, self.insecure);
        push_bool(ConfigKey::Junit, self.junit);

        let strings = [
            (ConfigKey::PyxisApiToken, &self.pyxis_api_token),
            (ConfigKey::PyxisHost, &self.pyxis_host),
            (ConfigKey::PyxisEnv, &self.pyxis_env),
            (ConfigKey::CertificationProjectId, &self.certification_project_id),
            (ConfigKey::Platform, &self.platform),
            (ConfigKey::DockerConfig, &self.docker_config),
            (ConfigKey::Artifacts, &self.artifacts),
            (ConfigKey::LogFile, &self.logfile),
            (ConfigKey::LogLevel, &self.loglevel),
            (ConfigKey::ResponseFormat, &self.response_format),
        ];
        for (key, v) in strings {
            if let Some(v) = v {
                out.push((key, RawValue::Str(v.clone())));
            }
        }
        out
    }

    /// Overlay `other` on top of `self`; fields set in `other` win.
    pub fn merged_with(self, other: ConfigFile) -> ConfigFile {
        ConfigFile {
            includes: vec![],
            submit: other.submit.or(self.submit),
            insecure: other.insecure.or(self.insecure),
            pyxis_api_token: other.pyxis_api_token.or(self.pyxis_api_token),
            pyxis_host: other.pyxis_host.or(self.pyxis_host),
            pyxis_env: other.pyxis_env.or(self.pyxis_env),
            certification_project_id: other
                .certification_project_id
                .or(self.certification_project_id),
            platform: other.platform.or(self.platform),
            docker_config: other.docker_config.or(self.docker_config),
            artifacts: other.artifacts.or(self.artifacts),
            logfile: other.logfile.or(self.logfile),
            loglevel: other.loglevel.or(self.loglevel),
            junit: other.junit.or(self.junit),
            response_format: other.response_format.or(self.response_format),
        }
    }
}

// ── Check Results ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CheckResult {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub help: String,
    pub elapsed_ms: u64,
    /// Why the check failed or errored; empty for passing checks.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
}

/// Everything the check engine produced for one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Results {
    pub schema: String,
    pub tested_image: String,
    pub platform: String,
    /// RFC 3339 timestamp of when the checks ran.
    pub tested_on: String,
    pub passed_overall: bool,
    pub passed: Vec<CheckResult>,
    pub failed: Vec<CheckResult>,
    pub errors: Vec<CheckResult>,
}

impl Results {
    pub fn empty(image: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            schema: RESULTS_SCHEMA_V1.to_string(),
            tested_image: image.into(),
            platform: platform.into(),
            tested_on: String::new(),
            passed_overall: true,
            passed: vec![],
            failed: vec![],
            errors: vec![],
        }
    }

    pub fn total(&self) -> usize {
        self.passed.len() + self.failed.len() + self.errors.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TestLibrary {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UserResults {
    pub passed: Vec<CheckResult>,
    pub failed: Vec<CheckResult>,
    pub errors: Vec<CheckResult>,
}

/// The JSON document handed to users (and to Pyxis) for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UserResponse {
    pub image: String,
    pub passed: bool,
    pub platform: String,
    pub tested_on: String,
    pub test_library: TestLibrary,
    pub results: UserResults,
}

impl UserResponse {
    pub fn from_results(results: &Results, library: TestLibrary) -> Self {
        Self {
            image: results.tested_image.clone(),
            passed: results.passed_overall,
            platform: results.platform.clone(),
            tested_on: results.tested_on.clone(),
            test_library: library,
            results: UserResults {
                passed: results.passed.clone(),
                failed: results.failed.clone(),
                errors: results.errors.clone(),
            },
        }
    }
}
