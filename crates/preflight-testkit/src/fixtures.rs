//! Common test fixtures for preflight.

use preflight_types::{CheckResult, ConfigFile, Results};

/// Collection of sample configuration files for testing.
pub mod sample_configs {
    use super::*;

    /// An empty configuration; every key falls through to defaults.
    pub fn empty() -> ConfigFile {
        ConfigFile::default()
    }

    /// A configuration that prepares a submission.
    pub fn submission() -> ConfigFile {
        ConfigFile {
            submit: Some(true),
            certification_project_id: Some("ospid-5f1c2a".to_string()),
            pyxis_api_token: Some("file-token".to_string()),
            pyxis_env: Some("qa".to_string()),
            ..ConfigFile::default()
        }
    }

    /// A configuration for pulling from a plain-HTTP registry.
    pub fn insecure() -> ConfigFile {
        ConfigFile {
            insecure: Some(true),
            platform: Some("arm64".to_string()),
            ..ConfigFile::default()
        }
    }

    /// TOML text of [`submission`].
    pub const SUBMISSION_TOML: &str = r#"submit = true
certification_project_id = "ospid-5f1c2a"
pyxis_api_token = "file-token"
pyxis_env = "qa"
"#;
}

/// Collection of sample check results.
pub mod sample_results {
    use super::*;

    fn check(name: &str, reason: &str) -> CheckResult {
        CheckResult {
            name: name.to_string(),
            description: format!("{name} description"),
            help: String::new(),
            elapsed_ms: 1,
            reason: reason.to_string(),
        }
    }

    /// Every check passed.
    pub fn passing() -> Results {
        let mut r = Results::empty("quay.io/example/app:1.0", "amd64");
        r.tested_on = "2024-01-01T00:00:00+00:00".to_string();
        r.passed = vec![check("ReferenceIsValid", ""), check("HasTagOrDigest", "")];
        r
    }

    /// One failed and one errored check.
    pub fn failing() -> Results {
        let mut r = Results::empty("quay.io/example/app", "amd64");
        r.tested_on = "2024-01-01T00:00:00+00:00".to_string();
        r.passed_overall = false;
        r.passed = vec![check("ReferenceIsValid", "")];
        r.failed = vec![check("HasTagOrDigest", "image reference has no tag or digest")];
        r.errors = vec![check("Flaky", "could not evaluate <check> & friends")];
        r
    }
}
