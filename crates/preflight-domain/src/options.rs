//! Check engine options derived from the run configuration.

use preflight_types::ApiToken;

use crate::config::RunConfiguration;

/// One setting applied to the container check engine. Options are applied in
/// order; a later option of the same kind replaces an earlier one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOption {
    /// Project and credentials used to look the project up in Pyxis.
    CertificationProject { id: String, token: ApiToken },
    /// Path to a docker `config.json` with registry credentials.
    DockerConfigJsonFromFile(String),
    PyxisHost(String),
    Platform(String),
    /// Talk to the registry without TLS verification.
    InsecureConnection,
}

/// Build the ordered option list for the container check.
///
/// Setting `insecure` also turns `submit` off on `cfg`: results gathered over
/// an insecure connection are never submitted.
pub fn generate_container_check_options(cfg: &mut RunConfiguration) -> Vec<CheckOption> {
    let certification_project = || CheckOption::CertificationProject {
        id: cfg.certification_project_id.clone(),
        token: cfg.pyxis_api_token.clone(),
    };

    let mut opts = vec![
        certification_project(),
        CheckOption::DockerConfigJsonFromFile(cfg.docker_config.clone()),
        // The host is always resolved during configuration rendering.
        CheckOption::PyxisHost(cfg.pyxis_host.clone()),
        CheckOption::Platform(cfg.platform.clone()),
    ];

    if !cfg.pyxis_api_token.is_empty() && !cfg.certification_project_id.is_empty() {
        opts.push(certification_project());
    }

    if cfg.insecure {
        cfg.submit = false;
        opts.push(CheckOption::InsecureConnection);
    }

    opts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    fn base_config() -> RunConfiguration {
        RunConfiguration::from_settings(&Settings::new()).unwrap()
    }

    #[test]
    fn always_present_options_in_order() {
        let mut cfg = base_config();
        cfg.docker_config = "/auth.json".to_string();
        cfg.platform = "arm64".to_string();

        let opts = generate_container_check_options(&mut cfg);
        assert_eq!(opts.len(), 4);
        assert!(matches!(opts[0], CheckOption::CertificationProject { .. }));
        assert_eq!(
            opts[1],
            CheckOption::DockerConfigJsonFromFile("/auth.json".to_string())
        );
        assert_eq!(
            opts[2],
            CheckOption::PyxisHost("catalog.redhat.com/api/containers".to_string())
        );
        assert_eq!(opts[3], CheckOption::Platform("arm64".to_string()));
    }

    #[test]
    fn credentials_add_second_project_option() {
        let mut cfg = base_config();
        cfg.certification_project_id = "123".to_string();
        cfg.pyxis_api_token = ApiToken::new("tok");

        let opts = generate_container_check_options(&mut cfg);
        assert_eq!(opts.len(), 5);
        assert_eq!(opts[0], opts[4]);
    }

    #[test]
    fn partial_credentials_do_not_add_second_project_option() {
        let mut cfg = base_config();
        cfg.certification_project_id = "123".to_string();

        let opts = generate_container_check_options(&mut cfg);
        assert_eq!(opts.len(), 4);
    }

    #[test]
    fn insecure_forces_submit_off() {
        let mut cfg = base_config();
        cfg.insecure = true;
        cfg.submit = true;

        let opts = generate_container_check_options(&mut cfg);
        assert_eq!(opts.last(), Some(&CheckOption::InsecureConnection));
        assert!(!cfg.submit);
    }

    #[test]
    fn secure_run_keeps_submit() {
        let mut cfg = base_config();
        cfg.submit = true;

        let opts = generate_container_check_options(&mut cfg);
        assert!(!opts.contains(&CheckOption::InsecureConnection));
        assert!(cfg.submit);
    }
}
