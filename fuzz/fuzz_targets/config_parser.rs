//! Fuzz target for `preflight.toml` parsing and settings layering.
//!
//! Arbitrary text must never panic the parser, and whatever parses must load
//! into [`Settings`] and render into a run configuration or a typed error.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use preflight_domain::{RunConfiguration, Settings};
use preflight_types::ConfigFile;

#[derive(Arbitrary, Debug)]
struct FuzzConfig {
    use_structured: bool,
    raw: String,
    structured: StructuredConfig,
}

#[derive(Arbitrary, Debug)]
struct StructuredConfig {
    submit: Option<bool>,
    insecure: Option<bool>,
    junit: Option<bool>,
    certification_project_id: Option<String>,
    pyxis_api_token: Option<String>,
    pyxis_env: Option<String>,
    platform: Option<String>,
    artifacts: Option<String>,
}

impl StructuredConfig {
    fn to_toml_string(&self) -> String {
        let mut out = String::new();
        let bools = [
            ("submit", self.submit),
            ("insecure", self.insecure),
            ("junit", self.junit),
        ];
        for (key, value) in bools {
            if let Some(v) = value {
                out.push_str(&format!("{key} = {v}\n"));
            }
        }
        let strings = [
            ("certification_project_id", &self.certification_project_id),
            ("pyxis_api_token", &self.pyxis_api_token),
            ("pyxis_env", &self.pyxis_env),
            ("platform", &self.platform),
            ("artifacts", &self.artifacts),
        ];
        for (key, value) in strings {
            if let Some(v) = value {
                out.push_str(&format!("{key} = {}\n", escape_toml_string(v)));
            }
        }
        out
    }
}

fn escape_toml_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fuzz_target!(|input: FuzzConfig| {
    let text = if input.use_structured {
        input.structured.to_toml_string()
    } else {
        if input.raw.len() > 10_000 {
            return;
        }
        input.raw
    };

    let Ok(file) = toml::from_str::<ConfigFile>(&text) else {
        return;
    };

    let mut settings = Settings::new();
    settings.load_file(&file);
    if let Ok(cfg) = RunConfiguration::from_settings(&settings) {
        // The host is always resolved.
        assert!(!cfg.pyxis_host.is_empty());
        assert!(!cfg.artifacts.as_os_str().is_empty());
    }
});
