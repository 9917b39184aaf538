//! Layered key/value settings.
//!
//! Values arrive from several sources and are resolved by precedence:
//! explicit overrides, then command-line flags, then `PFLT_*` environment
//! variables, then the config file, then built-in defaults. Only flags the
//! user actually typed are recorded in the flag layer, so an untouched flag
//! never shadows the environment.

use std::collections::BTreeMap;
use std::fmt;

use preflight_types::{
    ConfigFile, ConfigKey, RawValue, DEFAULT_ARTIFACTS_DIR, DEFAULT_LOGFILE, DEFAULT_LOGLEVEL,
    DEFAULT_PYXIS_ENV, DEFAULT_RESPONSE_FORMAT,
};

use crate::config::{host_platform, ConfigurationError};

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Layer {
    Override,
    Flag,
    Env,
    File,
    Default,
}

#[derive(Clone)]
pub struct Settings {
    overrides: BTreeMap<ConfigKey, RawValue>,
    flags: BTreeMap<ConfigKey, RawValue>,
    env: BTreeMap<ConfigKey, RawValue>,
    file: BTreeMap<ConfigKey, RawValue>,
    defaults: BTreeMap<ConfigKey, RawValue>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("overrides", &RedactedLayer(&self.overrides))
            .field("flags", &RedactedLayer(&self.flags))
            .field("env", &RedactedLayer(&self.env))
            .field("file", &RedactedLayer(&self.file))
            .field("defaults", &RedactedLayer(&self.defaults))
            .finish()
    }
}

/// Debug view of one layer with the API token masked.
struct RedactedLayer<'a>(&'a BTreeMap<ConfigKey, RawValue>);

impl fmt::Debug for RedactedLayer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in self.0 {
            match key {
                ConfigKey::PyxisApiToken => map.entry(key, &format_args!("[REDACTED]")),
                _ => map.entry(key, value),
            };
        }
        map.finish()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    /// Empty settings with only the built-in defaults populated.
    pub fn new() -> Self {
        let mut defaults = BTreeMap::new();
        let mut def = |key, value| {
            defaults.insert(key, value);
        };
        def(ConfigKey::Submit, RawValue::Bool(false));
        def(ConfigKey::Insecure, RawValue::Bool(false));
        def(ConfigKey::Junit, RawValue::Bool(false));
        def(ConfigKey::PyxisApiToken, RawValue::Str(String::new()));
        def(ConfigKey::PyxisHost, RawValue::Str(String::new()));
        def(
            ConfigKey::PyxisEnv,
            RawValue::Str(DEFAULT_PYXIS_ENV.to_string()),
        );
        def(
            ConfigKey::CertificationProjectId,
            RawValue::Str(String::new()),
        );
        def(
            ConfigKey::Platform,
            RawValue::Str(host_platform().to_string()),
        );
        def(ConfigKey::DockerConfig, RawValue::Str(String::new()));
        def(
            ConfigKey::Artifacts,
            RawValue::Str(DEFAULT_ARTIFACTS_DIR.to_string()),
        );
        def(ConfigKey::LogFile, RawValue::Str(DEFAULT_LOGFILE.to_string()));
        def(
            ConfigKey::LogLevel,
            RawValue::Str(DEFAULT_LOGLEVEL.to_string()),
        );
        def(
            ConfigKey::ResponseFormat,
            RawValue::Str(DEFAULT_RESPONSE_FORMAT.to_string()),
        );

        Self {
            overrides: BTreeMap::new(),
            flags: BTreeMap::new(),
            env: BTreeMap::new(),
            file: BTreeMap::new(),
            defaults,
        }
    }

    /// Record a flag the user set explicitly on the command line.
    pub fn set_flag(&mut self, key: ConfigKey, value: RawValue) {
        self.flags.insert(key, value);
    }

    /// Read `PFLT_*` variables through `lookup`. Empty values count as unset.
    pub fn load_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in ConfigKey::ALL {
            if let Some(value) = lookup(&key.env_var()).filter(|v| !v.is_empty()) {
                self.env.insert(key, RawValue::Str(value));
            }
        }
    }

    pub fn load_file(&mut self, file: &ConfigFile) {
        for (key, value) in file.entries() {
            self.file.insert(key, value);
        }
    }

    /// Force a value, shadowing every other source.
    pub fn set(&mut self, key: ConfigKey, value: RawValue) {
        self.overrides.insert(key, value);
    }

    pub fn source(&self, key: ConfigKey) -> Option<Layer> {
        [
            (Layer::Override, &self.overrides),
            (Layer::Flag, &self.flags),
            (Layer::Env, &self.env),
            (Layer::File, &self.file),
            (Layer::Default, &self.defaults),
        ]
        .into_iter()
        .find(|(_, layer)| layer.contains_key(&key))
        .map(|(l, _)| l)
    }

    /// True when any source other than the built-in defaults provides `key`.
    pub fn is_set(&self, key: ConfigKey) -> bool {
        matches!(self.source(key), Some(l) if l != Layer::Default)
    }

    pub fn get(&self, key: ConfigKey) -> Option<&RawValue> {
        self.overrides
            .get(&key)
            .or_else(|| self.flags.get(&key))
            .or_else(|| self.env.get(&key))
            .or_else(|| self.file.get(&key))
            .or_else(|| self.defaults.get(&key))
    }

    /// The resolved value rendered as text; unknown keys read as "".
    pub fn get_text(&self, key: ConfigKey) -> String {
        self.get(key).map(RawValue::as_text).unwrap_or_default()
    }

    /// The resolved value as a boolean.
    ///
    /// Accepts the spellings `1 t T TRUE true True 0 f F FALSE false False`.
    pub fn get_bool(&self, key: ConfigKey) -> Result<bool, ConfigurationError> {
        match self.get(key) {
            None => Ok(false),
            Some(RawValue::Bool(b)) => Ok(*b),
            Some(RawValue::Str(s)) => parse_bool(s).ok_or_else(|| ConfigurationError::NotABool {
                key,
                value: s.clone(),
            }),
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
