//! A snapshot of the parsed command-line flags.
//!
//! Validation works on this value instead of on process-wide flag state: the
//! binary captures each recognized flag once after parsing and passes the
//! snapshot down.

use std::fmt;

use preflight_types::{ConfigKey, SUBMIT_MARKER};

#[derive(Clone, PartialEq, Eq)]
pub struct FlagValue {
    /// Flag name without the leading dashes, e.g. `certification-project-id`.
    pub name: String,
    /// Textual value, e.g. `"true"` for a set boolean flag.
    pub value: String,
    /// Whether the user typed the flag on the command line.
    pub changed: bool,
}

impl fmt::Debug for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secret = ConfigKey::PyxisApiToken.flag_name() == Some(self.name.as_str());
        let value: &dyn fmt::Debug = if secret { &"[REDACTED]" } else { &self.value };
        f.debug_struct("FlagValue")
            .field("name", &self.name)
            .field("value", value)
            .field("changed", &self.changed)
            .finish()
    }
}

impl FlagValue {
    pub fn changed(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            changed: true,
        }
    }

    pub fn unchanged(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            changed: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSnapshot {
    flags: Vec<FlagValue>,
}

impl FlagSnapshot {
    pub fn new(flags: Vec<FlagValue>) -> Self {
        Self { flags }
    }

    pub fn get(&self, name: &str) -> Option<&FlagValue> {
        self.flags.iter().find(|f| f.name == name)
    }

    pub fn changed(&self, name: &str) -> bool {
        self.get(name).is_some_and(|f| f.changed)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlagValue> {
        self.flags.iter()
    }
}

/// Whether any flag the user set carries `--submit` inside its value.
///
/// `--certification-project-id --submit` makes the parser swallow `--submit`
/// as the project id. The intent to submit is still there, so it is honoured
/// for validation purposes.
pub fn embedded_submit_marker(flags: &FlagSnapshot) -> bool {
    flags
        .iter()
        .any(|f| f.changed && f.value.contains(SUBMIT_MARKER))
}
