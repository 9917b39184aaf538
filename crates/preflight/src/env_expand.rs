//! `${VAR}` / `${VAR:-default}` expansion for config file text.
//!
//! `${VAR}` requires VAR to be set. `${VAR:-default}` falls back to
//! `default` when VAR is unset or empty. A `$` not followed by `{` is kept
//! as-is.

use std::borrow::Cow;
use std::sync::OnceLock;

use anyhow::{Result, bail};
use regex::{Captures, Regex};

fn reference_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\{([^}:]*)(?::-([^}]*))?\}").unwrap_or_else(|e| panic!("invalid regex: {e}"))
    })
}

/// Expand references against the process environment.
pub fn expand_env_vars(text: &str) -> Result<Cow<'_, str>> {
    expand_with(text, |name| std::env::var(name).ok())
}

/// Expand references using `lookup` to resolve variable names.
pub fn expand_with<F>(text: &str, lookup: F) -> Result<Cow<'_, str>>
where
    F: Fn(&str) -> Option<String>,
{
    if !text.contains("${") {
        return Ok(Cow::Borrowed(text));
    }

    let mut failure = None;
    let expanded = reference_pattern().replace_all(text, |caps: &Captures<'_>| {
        if failure.is_some() {
            return String::new();
        }
        match resolve(caps, &lookup) {
            Ok(v) => v,
            Err(e) => {
                failure = Some(e);
                String::new()
            }
        }
    });
    if let Some(e) = failure {
        return Err(e);
    }

    // Anything left over never closed.
    let tail_start = last_match_end(text);
    if let Some(pos) = text[tail_start..].find("${") {
        let start = tail_start + pos;
        let snippet: String = text[start + 2..].chars().take(20).collect();
        bail!(
            "unclosed environment variable reference starting at position {}: ${{{}...",
            start,
            snippet
        );
    }

    Ok(Cow::Owned(expanded.into_owned()))
}

fn last_match_end(text: &str) -> usize {
    reference_pattern()
        .find_iter(text)
        .last()
        .map_or(0, |m| m.end())
}

fn resolve<F>(caps: &Captures<'_>, lookup: &F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let name = &caps[1];
    validate_var_name(name)?;
    match caps.get(2) {
        Some(default) => Ok(lookup(name)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.as_str().to_string())),
        None => match lookup(name) {
            Some(v) => Ok(v),
            None => bail!(
                "environment variable '{name}' is not set. \
                 Use ${{{name}:-default}} syntax to provide a default value."
            ),
        },
    }
}

fn validate_var_name(name: &str) -> Result<()> {
    let Some(first) = name.chars().next() else {
        bail!("empty environment variable name in ${{}}");
    };
    if !first.is_ascii_alphabetic() && first != '_' {
        bail!("invalid environment variable name '{name}': must start with a letter or underscore");
    }
    if let Some(c) = name.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '_') {
        bail!("invalid environment variable name '{name}': contains invalid character '{c}'");
    }
    Ok(())
}
