//! Config file loading with include resolution.
//!
//! A config file may list other files under `includes`; they are loaded
//! first, in order, and the including file is merged on top. Paths are
//! resolved relative to the including file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::debug;

use preflight_types::{ConfigFile, DEFAULT_CONFIG_FILE};

/// Maximum depth for include resolution to prevent excessive nesting.
const MAX_INCLUDE_DEPTH: usize = 10;

/// Locate and load the config file for this invocation.
///
/// An explicit `--config` path must exist. Without one, `./preflight.toml`
/// is used when present and an empty config otherwise.
pub fn load_config<F>(explicit: Option<&Path>, expand_env: F) -> Result<ConfigFile>
where
    F: Fn(&str) -> Result<String> + Copy,
{
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default.is_file() {
                debug!("no {DEFAULT_CONFIG_FILE} in the working directory");
                return Ok(ConfigFile::default());
            }
            default
        }
    };
    load_config_with_includes(&path, expand_env)
}

/// Load `path`, resolving `includes` recursively.
pub fn load_config_with_includes<F>(path: &Path, expand_env: F) -> Result<ConfigFile>
where
    F: Fn(&str) -> Result<String> + Copy,
{
    let mut visited = HashSet::new();
    load_config_recursive(path, expand_env, &mut visited, 0)
}

fn load_config_recursive<F>(
    path: &Path,
    expand_env: F,
    visited: &mut HashSet<PathBuf>,
    depth: usize,
) -> Result<ConfigFile>
where
    F: Fn(&str) -> Result<String> + Copy,
{
    if depth > MAX_INCLUDE_DEPTH {
        bail!(
            "include depth exceeded maximum of {} levels at '{}'",
            MAX_INCLUDE_DEPTH,
            path.display()
        );
    }

    let canonical = path
        .canonicalize()
        .with_context(|| format!("canonicalize path '{}'", path.display()))?;
    if !visited.insert(canonical) {
        bail!("circular include detected: '{}'", path.display());
    }

    debug!("loading config from '{}' (depth {})", path.display(), depth);

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config '{}'", path.display()))?;
    let expanded = expand_env(&text)?;
    let mut config: ConfigFile =
        toml::from_str(&expanded).with_context(|| format!("parse config '{}'", path.display()))?;

    let includes = std::mem::take(&mut config.includes);
    if includes.is_empty() {
        return Ok(config);
    }

    let base_dir = path.parent().unwrap_or(Path::new("."));
    let mut merged = ConfigFile::default();
    for include in &includes {
        let full_path = base_dir.join(include);
        if !full_path.exists() {
            bail!(
                "included config file not found: '{}' (resolved from '{}')",
                full_path.display(),
                include
            );
        }
        let included = load_config_recursive(&full_path, expand_env, visited, depth + 1)?;
        merged = merged.merged_with(included);
    }

    Ok(merged.merged_with(config))
}
