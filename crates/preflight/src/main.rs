use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::parser::ValueSource;
use clap::{ArgMatches, Args, CommandFactory, FromArgMatches, Parser, Subcommand};
use tracing::{debug, warn};

use preflight_core::{LogContext, RunContext, check_container_run, run_preflight};
use preflight_domain::{
    FlagSnapshot, FlagValue, Settings, ValidatedArgs, ValidationError,
    validate_certification_project_id, validate_flag_groups, validate_positional_args,
};
use preflight_types::{ConfigKey, DEFAULT_PYXIS_ENV, RawValue};

mod config_loader;
mod env_expand;

/// Exit code for input that was rejected before anything ran.
const EXIT_USAGE: u8 = 2;

#[derive(Parser)]
#[command(name = "preflight", version)]
#[command(about = "Pre-flight certification checks for container images", long_about = None)]
struct Cli {
    /// Enable verbose (info-level) logging to stderr.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Enable debug-level logging to stderr.
    #[arg(long, global = true)]
    debug: bool,

    /// Path to a config file. If omitted, uses ./preflight.toml if present.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run checks against an artifact.
    #[command(subcommand)]
    Check(CheckCommands),
}

#[derive(Subcommand)]
enum CheckCommands {
    /// Run checks for a container image.
    Container(ContainerArgs),
}

#[derive(Args, Debug)]
struct ContainerArgs {
    /// Container image reference, e.g. quay.io/repo-name/container-name:version.
    #[arg(value_name = "IMAGE")]
    images: Vec<String>,

    /// Submit check container results to Red Hat Partner Connect.
    #[arg(long, short = 's')]
    submit: bool,

    /// Use insecure protocol for the registry. Cannot be combined with --submit.
    #[arg(long)]
    insecure: bool,

    /// API token for Pyxis authentication. (env: PFLT_PYXIS_API_TOKEN)
    #[arg(long, value_name = "TOKEN", allow_hyphen_values = true)]
    pyxis_api_token: Option<String>,

    /// Host and URI path of the Pyxis API; overrides --pyxis-env. (env: PFLT_PYXIS_HOST)
    #[arg(long, value_name = "HOST", allow_hyphen_values = true)]
    pyxis_host: Option<String>,

    /// Pyxis environment to submit to: prod, uat, qa or stage. (env: PFLT_PYXIS_ENV)
    #[arg(long, value_name = "ENV", default_value = DEFAULT_PYXIS_ENV, allow_hyphen_values = true)]
    pyxis_env: String,

    /// Certification project id from connect.redhat.com. (env: PFLT_CERTIFICATION_PROJECT_ID)
    #[arg(long, value_name = "ID", allow_hyphen_values = true)]
    certification_project_id: Option<String>,

    /// Architecture of the image to pull. Defaults to the current platform.
    #[arg(long, value_name = "ARCH", allow_hyphen_values = true)]
    platform: Option<String>,
}

fn main() -> ExitCode {
    match run_with_args(std::env::args_os()) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run_with_args<I, T>(args: I) -> Result<u8>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = Cli::command().get_matches_from(args);
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    match cli.command {
        Commands::Check(CheckCommands::Container(ref args)) => {
            let sub = matches
                .subcommand_matches("check")
                .and_then(|m| m.subcommand_matches("container"))
                .context("container arguments were not parsed")?;
            cmd_check_container(&cli, args, sub)
        }
    }
}

fn cmd_check_container(cli: &Cli, args: &ContainerArgs, matches: &ArgMatches) -> Result<u8> {
    let flags = flag_snapshot(matches);

    let file = config_loader::load_config(cli.config.as_deref(), |text| {
        Ok(env_expand::expand_env_vars(text)?.into_owned())
    })?;
    let mut settings = Settings::new();
    settings.load_file(&file);
    settings.load_env(|name| std::env::var(name).ok());
    apply_flags(&mut settings, &flags);

    let log_sink = init_logging(
        cli.verbose,
        cli.debug,
        &settings.get_text(ConfigKey::LogLevel),
    );

    let validated = match validate(&args.images, &flags, &mut settings) {
        Ok(v) => v,
        Err(err) => {
            eprintln!("Error: {err}\n");
            eprintln!("{}", container_usage());
            return Ok(EXIT_USAGE);
        }
    };
    debug!(image = %validated.image, submit = validated.submit_requested, "arguments validated");

    let log_file = PathBuf::from(settings.get_text(ConfigKey::LogFile));
    let logger =
        log_sink.attach((!log_file.as_os_str().is_empty()).then_some(log_file.as_path()));

    let ctx = RunContext::new().with_logger(logger);
    let outcome = check_container_run(&ctx, &validated.image, &settings, &run_preflight)
        .context("preflight check failed")?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&outcome.output).context("write results to stdout")?;
    stdout.flush().context("flush stdout")?;
    Ok(0)
}

/// Positional arguments and submission prerequisites first, then the flag
/// groups, then the project id.
fn validate(
    images: &[String],
    flags: &FlagSnapshot,
    settings: &mut Settings,
) -> Result<ValidatedArgs, ValidationError> {
    let validated = validate_positional_args(images, flags, settings)?;
    validate_flag_groups(flags)?;
    validate_certification_project_id(settings)?;
    Ok(validated)
}

/// Capture every configuration-backed flag, recording whether the user typed it.
fn flag_snapshot(matches: &ArgMatches) -> FlagSnapshot {
    let flags = ConfigKey::ALL
        .into_iter()
        .filter_map(|key| key.flag_name().map(|name| (key, name)))
        .map(|(key, name)| {
            let id = name.replace('-', "_");
            let value = if is_bool_key(key) {
                matches.get_flag(&id).to_string()
            } else {
                matches
                    .get_one::<String>(&id)
                    .cloned()
                    .unwrap_or_default()
            };
            if matches.value_source(&id) == Some(ValueSource::CommandLine) {
                FlagValue::changed(name, value)
            } else {
                FlagValue::unchanged(name, value)
            }
        })
        .collect();
    FlagSnapshot::new(flags)
}

fn apply_flags(settings: &mut Settings, flags: &FlagSnapshot) {
    for flag in flags.iter().filter(|f| f.changed) {
        let Some(key) = ConfigKey::from_flag_name(&flag.name) else {
            continue;
        };
        let value = if is_bool_key(key) {
            RawValue::Bool(flag.value == "true")
        } else {
            RawValue::Str(flag.value.clone())
        };
        settings.set_flag(key, value);
    }
}

fn is_bool_key(key: ConfigKey) -> bool {
    matches!(key, ConfigKey::Submit | ConfigKey::Insecure)
}

fn container_usage() -> String {
    let mut cmd = Cli::command();
    cmd.build();
    cmd.find_subcommand_mut("check")
        .and_then(|c| c.find_subcommand_mut("container"))
        .map(|c| c.render_usage().to_string())
        .unwrap_or_default()
}

/// Log file sink. Events are dropped until a file is attached, so nothing
/// touches the filesystem before the arguments have been accepted.
#[derive(Clone, Default)]
struct LogFileSlot(Arc<Mutex<Option<File>>>);

impl Write for LogFileSlot {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.0.lock() {
            Ok(mut guard) => match guard.as_mut() {
                Some(file) => file.write(buf),
                None => Ok(buf.len()),
            },
            Err(_) => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.0.lock() {
            Ok(mut guard) => guard.as_mut().map_or(Ok(()), |file| file.flush()),
            Err(_) => Ok(()),
        }
    }
}

impl LogFileSlot {
    /// Open `log_file` and start writing to it. A file that cannot be opened
    /// is reported and skipped.
    fn attach(&self, log_file: Option<&Path>) -> LogContext {
        let Some(path) = log_file else {
            return LogContext::new(None);
        };
        let file = match open_log_file(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("log file disabled: {e:#}");
                return LogContext::new(None);
            }
        };
        let attached = match self.0.lock() {
            Ok(mut guard) => {
                *guard = Some(file);
                true
            }
            Err(_) => false,
        };
        if !attached {
            warn!("log file disabled: sink poisoned");
            return LogContext::new(None);
        }
        debug!("logging to {}", path.display());
        LogContext::new(Some(path.to_path_buf()))
    }
}

/// Console logging goes to stderr (`RUST_LOG` wins, otherwise `--verbose` /
/// `--debug`); the log file gets `log_level` once [`LogFileSlot::attach`]
/// has been called.
fn init_logging(verbose: bool, debug: bool, log_level: &str) -> LogFileSlot {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let slot = LogFileSlot::default();
    let sink = slot.clone();
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(move || sink.clone())
                .with_filter(EnvFilter::new(log_level)),
        )
        .try_init();

    debug!("Logging initialized at level: {}", level);
    slot
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create log directory '{}'", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file '{}'", path.display()))
}
