//! Argument parsing, setup, and exit codes.

use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::Parser;
use foldpack_app::{AppError, Coordinator, DirectorySelector, RunOptions, RunReport, run_selected};
use foldpack_config::{
    ConfigError, DEFAULT_LOG_LEVEL, DEFAULT_LOG_PATH, LogFormatSetting, RunConfig, ValidatedConfig,
};
use foldpack_events::EventBus;
use foldpack_telemetry::{
    LogFormat, LoggingConfig, RunLog, RunLogOptions, TelemetryError, error_chain, init_logging,
};
use tracing::error;

use crate::progress::ProgressReporter;
use crate::select::{ArgumentSelector, PromptSelector};

#[derive(Parser, Debug)]
#[command(
    name = "foldpack",
    version,
    about = "Zip every subfolder of a directory and remove the originals"
)]
struct Cli {
    /// Directory whose immediate subfolders are archived.
    #[arg(env = "FOLDPACK_ROOT")]
    root: Option<PathBuf>,
    /// Number of folders processed concurrently (defaults to available cores).
    #[arg(long, short = 'j', env = "FOLDPACK_WORKERS")]
    workers: Option<NonZeroUsize>,
    /// Append-only run log.
    #[arg(long, env = "FOLDPACK_LOG_PATH", default_value = DEFAULT_LOG_PATH)]
    log_path: PathBuf,
    /// Prefix run log lines with a UTC timestamp.
    #[arg(long, env = "FOLDPACK_LOG_TIMESTAMPS")]
    log_timestamps: bool,
    /// Console log format (`pretty` or `json`).
    #[arg(long, env = "FOLDPACK_LOG_FORMAT", default_value = "pretty")]
    log_format: LogFormatSetting,
    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,
    /// Show what would be archived without writing or deleting anything.
    #[arg(long)]
    dry_run: bool,
    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,
    /// Print the run report as JSON once the run finishes.
    #[arg(long)]
    json_report: bool,
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        RunConfig {
            root: self.root.clone(),
            workers: self.workers,
            log_path: self.log_path.clone(),
            log_timestamps: self.log_timestamps,
            log_level: self.log_level.clone(),
            log_format: self.log_format,
            dry_run: self.dry_run,
        }
    }
}

/// Parses process arguments, runs the archive pass, and returns the exit code.
pub async fn run() -> i32 {
    run_from(std::env::args_os()).await
}

/// Same as [`run`] with explicit arguments (the first is the program name).
pub async fn run_from<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return err.exit_code();
        }
    };
    match execute(&cli).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn execute(cli: &Cli) -> CliResult<()> {
    let config = cli.run_config().validate().map_err(CliError::config)?;
    install_logging(&config)?;

    let selector: Box<dyn DirectorySelector> =
        if config.root.is_none() && io::stdin().is_terminal() {
            Box::new(PromptSelector::new())
        } else {
            Box::new(ArgumentSelector::new(config.root.clone()))
        };

    let events = EventBus::new();
    let reporter = (!cli.no_progress && io::stderr().is_terminal())
        .then(|| ProgressReporter::stderr(&events));
    let mut options = RunOptions::new(config.workers);
    options.dry_run = config.dry_run;
    let coordinator = Coordinator::new(events, options);

    let outcome = run_selected(selector.as_ref(), &coordinator).await;
    if let Some(reporter) = reporter {
        reporter.finish(matches!(outcome, Ok(Some(_)))).await;
    }

    match outcome {
        Ok(Some(report)) if cli.json_report => print_report(&report),
        Ok(_) => Ok(()),
        Err(err) => {
            error!(error = %error_chain(&err), "archive run could not start");
            Err(CliError::app(err))
        }
    }
}

fn install_logging(config: &ValidatedConfig) -> CliResult<()> {
    let run_log = RunLog::open(
        &config.log_path,
        RunLogOptions {
            timestamps: config.log_timestamps,
        },
    )
    .map_err(CliError::telemetry)?;
    let format = match config.log_format {
        LogFormatSetting::Json => LogFormat::Json,
        LogFormatSetting::Pretty => LogFormat::Pretty,
    };
    init_logging(
        &LoggingConfig {
            level: &config.log_level,
            format,
        },
        Some(run_log),
    )
    .map_err(CliError::telemetry)
}

fn print_report(report: &RunReport) -> CliResult<()> {
    let rendered = serde_json::to_string_pretty(report)
        .map_err(|err| CliError::failure(anyhow!("failed to render run report: {err}")))?;
    println!("{rendered}");
    Ok(())
}

#[derive(Debug)]
enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

type CliResult<T> = Result<T, CliError>;

impl CliError {
    fn config(err: ConfigError) -> Self {
        let detail = match &err {
            ConfigError::InvalidField { field, reason, .. } => format!("{field} ({reason})"),
            ConfigError::RootUnavailable { path, reason } => {
                format!("{} ({reason})", path.display())
            }
            ConfigError::InvalidLogFormat { value } => value.clone(),
        };
        Self::Validation(format!("{err}: {detail}"))
    }

    fn telemetry(err: TelemetryError) -> Self {
        Self::Failure(anyhow!(error_chain(&err)))
    }

    fn app(err: AppError) -> Self {
        match err {
            AppError::RootUnavailable { path } => {
                Self::Validation(format!("not a directory: {}", path.display()))
            }
            other => Self::Failure(anyhow!(error_chain(&other))),
        }
    }

    fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}
