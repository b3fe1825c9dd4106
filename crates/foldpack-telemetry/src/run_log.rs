//! Persistent append-only run log.
//!
//! # Design
//! - One `RunLog` owns the file handle; every append formats a complete line
//!   and writes and flushes it while holding the lock, so concurrent writers
//!   never interleave partial lines.
//! - `RunLogLayer` bridges `tracing` events into `RunLog::append`, so call sites
//!   use the ordinary `info!`/`warn!`/`error!` macros.
//! - A failed append is counted and dropped; logging never aborts a run.

use std::borrow::Cow;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{SecondsFormat, Utc};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::error::{Result, TelemetryError};

/// Severity written at the start of each log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Fine-grained tracing.
    Trace,
    /// Debug detail.
    Debug,
    /// Normal progress.
    Info,
    /// Recoverable failure.
    Warning,
    /// Failure with diagnostic detail.
    Error,
}

impl LogLevel {
    /// Label written to the log file.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

impl From<Level> for LogLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::ERROR => Self::Error,
            Level::WARN => Self::Warning,
            Level::INFO => Self::Info,
            Level::DEBUG => Self::Debug,
            Level::TRACE => Self::Trace,
        }
    }
}

/// Options controlling the run log's line format.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunLogOptions {
    /// Prefix each line with an RFC 3339 UTC timestamp.
    pub timestamps: bool,
}

/// Shared handle to the append-only log file.
#[derive(Clone)]
pub struct RunLog {
    inner: Arc<RunLogInner>,
}

struct RunLogInner {
    path: PathBuf,
    file: Mutex<File>,
    options: RunLogOptions,
    write_failures: AtomicU64,
}

impl RunLog {
    /// Open (creating if needed) the log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory or the file cannot be created.
    pub fn open(path: impl Into<PathBuf>, options: RunLogOptions) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| TelemetryError::LogCreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| TelemetryError::LogOpen {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            inner: Arc::new(RunLogInner {
                path,
                file: Mutex::new(file),
                options,
                write_failures: AtomicU64::new(0),
            }),
        })
    }

    /// Path of the underlying log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Number of appends that failed since the log was opened.
    #[must_use]
    pub fn write_failures(&self) -> u64 {
        self.inner.write_failures.load(Ordering::Relaxed)
    }

    /// Append one `<LEVEL>: <message>` line and flush it.
    ///
    /// # Errors
    ///
    /// Returns an error if the write or flush fails.
    pub fn append(&self, level: LogLevel, message: &str) -> Result<()> {
        let line = self.render_line(level, message);
        let mut file = self
            .inner
            .file
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        file.write_all(line.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|source| TelemetryError::LogWrite {
                path: self.inner.path.clone(),
                source,
            })
    }

    /// Tracing layer that forwards INFO-and-above events to this log.
    #[must_use]
    pub fn layer(self) -> RunLogLayer {
        RunLogLayer { log: self }
    }

    fn record(&self, level: LogLevel, message: &str) {
        if self.append(level, message).is_err() {
            self.inner.write_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn render_line(&self, level: LogLevel, message: &str) -> String {
        let message = single_line(message);
        if self.inner.options.timestamps {
            let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
            format!("{stamp} {}: {message}\n", level.as_str())
        } else {
            format!("{}: {message}\n", level.as_str())
        }
    }
}

/// Escape line breaks so one entry stays on one line.
fn single_line(message: &str) -> Cow<'_, str> {
    if !message.contains(['\n', '\r']) {
        return Cow::Borrowed(message);
    }
    let mut escaped = String::with_capacity(message.len() + 8);
    for ch in message.chars() {
        match ch {
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

/// `tracing_subscriber` layer that appends rendered events to a [`RunLog`].
pub struct RunLogLayer {
    log: RunLog,
}

impl<S> Layer<S> for RunLogLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level > Level::INFO {
            return;
        }
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);
        self.log.record(LogLevel::from(level), &visitor.finish());
    }
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: Vec<String>,
}

impl LineVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            return self.message;
        }
        let fields = self.fields.join(" ");
        if self.message.is_empty() {
            fields
        } else {
            format!("{} {fields}", self.message)
        }
    }
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={value}", field.name()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push(format!("{}={value:?}", field.name()));
        }
    }
}
