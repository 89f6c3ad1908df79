//! # Logger
//!
//! Installs the global `tracing` subscriber for heartbeat binaries.
//!
//! Console output is compact and colored. File output goes through a
//! non-blocking rolling appender so a slow SD card never stalls the acquisition
//! loop. Without an explicit [`LoggerBuilder::filter`], `RUST_LOG` directives are
//! honored on top of the configured level.
//!
//! ```rust
//! # use hb_logger::{FileSink, LevelFilter, Logger};
//! # let dir = tempfile::tempdir().unwrap();
//! let _logger = Logger::builder()
//!     .name("heartbeat-acquisition")
//!     .level(LevelFilter::DEBUG)
//!     .file(FileSink::new(dir.path()).keep(7))
//!     .init()
//!     .unwrap();
//! ```

mod error;

pub use crate::error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;
pub use tracing_appender::rolling::Rotation;

use std::fs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

/// A node that logs once a minute still fits two weeks of daily files on a small card.
const DEFAULT_KEEP: usize = 14;
const LOG_EXTENSION: &str = "log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Rolling log files under one directory, named `<logger name>.<date>.log`.
#[derive(Debug, Clone)]
#[must_use]
pub struct FileSink {
    dir: PathBuf,
    rotation: Rotation,
    keep: usize,
    json: bool,
}

impl FileSink {
    /// Daily files in `dir`, keeping the newest fourteen.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), rotation: Rotation::DAILY, keep: DEFAULT_KEEP, json: false }
    }

    pub const fn rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Number of rotated files left on disk.
    pub const fn keep(mut self, files: usize) -> Self {
        self.keep = files;
        self
    }

    /// One JSON object per line instead of the text format.
    pub const fn json(mut self) -> Self {
        self.json = true;
        self
    }

    fn layer(&self, name: &str) -> Result<(BoxedLayer, WorkerGuard), LoggerError> {
        if self.keep == 0 {
            return Err(invalid("a file sink must keep at least one file"));
        }
        fs::create_dir_all(&self.dir)
            .context(format!("Failed to create log directory {}", self.dir.display()))?;

        let appender = RollingFileAppender::builder()
            .rotation(self.rotation.clone())
            .filename_prefix(name)
            .filename_suffix(LOG_EXTENSION)
            .max_log_files(self.keep)
            .build(&self.dir)?;
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let layer = fmt::layer().with_writer(writer).with_ansi(false);
        let layer = if self.json { layer.json().boxed() } else { layer.boxed() };
        Ok((layer, guard))
    }
}

/// Marker for a builder that has not been given a name yet.
#[derive(Debug, Default)]
pub struct Unnamed;

/// Marker carrying the logger name.
#[derive(Debug)]
pub struct Named(String);

/// Configures and installs the global subscriber. [`LoggerBuilder::init`] only
/// exists once a name is set.
#[derive(Debug)]
#[must_use = "nothing is logged until .init() is called"]
pub struct LoggerBuilder<N = Unnamed> {
    name: N,
    level: LevelFilter,
    console: bool,
    filter: Option<String>,
    file: Option<FileSink>,
}

impl<N> LoggerBuilder<N> {
    pub const fn level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// Explicit directives such as `"hb_capture=debug,tower_http=warn"`. Replaces `RUST_LOG`.
    pub fn filter(mut self, directives: impl Into<String>) -> Self {
        self.filter = Some(directives.into());
        self
    }

    pub const fn console(mut self, enabled: bool) -> Self {
        self.console = enabled;
        self
    }

    pub fn file(mut self, sink: FileSink) -> Self {
        self.file = Some(sink);
        self
    }

    fn env_filter(&self) -> Result<EnvFilter, LoggerError> {
        let builder = EnvFilter::builder().with_default_directive(self.level.into());
        let Some(directives) = &self.filter else {
            return Ok(builder.from_env_lossy());
        };
        builder
            .parse(directives)
            .map_err(|e| invalid(format!("Invalid filter '{directives}': {e}")))
    }
}

impl LoggerBuilder<Unnamed> {
    /// Names the program; the name also prefixes log files.
    pub fn name(self, name: impl Into<String>) -> LoggerBuilder<Named> {
        LoggerBuilder {
            name: Named(name.into()),
            level: self.level,
            console: self.console,
            filter: self.filter,
            file: self.file,
        }
    }
}

impl LoggerBuilder<Named> {
    /// Installs the subscriber.
    ///
    /// Keep the returned [`Logger`] alive until exit: it owns the worker that
    /// drains the file writer.
    ///
    /// # Errors
    /// * [`LoggerError::InvalidConfiguration`] for a blank name, a sink keeping no
    ///   files, bad filter directives, or when every output is off.
    /// * [`LoggerError::Io`] / [`LoggerError::Appender`] if the log directory is unusable.
    /// * [`LoggerError::Subscriber`] if this process already installed a subscriber.
    pub fn init(self) -> Result<Logger, LoggerError> {
        let name = self.name.0.trim();
        if name.is_empty() {
            return Err(invalid("logger name cannot be blank"));
        }
        if !self.console && self.file.is_none() {
            return Err(invalid("no output enabled, turn on the console or add a file sink"));
        }
        let env_filter = self.env_filter()?;

        let mut layers: Vec<BoxedLayer> = Vec::with_capacity(2);
        if self.console {
            layers.push(fmt::layer().compact().with_ansi(true).boxed());
        }
        let guard = match &self.file {
            Some(sink) => {
                let (layer, guard) = sink.layer(name)?;
                layers.push(layer);
                Some(guard)
            },
            None => None,
        };

        tracing_subscriber::registry().with(layers).with(env_filter).try_init()?;
        Ok(Logger { guard })
    }
}

/// Handle to the installed subscriber.
#[must_use = "dropping the logger stops the file writer"]
#[derive(Debug)]
pub struct Logger {
    guard: Option<WorkerGuard>,
}

impl Logger {
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder {
            name: Unnamed,
            level: LevelFilter::INFO,
            console: true,
            filter: None,
            file: None,
        }
    }

    /// Whether log lines are also going to disk.
    #[must_use]
    pub const fn writes_files(&self) -> bool {
        self.guard.is_some()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::debug!("Flushing log files");
        }
    }
}

/// Parses the `log.level` config value (`"info"`, `"DEBUG"`, `"off"`...).
///
/// # Errors
/// Returns [`LoggerError::InvalidConfiguration`] for an unknown level.
pub fn parse_level(level: &str) -> Result<LevelFilter, LoggerError> {
    level.trim().parse().map_err(|e| invalid(format!("Unknown log level '{level}': {e}")))
}

fn invalid(message: impl Into<std::borrow::Cow<'static, str>>) -> LoggerError {
    LoggerError::InvalidConfiguration { message: message.into(), context: None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_starts_console_only_at_info() {
        let builder = Logger::builder().name("node");
        assert!(builder.console);
        assert_eq!(builder.level, LevelFilter::INFO);
        assert!(builder.file.is_none());
        assert!(builder.filter.is_none());
    }

    #[test]
    fn file_sink_defaults_to_daily_two_weeks() {
        let sink = FileSink::new("logs");
        assert_eq!(sink.keep, DEFAULT_KEEP);
        assert_eq!(sink.rotation, Rotation::DAILY);
        assert!(!sink.json);

        let sink = sink.keep(3).rotation(Rotation::HOURLY).json();
        assert_eq!((sink.keep, sink.json), (3, true));
    }

    // None of the cases below reach `try_init`, so they never touch the global subscriber.

    #[test]
    fn blank_name_is_rejected() {
        let err = Logger::builder().name("  ").init().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }), "{err}");
    }

    #[test]
    fn sink_keeping_nothing_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = Logger::builder().name("node").file(FileSink::new(dir.path()).keep(0)).init();
        assert!(err.unwrap_err().to_string().contains("at least one file"));
    }

    #[test]
    fn silent_logger_is_rejected() {
        let err = Logger::builder().name("node").console(false).init().unwrap_err();
        assert!(err.to_string().contains("no output enabled"));
    }

    #[test]
    fn bad_directives_are_rejected() {
        let err = Logger::builder().name("node").filter("hb_capture=chatty").init().unwrap_err();
        assert!(err.to_string().contains("Invalid filter"));
    }

    #[test]
    fn config_levels_parse() {
        assert_eq!(parse_level("DEBUG").unwrap(), LevelFilter::DEBUG);
        assert_eq!(parse_level(" warn ").unwrap(), LevelFilter::WARN);
        assert_eq!(parse_level("off").unwrap(), LevelFilter::OFF);
        assert!(parse_level("chatty").is_err());
    }
}
