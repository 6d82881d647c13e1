//! Rolling Logger
//!
//! Writes formatted `tracing` events to `<dir>/<app>.log`, rotating the file
//! once it grows past a size limit and keeping a bounded number of archives.
//! The most recent lines are also kept in memory for display.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use thiserror::Error;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Log file error: {0}")]
    Io(#[from] io::Error),

    #[error("Logger already initialized")]
    AlreadyInitialized,

    #[error("Logger not initialized")]
    NotInitialized,

    #[error("Logger state poisoned")]
    Poisoned,
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub dir: PathBuf,
    pub app_name: String,
    /// Rotate once the active file would grow past this size
    pub max_file_bytes: u64,
    /// Archives beyond this count are deleted, oldest first
    pub max_archives: usize,
    /// Lines kept in memory for `recent_lines`
    pub buffer_lines: usize,
}

impl LoggerConfig {
    pub fn new(dir: impl Into<PathBuf>, app_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            app_name: app_name.into(),
            max_file_bytes: 5 * 1024 * 1024,
            max_archives: 3,
            buffer_lines: 500,
        }
    }
}

struct State {
    config: LoggerConfig,
    file: File,
    written: u64,
    recent: VecDeque<String>,
}

impl State {
    fn active_path(config: &LoggerConfig) -> PathBuf {
        config.dir.join(format!("{}.log", config.app_name))
    }

    fn open(config: LoggerConfig) -> io::Result<Self> {
        fs::create_dir_all(&config.dir)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(Self::active_path(&config))?;
        let written = file.metadata()?.len();
        Ok(Self {
            config,
            file,
            written,
            recent: VecDeque::new(),
        })
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let len = line.len() as u64 + 1;
        if self.written > 0 && self.written + len > self.config.max_file_bytes {
            self.rotate()?;
        }

        writeln!(self.file, "{}", line)?;
        self.written += len;

        if self.config.buffer_lines > 0 {
            if self.recent.len() == self.config.buffer_lines {
                self.recent.pop_front();
            }
            self.recent.push_back(line.to_string());
        }
        Ok(())
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        let active = Self::active_path(&self.config);
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S%.9f");

        let mut archive = self.config.dir.join(format!("{}.{}.log", self.config.app_name, stamp));
        let mut n = 1;
        while archive.exists() {
            archive = self
                .config
                .dir
                .join(format!("{}.{}-{}.log", self.config.app_name, stamp, n));
            n += 1;
        }
        fs::rename(&active, &archive)?;

        self.file = OpenOptions::new().create(true).append(true).open(&active)?;
        self.written = 0;
        self.prune()
    }

    fn prune(&self) -> io::Result<()> {
        let mut archives = archives_in(&self.config.dir, &self.config.app_name)?;
        archives.sort();
        while archives.len() > self.config.max_archives {
            let oldest = archives.remove(0);
            fs::remove_file(oldest)?;
        }
        Ok(())
    }
}

/// Rotated files of `app_name` inside `dir`
pub fn archives_in(dir: &Path, app_name: &str) -> io::Result<Vec<PathBuf>> {
    let active = format!("{}.log", app_name);
    let prefix = format!("{}.", app_name);
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name != active && name.starts_with(&prefix) && name.ends_with(".log") {
            found.push(path);
        }
    }
    Ok(found)
}

/// Shared handle on a rotating log file
#[derive(Clone)]
pub struct RollingLogger {
    state: Arc<Mutex<State>>,
}

impl RollingLogger {
    pub fn open(config: LoggerConfig) -> Result<Self, LoggerError> {
        Ok(Self {
            state: Arc::new(Mutex::new(State::open(config)?)),
        })
    }

    pub fn write_line(&self, line: &str) -> Result<(), LoggerError> {
        let mut state = self.state.lock().map_err(|_| LoggerError::Poisoned)?;
        state.write_line(line)?;
        Ok(())
    }

    /// Oldest first
    pub fn recent_lines(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|state| state.recent.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.state
            .lock()
            .ok()
            .map(|state| State::active_path(&state.config))
    }
}

/// Per-event writer handed out to the fmt layer; complete lines are
/// forwarded to the logger, a trailing partial line on drop.
pub struct LineWriter {
    logger: RollingLogger,
    pending: Vec<u8>,
}

impl LineWriter {
    fn drain_lines(&mut self, include_partial: bool) -> io::Result<()> {
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.forward(&line[..line.len() - 1])?;
        }
        if include_partial && !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.forward(&line)?;
        }
        Ok(())
    }

    fn forward(&self, bytes: &[u8]) -> io::Result<()> {
        let line = String::from_utf8_lossy(bytes);
        self.logger
            .write_line(line.trim_end_matches('\r'))
            .map_err(|e| io::Error::other(e.to_string()))
    }
}

impl Write for LineWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        self.drain_lines(false)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.drain_lines(true)
    }
}

impl Drop for LineWriter {
    fn drop(&mut self) {
        let _ = self.drain_lines(true);
    }
}

impl<'a> MakeWriter<'a> for RollingLogger {
    type Writer = LineWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LineWriter {
            logger: self.clone(),
            pending: Vec::new(),
        }
    }
}

// ========================
// Process-wide logger
// ========================

static GLOBAL: OnceLock<RollingLogger> = OnceLock::new();

/// Install the global subscriber writing to `<log_dir>/<app_name>.log`.
///
/// Filtering follows `RUST_LOG`, defaulting to `info`.
pub fn init_logger(log_dir: impl Into<PathBuf>, app_name: &str) -> Result<(), LoggerError> {
    init_with(LoggerConfig::new(log_dir, app_name))
}

pub fn init_with(config: LoggerConfig) -> Result<(), LoggerError> {
    if GLOBAL.get().is_some() {
        return Err(LoggerError::AlreadyInitialized);
    }
    let logger = RollingLogger::open(config)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(logger.clone()),
        )
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)?;

    GLOBAL.set(logger).map_err(|_| LoggerError::AlreadyInitialized)
}

fn global() -> Result<&'static RollingLogger, LoggerError> {
    GLOBAL.get().ok_or(LoggerError::NotInitialized)
}

fn write_direct(level: &str, message: &str) -> Result<(), LoggerError> {
    let line = format!(
        "{} {:>5} {}",
        chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
        level,
        message
    );
    global()?.write_line(&line)
}

pub fn info(message: &str) -> Result<(), LoggerError> {
    write_direct("INFO", message)
}

pub fn error(message: &str) -> Result<(), LoggerError> {
    write_direct("ERROR", message)
}

/// Buffered lines of the global logger, oldest first
pub fn recent_lines() -> Vec<String> {
    GLOBAL.get().map(RollingLogger::recent_lines).unwrap_or_default()
}
