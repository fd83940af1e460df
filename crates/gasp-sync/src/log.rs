//! Per-instance logging.
//!
//! Each engine carries its own verbosity and prefix, so two engines in one
//! process (the common test setup, or a node syncing several peers) can log
//! at different levels. Events are emitted through `tracing` once the
//! instance level admits them.

use std::fmt;

/// Verbosity of an engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogLevel {
    /// Emit nothing.
    None = 0,
    Error = 1,
    Warn = 2,
    #[default]
    Info = 3,
    Debug = 4,
}

/// Logging capability handed to an engine at construction.
#[derive(Debug, Clone)]
pub struct SyncLog {
    level: LogLevel,
    prefix: String,
}

impl SyncLog {
    /// Create a logger.
    pub fn new(level: LogLevel, prefix: impl Into<String>) -> Self {
        Self {
            level,
            prefix: prefix.into(),
        }
    }

    /// A logger that emits nothing.
    pub fn silent() -> Self {
        Self::new(LogLevel::None, "")
    }

    /// Configured level.
    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Prefix attached to every event.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether events at `level` are emitted.
    pub fn enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::None && self.level >= level
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        if self.enabled(LogLevel::Error) {
            tracing::error!(prefix = %self.prefix, "{}", args);
        }
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        if self.enabled(LogLevel::Warn) {
            tracing::warn!(prefix = %self.prefix, "{}", args);
        }
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        if self.enabled(LogLevel::Info) {
            tracing::info!(prefix = %self.prefix, "{}", args);
        }
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        if self.enabled(LogLevel::Debug) {
            tracing::debug!(prefix = %self.prefix, "{}", args);
        }
    }
}
