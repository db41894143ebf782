//! Configuration types for anvilq.
//!
//! This module contains the configuration structures used by the queues,
//! including concurrency limits, submission defaults and logging settings.

use crate::error::{AnvilError, AnvilResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of in-flight tasks for a bounded queue.
pub const DEFAULT_CONCURRENT_LIMIT: usize = 3;

/// Main configuration for an anvilq queue.
///
/// # Examples
///
/// ```rust
/// use anvilq::config::QueueConfig;
///
/// // Use default configuration
/// let config = QueueConfig::default();
///
/// // Custom configuration
/// let config = QueueConfig::default()
///     .with_name("lookups")
///     .with_concurrent_limit(8)
///     .with_auto_dequeue(false);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Human readable queue name, used in log fields
    pub name: String,

    /// Maximum simultaneous in-flight tasks (ignored by serial queues and by
    /// queues built from an explicit policy)
    pub concurrent_limit: usize,

    /// Whether submissions start processing immediately
    pub auto_dequeue: bool,

    /// Default grace period for `shutdown` (in milliseconds)
    pub shutdown_timeout_ms: u64,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: "anvilq".to_string(),
            concurrent_limit: DEFAULT_CONCURRENT_LIMIT,
            auto_dequeue: true,
            shutdown_timeout_ms: 30_000, // 30 seconds
            logging: LoggingConfig::default(),
        }
    }
}

impl QueueConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> AnvilResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Create a new configuration optimized for development.
    pub fn development() -> Self {
        Self {
            concurrent_limit: 2,
            shutdown_timeout_ms: 5_000,
            logging: LoggingConfig {
                level: LogLevel::Debug,
                colored: true,
                include_targets: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Create a new configuration optimized for production.
    pub fn production() -> Self {
        Self {
            concurrent_limit: num_cpus::get() * 2,
            shutdown_timeout_ms: 60_000,
            logging: LoggingConfig {
                level: LogLevel::Info,
                json_format: true,
                colored: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Check the configuration for values no queue can run with.
    pub fn validate(&self) -> AnvilResult<()> {
        if self.concurrent_limit == 0 {
            return Err(AnvilError::config("concurrent_limit must be at least 1"));
        }
        self.validate_shared()
    }

    /// Checks that apply whatever policy drives the queue. The policy itself
    /// owns its capacity, so `concurrent_limit` is left to it.
    pub(crate) fn validate_shared(&self) -> AnvilResult<()> {
        if self.name.trim().is_empty() {
            return Err(AnvilError::config("queue name must not be empty"));
        }
        Ok(())
    }

    /// Set the queue name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the concurrency limit.
    pub fn with_concurrent_limit(mut self, limit: usize) -> Self {
        self.concurrent_limit = limit;
        self
    }

    /// Set whether submissions start processing immediately.
    pub fn with_auto_dequeue(mut self, enabled: bool) -> Self {
        self.auto_dequeue = enabled;
        self
    }

    /// Set the shutdown grace period.
    pub fn with_shutdown_timeout(mut self, timeout_ms: u64) -> Self {
        self.shutdown_timeout_ms = timeout_ms;
        self
    }

    /// Shutdown grace period as a `Duration`.
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout_ms.millis()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter
    pub level: LogLevel,

    /// Enable structured JSON logging
    pub json_format: bool,

    /// Enable colored output (ignored if json_format is true)
    pub colored: bool,

    /// Include timestamps in logs
    pub include_timestamps: bool,

    /// Include target module in logs
    pub include_targets: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            json_format: false,
            colored: true,
            include_timestamps: true,
            include_targets: false,
        }
    }
}

/// Log level enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// Trace level
    Trace,
    /// Debug level
    Debug,
    /// Info level
    Info,
    /// Warn level
    Warn,
    /// Error level
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Helper trait for converting durations in configuration.
pub trait DurationExt {
    /// Convert seconds to Duration
    fn secs(self) -> Duration;
    /// Convert milliseconds to Duration
    fn millis(self) -> Duration;
}

impl DurationExt for u64 {
    fn secs(self) -> Duration {
        Duration::from_secs(self)
    }

    fn millis(self) -> Duration {
        Duration::from_millis(self)
    }
}
