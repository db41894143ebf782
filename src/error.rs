//! Error types for anvilq operations.

use crate::task::TaskId;
use thiserror::Error;

/// Result type used throughout anvilq.
pub type AnvilResult<T> = Result<T, AnvilError>;

/// Main error type for anvilq operations.
#[derive(Error, Debug)]
pub enum AnvilError {
    /// A required argument was missing or malformed
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// Task execution failed
    #[error("Task execution failed: {message}")]
    TaskFailed {
        /// Error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The task's action panicked while running
    #[error("Task panicked: {message}")]
    TaskPanicked {
        /// Panic payload, when it was a string
        message: String,
    },

    /// The task was dropped before it could settle
    #[error("Task {task_id} was abandoned before it settled")]
    Abandoned {
        /// Sequence number of the abandoned task
        task_id: TaskId,
    },

    /// Operation timed out
    #[error("Operation timed out after {timeout_ms} ms")]
    Timeout {
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Error message
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl AnvilError {
    /// Create a new task execution error
    pub fn task<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::TaskFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a task execution error without an underlying cause
    pub fn task_msg(message: impl Into<String>) -> Self {
        Self::TaskFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_task_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = AnvilError::task("write failed", io);

        assert_eq!(err.to_string(), "Task execution failed: write failed");
        assert_eq!(err.source().unwrap().to_string(), "disk on fire");
    }

    #[test]
    fn test_abandoned_message() {
        let err = AnvilError::Abandoned { task_id: 7 };
        assert_eq!(err.to_string(), "Task 7 was abandoned before it settled");
    }
}
