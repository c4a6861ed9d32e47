//! Unified error types for the AAX harness workspace.
//!
//! The variants follow the failure taxonomy of a verification run: a command
//! that exited non-zero, output that did not contain what was expected, and
//! a condition that never converged are kept distinct so a report can tell
//! them apart.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum AaxError {
    /// An external command ran but exited with a non-zero code.
    #[error("`{program} {}` exited with code {exit_code}: {}", .args.join(" "), .stderr.trim())]
    CommandFailed {
        /// Program that was invoked.
        program: String,
        /// Arguments passed to the program.
        args: Vec<String>,
        /// Exit code reported by the process.
        exit_code: i32,
        /// Captured standard error.
        stderr: String,
    },

    /// An external command could not be started at all.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        /// Program that could not be started.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Expected text was absent from captured output.
    #[error("expected output to contain {needle:?}, got: {output:?}")]
    MissingOutput {
        /// Substring that was expected.
        needle: String,
        /// Output that was searched.
        output: String,
    },

    /// Captured output did not match the expected value.
    #[error("expected {expected}, got {actual:?}")]
    UnexpectedOutput {
        /// Description of the expected value.
        expected: String,
        /// Actual value observed.
        actual: String,
    },

    /// A polled condition did not converge within its attempt budget.
    #[error("timed out waiting for {condition} after {attempts} attempts")]
    Timeout {
        /// Human-readable name of the awaited condition.
        condition: String,
        /// Number of attempts made.
        attempts: u32,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// JSON decoding or encoding failed.
    #[error("JSON error: {source}")]
    Json {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// YAML decoding or encoding failed.
    #[error("YAML error: {source}")]
    Yaml {
        /// Underlying serialization error.
        #[from]
        source: serde_yaml::Error,
    },
}

impl AaxError {
    /// Shorthand for a [`AaxError::Config`] error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns `true` if this error is a polling timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, AaxError>;
