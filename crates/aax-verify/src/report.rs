//! Per-check outcomes of a suite run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use aax_common::error::AaxError;

/// Broad class of a failure, so timeouts stand apart from wrong output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A command exited non-zero or could not be spawned.
    Command,
    /// A command succeeded but printed the wrong thing.
    Output,
    /// A polled condition never converged.
    Timeout,
    /// The shared stack could not be brought up.
    Setup,
    /// Anything else: configuration, decoding, I/O.
    Other,
}

impl FailureKind {
    /// Classifies an error.
    #[must_use]
    pub const fn of(error: &AaxError) -> Self {
        match error {
            AaxError::CommandFailed { .. } | AaxError::Spawn { .. } => Self::Command,
            AaxError::MissingOutput { .. } | AaxError::UnexpectedOutput { .. } => Self::Output,
            AaxError::Timeout { .. } => Self::Timeout,
            _ => Self::Other,
        }
    }
}

/// Result of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckStatus {
    /// The check passed.
    Passed,
    /// The check failed.
    Failed {
        /// Failure class.
        kind: FailureKind,
        /// Error message.
        reason: String,
    },
    /// The check was not run.
    Skipped {
        /// Why it was not run.
        reason: String,
    },
}

/// Outcome of one named check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    /// Suite the check belongs to.
    pub suite: String,
    /// Check name.
    pub name: String,
    /// What happened.
    #[serde(flatten)]
    pub status: CheckStatus,
}

impl CheckOutcome {
    /// Returns `true` if the check failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self.status, CheckStatus::Failed { .. })
    }
}

/// All outcomes of one suite run.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    /// Unique id of this run.
    pub run_id: Uuid,
    /// Suite name.
    pub suite: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished; `None` while still running.
    pub finished_at: Option<DateTime<Utc>>,
    /// Outcomes in execution order.
    pub outcomes: Vec<CheckOutcome>,
}

impl SuiteReport {
    /// Starts an empty report for `suite`.
    #[must_use]
    pub fn start(suite: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            suite: suite.into(),
            started_at: Utc::now(),
            finished_at: None,
            outcomes: Vec::new(),
        }
    }

    /// Appends an outcome.
    pub fn record(&mut self, name: impl Into<String>, status: CheckStatus) {
        self.outcomes.push(CheckOutcome {
            suite: self.suite.clone(),
            name: name.into(),
            status,
        });
    }

    /// Stamps the finish time.
    #[must_use]
    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    /// Number of passed checks.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.count(|s| matches!(s, CheckStatus::Passed))
    }

    /// Number of failed checks.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, CheckStatus::Failed { .. }))
    }

    /// Number of skipped checks.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, CheckStatus::Skipped { .. }))
    }

    /// Returns `true` if no check failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Looks an outcome up by check name.
    #[must_use]
    pub fn outcome(&self, name: &str) -> Option<&CheckOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    fn count(&self, pred: impl Fn(&CheckStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}
