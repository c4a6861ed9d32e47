//! Assertions over captured process output.
//!
//! Every check first requires a zero exit code; only then is the output
//! inspected. The error variant tells a failed command apart from output
//! that merely did not match.

use aax_common::error::{AaxError, Result};
use aax_runtime::command::Completed;
use serde::{Deserialize, Serialize};

/// What a check expects from a command's output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expectation {
    /// Exit code zero, output ignored.
    #[default]
    Succeeds,
    /// Standard output contains `text`.
    Contains {
        /// Required substring.
        text: String,
    },
    /// Trimmed standard output equals `text`.
    Equals {
        /// Required value.
        text: String,
    },
    /// Combined stdout and stderr, lower-cased, contains one of `needles`.
    ContainsAny {
        /// Candidate substrings, compared case-insensitively.
        needles: Vec<String>,
    },
}

impl Expectation {
    /// Shorthand for [`Expectation::Contains`].
    #[must_use]
    pub fn contains(text: impl Into<String>) -> Self {
        Self::Contains { text: text.into() }
    }

    /// Shorthand for [`Expectation::Equals`].
    #[must_use]
    pub fn equals(text: impl Into<String>) -> Self {
        Self::Equals { text: text.into() }
    }

    /// Shorthand for [`Expectation::ContainsAny`].
    #[must_use]
    pub fn contains_any<I, S>(needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ContainsAny {
            needles: needles.into_iter().map(Into::into).collect(),
        }
    }

    /// Checks a finished command against this expectation.
    ///
    /// # Errors
    ///
    /// Returns [`AaxError::CommandFailed`] naming the invocation on a
    /// non-zero exit, [`AaxError::MissingOutput`] when a substring is absent
    /// and [`AaxError::UnexpectedOutput`] when an exact match fails.
    pub fn evaluate(&self, completed: Completed) -> Result<()> {
        let output = completed.checked()?;
        match self {
            Self::Succeeds => Ok(()),
            Self::Contains { text } => ensure_contains(&output.stdout, text),
            Self::Equals { text } => ensure_equals(output.stdout_trimmed(), text),
            Self::ContainsAny { needles } => ensure_contains_any(&output.combined(), needles),
        }
    }
}

/// Fails unless `haystack` contains `needle`.
///
/// # Errors
///
/// Returns [`AaxError::MissingOutput`].
pub fn ensure_contains(haystack: &str, needle: &str) -> Result<()> {
    if haystack.contains(needle) {
        Ok(())
    } else {
        Err(AaxError::MissingOutput {
            needle: needle.to_string(),
            output: haystack.to_string(),
        })
    }
}

/// Fails unless `actual` equals `expected`.
///
/// # Errors
///
/// Returns [`AaxError::UnexpectedOutput`].
pub fn ensure_equals(actual: &str, expected: &str) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(AaxError::UnexpectedOutput {
            expected: format!("{expected:?}"),
            actual: actual.to_string(),
        })
    }
}

/// Fails unless the lower-cased `haystack` contains one of `needles`,
/// itself lower-cased.
///
/// # Errors
///
/// Returns [`AaxError::MissingOutput`] naming every candidate.
pub fn ensure_contains_any<S: AsRef<str>>(haystack: &str, needles: &[S]) -> Result<()> {
    let lowered = haystack.to_lowercase();
    if needles
        .iter()
        .any(|n| lowered.contains(&n.as_ref().to_lowercase()))
    {
        Ok(())
    } else {
        Err(AaxError::MissingOutput {
            needle: needles
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join(" | "),
            output: haystack.to_string(),
        })
    }
}
