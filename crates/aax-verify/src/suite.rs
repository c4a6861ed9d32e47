//! Sequential check runner shared by the suites.
//!
//! Checks run one at a time in declaration order. A failing check is
//! recorded and the run moves on. Checks that need the shared stack run
//! inside one [`StackGuard`] scope, and all of them fail with the setup
//! error if the stack cannot be brought up.

use std::time::Duration;

use aax_common::config::HarnessConfig;
use aax_common::error::{AaxError, Result};
use aax_common::types::ExecOutput;
use aax_runtime::command::CommandRunner;
use aax_runtime::guard::StackGuard;

use crate::report::{CheckStatus, FailureKind, SuiteReport};

/// What a suite needs from the outside world.
#[derive(Clone, Copy)]
pub struct SuiteEnv<'a> {
    /// Runner for every external command.
    pub runner: &'a dyn CommandRunner,
    /// Binary names and repository root.
    pub config: &'a HarnessConfig,
    /// Sleep used for settle delays and between poll attempts.
    pub sleep: fn(Duration),
}

impl std::fmt::Debug for SuiteEnv<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuiteEnv")
            .field("config", self.config)
            .finish_non_exhaustive()
    }
}

impl<'a> SuiteEnv<'a> {
    /// Environment that really sleeps.
    #[must_use]
    pub fn new(runner: &'a dyn CommandRunner, config: &'a HarnessConfig) -> Self {
        Self {
            runner,
            config,
            sleep: std::thread::sleep,
        }
    }

    /// Replaces the sleep function.
    #[must_use]
    pub fn with_sleep(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    /// Waits `secs` seconds for a freshly started stack to settle.
    pub fn settle(&self, secs: u64) {
        if secs > 0 {
            tracing::debug!(secs, "waiting for stack to settle");
            (self.sleep)(Duration::from_secs(secs));
        }
    }
}

/// A named check, not yet run.
pub struct Check<'c> {
    name: String,
    run: Box<dyn FnOnce() -> Result<()> + 'c>,
}

impl<'c> Check<'c> {
    /// Creates a check.
    pub fn new(name: impl Into<String>, run: impl FnOnce() -> Result<()> + 'c) -> Self {
        Self {
            name: name.into(),
            run: Box::new(run),
        }
    }

    /// Check name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for Check<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Check").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Records outcomes as a suite runs.
#[derive(Debug)]
pub struct SuiteRun {
    report: SuiteReport,
}

impl SuiteRun {
    /// Starts a run of `suite`.
    #[must_use]
    pub fn start(suite: &str) -> Self {
        let report = SuiteReport::start(suite);
        tracing::info!(suite, run_id = %report.run_id, "suite started");
        Self { report }
    }

    /// Runs one check, records its outcome and returns whether it passed.
    pub fn run(&mut self, check: Check<'_>) -> bool {
        let Check { name, run } = check;
        tracing::debug!(suite = %self.report.suite, check = %name, "running check");
        match run() {
            Ok(()) => {
                tracing::info!(suite = %self.report.suite, check = %name, "passed");
                self.report.record(name, CheckStatus::Passed);
                true
            }
            Err(e) => {
                self.fail(name, FailureKind::of(&e), &e);
                false
            }
        }
    }

    /// Runs every check in order.
    pub fn run_all<'c>(&mut self, checks: impl IntoIterator<Item = Check<'c>>) {
        for check in checks {
            let _ = self.run(check);
        }
    }

    /// Records `name` as failed without running anything.
    pub fn fail(&mut self, name: impl Into<String>, kind: FailureKind, error: &AaxError) {
        let name = name.into();
        tracing::warn!(suite = %self.report.suite, check = %name, error = %error, "failed");
        self.report.record(
            name,
            CheckStatus::Failed {
                kind,
                reason: error.to_string(),
            },
        );
    }

    /// Records `name` as skipped.
    pub fn skip(&mut self, name: impl Into<String>, reason: &str) {
        let name = name.into();
        tracing::info!(suite = %self.report.suite, check = %name, reason, "skipped");
        self.report.record(
            name,
            CheckStatus::Skipped {
                reason: reason.to_string(),
            },
        );
    }

    /// Brings a stack up with `setup`, runs `checks` against it and tears it
    /// down with `teardown` exactly once.
    ///
    /// When setup fails every check is recorded as a setup failure and
    /// teardown does not run. A teardown that errors or exits non-zero is
    /// recorded as a failed `<stack> teardown` outcome.
    pub fn with_stack<'c, S, T>(&mut self, stack: &str, setup: S, teardown: T, checks: Vec<Check<'c>>)
    where
        S: FnOnce() -> Result<ExecOutput>,
        T: FnOnce() -> Result<ExecOutput> + 'c,
    {
        match StackGuard::acquire(stack, setup, teardown) {
            Ok(guard) => {
                self.run_all(checks);
                let name = format!("{stack} teardown");
                match guard.release() {
                    Ok(out) if !out.success() => {
                        tracing::warn!(
                            stack,
                            exit_code = out.exit_code,
                            stderr = %out.stderr.trim(),
                            "teardown exited non-zero"
                        );
                        self.report.record(
                            name,
                            CheckStatus::Failed {
                                kind: FailureKind::Command,
                                reason: format!(
                                    "teardown exited with code {}: {}",
                                    out.exit_code,
                                    out.stderr.trim()
                                ),
                            },
                        );
                    }
                    Ok(_) => {}
                    Err(e) => self.fail(name, FailureKind::of(&e), &e),
                }
            }
            Err(e) => {
                for check in checks {
                    self.fail(check.name, FailureKind::Setup, &e);
                }
            }
        }
    }

    /// Finishes the run.
    #[must_use]
    pub fn finish(self) -> SuiteReport {
        let report = self.report.finish();
        tracing::info!(
            suite = %report.suite,
            passed = report.passed(),
            failed = report.failed(),
            skipped = report.skipped(),
            "suite finished"
        );
        report
    }
}
