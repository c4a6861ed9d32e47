//! Scoped ownership of a brought-up external stack.
//!
//! A compose project or a cluster namespace is shared mutable state outside
//! the process. [`StackGuard`] ties its lifetime to a Rust scope: setup runs
//! on acquisition, teardown runs exactly once when the guard is released or
//! dropped, including while unwinding from a failed check.

use aax_common::error::Result;
use aax_common::types::ExecOutput;

type Teardown<'a> = Box<dyn FnOnce() -> Result<ExecOutput> + 'a>;

/// Owner of a running stack. Dropping it tears the stack down.
pub struct StackGuard<'a> {
    name: String,
    teardown: Option<Teardown<'a>>,
}

impl std::fmt::Debug for StackGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackGuard")
            .field("name", &self.name)
            .field("armed", &self.teardown.is_some())
            .finish()
    }
}

impl<'a> StackGuard<'a> {
    /// Runs `setup` and, if it succeeds, returns a guard that will run
    /// `teardown`.
    ///
    /// `setup` must fail (for instance via
    /// [`Invocation::check`](crate::command::Invocation::check)) when the
    /// stack did not come up; teardown is then never armed.
    ///
    /// # Errors
    ///
    /// Returns the setup error unchanged.
    pub fn acquire<S, T>(name: impl Into<String>, setup: S, teardown: T) -> Result<Self>
    where
        S: FnOnce() -> Result<ExecOutput>,
        T: FnOnce() -> Result<ExecOutput> + 'a,
    {
        let name = name.into();
        tracing::info!(stack = %name, "bringing stack up");
        match setup() {
            Ok(_) => Ok(Self {
                name,
                teardown: Some(Box::new(teardown)),
            }),
            Err(e) => {
                tracing::error!(stack = %name, error = %e, "stack setup failed");
                Err(e)
            }
        }
    }

    /// Name of the guarded stack.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tears the stack down now and returns the teardown output.
    ///
    /// # Errors
    ///
    /// Returns an error if the teardown command could not be run.
    pub fn release(mut self) -> Result<ExecOutput> {
        self.run_teardown().unwrap_or_else(|| Ok(ExecOutput::default()))
    }

    fn run_teardown(&mut self) -> Option<Result<ExecOutput>> {
        let teardown = self.teardown.take()?;
        tracing::info!(stack = %self.name, "tearing stack down");
        Some(teardown())
    }
}

impl Drop for StackGuard<'_> {
    fn drop(&mut self) {
        match self.run_teardown() {
            Some(Ok(out)) if !out.success() => {
                tracing::warn!(
                    stack = %self.name,
                    exit_code = out.exit_code,
                    stderr = %out.stderr.trim(),
                    "teardown exited non-zero"
                );
            }
            Some(Err(e)) => {
                tracing::error!(stack = %self.name, error = %e, "teardown failed");
            }
            _ => {}
        }
    }
}
