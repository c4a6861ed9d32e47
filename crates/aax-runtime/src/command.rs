//! Blocking execution of external CLI commands.
//!
//! The [`CommandRunner`] trait is the single seam between the harness and
//! the outside world. [`SystemRunner`] spawns real processes; tests swap in
//! a scripted runner that records invocations and replays canned output.

use std::fmt;
use std::path::{Path, PathBuf};

use aax_common::error::{AaxError, Result};
use aax_common::types::ExecOutput;

/// A fully described external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to execute, looked up on `PATH`.
    pub program: String,
    /// Arguments, passed verbatim.
    pub args: Vec<String>,
    /// Working directory, or the current one when `None`.
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    /// Creates an invocation with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Converts a non-zero exit into [`AaxError::CommandFailed`].
    ///
    /// # Errors
    ///
    /// Returns an error carrying the captured stderr if `output` did not
    /// exit with code zero.
    pub fn check(&self, output: ExecOutput) -> Result<ExecOutput> {
        if output.success() {
            Ok(output)
        } else {
            Err(AaxError::CommandFailed {
                program: self.program.clone(),
                args: self.args.clone(),
                exit_code: output.exit_code,
                stderr: output.stderr,
            })
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// A finished command: the invocation that ran and its raw output.
///
/// Drivers hand this back so a failure is reported with the exact program,
/// arguments and working directory that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completed {
    /// What was run.
    pub invocation: Invocation,
    /// What it printed and how it exited.
    pub output: ExecOutput,
}

impl Completed {
    /// Returns the output if the command exited zero.
    ///
    /// # Errors
    ///
    /// Returns [`AaxError::CommandFailed`] naming the invocation that ran.
    pub fn checked(self) -> Result<ExecOutput> {
        self.invocation.check(self.output)
    }
}

/// Executes external commands and captures their output.
///
/// Implementations must pass the exit code and both output streams through
/// unchanged. Only a failure to start the process is an `Err`; a non-zero
/// exit is a normal [`ExecOutput`].
pub trait CommandRunner: Send + Sync {
    /// Runs `invocation` to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    fn run(&self, invocation: &Invocation) -> Result<ExecOutput>;

    /// Runs `invocation` and keeps it alongside the output.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    fn complete(&self, invocation: Invocation) -> Result<Completed> {
        let output = self.run(&invocation)?;
        Ok(Completed { invocation, output })
    }
}

/// Runner that spawns real processes with `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    /// Creates a new system runner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<ExecOutput> {
        tracing::debug!(cmd = %invocation, cwd = ?invocation.cwd, "running command");

        let mut command = std::process::Command::new(&invocation.program);
        let _ = command.args(&invocation.args);
        if let Some(dir) = invocation.cwd.as_deref() {
            let _ = command.current_dir(dir);
        }

        let output = command.output().map_err(|e| AaxError::Spawn {
            program: invocation.program.clone(),
            source: e,
        })?;

        // Streams are decoded lossily; invalid UTF-8 becomes U+FFFD.
        let result = ExecOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        };
        tracing::debug!(cmd = %invocation, exit_code = result.exit_code, "command finished");
        Ok(result)
    }
}

/// Returns `dir` as a working directory unless it is empty, in which case
/// the child inherits the caller's.
#[must_use]
pub fn non_empty_dir(dir: &Path) -> Option<PathBuf> {
    if dir.as_os_str().is_empty() {
        None
    } else {
        Some(dir.to_path_buf())
    }
}
