//! Scripted command runner for tests.
//!
//! Records every invocation and answers from a list of rules matched
//! against the command line. Unmatched commands succeed with empty output.

use std::sync::{Mutex, PoisonError};

use aax_common::error::{AaxError, Result};
use aax_common::types::ExecOutput;

use crate::command::{CommandRunner, Invocation};

type Responder = Box<dyn Fn(&Invocation, usize) -> Option<ExecOutput> + Send + Sync>;

/// A [`CommandRunner`] that never spawns a process.
pub struct ScriptedRunner {
    rules: Vec<Responder>,
    calls: Mutex<Vec<Invocation>>,
    spawn_failures: Vec<String>,
}

impl std::fmt::Debug for ScriptedRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedRunner")
            .field("rules", &self.rules.len())
            .field("calls", &self.calls().len())
            .finish_non_exhaustive()
    }
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedRunner {
    /// Creates a runner with no rules.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            calls: Mutex::new(Vec::new()),
            spawn_failures: Vec::new(),
        }
    }

    /// Answers every command whose line contains `pattern` with `output`.
    ///
    /// Earlier rules win over later ones.
    #[must_use]
    pub fn on(self, pattern: &str, output: ExecOutput) -> Self {
        let pattern = pattern.to_string();
        self.on_with(move |inv, _| {
            inv.to_string().contains(&pattern).then(|| output.clone())
        })
    }

    /// Answers the n-th (zero-based) matching call of `pattern` from `outputs`,
    /// repeating the last entry once the list runs out.
    #[must_use]
    pub fn on_sequence(self, pattern: &str, outputs: Vec<ExecOutput>) -> Self {
        let pattern = pattern.to_string();
        let seen = Mutex::new(0_usize);
        self.on_with(move |inv, _| {
            if !inv.to_string().contains(&pattern) {
                return None;
            }
            let mut n = seen.lock().unwrap_or_else(PoisonError::into_inner);
            let idx = (*n).min(outputs.len().saturating_sub(1));
            *n += 1;
            outputs.get(idx).cloned()
        })
    }

    /// Adds a free-form rule. The closure receives the invocation and the
    /// number of calls recorded before it.
    #[must_use]
    pub fn on_with<F>(mut self, rule: F) -> Self
    where
        F: Fn(&Invocation, usize) -> Option<ExecOutput> + Send + Sync + 'static,
    {
        self.rules.push(Box::new(rule));
        self
    }

    /// Makes every invocation of `program` fail to spawn.
    #[must_use]
    pub fn missing_program(mut self, program: &str) -> Self {
        self.spawn_failures.push(program.to_string());
        self
    }

    /// Returns a snapshot of every recorded invocation.
    #[must_use]
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the recorded invocations rendered as command lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.calls().iter().map(ToString::to_string).collect()
    }

    /// Counts recorded command lines containing `pattern`.
    #[must_use]
    pub fn count(&self, pattern: &str) -> usize {
        self.lines().iter().filter(|l| l.contains(pattern)).count()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> Result<ExecOutput> {
        let index = {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            calls.push(invocation.clone());
            calls.len() - 1
        };
        if self.spawn_failures.contains(&invocation.program) {
            return Err(AaxError::Spawn {
                program: invocation.program.clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        Ok(self
            .rules
            .iter()
            .find_map(|rule| rule(invocation, index))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_rule_wins() {
        let runner = ScriptedRunner::new()
            .on("ps ee-base", ExecOutput::ok("healthy"))
            .on("ps", ExecOutput::ok("other"));
        let out = runner
            .run(&Invocation::new("docker").args(["compose", "ps", "ee-base"]))
            .unwrap();
        assert_eq!(out.stdout, "healthy");
    }

    #[test]
    fn sequence_repeats_last_output() {
        let runner = ScriptedRunner::new().on_sequence(
            "get",
            vec![ExecOutput::ok("0"), ExecOutput::ok("1")],
        );
        let inv = Invocation::new("kubectl").arg("get");
        let seen: Vec<_> = (0..3).map(|_| runner.run(&inv).unwrap().stdout).collect();
        assert_eq!(seen, vec!["0", "1", "1"]);
        assert_eq!(runner.count("kubectl get"), 3);
    }

    #[test]
    fn unmatched_commands_succeed_empty() {
        let runner = ScriptedRunner::new();
        let out = runner.run(&Invocation::new("true")).unwrap();
        assert_eq!(out, ExecOutput::default());
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let runner = ScriptedRunner::new().missing_program("kubectl");
        let err = runner.run(&Invocation::new("kubectl")).unwrap_err();
        assert!(matches!(err, AaxError::Spawn { .. }));
    }
}
