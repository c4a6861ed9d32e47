//! `docker compose` driver.
//!
//! Runs in the compose project directory so the project's default file and
//! name apply. Every method returns the raw tool output together with the
//! invocation that produced it.

use std::path::{Path, PathBuf};

use aax_common::config::HarnessConfig;
use aax_common::error::Result;
use aax_runtime::command::{CommandRunner, Completed, Invocation, non_empty_dir};

/// Driver for one compose project.
pub struct ComposeDriver<'a> {
    runner: &'a dyn CommandRunner,
    docker: String,
    project_dir: PathBuf,
}

impl<'a> ComposeDriver<'a> {
    /// Creates a driver for the project in `project_dir`, resolved against
    /// the repository root.
    #[must_use]
    pub fn new(runner: &'a dyn CommandRunner, config: &HarnessConfig, project_dir: &Path) -> Self {
        Self {
            runner,
            docker: config.docker.clone(),
            project_dir: config.resolve(project_dir),
        }
    }

    fn compose<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut invocation = Invocation::new(&self.docker).arg("compose").args(args);
        invocation.cwd = non_empty_dir(&self.project_dir);
        invocation
    }

    fn run(&self, invocation: Invocation) -> Result<Completed> {
        tracing::debug!(cmd = %invocation, "compose");
        self.runner.complete(invocation)
    }

    /// `docker compose up -d`.
    ///
    /// # Errors
    ///
    /// Returns an error if the CLI cannot be spawned.
    pub fn up(&self) -> Result<Completed> {
        self.run(self.compose(["up", "-d"]))
    }

    /// `docker compose down`.
    ///
    /// # Errors
    ///
    /// Returns an error if the CLI cannot be spawned.
    pub fn down(&self) -> Result<Completed> {
        self.run(self.compose(["down"]))
    }

    /// `docker compose build`.
    ///
    /// # Errors
    ///
    /// Returns an error if the CLI cannot be spawned.
    pub fn build(&self) -> Result<Completed> {
        self.run(self.compose(["build"]))
    }

    /// `docker compose config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the CLI cannot be spawned.
    pub fn config(&self) -> Result<Completed> {
        self.run(self.compose(["config"]))
    }

    /// `docker compose config --services`.
    ///
    /// # Errors
    ///
    /// Returns an error if the CLI cannot be spawned.
    pub fn config_services(&self) -> Result<Completed> {
        self.run(self.compose(["config", "--services"]))
    }

    /// `docker compose ps [service] --format <format>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the CLI cannot be spawned.
    pub fn ps(&self, service: Option<&str>, format: &str) -> Result<Completed> {
        let mut args = vec!["ps".to_string()];
        if let Some(service) = service {
            args.push(service.to_string());
        }
        args.push("--format".to_string());
        args.push(format.to_string());
        self.run(self.compose(args))
    }

    /// `docker compose exec -T <service> <argv…>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the CLI cannot be spawned.
    pub fn exec(&self, service: &str, argv: &[String]) -> Result<Completed> {
        let invocation = self
            .compose(["exec", "-T", service])
            .args(argv.iter().cloned());
        self.run(invocation)
    }

    /// `docker network ls --format {{.Name}}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the CLI cannot be spawned.
    pub fn network_ls(&self) -> Result<Completed> {
        let invocation =
            Invocation::new(&self.docker).args(["network", "ls", "--format", "{{.Name}}"]);
        self.run(invocation)
    }

    /// `docker volume ls --format {{.Name}}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the CLI cannot be spawned.
    pub fn volume_ls(&self) -> Result<Completed> {
        let invocation =
            Invocation::new(&self.docker).args(["volume", "ls", "--format", "{{.Name}}"]);
        self.run(invocation)
    }
}
