//! Image build and container run invocations.
//!
//! Both operations are pure pass-throughs: they construct the argument
//! vector, run it once, and hand back the raw output together with the
//! invocation, without retry or interpretation.

use std::path::Path;

use aax_common::config::HarnessConfig;
use aax_common::error::Result;
use aax_common::types::BuildArgs;

use crate::command::{CommandRunner, Completed, Invocation, non_empty_dir};

/// Builds the `docker build` argument vector.
///
/// The result is `build -f <dockerfile> -t <tag> (--build-arg K=V)* <context>`
/// with build arguments in declaration order.
#[must_use]
fn build_argv(tag: &str, dockerfile: &Path, context: &Path, build_args: &BuildArgs) -> Vec<String> {
    let mut argv = vec![
        "build".to_string(),
        "-f".to_string(),
        dockerfile.display().to_string(),
        "-t".to_string(),
        tag.to_string(),
    ];
    for (key, value) in build_args.iter() {
        argv.push("--build-arg".to_string());
        argv.push(format!("{key}={value}"));
    }
    argv.push(context.display().to_string());
    argv
}

/// Builds the `docker run` argument vector for a throwaway container.
#[must_use]
fn run_argv(image: &str, entrypoint: Option<&str>, argv: &[String]) -> Vec<String> {
    let mut out = vec!["run".to_string(), "--rm".to_string()];
    if let Some(entrypoint) = entrypoint {
        out.push("--entrypoint".to_string());
        out.push(entrypoint.to_string());
    }
    out.push(image.to_string());
    out.extend(argv.iter().cloned());
    out
}

/// Invokes the container CLI to build images and run one-shot containers.
pub struct ImageInvoker<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a HarnessConfig,
}

impl<'a> ImageInvoker<'a> {
    /// Creates an invoker using `runner` and the binaries named in `config`.
    #[must_use]
    pub fn new(runner: &'a dyn CommandRunner, config: &'a HarnessConfig) -> Self {
        Self { runner, config }
    }

    /// Builds an image.
    ///
    /// Relative `dockerfile` and `context` paths resolve against the
    /// repository root, which is also the working directory of the build.
    ///
    /// # Errors
    ///
    /// Returns an error only if the container CLI cannot be spawned; a failed
    /// build is reported through the returned exit code.
    pub fn build(
        &self,
        tag: &str,
        dockerfile: &Path,
        context: &Path,
        build_args: &BuildArgs,
    ) -> Result<Completed> {
        let dockerfile = self.config.resolve(dockerfile);
        let context = self.config.resolve(context);
        tracing::info!(
            tag,
            dockerfile = %dockerfile.display(),
            context = %context.display(),
            build_args = build_args.len(),
            "building image"
        );

        let mut invocation = Invocation::new(&self.config.docker)
            .args(build_argv(tag, &dockerfile, &context, build_args));
        invocation.cwd = non_empty_dir(&self.config.repo_root);

        let completed = self.runner.complete(invocation)?;
        if !completed.output.success() {
            tracing::warn!(tag, exit_code = completed.output.exit_code, "image build failed");
        }
        Ok(completed)
    }

    /// Runs `argv` in a throwaway container of `image`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the container CLI cannot be spawned.
    pub fn run(&self, image: &str, argv: &[String]) -> Result<Completed> {
        self.run_inner(image, None, argv)
    }

    /// Runs `args` in a throwaway container with the entrypoint replaced by
    /// `entrypoint`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the container CLI cannot be spawned.
    pub fn run_with_entrypoint(
        &self,
        image: &str,
        entrypoint: &str,
        args: &[String],
    ) -> Result<Completed> {
        self.run_inner(image, Some(entrypoint), args)
    }

    fn run_inner(&self, image: &str, entrypoint: Option<&str>, argv: &[String]) -> Result<Completed> {
        tracing::debug!(image, ?entrypoint, cmd = ?argv, "running container");
        let invocation =
            Invocation::new(&self.config.docker).args(run_argv(image, entrypoint, argv));
        self.runner.complete(invocation)
    }
}
