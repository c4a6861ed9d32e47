//! Image suite: build each image, then check it in throwaway containers.

use std::collections::BTreeSet;

use aax_common::error::{AaxError, Result};
use aax_common::types::ExecOutput;
use aax_runtime::image::ImageInvoker;

use crate::contract::{ContainerCheck, Contract, ImageTarget};
use crate::plan::build_order;
use crate::report::{FailureKind, SuiteReport};
use crate::suite::{Check, SuiteEnv, SuiteRun};

/// Suite name used in reports.
pub const SUITE: &str = "images";

fn build_one(invoker: &ImageInvoker<'_>, image: &ImageTarget) -> Result<ExecOutput> {
    invoker
        .build(&image.tag, &image.dockerfile, &image.context, &image.build_args)?
        .checked()
}

fn run_check(invoker: &ImageInvoker<'_>, image: &ImageTarget, check: &ContainerCheck) -> Result<()> {
    let completed = match check.entrypoint.as_deref() {
        Some(entrypoint) => invoker.run_with_entrypoint(&image.tag, entrypoint, &check.argv)?,
        None => invoker.run(&image.tag, &check.argv)?,
    };
    check.expect.evaluate(completed)
}

/// Builds the selected images (all when `selection` is empty) and their
/// dependencies, stopping at the first failed build.
///
/// Returns the build output of each image in build order.
///
/// # Errors
///
/// Returns a planning error, or [`AaxError::CommandFailed`] for the first
/// image that did not build.
pub fn build_images(
    env: &SuiteEnv<'_>,
    contract: &Contract,
    selection: &[String],
) -> Result<Vec<(String, ExecOutput)>> {
    let plan = build_order(&contract.images, selection)?;
    let invoker = ImageInvoker::new(env.runner, env.config);
    let mut built = Vec::with_capacity(plan.len());
    for image in plan {
        let out = build_one(&invoker, image)?;
        tracing::info!(image = %image.name, tag = %image.tag, "image built");
        built.push((image.name.clone(), out));
    }
    Ok(built)
}

/// Runs the image suite over the selected images (all when empty).
///
/// Images are built in dependency order. An image whose dependency failed
/// to build is not built; checks of an image that did not build are
/// skipped.
///
/// # Errors
///
/// Returns an error only if the build plan is invalid; check failures are
/// recorded in the report.
pub fn run(env: &SuiteEnv<'_>, contract: &Contract, selection: &[String]) -> Result<SuiteReport> {
    let plan = build_order(&contract.images, selection)?;
    let invoker = ImageInvoker::new(env.runner, env.config);
    let mut run = SuiteRun::start(SUITE);
    let mut unbuilt: BTreeSet<&str> = BTreeSet::new();

    for image in plan {
        let build_name = format!("{}: image builds", image.name);
        let built = match image.depends_on.iter().find(|d| unbuilt.contains(d.as_str())) {
            Some(dependency) => {
                let error = AaxError::NotFound {
                    kind: "base image",
                    id: format!("{dependency} did not build"),
                };
                run.fail(build_name, FailureKind::Setup, &error);
                false
            }
            None => run.run(Check::new(build_name, || build_one(&invoker, image).map(|_| ()))),
        };

        if !built {
            let _ = unbuilt.insert(image.name.as_str());
            for check in &image.checks {
                run.skip(format!("{}: {}", image.name, check.name), "image did not build");
            }
            continue;
        }

        for check in &image.checks {
            let name = format!("{}: {}", image.name, check.name);
            let _ = run.run(Check::new(name, || run_check(&invoker, image, check)));
        }
    }
    Ok(run.finish())
}
