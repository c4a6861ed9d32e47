//! `aax verify`: Run a verification suite and report every check.

use aax_runtime::command::SystemRunner;
use aax_verify::report::SuiteReport;
use aax_verify::suite::SuiteEnv;
use aax_verify::{cluster, compose, images};
use clap::{Args, ValueEnum};

use super::{Context, Format};
use crate::output;

/// Suite to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Suite {
    /// Build every image and check it in throwaway containers.
    Images,
    /// Validate the compose project and exercise the running stack.
    Compose,
    /// Validate the manifests and exercise the applied namespace.
    Cluster,
    /// All three, in that order.
    All,
}

/// Arguments for the `verify` command.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Suite to run.
    #[arg(value_enum)]
    pub suite: Suite,

    /// Restrict the image suite to these images (and their dependencies).
    #[arg(long = "image", value_name = "NAME")]
    pub images: Vec<String>,

    /// Report format.
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

/// Executes the `verify` command.
///
/// Prints one report per suite and fails if any check failed.
///
/// # Errors
///
/// Returns an error if the contract cannot be loaded, the build plan is
/// invalid, or at least one check failed.
pub fn execute(args: VerifyArgs, ctx: &Context) -> anyhow::Result<()> {
    let contract = ctx.contract()?;
    let runner = SystemRunner::new();
    let env = SuiteEnv::new(&runner, &ctx.harness);

    let mut reports: Vec<SuiteReport> = Vec::new();
    if matches!(args.suite, Suite::Images | Suite::All) {
        reports.push(images::run(&env, &contract, &args.images)?);
    }
    if matches!(args.suite, Suite::Compose | Suite::All) {
        reports.push(compose::run(&env, &contract.compose));
    }
    if matches!(args.suite, Suite::Cluster | Suite::All) {
        reports.push(cluster::run(&env, &contract.cluster));
    }

    match args.format {
        Format::Text => {
            for report in &reports {
                print!("{}", output::format_report(report));
            }
        }
        Format::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        Format::Yaml => print!("{}", serde_yaml::to_string(&reports)?),
    }

    let failed: usize = reports.iter().map(SuiteReport::failed).sum();
    if failed > 0 {
        anyhow::bail!("{failed} check(s) failed");
    }
    Ok(())
}
