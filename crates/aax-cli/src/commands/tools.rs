//! `aax tools`: Show the container and cluster tooling on this host.

use aax_runtime::command::SystemRunner;
use aax_runtime::tools::tool_info;
use aax_verify::cluster::{Availability, detect};
use aax_verify::suite::SuiteEnv;
use clap::Args;

use super::Context;
use crate::output;

/// Arguments for the `tools` command.
#[derive(Args, Debug)]
pub struct ToolsArgs {
    /// Also ask the cluster CLI whether a cluster is reachable.
    #[arg(long)]
    pub cluster: bool,
}

/// Executes the `tools` command.
///
/// # Errors
///
/// Never fails; missing tools are reported, not treated as errors.
#[allow(clippy::unnecessary_wraps)]
pub fn execute(args: ToolsArgs, ctx: &Context) -> anyhow::Result<()> {
    let info = tool_info(&ctx.harness);
    print!("{}", output::format_tools(&info));
    if args.cluster {
        let runner = SystemRunner::new();
        match detect(&SuiteEnv::new(&runner, &ctx.harness)) {
            Availability::Reachable => println!("{:<10} reachable", "cluster"),
            Availability::Unavailable(reason) => {
                println!("{:<10} unreachable ({reason})", "cluster");
            }
        }
    }
    Ok(())
}
