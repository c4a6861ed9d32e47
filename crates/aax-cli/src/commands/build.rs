//! `aax build`: Build images in dependency order.

use aax_runtime::command::SystemRunner;
use aax_verify::images::build_images;
use aax_verify::suite::SuiteEnv;
use clap::Args;

use super::Context;

/// Arguments for the `build` command.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Images to build; every image in the contract when omitted.
    #[arg(value_name = "IMAGE")]
    pub images: Vec<String>,
}

/// Executes the `build` command.
///
/// Builds the selected images and whatever they build on, stopping at the
/// first failure.
///
/// # Errors
///
/// Returns an error if the contract is invalid or a build fails.
pub fn execute(args: BuildArgs, ctx: &Context) -> anyhow::Result<()> {
    let contract = ctx.contract()?;
    let runner = SystemRunner::new();
    let env = SuiteEnv::new(&runner, &ctx.harness);

    let built = build_images(&env, &contract, &args.images)?;
    for (name, _) in &built {
        if let Some(image) = contract.image(name) {
            println!("built {:<12} {}", image.name, image.tag);
        }
    }
    println!("{} image(s) built", built.len());
    Ok(())
}
