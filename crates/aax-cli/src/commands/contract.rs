//! `aax contract`: Print or validate the effective verification contract.

use aax_verify::plan::build_order;
use clap::Args;

use super::Context;

/// Arguments for the `contract` command.
#[derive(Args, Debug)]
pub struct ContractArgs {
    /// Only validate; print the build order instead of the contract.
    #[arg(long)]
    pub check: bool,
}

/// Executes the `contract` command.
///
/// # Errors
///
/// Returns an error if the contract is invalid or its images cannot be
/// ordered.
pub fn execute(args: ContractArgs, ctx: &Context) -> anyhow::Result<()> {
    let contract = ctx.contract()?;
    let order = build_order(&contract.images, &[])?;

    if args.check {
        let source = if ctx.contract_path.exists() {
            ctx.contract_path.display().to_string()
        } else {
            "built-in contract".to_string()
        };
        println!("{source}: ok");
        let names: Vec<&str> = order.iter().map(|i| i.name.as_str()).collect();
        println!("build order: {}", names.join(" -> "));
        return Ok(());
    }

    print!("{}", contract.to_yaml()?);
    Ok(())
}
