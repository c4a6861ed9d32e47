//! `aax settings`: Render the hub settings resolved from the environment.

use aax_common::settings::HubSettings;
use clap::Args;

use super::Format;
use crate::output;

/// Arguments for the `settings` command.
#[derive(Args, Debug)]
pub struct SettingsArgs {
    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Yaml)]
    pub format: Format,
}

/// Executes the `settings` command.
///
/// # Errors
///
/// Returns an error if an environment value is invalid.
pub fn execute(args: SettingsArgs) -> anyhow::Result<()> {
    let settings = HubSettings::from_env()?;
    match args.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&settings)?),
        Format::Yaml => print!("{}", serde_yaml::to_string(&settings)?),
        Format::Text => print!("{}", output::format_settings(&settings)),
    }
    Ok(())
}
