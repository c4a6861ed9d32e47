//! CLI command definitions and dispatch.

pub mod build;
pub mod contract;
pub mod settings;
pub mod tools;
pub mod verify;

use std::path::PathBuf;

use aax_common::config::HarnessConfig;
use aax_common::constants::{
    DEFAULT_CONTRACT_FILE, DEFAULT_DOCKER_BIN, DEFAULT_KUBECTL_BIN, REPO_ROOT_ENV, repo_root,
};
use aax_verify::contract::Contract;
use clap::{Parser, Subcommand, ValueEnum};

/// AAX: build and verify the automation platform images and deployments.
#[derive(Parser, Debug)]
#[command(name = "aax", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Contract file; the built-in contract is used when it does not exist.
    #[arg(long, global = true, env = "AAX_CONFIG", default_value = DEFAULT_CONTRACT_FILE)]
    pub config: PathBuf,

    /// Repository root that build files and manifests resolve against.
    #[arg(long, global = true, env = REPO_ROOT_ENV)]
    pub repo_root: Option<PathBuf>,

    /// Container CLI binary.
    #[arg(long, global = true, env = "AAX_DOCKER", default_value = DEFAULT_DOCKER_BIN)]
    pub docker: String,

    /// Cluster CLI binary.
    #[arg(long, global = true, env = "AAX_KUBECTL", default_value = DEFAULT_KUBECTL_BIN)]
    pub kubectl: String,

    /// Log line format on stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Output format for structured command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Aligned table.
    Text,
    /// JSON document.
    Json,
    /// YAML document.
    Yaml,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build images in dependency order.
    Build(build::BuildArgs),
    /// Run a verification suite.
    Verify(verify::VerifyArgs),
    /// Render the hub settings resolved from the environment.
    Settings(settings::SettingsArgs),
    /// Print or validate the effective verification contract.
    Contract(contract::ContractArgs),
    /// Show the container and cluster tooling available on this host.
    Tools(tools::ToolsArgs),
}

/// Settings shared by every command, resolved from the global flags.
#[derive(Debug, Clone)]
pub struct Context {
    /// Harness configuration.
    pub harness: HarnessConfig,
    /// Contract file location, resolved against the repository root.
    pub contract_path: PathBuf,
}

impl Context {
    /// Builds the context from the parsed global flags.
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        let harness = HarnessConfig {
            repo_root: cli.repo_root.clone().unwrap_or_else(|| repo_root().clone()),
            docker: cli.docker.clone(),
            kubectl: cli.kubectl.clone(),
        };
        let contract_path = harness.resolve(&cli.config);
        Self {
            harness,
            contract_path,
        }
    }

    /// Loads the contract file, or the built-in contract when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is invalid.
    pub fn contract(&self) -> anyhow::Result<Contract> {
        Contract::load_or_default(&self.contract_path).map_err(|e| {
            anyhow::anyhow!("failed to load contract {}: {e}", self.contract_path.display())
        })
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context::from_cli(&cli);
    tracing::debug!(repo_root = %ctx.harness.repo_root.display(), "resolved context");
    match cli.command {
        Command::Build(args) => build::execute(args, &ctx),
        Command::Verify(args) => verify::execute(args, &ctx),
        Command::Settings(args) => settings::execute(args),
        Command::Contract(args) => contract::execute(args, &ctx),
        Command::Tools(args) => tools::execute(args, &ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_shape_the_context() {
        let cli = Cli::try_parse_from([
            "aax",
            "--repo-root",
            "/srv/aax",
            "--docker",
            "podman",
            "--config",
            "ci/aax.yaml",
            "tools",
        ])
        .unwrap();
        let ctx = Context::from_cli(&cli);
        assert_eq!(ctx.harness.docker, "podman");
        assert_eq!(ctx.contract_path, PathBuf::from("/srv/aax/ci/aax.yaml"));
    }

    #[test]
    fn verify_requires_a_suite() {
        assert!(Cli::try_parse_from(["aax", "verify"]).is_err());
        let cli = Cli::try_parse_from(["aax", "verify", "compose", "--format", "json"]).unwrap();
        assert!(matches!(cli.command, Command::Verify(_)));
    }

    #[test]
    fn log_format_is_global() {
        let cli = Cli::try_parse_from(["aax", "tools", "--log-format", "json"]).unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
