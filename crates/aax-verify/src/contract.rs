//! The verification contract: what each suite builds, runs and asserts.
//!
//! A contract is plain data. The built-in [`Contract::default`] describes the
//! AAX images and deployments; a YAML file can replace any top-level section
//! and every section it omits keeps its default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use aax_common::constants::{
    ANSIBLE_CORE_BANNER, CLUSTER_PVCS, DEFAULT_NAMESPACE, EE_BASE_TAG, KUSTOMIZE_DIR,
    PYTHON_VERSION_PREFIX, STACK_SERVICES,
};
use aax_common::error::{AaxError, Result};
use aax_common::types::BuildArgs;
use aax_runtime::poll::Poller;
use serde::{Deserialize, Serialize};

use crate::expect::Expectation;

/// Complete description of the three suites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contract {
    /// Images built and checked by the image suite.
    pub images: Vec<ImageTarget>,
    /// Compose topology checks.
    pub compose: ComposeContract,
    /// Cluster manifest checks.
    pub cluster: ClusterContract,
}

impl Default for Contract {
    fn default() -> Self {
        Self {
            images: default_images(),
            compose: ComposeContract::default(),
            cluster: ClusterContract::default(),
        }
    }
}

impl Contract {
    /// Reads a contract from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML, or
    /// fails [`Contract::validate`].
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| AaxError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let contract = Self::from_yaml(&text)?;
        tracing::debug!(path = %path.display(), images = contract.images.len(), "contract loaded");
        Ok(contract)
    }

    /// Parses and validates a contract from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid contract.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let contract: Self = serde_yaml::from_str(text)?;
        contract.validate()?;
        Ok(contract)
    }

    /// Loads `path` if it exists, otherwise returns the built-in contract.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be loaded.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no contract file, using built-in contract");
            Ok(Self::default())
        }
    }

    /// Renders the contract as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Looks an image up by name.
    #[must_use]
    pub fn image(&self, name: &str) -> Option<&ImageTarget> {
        self.images.iter().find(|i| i.name == name)
    }

    /// Checks structural invariants that YAML decoding cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`AaxError::Config`] for duplicate image names, empty argv
    /// or a zero poll budget.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::BTreeSet::new();
        for image in &self.images {
            if image.name.is_empty() || image.tag.is_empty() {
                return Err(AaxError::config("image entries need a name and a tag"));
            }
            if !seen.insert(image.name.as_str()) {
                return Err(AaxError::config(format!("duplicate image `{}`", image.name)));
            }
            for check in &image.checks {
                check.validate(&image.name)?;
            }
        }
        for exec in self.compose.exec_checks.iter().chain(&self.cluster.exec_checks) {
            exec.check.validate(&exec.target)?;
        }
        self.compose.health_poll.validate("compose.health_poll")?;
        self.cluster.readiness_poll.validate("cluster.readiness_poll")?;
        Ok(())
    }
}

/// An image to build and the checks run in throwaway containers of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageTarget {
    /// Short name, e.g. `ee-base`.
    pub name: String,
    /// Tag given to the built image.
    pub tag: String,
    /// Dockerfile path, relative to the repository root.
    pub dockerfile: PathBuf,
    /// Build context, relative to the repository root.
    pub context: PathBuf,
    /// Build arguments in the order they are passed.
    #[serde(default, skip_serializing_if = "BuildArgs::is_empty")]
    pub build_args: BuildArgs,
    /// Images that must be built first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    /// Container checks.
    #[serde(default)]
    pub checks: Vec<ContainerCheck>,
}

impl ImageTarget {
    fn new(name: &str, dockerfile: &str, context: &str) -> Self {
        Self {
            name: name.to_string(),
            tag: format!("aax/{name}:latest"),
            dockerfile: PathBuf::from(dockerfile),
            context: PathBuf::from(context),
            build_args: BuildArgs::new(),
            depends_on: Vec::new(),
            checks: Vec::new(),
        }
    }

    fn on_base(mut self, base: &str) -> Self {
        self.build_args.insert("BASE_IMAGE", EE_BASE_TAG);
        self.depends_on.push(base.to_string());
        self
    }

    fn build_arg(mut self, key: &str, value: &str) -> Self {
        self.build_args.insert(key, value);
        self
    }

    fn checks(mut self, checks: impl IntoIterator<Item = ContainerCheck>) -> Self {
        self.checks.extend(checks);
        self
    }
}

/// One command run in a container and what its output must show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerCheck {
    /// Human-readable description, used as the check name.
    pub name: String,
    /// Command and arguments.
    pub argv: Vec<String>,
    /// Expected outcome.
    #[serde(default)]
    pub expect: Expectation,
    /// Replaces the image entrypoint for image-suite runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
}

impl ContainerCheck {
    /// Creates a check.
    #[must_use]
    pub fn new(name: impl Into<String>, argv: &[&str], expect: Expectation) -> Self {
        Self {
            name: name.into(),
            argv: argv.iter().map(ToString::to_string).collect(),
            expect,
            entrypoint: None,
        }
    }

    fn validate(&self, owner: &str) -> Result<()> {
        if self.argv.is_empty() {
            return Err(AaxError::config(format!(
                "check `{}` of `{owner}` has an empty argv",
                self.name
            )));
        }
        Ok(())
    }
}

/// A container check bound to a compose service or cluster deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecCheck {
    /// Service or deployment name.
    pub target: String,
    /// The check to run there.
    pub check: ContainerCheck,
}

impl ExecCheck {
    fn new(target: &str, check: ContainerCheck) -> Self {
        Self {
            target: target.to_string(),
            check,
        }
    }
}

/// Attempt budget of a polled condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollBudget {
    /// Maximum number of checks.
    pub attempts: u32,
    /// Delay between checks, in milliseconds.
    pub delay_ms: u64,
}

impl PollBudget {
    /// Creates a budget of `attempts` checks `delay_ms` apart.
    #[must_use]
    pub const fn new(attempts: u32, delay_ms: u64) -> Self {
        Self { attempts, delay_ms }
    }

    /// Builds the poller for this budget.
    #[must_use]
    pub const fn poller(&self) -> Poller {
        Poller::new(self.attempts, Duration::from_millis(self.delay_ms))
    }

    fn validate(&self, field: &str) -> Result<()> {
        if self.attempts == 0 {
            return Err(AaxError::config(format!("{field}.attempts must be at least 1")));
        }
        Ok(())
    }
}

/// Checks against the compose topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeContract {
    /// Project directory, relative to the repository root.
    pub project_dir: PathBuf,
    /// Services that must be defined and appear in `ps`.
    pub services: Vec<String>,
    /// Service whose health is polled after `up`.
    pub health_service: String,
    /// Budget for the health poll.
    pub health_poll: PollBudget,
    /// Seconds to wait after `up` before the first check.
    pub settle_secs: u64,
    /// Services whose state must be `running` or `exited`.
    pub started_services: Vec<String>,
    /// Acceptable network name fragments; any one must be listed.
    pub network_names: Vec<String>,
    /// Volume name fragments; each must appear in some volume name.
    pub volume_fragments: Vec<String>,
    /// Keys the rendered config must contain.
    pub resource_keys: Vec<String>,
    /// Minimum number of `healthcheck:` entries in the rendered config.
    pub min_healthchecks: usize,
    /// Commands run with `compose exec`.
    pub exec_checks: Vec<ExecCheck>,
}

impl Default for ComposeContract {
    fn default() -> Self {
        let mut exec_checks = stack_exec_checks();
        exec_checks.insert(
            4,
            ExecCheck::new(
                "dev-tools",
                ContainerCheck::new(
                    "resolves ee-base on the shared network",
                    &["python3", "-c", "import socket; socket.gethostbyname('ee-base')"],
                    Expectation::Succeeds,
                ),
            ),
        );
        Self {
            project_dir: PathBuf::new(),
            services: strings(&STACK_SERVICES),
            health_service: "ee-base".to_string(),
            health_poll: PollBudget::new(30, 1_000),
            settle_secs: 10,
            started_services: strings(&["ee-builder", "dev-tools"]),
            network_names: strings(&["aax_ansible", "ansible"]),
            volume_fragments: strings(&["workspace", "ee_builds"]),
            resource_keys: strings(&["cpus:", "memory:"]),
            min_healthchecks: 3,
            exec_checks,
        }
    }
}

/// Checks against the cluster manifests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterContract {
    /// Kustomization directory, relative to the repository root.
    pub kustomize_dir: PathBuf,
    /// Namespace the manifests create.
    pub namespace: String,
    /// Text the rendered manifests must contain.
    pub manifest_markers: Vec<String>,
    /// Deployments that must exist and become ready.
    pub deployments: Vec<String>,
    /// Services that must exist with a cluster IP.
    pub services: Vec<String>,
    /// Persistent volume claims that must exist and be bound.
    pub pvcs: Vec<String>,
    /// Number of pods that must reach `Running`.
    pub expected_pods: usize,
    /// Ready replica count each deployment must report.
    pub ready_replicas: String,
    /// Budget for the readiness and pod-phase polls.
    pub readiness_poll: PollBudget,
    /// Seconds to wait after `apply` before the first check.
    pub settle_secs: u64,
    /// Keys the container resources must mention.
    pub resource_keys: Vec<String>,
    /// Probe keys each deployment must declare.
    pub probe_keys: Vec<String>,
    /// Commands run with `kubectl exec` against `deployment/<target>`.
    pub exec_checks: Vec<ExecCheck>,
}

impl Default for ClusterContract {
    fn default() -> Self {
        Self {
            kustomize_dir: PathBuf::from(KUSTOMIZE_DIR),
            namespace: DEFAULT_NAMESPACE.to_string(),
            manifest_markers: vec![
                "kind: Namespace".to_string(),
                format!("name: {DEFAULT_NAMESPACE}"),
            ],
            deployments: strings(&STACK_SERVICES),
            services: strings(&STACK_SERVICES),
            pvcs: strings(&CLUSTER_PVCS),
            expected_pods: STACK_SERVICES.len(),
            ready_replicas: "1".to_string(),
            readiness_poll: PollBudget::new(30, 2_000),
            settle_secs: 15,
            resource_keys: strings(&["limits", "requests", "cpu", "memory"]),
            probe_keys: strings(&["livenessProbe", "readinessProbe"]),
            exec_checks: stack_exec_checks(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

fn version_check(tool: &str, version: &str) -> ContainerCheck {
    ContainerCheck::new(
        format!("{tool} {version}"),
        &[tool, "--version"],
        Expectation::contains(version),
    )
}

fn ansible_core_check() -> ContainerCheck {
    ContainerCheck::new(
        "ansible core",
        &["ansible", "--version"],
        Expectation::contains(ANSIBLE_CORE_BANNER),
    )
}

fn python_check() -> ContainerCheck {
    ContainerCheck::new(
        "python version",
        &["python3", "--version"],
        Expectation::contains(PYTHON_VERSION_PREFIX),
    )
}

fn user_check(user: &str) -> ContainerCheck {
    ContainerCheck::new(format!("runs as {user}"), &["whoami"], Expectation::equals(user))
}

fn workdir_check() -> ContainerCheck {
    ContainerCheck::new("workspace directory", &["pwd"], Expectation::equals("/workspace"))
}

fn pager_check() -> ContainerCheck {
    ContainerCheck::new("pager disabled", &["printenv", "PAGER"], Expectation::equals(""))
}

fn imports(modules: &[&str]) -> Vec<ContainerCheck> {
    modules
        .iter()
        .map(|m| {
            ContainerCheck::new(
                format!("imports {m}"),
                &["python3", "-c", &format!("import {m}")],
                Expectation::Succeeds,
            )
        })
        .collect()
}

/// Exec checks shared by the compose and cluster stacks.
fn stack_exec_checks() -> Vec<ExecCheck> {
    let mut checks = vec![
        ExecCheck::new("ee-base", ansible_core_check()),
        ExecCheck::new("ee-builder", version_check("ansible-builder", "3.1")),
        ExecCheck::new("dev-tools", version_check("ansible-navigator", "24.2.0")),
        ExecCheck::new("dev-tools", version_check("ansible-lint", "25.12.1")),
    ];
    for service in STACK_SERVICES {
        checks.push(ExecCheck::new(
            service,
            ContainerCheck::new(
                "ANSIBLE_NOCOWS set",
                &["printenv", "ANSIBLE_NOCOWS"],
                Expectation::equals("1"),
            ),
        ));
    }
    checks.push(ExecCheck::new("dev-tools", pager_check()));
    checks
}

fn default_images() -> Vec<ImageTarget> {
    let mut ee_base_checks = vec![
        ansible_core_check(),
        version_check("ansible-runner", "2.4.2"),
        python_check(),
    ];
    ee_base_checks.extend(["git", "ssh", "rsync", "jq", "curl"].into_iter().map(|tool| {
        ContainerCheck::new(format!("{tool} installed"), &["which", tool], Expectation::Succeeds)
    }));
    ee_base_checks.extend([
        ContainerCheck::new(
            "ansible.cfg in place",
            &["cat", "/etc/ansible/ansible.cfg"],
            Expectation::contains("host_key_checking = False"),
        ),
        user_check("ansible"),
        ContainerCheck::new("entrypoint passes argv", &["echo", "test"], Expectation::contains("test")),
        ContainerCheck::new(
            "ansible modules import",
            &["python3", "-c", "import ansible; import ansible_runner; print('success')"],
            Expectation::contains("success"),
        ),
    ]);

    vec![
        ImageTarget::new("ee-base", "images/ee-base/Dockerfile", "images/ee-base")
            .checks(ee_base_checks),
        ImageTarget::new("ee-builder", "images/ee-builder/Dockerfile", "images/ee-builder")
            .on_base("ee-base")
            .checks([
                version_check("ansible-builder", "3.1.0"),
                ansible_core_check(),
                python_check(),
                user_check("ansible"),
                workdir_check(),
            ]),
        ImageTarget::new("dev-tools", "images/dev-tools/Dockerfile", "images/dev-tools")
            .on_base("ee-base")
            .checks([
                version_check("ansible-navigator", "24.2.0"),
                version_check("ansible-lint", "25.12.1"),
                ansible_core_check(),
                python_check(),
                user_check("ansible"),
                workdir_check(),
                pager_check(),
            ]),
        ImageTarget::new("awx", "images/awx/Dockerfile", "images/awx")
            .build_arg("AWX_VERSION", "24.6.1")
            .checks(imports(&["django", "gunicorn", "psycopg2"])),
        ImageTarget::new("galaxy-ng", "images/galaxy-ng/Dockerfile", "images/galaxy-ng")
            .checks(imports(&["django", "galaxy_ng", "gunicorn", "psycopg2"]))
            .checks([user_check("galaxy")]),
        ImageTarget::new("pulp", "images/pulp/Dockerfile.pulp", "images/pulp")
            .checks(imports(&["pulpcore", "pulp_ansible", "psycopg2", "redis"]))
            .checks([user_check("pulp")]),
        ImageTarget::new("eda", "images/eda-controller/Dockerfile", "images/eda-controller")
            .checks(imports(&["ansible_rulebook", "aiohttp", "psycopg2"]))
            .checks([
                ContainerCheck::new(
                    "ansible-rulebook cli",
                    &["ansible-rulebook", "--version"],
                    Expectation::Succeeds,
                ),
                user_check("eda"),
                ContainerCheck::new(
                    "java runtime",
                    &["java", "-version"],
                    Expectation::contains_any(["openjdk", "java"]),
                ),
            ]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_contract_covers_every_image() {
        let contract = Contract::default();
        let names: Vec<_> = contract.images.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["ee-base", "ee-builder", "dev-tools", "awx", "galaxy-ng", "pulp", "eda"]
        );
        contract.validate().unwrap();
    }

    #[test]
    fn derived_images_build_on_ee_base() {
        let contract = Contract::default();
        for name in ["ee-builder", "dev-tools"] {
            let image = contract.image(name).unwrap();
            assert_eq!(image.depends_on, vec!["ee-base"]);
            assert_eq!(image.build_args.get("BASE_IMAGE"), Some(EE_BASE_TAG));
        }
        let awx = contract.image("awx").unwrap();
        assert_eq!(awx.build_args.get("AWX_VERSION"), Some("24.6.1"));
        assert_eq!(
            contract.image("pulp").unwrap().dockerfile,
            PathBuf::from("images/pulp/Dockerfile.pulp")
        );
    }

    #[test]
    fn ee_base_checks_required_tools() {
        let contract = Contract::default();
        let base = contract.image("ee-base").unwrap();
        let which: Vec<_> = base
            .checks
            .iter()
            .filter(|c| c.argv[0] == "which")
            .map(|c| c.argv[1].as_str())
            .collect();
        assert_eq!(which, vec!["git", "ssh", "rsync", "jq", "curl"]);
    }

    #[test]
    fn stack_defaults_match_deployment() {
        let contract = Contract::default();
        assert_eq!(contract.compose.health_poll, PollBudget::new(30, 1_000));
        assert_eq!(contract.cluster.readiness_poll, PollBudget::new(30, 2_000));
        assert_eq!(contract.cluster.settle_secs, 15);
        assert_eq!(contract.cluster.pvcs.len(), 4);
        let nocows = contract
            .cluster
            .exec_checks
            .iter()
            .filter(|e| e.check.argv == ["printenv", "ANSIBLE_NOCOWS"])
            .count();
        assert_eq!(nocows, 3);
        assert!(contract
            .compose
            .exec_checks
            .iter()
            .any(|e| e.target == "dev-tools" && e.check.argv[0] == "python3"));
    }

    #[test]
    fn partial_yaml_keeps_other_sections() {
        let yaml = r"
images:
  - name: ee-builder
    tag: aax/ee-builder:dev
    dockerfile: images/ee-builder/Dockerfile
    context: images/ee-builder
    build_args:
      BASE_IMAGE: aax/ee-base:dev
      PIP_INDEX: https://mirror.example
    checks:
      - name: builder present
        argv: [ansible-builder, --version]
        expect:
          kind: contains
          text: '3.1'
";
        let contract = Contract::from_yaml(yaml).unwrap();
        assert_eq!(contract.images.len(), 1);
        let keys: Vec<_> = contract.images[0].build_args.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["BASE_IMAGE", "PIP_INDEX"]);
        assert_eq!(contract.cluster, ClusterContract::default());
        assert_eq!(contract.compose.services, strings(&STACK_SERVICES));
    }

    #[test]
    fn build_arg_order_survives_yaml() {
        let contract = Contract::default();
        let text = contract.to_yaml().unwrap();
        let back = Contract::from_yaml(&text).unwrap();
        assert_eq!(back, contract);
    }

    #[test]
    fn duplicate_images_are_rejected() {
        let mut contract = Contract::default();
        contract.images.push(contract.images[0].clone());
        let err = contract.validate().unwrap_err();
        assert!(matches!(err, AaxError::Config { .. }));
    }

    #[test]
    fn zero_poll_budget_is_rejected() {
        let yaml = "compose:\n  health_poll:\n    attempts: 0\n    delay_ms: 10\n";
        assert!(Contract::from_yaml(yaml).is_err());
    }

    #[test]
    fn load_or_default_reads_file_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aax.yaml");
        assert_eq!(Contract::load_or_default(&path).unwrap(), Contract::default());

        std::fs::write(&path, "cluster:\n  namespace: staging\n").unwrap();
        let contract = Contract::load_or_default(&path).unwrap();
        assert_eq!(contract.cluster.namespace, "staging");
        assert_eq!(contract.images.len(), 7);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Contract::load(Path::new("/nonexistent/aax.yaml")).unwrap_err();
        assert!(matches!(err, AaxError::Io { .. }));
    }
}
