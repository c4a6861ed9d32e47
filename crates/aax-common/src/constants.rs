//! System-wide constants and default names.

use std::path::PathBuf;
use std::sync::OnceLock;

/// Environment variable overriding the repository root.
pub const REPO_ROOT_ENV: &str = "AAX_REPO_ROOT";

/// Returns the repository root, preferring `$AAX_REPO_ROOT` and falling
/// back to the current working directory.
fn resolve_repo_root() -> PathBuf {
    if let Ok(root) = std::env::var(REPO_ROOT_ENV) {
        if !root.is_empty() {
            return PathBuf::from(root);
        }
    }
    std::env::current_dir().unwrap_or_default()
}

static REPO_ROOT: OnceLock<PathBuf> = OnceLock::new();

/// Returns the resolved repository root for this session.
pub fn repo_root() -> &'static PathBuf {
    REPO_ROOT.get_or_init(resolve_repo_root)
}

/// Default contract file looked up in the repository root.
pub const DEFAULT_CONTRACT_FILE: &str = "aax.yaml";

/// Default container CLI binary.
pub const DEFAULT_DOCKER_BIN: &str = "docker";

/// Default cluster CLI binary.
pub const DEFAULT_KUBECTL_BIN: &str = "kubectl";

/// Cluster namespace every manifest deploys into.
pub const DEFAULT_NAMESPACE: &str = "aax";

/// Kustomization directory, relative to the repository root.
pub const KUSTOMIZE_DIR: &str = "k8s/";

/// Services shared by the compose topology and the cluster deployments.
pub const STACK_SERVICES: [&str; 3] = ["ee-base", "ee-builder", "dev-tools"];

/// Persistent volume claims expected bound in the namespace.
pub const CLUSTER_PVCS: [&str; 4] = ["workspace", "ee-builds", "ee-definitions", "dev-workspace"];

/// Tag of the base execution-environment image other images build on.
pub const EE_BASE_TAG: &str = "aax/ee-base:latest";

/// Version banner printed by `ansible --version` in every derived image.
pub const ANSIBLE_CORE_BANNER: &str = "ansible [core 2.20.0]";

/// Python version prefix expected in automation images.
pub const PYTHON_VERSION_PREFIX: &str = "Python 3.14";
