//! Global configuration model for the AAX harness.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Root configuration shared by every driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Directory relative build files, contexts and manifests resolve against.
    pub repo_root: PathBuf,
    /// Container CLI binary (`docker` or a compatible replacement).
    pub docker: String,
    /// Cluster CLI binary.
    pub kubectl: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            repo_root: crate::constants::repo_root().clone(),
            docker: crate::constants::DEFAULT_DOCKER_BIN.to_string(),
            kubectl: crate::constants::DEFAULT_KUBECTL_BIN.to_string(),
        }
    }
}

impl HarnessConfig {
    /// Creates a configuration rooted at `repo_root` with default binaries.
    #[must_use]
    pub fn with_repo_root(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            docker: crate::constants::DEFAULT_DOCKER_BIN.to_string(),
            kubectl: crate::constants::DEFAULT_KUBECTL_BIN.to_string(),
        }
    }

    /// Resolves `path` against the repository root unless it is absolute.
    #[must_use]
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.repo_root.join(path)
        }
    }
}
