//! Discovery of the external CLIs the harness drives.

use std::path::PathBuf;

use aax_common::config::HarnessConfig;

/// Location of one external tool, if installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    /// Binary name as configured.
    pub name: String,
    /// Resolved path on `PATH`, or `None` when not installed.
    pub path: Option<PathBuf>,
}

impl ToolStatus {
    /// Returns `true` if the tool was found.
    #[must_use]
    pub const fn available(&self) -> bool {
        self.path.is_some()
    }
}

/// Looks `name` up on `PATH`.
#[must_use]
pub fn locate(name: &str) -> ToolStatus {
    ToolStatus {
        name: name.to_string(),
        path: which::which(name).ok(),
    }
}

/// Information about the host's container and cluster tooling.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Host operating system name.
    pub os: String,
    /// Host CPU architecture.
    pub arch: String,
    /// Container CLI.
    pub docker: ToolStatus,
    /// Cluster CLI.
    pub kubectl: ToolStatus,
}

/// Returns the tooling available for the binaries named in `config`.
#[must_use]
pub fn tool_info(config: &HarnessConfig) -> ToolInfo {
    ToolInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        docker: locate(&config.docker),
        kubectl: locate(&config.kubectl),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_info_os_not_empty() {
        let info = tool_info(&HarnessConfig::with_repo_root(""));
        assert!(!info.os.is_empty());
        assert!(!info.arch.is_empty());
    }

    #[test]
    fn unknown_binary_is_unavailable() {
        let status = locate("aax-no-such-tool");
        assert!(!status.available());
    }
}
