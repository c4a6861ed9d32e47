//! `kubectl` driver.
//!
//! Every method returns the raw tool output together with the invocation
//! that produced it.

use std::path::Path;

use aax_common::config::HarnessConfig;
use aax_common::error::Result;
use aax_runtime::command::{CommandRunner, Completed, Invocation, non_empty_dir};

/// Output format for `kubectl get`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// `-o name`: one `kind/name` reference per line.
    Name,
    /// `-o jsonpath=<expr>`.
    JsonPath(String),
    /// `-o yaml`.
    Yaml,
}

impl Output {
    /// Shorthand for a jsonpath expression.
    #[must_use]
    pub fn jsonpath(expr: impl Into<String>) -> Self {
        Self::JsonPath(expr.into())
    }

    fn as_arg(&self) -> String {
        match self {
            Self::Name => "name".to_string(),
            Self::JsonPath(expr) => format!("jsonpath={expr}"),
            Self::Yaml => "yaml".to_string(),
        }
    }
}

/// Query for `kubectl get`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetQuery<'q> {
    /// Resource kind, e.g. `deployment`, `pvc`.
    pub kind: &'q str,
    /// Single object name; all objects of the kind when `None`.
    pub name: Option<&'q str>,
    /// Namespace.
    pub namespace: &'q str,
    /// Label selector (`-l`).
    pub selector: Option<&'q str>,
    /// Output format.
    pub output: Output,
}

impl<'q> GetQuery<'q> {
    /// Lists every object of `kind` in `namespace` by name.
    #[must_use]
    pub const fn list(kind: &'q str, namespace: &'q str) -> Self {
        Self {
            kind,
            name: None,
            namespace,
            selector: None,
            output: Output::Name,
        }
    }

    /// Selects one named object.
    #[must_use]
    pub fn named(mut self, name: &'q str) -> Self {
        self.name = Some(name);
        self
    }

    /// Filters by label selector.
    #[must_use]
    pub fn selector(mut self, selector: &'q str) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }

    fn to_args(&self) -> Vec<String> {
        let mut args = vec!["get".to_string(), self.kind.to_string()];
        if let Some(name) = self.name {
            args.push(name.to_string());
        }
        args.push("-n".to_string());
        args.push(self.namespace.to_string());
        if let Some(selector) = self.selector {
            args.push("-l".to_string());
            args.push(selector.to_string());
        }
        args.push("-o".to_string());
        args.push(self.output.as_arg());
        args
    }
}

/// Driver for the cluster CLI.
pub struct KubeDriver<'a> {
    runner: &'a dyn CommandRunner,
    kubectl: String,
    repo_root: std::path::PathBuf,
}

impl<'a> KubeDriver<'a> {
    /// Creates a driver using the binary named in `config`.
    ///
    /// Manifest commands run from the repository root.
    #[must_use]
    pub fn new(runner: &'a dyn CommandRunner, config: &HarnessConfig) -> Self {
        Self {
            runner,
            kubectl: config.kubectl.clone(),
            repo_root: config.repo_root.clone(),
        }
    }

    fn kubectl<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation::new(&self.kubectl).args(args)
    }

    fn in_repo(&self, invocation: Invocation) -> Invocation {
        let mut invocation = invocation;
        invocation.cwd = non_empty_dir(&self.repo_root);
        invocation
    }

    fn run(&self, invocation: Invocation) -> Result<Completed> {
        tracing::debug!(cmd = %invocation, "kubectl");
        self.runner.complete(invocation)
    }

    /// `kubectl apply -k <path>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the CLI cannot be spawned.
    pub fn apply_kustomize(&self, path: &Path) -> Result<Completed> {
        self.run(self.in_repo(self.kubectl([
            "apply".to_string(),
            "-k".to_string(),
            path.display().to_string(),
        ])))
    }

    /// `kubectl delete namespace <namespace>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the CLI cannot be spawned.
    pub fn delete_namespace(&self, namespace: &str) -> Result<Completed> {
        self.run(self.in_repo(self.kubectl(["delete", "namespace", namespace])))
    }

    /// `kubectl kustomize <path>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the CLI cannot be spawned.
    pub fn kustomize(&self, path: &Path) -> Result<Completed> {
        let invocation =
            self.in_repo(self.kubectl(["kustomize".to_string(), path.display().to_string()]));
        self.run(invocation)
    }

    /// `kubectl get …` as described by `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the CLI cannot be spawned.
    pub fn get(&self, query: &GetQuery<'_>) -> Result<Completed> {
        self.run(self.kubectl(query.to_args()))
    }

    /// `kubectl exec -n <namespace> <target> -- <argv…>`.
    ///
    /// `target` may be a pod name or a `deployment/<name>` reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the CLI cannot be spawned.
    pub fn exec(&self, namespace: &str, target: &str, argv: &[String]) -> Result<Completed> {
        let invocation = self
            .kubectl(["exec", "-n", namespace, target, "--"])
            .args(argv.iter().cloned());
        self.run(invocation)
    }

    /// `kubectl cluster-info`.
    ///
    /// # Errors
    ///
    /// Returns an error if the CLI cannot be spawned.
    pub fn cluster_info(&self) -> Result<Completed> {
        self.run(self.kubectl(["cluster-info"]))
    }
}
