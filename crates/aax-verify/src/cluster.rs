//! Cluster suite: rendered manifests, then the applied namespace.
//!
//! Needs `kubectl` and a reachable cluster. Without one every check is
//! recorded as skipped rather than failed.

use aax_common::error::{AaxError, Result};
use aax_common::types::ExecOutput;
use aax_orchestrate::kube::{GetQuery, KubeDriver, Output};
use aax_orchestrate::object_ref::parse_object_refs;
use aax_orchestrate::parse::split_words;
use aax_runtime::tools;

use crate::contract::{ClusterContract, ExecCheck};
use crate::expect::{ensure_contains, ensure_equals};
use crate::report::SuiteReport;
use crate::suite::{Check, SuiteEnv, SuiteRun};

/// Suite name used in reports.
pub const SUITE: &str = "cluster";

/// Whether the suite can run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// `kubectl` is installed and `cluster-info` succeeds.
    Reachable,
    /// The suite must be skipped, with the reason.
    Unavailable(String),
}

/// Checks whether `kubectl` is installed and a cluster is configured.
#[must_use]
pub fn detect(env: &SuiteEnv<'_>) -> Availability {
    let kubectl = tools::locate(&env.config.kubectl);
    if !kubectl.available() {
        tracing::info!(kubectl = %env.config.kubectl, "cluster CLI not installed");
        return Availability::Unavailable(format!("`{}` not found on PATH", env.config.kubectl));
    }
    reachability(&KubeDriver::new(env.runner, env.config), &env.config.kubectl)
}

fn reachability(driver: &KubeDriver<'_>, kubectl: &str) -> Availability {
    match driver.cluster_info() {
        Ok(completed) if completed.output.success() => Availability::Reachable,
        Ok(completed) => {
            tracing::info!(exit_code = completed.output.exit_code, "no cluster configured");
            Availability::Unavailable("no Kubernetes cluster configured".to_string())
        }
        Err(e) => {
            tracing::info!(error = %e, "cluster CLI unusable");
            Availability::Unavailable(format!("`{kubectl}` unusable: {e}"))
        }
    }
}

struct ClusterChecks<'e> {
    env: SuiteEnv<'e>,
    driver: KubeDriver<'e>,
    contract: &'e ClusterContract,
}

impl ClusterChecks<'_> {
    fn ns(&self) -> &str {
        &self.contract.namespace
    }

    fn get(&self, query: &GetQuery<'_>) -> Result<ExecOutput> {
        self.driver.get(query)?.checked()
    }

    fn jsonpath(&self, kind: &str, name: &str, expr: &str) -> Result<String> {
        let query = GetQuery::list(kind, self.ns())
            .named(name)
            .output(Output::jsonpath(expr));
        Ok(self.get(&query)?.stdout_trimmed().to_string())
    }

    fn rendered(&self) -> Result<String> {
        Ok(self.driver.kustomize(&self.contract.kustomize_dir)?.checked()?.stdout)
    }

    fn manifests_render(&self) -> Result<()> {
        self.rendered().map(|_| ())
    }

    fn namespace_declared(&self) -> Result<()> {
        let text = self.rendered()?;
        for marker in &self.contract.manifest_markers {
            ensure_contains(&text, marker)?;
        }
        Ok(())
    }

    /// Lists `list_kind` by name and requires a `ref_kind/<name>` for each
    /// of `names`.
    fn objects_exist(&self, list_kind: &str, ref_kind: &str, names: &[String]) -> Result<()> {
        let out = self.get(&GetQuery::list(list_kind, self.ns()))?;
        let refs = parse_object_refs(&out.stdout)?;
        for name in names {
            if !refs.iter().any(|r| r.is(ref_kind, name)) {
                return Err(AaxError::MissingOutput {
                    needle: format!("{ref_kind}/{name}"),
                    output: out.stdout.clone(),
                });
            }
        }
        Ok(())
    }

    fn deployment_ready(&self, deployment: &str) -> Result<()> {
        let poller = self.contract.readiness_poll.poller();
        let _ = poller.poll_with_sleep(
            &format!("deployment {deployment} ready"),
            || {
                let query = GetQuery::list("deployment", self.ns())
                    .named(deployment)
                    .output(Output::jsonpath("{.status.readyReplicas}"));
                let out = self.driver.get(&query)?.output;
                Ok(out.stdout_trimmed() == self.contract.ready_replicas)
            },
            self.env.sleep,
        )?;
        Ok(())
    }

    fn cluster_ip(&self, service: &str) -> Result<()> {
        let ip = self.jsonpath("service", service, "{.spec.clusterIP}")?;
        if ip.is_empty() || ip == "None" {
            return Err(AaxError::UnexpectedOutput {
                expected: format!("a cluster IP for service {service}"),
                actual: ip,
            });
        }
        Ok(())
    }

    fn pods_running(&self) -> Result<()> {
        let poller = self.contract.readiness_poll.poller();
        let expected = self.contract.expected_pods;
        let _ = poller.poll_with_sleep(
            &format!("{expected} pods running"),
            || {
                let query = GetQuery::list("pods", self.ns())
                    .output(Output::jsonpath("{.items[*].status.phase}"));
                let out = self.driver.get(&query)?.output;
                let phases = split_words(&out.stdout);
                Ok(phases.len() == expected && phases.iter().all(|p| *p == "Running"))
            },
            self.env.sleep,
        )?;
        Ok(())
    }

    fn pods_labelled(&self, app: &str) -> Result<()> {
        let selector = format!("app={app}");
        let query = GetQuery::list("pods", self.ns()).selector(&selector);
        let out = self.get(&query)?;
        let refs = parse_object_refs(&out.stdout)?;
        if refs.first().is_some_and(|r| r.kind == "pod") {
            Ok(())
        } else {
            Err(AaxError::MissingOutput {
                needle: format!("pod selected by {selector}"),
                output: out.stdout,
            })
        }
    }

    fn pvc_bound(&self, pvc: &str) -> Result<()> {
        let phase = self.jsonpath("pvc", pvc, "{.status.phase}")?;
        ensure_equals(&phase, "Bound")
    }

    fn exec(&self, exec: &ExecCheck) -> Result<()> {
        let target = format!("deployment/{}", exec.target);
        exec.check
            .expect
            .evaluate(self.driver.exec(self.ns(), &target, &exec.check.argv)?)
    }

    fn resources(&self, deployment: &str) -> Result<()> {
        let resources = self.jsonpath(
            "deployment",
            deployment,
            "{.spec.template.spec.containers[0].resources}",
        )?;
        for key in &self.contract.resource_keys {
            ensure_contains(&resources, key)?;
        }
        Ok(())
    }

    fn probes(&self, deployment: &str) -> Result<()> {
        let query = GetQuery::list("deployment", self.ns())
            .named(deployment)
            .output(Output::Yaml);
        let yaml = self.get(&query)?.stdout;
        for key in &self.contract.probe_keys {
            ensure_contains(&yaml, key)?;
        }
        Ok(())
    }

    fn apply(&self) -> Result<ExecOutput> {
        self.driver.apply_kustomize(&self.contract.kustomize_dir)?.checked()
    }

    fn delete(&self) -> Result<ExecOutput> {
        self.driver.delete_namespace(self.ns())?.checked()
    }
}

fn stack_checks<'c>(checks: &'c ClusterChecks<'c>, contract: &'c ClusterContract) -> Vec<Check<'c>> {
    let mut stack = vec![Check::new("deployments exist", move || {
        checks.objects_exist("deployments", "deployment", &contract.deployments)
    })];
    for deployment in &contract.deployments {
        stack.push(Check::new(format!("{deployment} ready"), move || {
            checks.deployment_ready(deployment)
        }));
    }
    stack.push(Check::new("services exist", move || {
        checks.objects_exist("services", "service", &contract.services)
    }));
    for service in &contract.services {
        stack.push(Check::new(format!("{service} has cluster IP"), move || {
            checks.cluster_ip(service)
        }));
    }
    stack.push(Check::new("pods running", move || checks.pods_running()));
    for app in &contract.deployments {
        stack.push(Check::new(format!("{app} pods labelled"), move || {
            checks.pods_labelled(app)
        }));
    }
    stack.push(Check::new("volume claims exist", move || {
        checks.objects_exist("pvc", "persistentvolumeclaim", &contract.pvcs)
    }));
    for pvc in &contract.pvcs {
        stack.push(Check::new(format!("{pvc} bound"), move || checks.pvc_bound(pvc)));
    }
    for exec in &contract.exec_checks {
        stack.push(Check::new(
            format!("{}: {}", exec.target, exec.check.name),
            move || checks.exec(exec),
        ));
    }
    for deployment in &contract.deployments {
        stack.push(Check::new(format!("{deployment} resources"), move || {
            checks.resources(deployment)
        }));
        stack.push(Check::new(format!("{deployment} probes"), move || {
            checks.probes(deployment)
        }));
    }
    stack
}

/// Looks for a cluster and runs the suite, or skips it.
#[must_use]
pub fn run(env: &SuiteEnv<'_>, contract: &ClusterContract) -> SuiteReport {
    run_with(env, contract, &detect(env))
}

/// Runs the suite given an already known `availability`.
#[must_use]
pub fn run_with(env: &SuiteEnv<'_>, contract: &ClusterContract, availability: &Availability) -> SuiteReport {
    let checks = ClusterChecks {
        env: *env,
        driver: KubeDriver::new(env.runner, env.config),
        contract,
    };
    let checks = &checks;
    let mut run = SuiteRun::start(SUITE);

    let manifest = vec![
        Check::new("manifests render", move || checks.manifests_render()),
        Check::new("namespace declared", move || checks.namespace_declared()),
    ];
    let stack = stack_checks(checks, contract);

    if let Availability::Unavailable(reason) = availability {
        tracing::info!(%reason, "skipping cluster suite");
        for check in manifest.iter().chain(&stack) {
            run.skip(check.name(), reason);
        }
        return run.finish();
    }

    run.run_all(manifest);
    let settle = contract.settle_secs;
    run.with_stack(
        SUITE,
        || {
            let out = checks.apply()?;
            env.settle(settle);
            Ok(out)
        },
        move || checks.delete(),
        stack,
    );
    run.finish()
}

#[cfg(test)]
mod tests {
    use aax_common::config::HarnessConfig;
    use aax_runtime::testing::ScriptedRunner;

    use super::*;
    use crate::report::{CheckStatus, FailureKind};

    fn no_sleep(_: std::time::Duration) {}

    fn deployed(runner: ScriptedRunner) -> ScriptedRunner {
        runner
            .on(
                "kustomize k8s/",
                ExecOutput::ok("apiVersion: v1\nkind: Namespace\nmetadata:\n  name: aax\n"),
            )
            .on(
                "get deployments -n aax -o name",
                ExecOutput::ok(
                    "deployment.apps/ee-base\ndeployment.apps/ee-builder\ndeployment.apps/dev-tools\n",
                ),
            )
            .on("{.status.readyReplicas}", ExecOutput::ok("1"))
            .on(
                "get services -n aax -o name",
                ExecOutput::ok("service/ee-base\nservice/ee-builder\nservice/dev-tools\n"),
            )
            .on("{.spec.clusterIP}", ExecOutput::ok("10.96.12.4"))
            .on("{.items[*].status.phase}", ExecOutput::ok("Running Running Running"))
            .on("-l app=", ExecOutput::ok("pod/ee-base-7d9c-abcde\n"))
            .on(
                "get pvc -n aax -o name",
                ExecOutput::ok(
                    "persistentvolumeclaim/workspace\npersistentvolumeclaim/ee-builds\n\
                     persistentvolumeclaim/ee-definitions\npersistentvolumeclaim/dev-workspace\n",
                ),
            )
            .on("{.status.phase}", ExecOutput::ok("Bound"))
            .on(
                "containers[0].resources",
                ExecOutput::ok(r#"{"limits":{"cpu":"2","memory":"2Gi"},"requests":{"cpu":"500m","memory":"512Mi"}}"#),
            )
            .on("-o yaml", ExecOutput::ok("livenessProbe:\n  exec: {}\nreadinessProbe:\n  exec: {}\n"))
            .on("ansible --version", ExecOutput::ok("ansible [core 2.20.0]\n"))
            .on("ansible-builder --version", ExecOutput::ok("3.1.0\n"))
            .on("ansible-navigator --version", ExecOutput::ok("ansible-navigator 24.2.0\n"))
            .on("ansible-lint --version", ExecOutput::ok("ansible-lint 25.12.1\n"))
            .on("ANSIBLE_NOCOWS", ExecOutput::ok("1\n"))
            .on("PAGER", ExecOutput::ok(""))
    }

    fn run_reachable(runner: &ScriptedRunner) -> SuiteReport {
        let config = HarnessConfig::with_repo_root("");
        let env = SuiteEnv::new(runner, &config).with_sleep(no_sleep);
        run_with(&env, &ClusterContract::default(), &Availability::Reachable)
    }

    fn status<'r>(report: &'r SuiteReport, name: &str) -> &'r CheckStatus {
        &report.outcome(name).unwrap_or_else(|| panic!("no check {name}")).status
    }

    #[test]
    fn deployed_namespace_passes_every_check() {
        let runner = deployed(ScriptedRunner::new());
        let report = run_reachable(&runner);
        assert!(report.is_success(), "{:#?}", report.outcomes);
        assert_eq!(runner.count("apply -k k8s/"), 1);
        assert_eq!(runner.count("delete namespace aax"), 1);
        assert!(runner.lines().last().unwrap().ends_with("delete namespace aax"));
    }

    #[test]
    fn unavailable_cluster_skips_everything() {
        let runner = ScriptedRunner::new();
        let config = HarnessConfig::with_repo_root("");
        let env = SuiteEnv::new(&runner, &config).with_sleep(no_sleep);
        let report = run_with(
            &env,
            &ClusterContract::default(),
            &Availability::Unavailable("no Kubernetes cluster configured".to_string()),
        );
        assert!(runner.calls().is_empty());
        assert_eq!(report.skipped(), report.outcomes.len());
        assert!(report.outcomes.len() > 20);
        assert!(report.is_success());
    }

    #[test]
    fn missing_kubectl_is_unavailable() {
        let runner = ScriptedRunner::new();
        let mut config = HarnessConfig::with_repo_root("");
        config.kubectl = "aax-test-no-such-kubectl".to_string();
        let env = SuiteEnv::new(&runner, &config).with_sleep(no_sleep);
        assert!(matches!(detect(&env), Availability::Unavailable(_)));
        let report = run(&env, &ClusterContract::default());
        assert_eq!(report.skipped(), report.outcomes.len());
    }

    #[test]
    fn cluster_info_exit_code_decides_reachability() {
        let config = HarnessConfig::with_repo_root("");
        let up = ScriptedRunner::new().on("cluster-info", ExecOutput::ok("running at"));
        let down = ScriptedRunner::new().on("cluster-info", ExecOutput::new(1, "", "refused"));
        let broken = ScriptedRunner::new().missing_program("kubectl");

        let reachable = reachability(&KubeDriver::new(&up, &config), "kubectl");
        assert_eq!(reachable, Availability::Reachable);
        assert_eq!(
            reachability(&KubeDriver::new(&down, &config), "kubectl"),
            Availability::Unavailable("no Kubernetes cluster configured".to_string())
        );
        match reachability(&KubeDriver::new(&broken, &config), "kubectl") {
            Availability::Unavailable(reason) => assert!(reason.starts_with("`kubectl` unusable")),
            other => panic!("unexpected availability: {other:?}"),
        }
        assert_eq!(up.count("kubectl cluster-info"), 1);
    }

    #[test]
    fn failed_namespace_delete_is_reported() {
        let runner = deployed(ScriptedRunner::new().on(
            "delete namespace aax",
            ExecOutput::new(1, "", "namespace aax is stuck terminating"),
        ));
        let report = run_reachable(&runner);
        assert_eq!(runner.count("delete namespace aax"), 1);
        match status(&report, "cluster teardown") {
            CheckStatus::Failed { kind, reason } => {
                assert_eq!(*kind, FailureKind::Command);
                assert!(reason.contains("stuck terminating"));
            }
            other => panic!("unexpected status: {other:?}"),
        }
    }

    #[test]
    fn readiness_is_polled() {
        let runner = deployed(ScriptedRunner::new().on_sequence(
            "deployment ee-base -n aax -o jsonpath={.status.readyReplicas}",
            vec![ExecOutput::ok(""), ExecOutput::ok("1")],
        ));
        let report = run_reachable(&runner);
        assert_eq!(status(&report, "ee-base ready"), &CheckStatus::Passed);
        assert_eq!(runner.count("deployment ee-base -n aax -o jsonpath={.status.readyReplicas}"), 2);
    }

    #[test]
    fn too_few_pods_time_out() {
        let runner = deployed(
            ScriptedRunner::new().on("{.items[*].status.phase}", ExecOutput::ok("Running Running")),
        );
        let report = run_reachable(&runner);
        assert!(matches!(
            status(&report, "pods running"),
            CheckStatus::Failed { kind: FailureKind::Timeout, .. }
        ));
        assert_eq!(runner.count("{.items[*].status.phase}"), 30);
    }

    #[test]
    fn headless_service_has_no_cluster_ip() {
        let runner = deployed(ScriptedRunner::new().on(
            "service dev-tools -n aax -o jsonpath={.spec.clusterIP}",
            ExecOutput::ok("None"),
        ));
        let report = run_reachable(&runner);
        assert!(status(&report, "dev-tools has cluster IP") != &CheckStatus::Passed);
        assert_eq!(status(&report, "ee-base has cluster IP"), &CheckStatus::Passed);
    }

    #[test]
    fn pending_claim_is_not_bound() {
        let runner = deployed(ScriptedRunner::new().on(
            "pvc ee-builds -n aax -o jsonpath={.status.phase}",
            ExecOutput::ok("Pending"),
        ));
        let report = run_reachable(&runner);
        assert!(matches!(
            status(&report, "ee-builds bound"),
            CheckStatus::Failed { kind: FailureKind::Output, .. }
        ));
        assert_eq!(report.failed(), 1);
    }

    #[test]
    fn failed_apply_fails_stack_checks_and_keeps_namespace() {
        let runner = deployed(
            ScriptedRunner::new().on("apply -k", ExecOutput::new(1, "", "error validating data")),
        );
        let report = run_reachable(&runner);
        assert_eq!(runner.count("delete namespace"), 0);
        assert_eq!(status(&report, "manifests render"), &CheckStatus::Passed);
        assert!(matches!(
            status(&report, "deployments exist"),
            CheckStatus::Failed { kind: FailureKind::Setup, .. }
        ));
    }

    #[test]
    fn exec_targets_deployments() {
        let runner = deployed(ScriptedRunner::new());
        let _ = run_reachable(&runner);
        assert_eq!(
            runner.count("kubectl exec -n aax deployment/dev-tools -- printenv PAGER"),
            1
        );
    }
}
