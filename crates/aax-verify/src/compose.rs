//! Compose suite: project configuration, then the running stack.

use aax_common::error::{AaxError, Result};
use aax_common::types::ExecOutput;
use aax_orchestrate::compose::ComposeDriver;
use aax_orchestrate::parse::{parse_compose_config, parse_ps_json};

use crate::contract::{ComposeContract, ExecCheck};
use crate::expect::{ensure_contains, ensure_contains_any};
use crate::report::SuiteReport;
use crate::suite::{Check, SuiteEnv, SuiteRun};

/// Suite name used in reports.
pub const SUITE: &str = "compose";

struct ComposeChecks<'e> {
    env: SuiteEnv<'e>,
    driver: ComposeDriver<'e>,
    contract: &'e ComposeContract,
}

impl ComposeChecks<'_> {
    fn config_text(&self) -> Result<String> {
        Ok(self.driver.config()?.checked()?.stdout)
    }

    fn config_valid(&self) -> Result<()> {
        self.config_text().map(|_| ())
    }

    fn builds(&self) -> Result<()> {
        self.driver.build()?.checked().map(|_| ())
    }

    fn services_defined(&self) -> Result<()> {
        let out = self.driver.config_services()?.checked()?;
        let defined = out.lines();
        for service in &self.contract.services {
            if !defined.contains(&service.as_str()) {
                return Err(AaxError::MissingOutput {
                    needle: service.clone(),
                    output: out.stdout.clone(),
                });
            }
        }
        Ok(())
    }

    fn resource_limits(&self) -> Result<()> {
        let text = self.config_text()?;
        for key in &self.contract.resource_keys {
            ensure_contains(&text, key)?;
        }
        let model = parse_compose_config(&text)?;
        let service = &self.contract.health_service;
        let declared = model
            .services
            .get(service)
            .and_then(|s| s.limits())
            .is_some_and(|l| l.cpus.is_some() && l.memory.is_some());
        if declared {
            Ok(())
        } else {
            Err(AaxError::UnexpectedOutput {
                expected: format!("cpu and memory limits on `{service}`"),
                actual: "no deploy.resources.limits".to_string(),
            })
        }
    }

    fn healthchecks(&self) -> Result<()> {
        let text = self.config_text()?;
        let found = text.matches("healthcheck:").count();
        if found >= self.contract.min_healthchecks {
            Ok(())
        } else {
            Err(AaxError::UnexpectedOutput {
                expected: format!("at least {} healthcheck entries", self.contract.min_healthchecks),
                actual: found.to_string(),
            })
        }
    }

    fn services_running(&self) -> Result<()> {
        let out = self.driver.ps(None, "json")?.checked()?;
        let rows = parse_ps_json(&out.stdout)?;
        for service in &self.contract.services {
            if !rows.iter().any(|r| &r.service == service) {
                return Err(AaxError::MissingOutput {
                    needle: service.clone(),
                    output: out.stdout.clone(),
                });
            }
        }
        Ok(())
    }

    fn becomes_healthy(&self) -> Result<()> {
        let service = self.contract.health_service.as_str();
        let poller = self.contract.health_poll.poller();
        let condition = format!("{service} healthy");
        let _ = poller.poll_with_sleep(
            &condition,
            || {
                let out = self.driver.ps(Some(service), "{{.Health}}")?.output;
                let health = out.stdout.to_lowercase();
                Ok(health.split_whitespace().any(|w| w == "healthy"))
            },
            self.env.sleep,
        )?;
        Ok(())
    }

    fn started(&self, service: &str) -> Result<()> {
        let out = self.driver.ps(Some(service), "{{.State}}")?.checked()?;
        ensure_contains_any(&out.stdout, &["running", "exited"])
    }

    fn network_present(&self) -> Result<()> {
        let out = self.driver.network_ls()?.checked()?;
        ensure_contains_any(&out.stdout, &self.contract.network_names)
    }

    fn volumes_present(&self) -> Result<()> {
        let out = self.driver.volume_ls()?.checked()?;
        let volumes = out.lines();
        for fragment in &self.contract.volume_fragments {
            if !volumes.iter().any(|v| v.contains(fragment.as_str())) {
                return Err(AaxError::MissingOutput {
                    needle: fragment.clone(),
                    output: out.stdout.clone(),
                });
            }
        }
        Ok(())
    }

    fn exec(&self, exec: &ExecCheck) -> Result<()> {
        exec.check
            .expect
            .evaluate(self.driver.exec(&exec.target, &exec.check.argv)?)
    }

    fn up(&self) -> Result<ExecOutput> {
        self.driver.up()?.checked()
    }

    fn down(&self) -> Result<ExecOutput> {
        self.driver.down()?.checked()
    }
}

/// Runs the compose suite.
///
/// Configuration checks run first without a stack. The remaining checks run
/// between one `up -d` and one `down`.
#[must_use]
pub fn run(env: &SuiteEnv<'_>, contract: &ComposeContract) -> SuiteReport {
    let checks = ComposeChecks {
        env: *env,
        driver: ComposeDriver::new(env.runner, env.config, &contract.project_dir),
        contract,
    };
    let checks = &checks;
    let mut run = SuiteRun::start(SUITE);

    run.run_all([
        Check::new("compose config valid", || checks.config_valid()),
        Check::new("compose build", || checks.builds()),
        Check::new("services defined", || checks.services_defined()),
        Check::new("resource limits declared", || checks.resource_limits()),
        Check::new("healthchecks declared", || checks.healthchecks()),
    ]);

    let mut stack = vec![
        Check::new("services started", || checks.services_running()),
        Check::new(format!("{} healthy", contract.health_service), || {
            checks.becomes_healthy()
        }),
    ];
    for service in &contract.started_services {
        stack.push(Check::new(format!("{service} started"), move || {
            checks.started(service)
        }));
    }
    stack.push(Check::new("network present", || checks.network_present()));
    stack.push(Check::new("volumes present", || checks.volumes_present()));
    for exec in &contract.exec_checks {
        stack.push(Check::new(
            format!("{}: {}", exec.target, exec.check.name),
            move || checks.exec(exec),
        ));
    }

    let settle = contract.settle_secs;
    run.with_stack(
        SUITE,
        || {
            let out = checks.up()?;
            env.settle(settle);
            Ok(out)
        },
        || checks.down(),
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

    const CONFIG: &str = r#"
services:
  ee-base:
    healthcheck: {test: ["CMD", "true"]}
    deploy: {resources: {limits: {cpus: "2", memory: "2147483648"}}}
  ee-builder:
    healthcheck: {test: ["CMD", "true"]}
  dev-tools:
    healthcheck: {test: ["CMD", "true"]}
"#;

    /// Adds the answers of a healthy stack after any rules already on
    /// `runner`, which therefore take precedence.
    fn healthy(runner: ScriptedRunner) -> ScriptedRunner {
        runner
            .on("compose config --services", ExecOutput::ok("ee-base\nee-builder\ndev-tools\n"))
            .on("compose config", ExecOutput::ok(CONFIG))
            .on(
                "compose ps --format json",
                ExecOutput::ok(concat!(
                    r#"{"Service":"ee-base","State":"running","Health":"healthy"}"#,
                    "\n",
                    r#"{"Service":"ee-builder","State":"running","Health":""}"#,
                    "\n",
                    r#"{"Service":"dev-tools","State":"running","Health":""}"#,
                )),
            )
            .on("{{.Health}}", ExecOutput::ok("healthy\n"))
            .on("{{.State}}", ExecOutput::ok("running\n"))
            .on("network ls", ExecOutput::ok("bridge\naax_ansible\n"))
            .on("volume ls", ExecOutput::ok("aax_workspace\naax_ee_builds\n"))
            .on("ansible --version", ExecOutput::ok("ansible [core 2.20.0]\n"))
            .on("ansible-builder --version", ExecOutput::ok("3.1.0\n"))
            .on("ansible-navigator --version", ExecOutput::ok("ansible-navigator 24.2.0\n"))
            .on("ansible-lint --version", ExecOutput::ok("ansible-lint 25.12.1\n"))
            .on("ANSIBLE_NOCOWS", ExecOutput::ok("1\n"))
            .on("PAGER", ExecOutput::ok("\n"))
    }

    fn run_with(runner: &ScriptedRunner) -> SuiteReport {
        let config = HarnessConfig::with_repo_root("");
        let env = SuiteEnv::new(runner, &config).with_sleep(no_sleep);
        run(&env, &ComposeContract::default())
    }

    fn status<'r>(report: &'r SuiteReport, name: &str) -> &'r CheckStatus {
        &report.outcome(name).unwrap_or_else(|| panic!("no check {name}")).status
    }

    #[test]
    fn healthy_stack_passes_every_check() {
        let runner = healthy(ScriptedRunner::new());
        let report = run_with(&runner);
        assert!(report.is_success(), "{:#?}", report.outcomes);
        assert_eq!(report.passed(), report.outcomes.len());
        assert_eq!(runner.count("compose up -d"), 1);
        assert_eq!(runner.count("compose down"), 1);
    }

    #[test]
    fn stack_is_up_only_for_stack_checks() {
        let runner = healthy(ScriptedRunner::new());
        let _ = run_with(&runner);
        let lines = runner.lines();
        let up = lines.iter().position(|l| l.ends_with("compose up -d")).unwrap();
        let down = lines.iter().position(|l| l.ends_with("compose down")).unwrap();
        let build = lines.iter().position(|l| l.ends_with("compose build")).unwrap();
        let first_exec = lines.iter().position(|l| l.contains("exec -T")).unwrap();
        assert!(build < up);
        assert!(up < first_exec && first_exec < down);
        assert_eq!(down, lines.len() - 1);
    }

    #[test]
    fn too_few_healthchecks_fail() {
        let runner = healthy(ScriptedRunner::new().on(
            "compose config",
            ExecOutput::ok("services:\n  ee-base:\n    healthcheck: {}\n"),
        ));
        let report = run_with(&runner);
        assert!(matches!(
            status(&report, "healthchecks declared"),
            CheckStatus::Failed { kind: FailureKind::Output, .. }
        ));
    }

    #[test]
    fn health_is_polled_until_healthy() {
        let runner = healthy(ScriptedRunner::new().on_sequence(
            "{{.Health}}",
            vec![
                ExecOutput::ok("starting\n"),
                ExecOutput::ok("starting\n"),
                ExecOutput::ok("healthy\n"),
            ],
        ));
        let report = run_with(&runner);
        assert_eq!(status(&report, "ee-base healthy"), &CheckStatus::Passed);
        assert_eq!(runner.count("{{.Health}}"), 3);
    }

    #[test]
    fn unhealthy_times_out() {
        let runner = healthy(ScriptedRunner::new().on("{{.Health}}", ExecOutput::ok("unhealthy\n")));
        let report = run_with(&runner);
        assert!(matches!(
            status(&report, "ee-base healthy"),
            CheckStatus::Failed { kind: FailureKind::Timeout, .. }
        ));
        assert_eq!(runner.count("{{.Health}}"), 30);
        assert_eq!(report.failed(), 1);
    }

    #[test]
    fn failed_up_fails_stack_checks_without_teardown() {
        let runner = healthy(
            ScriptedRunner::new().on("compose up -d", ExecOutput::new(1, "", "port is already allocated")),
        );
        let report = run_with(&runner);
        assert_eq!(runner.count("compose down"), 0);
        assert_eq!(runner.count("exec -T"), 0);
        assert_eq!(status(&report, "compose config valid"), &CheckStatus::Passed);
        match status(&report, "ee-base: ansible core") {
            CheckStatus::Failed { kind, reason } => {
                assert_eq!(*kind, FailureKind::Setup);
                assert!(reason.contains("port is already allocated"));
            }
            other => panic!("unexpected status: {other:?}"),
        }
    }

    #[test]
    fn failed_down_is_reported() {
        let runner = healthy(ScriptedRunner::new().on(
            "compose down",
            ExecOutput::new(1, "", "network aax_ansible has active endpoints"),
        ));
        let report = run_with(&runner);
        assert_eq!(runner.count("compose down"), 1);
        assert!(!report.is_success());
        match status(&report, "compose teardown") {
            CheckStatus::Failed { kind, reason } => {
                assert_eq!(*kind, FailureKind::Command);
                assert!(reason.contains("compose down"));
                assert!(reason.contains("active endpoints"));
            }
            other => panic!("unexpected status: {other:?}"),
        }
        assert_eq!(report.failed(), 1);
    }

    #[test]
    fn missing_volume_is_reported() {
        let runner = healthy(ScriptedRunner::new().on("volume ls", ExecOutput::ok("aax_workspace\n")));
        let report = run_with(&runner);
        match status(&report, "volumes present") {
            CheckStatus::Failed { kind, reason } => {
                assert_eq!(*kind, FailureKind::Output);
                assert!(reason.contains("ee_builds"));
            }
            other => panic!("unexpected status: {other:?}"),
        }
    }

    #[test]
    fn nocows_is_checked_in_every_service() {
        let runner = healthy(ScriptedRunner::new());
        let _ = run_with(&runner);
        for service in ["ee-base", "ee-builder", "dev-tools"] {
            assert_eq!(
                runner.count(&format!("exec -T {service} printenv ANSIBLE_NOCOWS")),
                1,
                "{service}"
            );
        }
    }
}
