//! End-to-end suite runs against a scripted command runner.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::PathBuf;
use std::time::Duration;

use aax_common::config::HarnessConfig;
use aax_common::types::ExecOutput;
use aax_runtime::testing::ScriptedRunner;
use aax_verify::contract::Contract;
use aax_verify::report::CheckStatus;
use aax_verify::suite::SuiteEnv;
use aax_verify::{cluster, compose, images};

fn no_sleep(_: Duration) {}

// ── Contract files ────────────────────────────────────────────────

#[test]
fn contract_file_drives_the_image_suite() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("aax.yaml");
    std::fs::write(
        &path,
        r"
images:
  - name: base
    tag: local/base:test
    dockerfile: images/base/Dockerfile
    context: images/base
    checks:
      - name: greets
        argv: [echo, hello]
        expect: {kind: equals, text: hello}
  - name: tools
    tag: local/tools:test
    dockerfile: images/tools/Dockerfile
    context: images/tools
    depends_on: [base]
    build_args:
      BASE_IMAGE: local/base:test
      EXTRA: '1'
    checks:
      - name: java
        argv: [java, -version]
        expect: {kind: contains_any, needles: [OpenJDK]}
",
    )
    .expect("write contract");

    let contract = Contract::load(&path).expect("load");
    let runner = ScriptedRunner::new()
        .on("echo hello", ExecOutput::ok("hello\n"))
        .on("java -version", ExecOutput::new(0, "", "openjdk version \"17.0.9\""));
    let config = HarnessConfig::with_repo_root("/repo");
    let env = SuiteEnv::new(&runner, &config).with_sleep(no_sleep);

    let report = images::run(&env, &contract, &["tools".to_string()]).expect("plan");
    assert!(report.is_success(), "{:#?}", report.outcomes);
    assert_eq!(report.passed(), 4);

    let calls = runner.calls();
    assert_eq!(
        calls[2].args,
        vec![
            "build",
            "-f",
            "/repo/images/tools/Dockerfile",
            "-t",
            "local/tools:test",
            "--build-arg",
            "BASE_IMAGE=local/base:test",
            "--build-arg",
            "EXTRA=1",
            "/repo/images/tools",
        ]
    );
    assert_eq!(calls[2].cwd, Some(PathBuf::from("/repo")));
}

// ── Reports ───────────────────────────────────────────────────────

#[test]
fn report_serializes_with_run_metadata() {
    let runner = ScriptedRunner::new();
    let config = HarnessConfig::with_repo_root("");
    let env = SuiteEnv::new(&runner, &config).with_sleep(no_sleep);
    let mut contract = Contract::default();
    contract.images.retain(|i| i.name == "awx");

    let report = images::run(&env, &contract, &[]).expect("plan");
    let json = serde_json::to_value(&report).expect("json");
    assert_eq!(json["suite"], "images");
    assert!(json["run_id"].as_str().is_some());
    assert!(json["finished_at"].as_str().is_some());
    assert_eq!(json["outcomes"][0]["name"], "awx: image builds");
    assert_eq!(json["outcomes"][0]["status"], "passed");
}

// ── Stack suites ──────────────────────────────────────────────────

#[test]
fn compose_down_runs_once_even_when_checks_fail() {
    // Every command succeeds with empty output, so most stack checks fail.
    let runner = ScriptedRunner::new();
    let config = HarnessConfig::with_repo_root("");
    let env = SuiteEnv::new(&runner, &config).with_sleep(no_sleep);
    let report = compose::run(&env, &Contract::default().compose);

    assert!(!report.is_success());
    assert_eq!(runner.count("compose up -d"), 1);
    assert_eq!(runner.count("compose down"), 1);
    assert_eq!(
        report.outcome("compose config valid").unwrap().status,
        CheckStatus::Passed
    );
}

#[test]
fn missing_docker_fails_checks_instead_of_aborting() {
    let runner = ScriptedRunner::new().missing_program("docker");
    let config = HarnessConfig::with_repo_root("");
    let env = SuiteEnv::new(&runner, &config).with_sleep(no_sleep);
    let report = compose::run(&env, &Contract::default().compose);

    assert_eq!(report.passed(), 0);
    assert_eq!(report.failed(), report.outcomes.len());
    assert_eq!(runner.count("compose down"), 0);
}

#[test]
fn cluster_suite_without_cluster_only_skips() {
    let runner = ScriptedRunner::new();
    let config = HarnessConfig::with_repo_root("");
    let env = SuiteEnv::new(&runner, &config).with_sleep(no_sleep);
    let report = cluster::run_with(
        &env,
        &Contract::default().cluster,
        &cluster::Availability::Unavailable("kubectl not available".into()),
    );
    assert!(report.is_success());
    assert_eq!(report.passed(), 0);
    assert!(report.outcomes.iter().all(|o| matches!(
        &o.status,
        CheckStatus::Skipped { reason } if reason == "kubectl not available"
    )));
}
