//! Formatted output helpers for CLI commands.
//!
//! Renders suite reports as aligned tables, tool discovery as a short
//! listing, and settings as flattened `key = value` lines.

use std::fmt::Write as _;

use aax_common::settings::HubSettings;
use aax_runtime::tools::{ToolInfo, ToolStatus};
use aax_verify::report::{CheckStatus, SuiteReport};

/// Widest detail column printed before truncation.
const DETAIL_WIDTH: usize = 72;

/// Shortens `text` to at most `max` characters, marking the cut with `...`.
///
/// Only the first line is kept; trailing line breaks are not a cut.
#[must_use]
pub fn truncate(text: &str, max: usize) -> String {
    let text = text.trim_end_matches(['\n', '\r']);
    let line = text.lines().next().unwrap_or_default();
    let clipped = line.len() < text.len();
    if line.chars().count() <= max && !clipped {
        return line.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = line.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Short status label for a check.
#[must_use]
pub const fn status_label(status: &CheckStatus) -> &'static str {
    match status {
        CheckStatus::Passed => "PASS",
        CheckStatus::Failed { .. } => "FAIL",
        CheckStatus::Skipped { .. } => "SKIP",
    }
}

/// Renders a suite report as a table followed by a summary line.
#[must_use]
pub fn format_report(report: &SuiteReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "suite {} ({})", report.suite, report.run_id);
    let _ = writeln!(out, "{:<6} {:<44} DETAIL", "STATUS", "CHECK");
    for outcome in &report.outcomes {
        let detail = match &outcome.status {
            CheckStatus::Passed => String::new(),
            CheckStatus::Failed { kind, reason } => {
                truncate(&format!("[{}] {reason}", kind_label(*kind)), DETAIL_WIDTH)
            }
            CheckStatus::Skipped { reason } => truncate(reason, DETAIL_WIDTH),
        };
        let _ = writeln!(
            out,
            "{:<6} {:<44} {detail}",
            status_label(&outcome.status),
            outcome.name
        );
    }
    let _ = writeln!(out, "{}", summary(report));
    out
}

/// One-line tally of a report.
#[must_use]
pub fn summary(report: &SuiteReport) -> String {
    format!(
        "{}: {} passed, {} failed, {} skipped",
        report.suite,
        report.passed(),
        report.failed(),
        report.skipped()
    )
}

fn kind_label(kind: aax_verify::report::FailureKind) -> &'static str {
    use aax_verify::report::FailureKind;
    match kind {
        FailureKind::Command => "command",
        FailureKind::Output => "output",
        FailureKind::Timeout => "timeout",
        FailureKind::Setup => "setup",
        FailureKind::Other => "other",
    }
}

/// Renders the discovered tooling.
#[must_use]
pub fn format_tools(info: &ToolInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<10} {}/{}", "host", info.os, info.arch);
    for tool in [&info.docker, &info.kubectl] {
        let _ = writeln!(out, "{:<10} {}", tool.name, tool_location(tool));
    }
    out
}

fn tool_location(tool: &ToolStatus) -> String {
    tool.path
        .as_ref()
        .map_or_else(|| "not found".to_string(), |p| p.display().to_string())
}

/// Renders settings as sorted, dotted `key = value` lines.
#[must_use]
pub fn format_settings(settings: &HubSettings) -> String {
    let mut lines = Vec::new();
    if let Ok(value) = serde_json::to_value(settings) {
        flatten("", &value, &mut lines);
    }
    lines.sort();
    let mut out = String::new();
    for line in lines {
        let _ = writeln!(out, "{line}");
    }
    out
}

fn flatten(prefix: &str, value: &serde_json::Value, lines: &mut Vec<String>) {
    use serde_json::Value;
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, child, lines);
            }
        }
        Value::String(s) => lines.push(format!("{prefix} = {s}")),
        other => lines.push(format!("{prefix} = {other}")),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use aax_verify::report::FailureKind;

    use super::*;

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate("ok", 10), "ok");
    }

    #[test]
    fn truncate_cuts_long_text() {
        assert_eq!(truncate("abcdefghij", 6), "abc...");
    }

    #[test]
    fn truncate_keeps_only_first_line() {
        assert_eq!(truncate("first\nsecond", 40), "first...");
    }

    #[test]
    fn trailing_newline_is_not_a_cut() {
        assert_eq!(truncate("ok\n", 10), "ok");
        assert_eq!(truncate("exited with code 1: refused\r\n", 40), "exited with code 1: refused");
        assert_eq!(truncate("first\nsecond\n", 40), "first...");
    }

    #[test]
    fn report_table_lists_every_check() {
        let mut report = SuiteReport::start("compose");
        report.record("compose config valid", CheckStatus::Passed);
        report.record(
            "ee-base healthy",
            CheckStatus::Failed {
                kind: FailureKind::Timeout,
                reason: "timed out".to_string(),
            },
        );
        report.record(
            "network present",
            CheckStatus::Skipped {
                reason: "stack not started".to_string(),
            },
        );

        let table = format_report(&report);
        assert!(table.contains("PASS   compose config valid"));
        assert!(table.contains("FAIL   ee-base healthy"));
        assert!(table.contains("[timeout] timed out"));
        assert!(table.contains("SKIP   network present"));
        assert!(table.ends_with("compose: 1 passed, 1 failed, 1 skipped\n"));
    }

    #[test]
    fn tools_listing_marks_missing_binaries() {
        let info = ToolInfo {
            os: "linux".to_string(),
            arch: "x86_64".to_string(),
            docker: ToolStatus {
                name: "docker".to_string(),
                path: Some(PathBuf::from("/usr/bin/docker")),
            },
            kubectl: ToolStatus {
                name: "kubectl".to_string(),
                path: None,
            },
        };
        let text = format_tools(&info);
        assert!(text.contains("linux/x86_64"));
        assert!(text.contains("/usr/bin/docker"));
        assert!(text.contains("kubectl    not found"));
    }

    #[test]
    fn settings_are_flattened_and_sorted() {
        let defaults = format_settings(&HubSettings::from_lookup(|_| None).unwrap());
        assert!(defaults.lines().any(|l| l == "database.host = hub-postgres"));

        let settings = HubSettings::from_lookup(|key| {
            (key == "POSTGRES_HOST").then(|| "db.internal".to_string())
        })
        .unwrap();
        let text = format_settings(&settings);
        let lines: Vec<&str> = text.lines().collect();
        let mut sorted = lines.clone();
        sorted.sort_unstable();
        assert_eq!(lines, sorted);
        assert!(lines.iter().any(|l| l.starts_with("api_root = ")));
        assert!(lines.contains(&"database.host = db.internal"));
        assert!(!lines.contains(&"database.host = hub-postgres"));
    }
}
