//! Decoding of structured CLI output.

use std::collections::BTreeMap;

use aax_common::error::Result;
use serde::Deserialize;

/// One row of `docker compose ps --format json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PsEntry {
    /// Container name.
    #[serde(default)]
    pub name: String,
    /// Compose service the container belongs to.
    pub service: String,
    /// Runtime state, e.g. `running` or `exited`.
    #[serde(default)]
    pub state: String,
    /// Health status; empty when the service has no healthcheck.
    #[serde(default)]
    pub health: String,
}

/// Decodes `docker compose ps --format json` output.
///
/// Newer compose releases print one JSON object per line, older ones a
/// single JSON array; both are accepted.
///
/// # Errors
///
/// Returns an error if the output is neither form.
pub fn parse_ps_json(output: &str) -> Result<Vec<PsEntry>> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }
    trimmed
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).map_err(Into::into))
        .collect()
}

/// Resource limits of a compose service (`deploy.resources.limits`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ComposeLimits {
    /// CPU limit as written, e.g. `"2"` or `"0.5"`.
    #[serde(default, deserialize_with = "string_or_number")]
    pub cpus: Option<String>,
    /// Memory limit as written or normalised by compose.
    #[serde(default, deserialize_with = "string_or_number")]
    pub memory: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
struct ComposeResources {
    #[serde(default)]
    limits: Option<ComposeLimits>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
struct ComposeDeploy {
    #[serde(default)]
    resources: Option<ComposeResources>,
}

/// The parts of one service definition the harness inspects.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ComposeService {
    /// Healthcheck block, if any.
    #[serde(default)]
    pub healthcheck: Option<serde_yaml::Value>,
    #[serde(default)]
    deploy: Option<ComposeDeploy>,
}

impl ComposeService {
    /// Returns the service's resource limits, if declared.
    #[must_use]
    pub fn limits(&self) -> Option<&ComposeLimits> {
        self.deploy
            .as_ref()?
            .resources
            .as_ref()?
            .limits
            .as_ref()
    }
}

/// The normalised project printed by `docker compose config`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ComposeModel {
    /// Services keyed by name.
    #[serde(default)]
    pub services: BTreeMap<String, ComposeService>,
}

/// Decodes `docker compose config` output.
///
/// # Errors
///
/// Returns an error if the output is not valid YAML of the expected shape.
pub fn parse_compose_config(output: &str) -> Result<ComposeModel> {
    Ok(serde_yaml::from_str(output)?)
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_yaml::Value::String(s)) => Some(s),
        Some(serde_yaml::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Splits jsonpath output like `Running Running Pending` into words.
#[must_use]
pub fn split_words(output: &str) -> Vec<&str> {
    output.split_whitespace().collect()
}
