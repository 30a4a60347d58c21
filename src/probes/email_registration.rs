//! Which platforms have an account registered to the email address, via a
//! locally installed socialscan-compatible CLI.
//!
//! The tool must print its JSON results on stdout, either as one document or
//! as one JSON value per line. Lines that are not JSON are ignored. Any object
//! carrying a `platform` string is read as one check:
//!
//! ```text
//! {"platform": "GitHub", "available": false, "valid": true, "success": true, "message": ""}
//! ```
//!
//! A check that succeeded on a valid query with `available == false` means the
//! address is already registered there.

use crate::probes::external_tool::{exit_error, run_tool};
use crate::probes::{Probe, ProbeContext, ProbeError};
use crate::types::payload::{EmailRegistrationReport, RegistrationCheck};
use crate::types::{Capability, InvestigationInput, ProbePayload};
use crate::utils::toml_config::ProbeConfig;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeSet;

pub const DEFAULT_BINARY: &str = "socialscan";

/// Default argument template; `{}` is replaced by the email address.
pub fn default_args() -> Vec<String> {
    ["{}", "--json", "/dev/stdout"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn json_values(stdout: &str) -> Vec<Value> {
    let trimmed = stdout.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return vec![value];
    }
    // A JSON document after human-readable progress output.
    if let Some(value) = trimmed
        .find(['{', '['])
        .and_then(|start| serde_json::from_str(&trimmed[start..]).ok())
    {
        return vec![value];
    }
    trimmed
        .lines()
        .filter_map(|line| serde_json::from_str(line.trim()).ok())
        .collect()
}

fn collect_checks(value: &Value, checks: &mut Vec<RegistrationCheck>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_checks(item, checks)),
        Value::Object(map) => match map.get("platform").and_then(Value::as_str) {
            Some(platform) => {
                let flag = |key: &str| map.get(key).and_then(Value::as_bool);
                let answered = flag("success").unwrap_or(true) && flag("valid").unwrap_or(true);
                checks.push(RegistrationCheck {
                    platform: platform.trim().to_string(),
                    registered: flag("available").filter(|_| answered).map(|available| !available),
                    message: map
                        .get("message")
                        .and_then(Value::as_str)
                        .map(str::trim)
                        .filter(|m| !m.is_empty())
                        .map(str::to_string),
                });
            }
            None => map.values().for_each(|item| collect_checks(item, checks)),
        },
        _ => {}
    }
}

/// Parse the tool's stdout into per-platform checks, in output order.
pub fn parse_checks(stdout: &str) -> Vec<RegistrationCheck> {
    let mut checks = Vec::new();
    for value in json_values(stdout) {
        collect_checks(&value, &mut checks);
    }
    checks.retain(|c| !c.platform.is_empty());
    checks
}

pub struct EmailRegistrationProbe {
    binary: String,
    args: Vec<String>,
}

impl EmailRegistrationProbe {
    pub fn new(binary: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            binary: binary.into(),
            args,
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(
            config.extra_str("binary").unwrap_or(DEFAULT_BINARY),
            config.extra_string_list("args").unwrap_or_else(default_args),
        )
    }
}

#[async_trait]
impl Probe for EmailRegistrationProbe {
    fn capability(&self) -> Capability {
        Capability::EmailRegistration
    }

    fn description(&self) -> &str {
        "Platforms with an account registered to the email, via a local socialscan-compatible CLI"
    }

    fn applies_to(&self, input: &InvestigationInput) -> bool {
        input.email().is_some()
    }

    async fn execute(&self, ctx: &ProbeContext) -> Result<ProbePayload, ProbeError> {
        let email = ctx
            .input()
            .email()
            .ok_or_else(|| ProbeError::Unavailable("no email to check".to_string()))?
            .to_string();

        let args: Vec<String> = self.args.iter().map(|a| a.replace("{}", &email)).collect();
        tracing::debug!(binary = %self.binary, "running email registration check");

        let output = run_tool(ctx, &self.binary, &args).await?;
        let checks = parse_checks(&String::from_utf8_lossy(&output.stdout));
        if !output.status.success() && checks.is_empty() {
            return Err(exit_error(&self.binary, &output));
        }

        let registered_on: BTreeSet<String> = checks
            .iter()
            .filter(|c| c.registered == Some(true))
            .map(|c| c.platform.clone())
            .collect();

        Ok(ProbePayload::EmailRegistration(EmailRegistrationReport {
            tool: self.binary.clone(),
            email,
            checks,
            registered_on: registered_on.into_iter().collect(),
            exit_code: output.status.code(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_lines() {
        let stdout = "Checking jdoe@acme.com\n\
            {\"platform\": \"GitHub\", \"available\": false, \"valid\": true, \"success\": true, \"message\": \"\"}\n\
            {\"platform\": \"Spotify\", \"available\": true, \"valid\": true, \"success\": true}\n\
            {\"platform\": \"Twitter\", \"available\": false, \"valid\": true, \"success\": false, \"message\": \"rate limited\"}\n";

        let checks = parse_checks(stdout);
        assert_eq!(checks.len(), 3);
        assert_eq!(checks[0].registered, Some(true));
        assert_eq!(checks[0].message, None);
        assert_eq!(checks[1].registered, Some(false));
        assert_eq!(checks[2].registered, None);
        assert_eq!(checks[2].message.as_deref(), Some("rate limited"));
    }

    #[test]
    fn test_parse_grouped_document() {
        let stdout = r#"{
            "jdoe@acme.com": [
                {"platform": "Instagram", "available": false, "valid": true, "success": true},
                {"platform": "Tumblr", "available": false, "valid": false, "success": true}
            ]
        }"#;

        let checks = parse_checks(stdout);
        assert_eq!(checks.len(), 2);
        assert_eq!(checks[0].platform, "Instagram");
        assert_eq!(checks[0].registered, Some(true));
        assert_eq!(checks[1].registered, None);
    }

    #[test]
    fn test_non_json_output_yields_nothing() {
        assert!(parse_checks("socialscan: command failed\n").is_empty());
    }

    #[test]
    fn test_from_config_defaults() {
        let probe = EmailRegistrationProbe::from_config(&ProbeConfig::default());
        assert_eq!(probe.binary, DEFAULT_BINARY);
        assert_eq!(probe.args, default_args());
    }
}
