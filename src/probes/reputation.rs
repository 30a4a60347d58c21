//! EmailRep-style reputation lookup.

use crate::probes::{Probe, ProbeContext, ProbeError, endpoint};
use crate::types::payload::ReputationReport;
use crate::types::{Capability, InvestigationInput, ProbePayload};
use crate::utils::toml_config::ProbeConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://emailrep.io";

pub struct ReputationProbe {
    base_url: String,
}

impl ReputationProbe {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))
    }
}

#[derive(Debug, Deserialize)]
struct EmailRepResponse {
    #[serde(default)]
    reputation: String,
    #[serde(default)]
    suspicious: bool,
    #[serde(default)]
    references: u32,
    #[serde(default)]
    details: EmailRepDetails,
}

#[derive(Debug, Default, Deserialize)]
struct EmailRepDetails {
    #[serde(default)]
    blacklisted: bool,
    #[serde(default)]
    malicious_activity: bool,
    #[serde(default)]
    credentials_leaked: bool,
    #[serde(default)]
    data_breach: bool,
    #[serde(default)]
    disposable: bool,
    #[serde(default)]
    free_provider: bool,
    #[serde(default)]
    profiles: Vec<String>,
}

fn parse_reputation(body: &str) -> Result<ReputationReport, ProbeError> {
    let raw: EmailRepResponse =
        serde_json::from_str(body).map_err(|e| ProbeError::Parse(format!("emailrep: {}", e)))?;

    Ok(ReputationReport {
        reputation: if raw.reputation.is_empty() {
            "none".to_string()
        } else {
            raw.reputation
        },
        suspicious: raw.suspicious,
        references: raw.references,
        blacklisted: raw.details.blacklisted,
        malicious_activity: raw.details.malicious_activity,
        credentials_leaked: raw.details.credentials_leaked,
        data_breach: raw.details.data_breach,
        disposable: raw.details.disposable,
        free_provider: raw.details.free_provider,
        profiles: raw.details.profiles,
    })
}

#[async_trait]
impl Probe for ReputationProbe {
    fn capability(&self) -> Capability {
        Capability::Reputation
    }

    fn description(&self) -> &str {
        "Email address reputation, abuse and leak indicators (EmailRep)"
    }

    fn requires_credential(&self) -> bool {
        true
    }

    fn applies_to(&self, input: &InvestigationInput) -> bool {
        input.email().is_some()
    }

    async fn execute(&self, ctx: &ProbeContext) -> Result<ProbePayload, ProbeError> {
        let key = ctx.require_credential()?;
        let email = ctx
            .input()
            .email()
            .ok_or_else(|| ProbeError::Unavailable("no email to look up".to_string()))?;

        let url = endpoint(&self.base_url, &[email])?;
        let response = ctx.send(ctx.http().get(url).header("Key", key)).await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(ProbeError::Unavailable(
                "EmailRep rejected the API key".to_string(),
            )),
            status if status.is_success() => {
                Ok(ProbePayload::Reputation(parse_reputation(&response.text().await?)?))
            }
            status => Err(ProbeError::UnexpectedStatus {
                source_name: "emailrep".to_string(),
                status: status.as_u16(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reputation() {
        let body = r#"{
            "email": "bill@microsoft.com",
            "reputation": "high",
            "suspicious": false,
            "references": 79,
            "details": {
                "blacklisted": false,
                "malicious_activity": false,
                "credentials_leaked": true,
                "data_breach": true,
                "free_provider": false,
                "disposable": false,
                "profiles": ["myspace", "spotify", "twitter"]
            }
        }"#;

        let report = parse_reputation(body).unwrap();
        assert_eq!(report.reputation, "high");
        assert_eq!(report.references, 79);
        assert!(report.credentials_leaked);
        assert!(!report.suspicious);
        assert_eq!(report.profiles.len(), 3);
    }

    #[test]
    fn test_parse_reputation_without_details() {
        let report = parse_reputation(r#"{"suspicious": true}"#).unwrap();
        assert_eq!(report.reputation, "none");
        assert!(report.suspicious);
        assert!(report.profiles.is_empty());
    }
}
