//! Hunter-style email verification: deliverability, MX/SMTP checks and the
//! public pages an address was seen on.

use crate::probes::{Probe, ProbeContext, ProbeError, endpoint};
use crate::types::payload::DeliverabilityReport;
use crate::types::{Capability, InvestigationInput, ProbePayload};
use crate::utils::toml_config::ProbeConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.hunter.io/v2";

pub struct DeliverabilityProbe {
    base_url: String,
}

impl DeliverabilityProbe {
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
struct VerifierEnvelope {
    data: VerifierData,
}

#[derive(Debug, Deserialize)]
struct VerifierData {
    #[serde(default)]
    email: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    score: Option<u8>,
    #[serde(default)]
    disposable: bool,
    #[serde(default)]
    webmail: bool,
    #[serde(default)]
    gibberish: bool,
    #[serde(default)]
    mx_records: bool,
    #[serde(default)]
    smtp_check: bool,
    #[serde(default)]
    accept_all: bool,
    #[serde(default)]
    block: bool,
    #[serde(default)]
    sources: Vec<VerifierSource>,
}

#[derive(Debug, Deserialize)]
struct VerifierSource {
    #[serde(default)]
    uri: Option<String>,
}

fn parse_verification(body: &str) -> Result<DeliverabilityReport, ProbeError> {
    let raw: VerifierEnvelope =
        serde_json::from_str(body).map_err(|e| ProbeError::Parse(format!("hunter: {}", e)))?;
    let data = raw.data;

    Ok(DeliverabilityReport {
        email: data.email,
        status: data.status.unwrap_or_else(|| "unknown".to_string()),
        result: data.result,
        score: data.score,
        disposable: data.disposable,
        webmail: data.webmail,
        gibberish: data.gibberish,
        mx_records: data.mx_records,
        smtp_check: data.smtp_check,
        accept_all: data.accept_all,
        blocked: data.block,
        sources: data.sources.into_iter().filter_map(|s| s.uri).collect(),
    })
}

#[async_trait]
impl Probe for DeliverabilityProbe {
    fn capability(&self) -> Capability {
        Capability::Deliverability
    }

    fn description(&self) -> &str {
        "Email deliverability and public sources of the address (Hunter)"
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
            .ok_or_else(|| ProbeError::Unavailable("no email to verify".to_string()))?;

        let mut url = endpoint(&self.base_url, &["email-verifier"])?;
        url.query_pairs_mut()
            .append_pair("email", email)
            .append_pair("api_key", key);

        let response = ctx.send(ctx.http().get(url)).await?;
        match response.status() {
            StatusCode::UNAUTHORIZED => Err(ProbeError::Unavailable(
                "Hunter rejected the API key".to_string(),
            )),
            // Verification is still running upstream; a later run may succeed.
            StatusCode::ACCEPTED => Err(ProbeError::Unavailable(
                "Hunter verification still in progress".to_string(),
            )),
            status if status.is_success() => Ok(ProbePayload::Deliverability(
                parse_verification(&response.text().await?)?,
            )),
            status => Err(ProbeError::UnexpectedStatus {
                source_name: "hunter".to_string(),
                status: status.as_u16(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verification() {
        let body = r#"{
            "data": {
                "status": "valid",
                "result": "deliverable",
                "score": 100,
                "email": "patrick@stripe.com",
                "regexp": true,
                "gibberish": false,
                "disposable": false,
                "webmail": false,
                "mx_records": true,
                "smtp_server": true,
                "smtp_check": true,
                "accept_all": false,
                "block": false,
                "sources": [
                    {"domain": "blog.stripe.com", "uri": "http://blog.stripe.com/mobile-apps"},
                    {"domain": "example.com"}
                ]
            },
            "meta": {"params": {"email": "patrick@stripe.com"}}
        }"#;

        let report = parse_verification(body).unwrap();
        assert_eq!(report.status, "valid");
        assert_eq!(report.result.as_deref(), Some("deliverable"));
        assert_eq!(report.score, Some(100));
        assert!(report.smtp_check);
        assert!(!report.blocked);
        assert_eq!(report.sources, vec!["http://blog.stripe.com/mobile-apps"]);
    }

    #[test]
    fn test_missing_status_is_unknown() {
        let report = parse_verification(r#"{"data": {"email": "a@b.co"}}"#).unwrap();
        assert_eq!(report.status, "unknown");
        assert_eq!(report.score, None);
    }

    #[test]
    fn test_error_body_is_a_parse_error() {
        let body = r#"{"errors":[{"id":"wrong_params","code":400,"details":"email is missing"}]}"#;
        assert!(matches!(parse_verification(body), Err(ProbeError::Parse(_))));
    }
}
