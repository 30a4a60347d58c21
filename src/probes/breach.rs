//! HaveIBeenPwned v3 breach and paste lookup.

use crate::probes::{Probe, ProbeContext, ProbeError, endpoint};
use crate::types::payload::{BreachEntry, BreachReport, PasteEntry};
use crate::types::{Capability, InvestigationInput, ProbePayload};
use crate::utils::toml_config::ProbeConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://haveibeenpwned.com/api/v3";

const SOURCE_BREACHES: &str = "haveibeenpwned.breachedaccount";
const SOURCE_PASTES: &str = "haveibeenpwned.pasteaccount";

pub struct BreachProbe {
    base_url: String,
    include_pastes: bool,
}

impl BreachProbe {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            include_pastes: true,
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        let mut probe = Self::new(config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL));
        if let Some(include) = config.extra.get("include_pastes").and_then(|v| v.as_bool()) {
            probe.include_pastes = include;
        }
        probe
    }

    async fn get(
        &self,
        ctx: &ProbeContext,
        key: &str,
        resource: &str,
        email: &str,
    ) -> Result<Option<reqwest::Response>, ProbeError> {
        let mut url = endpoint(&self.base_url, &[resource, email])?;
        if resource == "breachedaccount" {
            url.query_pairs_mut().append_pair("truncateResponse", "false");
        }

        let request = ctx.http().get(url).header("hibp-api-key", key);
        let response = ctx.send(request).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::UNAUTHORIZED => Err(ProbeError::Unavailable(
                "HaveIBeenPwned rejected the API key".to_string(),
            )),
            status if status.is_success() => Ok(Some(response)),
            status => Err(ProbeError::UnexpectedStatus {
                source_name: resource.to_string(),
                status: status.as_u16(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HibpBreach {
    name: String,
    domain: Option<String>,
    breach_date: Option<String>,
    pwn_count: Option<u64>,
    #[serde(default)]
    data_classes: Vec<String>,
    #[serde(default)]
    is_verified: bool,
    #[serde(default)]
    is_sensitive: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HibpPaste {
    source: String,
    id: String,
    title: Option<String>,
    date: Option<String>,
}

fn parse_breaches(body: &str) -> Result<Vec<BreachEntry>, ProbeError> {
    let raw: Vec<HibpBreach> = serde_json::from_str(body)
        .map_err(|e| ProbeError::Parse(format!("breach list: {}", e)))?;

    Ok(raw
        .into_iter()
        .map(|b| BreachEntry {
            name: b.name,
            domain: b.domain.filter(|d| !d.is_empty()),
            breach_date: b.breach_date,
            pwn_count: b.pwn_count,
            data_classes: b.data_classes,
            is_verified: b.is_verified,
            is_sensitive: b.is_sensitive,
        })
        .collect())
}

fn parse_pastes(body: &str) -> Result<Vec<PasteEntry>, ProbeError> {
    let raw: Vec<HibpPaste> = serde_json::from_str(body)
        .map_err(|e| ProbeError::Parse(format!("paste list: {}", e)))?;

    Ok(raw
        .into_iter()
        .map(|p| PasteEntry {
            source: p.source,
            id: p.id,
            title: p.title,
            date: p.date,
        })
        .collect())
}

#[async_trait]
impl Probe for BreachProbe {
    fn capability(&self) -> Capability {
        Capability::Breach
    }

    fn description(&self) -> &str {
        "Known data breaches and pastes exposing the email address (HaveIBeenPwned)"
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

        let mut report = BreachReport::default();

        if let Some(response) = self.get(ctx, key, "breachedaccount", email).await? {
            report.breaches = parse_breaches(&response.text().await?)?;
        }
        report.total_breaches = u32::try_from(report.breaches.len()).unwrap_or(u32::MAX);
        report.sources_checked.push(SOURCE_BREACHES.to_string());

        // Paste lookups are best-effort; the breach list already answers the question.
        if self.include_pastes {
            match self.get(ctx, key, "pasteaccount", email).await {
                Ok(Some(response)) => {
                    report.pastes = parse_pastes(&response.text().await?)?;
                    report.sources_checked.push(SOURCE_PASTES.to_string());
                }
                Ok(None) => report.sources_checked.push(SOURCE_PASTES.to_string()),
                Err(ProbeError::Cancelled) => return Err(ProbeError::Cancelled),
                Err(e) => tracing::warn!(error = %e, "paste lookup failed"),
            }
        }

        tracing::debug!(
            breaches = report.total_breaches,
            pastes = report.pastes.len(),
            "breach lookup finished"
        );

        Ok(ProbePayload::Breach(report))
    }
}
