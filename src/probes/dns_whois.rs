//! DNS records over DoH and registration data over RDAP for the email domain.
//!
//! Each record type and the RDAP lookup fail independently: a failed lookup
//! is kept under `errors` in the report and the probe still succeeds.

use crate::probes::{Probe, ProbeContext, ProbeError, endpoint};
use crate::types::payload::{DnsWhoisReport, WhoisSummary};
use crate::types::{Capability, InvestigationInput, ProbePayload};
use crate::utils::toml_config::ProbeConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

pub const DEFAULT_DOH_URL: &str = "https://dns.google";
pub const DEFAULT_RDAP_URL: &str = "https://rdap.org";

const DEFAULT_RECORD_TYPES: [&str; 5] = ["A", "AAAA", "MX", "NS", "TXT"];

pub struct DnsWhoisProbe {
    doh_url: String,
    rdap_url: String,
    record_types: Vec<String>,
}

impl DnsWhoisProbe {
    pub fn new(doh_url: impl Into<String>, rdap_url: impl Into<String>) -> Self {
        Self {
            doh_url: doh_url.into(),
            rdap_url: rdap_url.into(),
            record_types: DEFAULT_RECORD_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        let mut probe = Self::new(
            config.base_url.as_deref().unwrap_or(DEFAULT_DOH_URL),
            config.extra_str("rdap_url").unwrap_or(DEFAULT_RDAP_URL),
        );
        if let Some(types) = config.extra_string_list("record_types") {
            probe.record_types = types.into_iter().map(|t| t.to_uppercase()).collect();
        }
        probe
    }

    async fn resolve(
        &self,
        ctx: &ProbeContext,
        domain: &str,
        record_type: &str,
    ) -> Result<Vec<String>, ProbeError> {
        let mut url = endpoint(&self.doh_url, &["resolve"])?;
        url.query_pairs_mut()
            .append_pair("name", domain)
            .append_pair("type", record_type);

        let response = ctx
            .send(ctx.http().get(url).header("accept", "application/dns-json"))
            .await?;
        if !response.status().is_success() {
            return Err(ProbeError::UnexpectedStatus {
                source_name: "doh".to_string(),
                status: response.status().as_u16(),
            });
        }

        parse_doh_answer(&response.text().await?, record_type)
    }

    async fn rdap(&self, ctx: &ProbeContext, domain: &str) -> Result<WhoisSummary, ProbeError> {
        let url = endpoint(&self.rdap_url, &["domain", domain])?;
        let response = ctx
            .send(ctx.http().get(url).header("accept", "application/rdap+json"))
            .await?;
        if !response.status().is_success() {
            return Err(ProbeError::UnexpectedStatus {
                source_name: "rdap".to_string(),
                status: response.status().as_u16(),
            });
        }

        let body: Value = serde_json::from_str(&response.text().await?)
            .map_err(|e| ProbeError::Parse(format!("rdap: {}", e)))?;
        Ok(summarize_rdap(&body))
    }
}

#[derive(Debug, Deserialize)]
struct DohResponse {
    #[serde(rename = "Status")]
    status: u32,
    #[serde(rename = "Answer", default)]
    answer: Vec<DohAnswer>,
}

#[derive(Debug, Deserialize)]
struct DohAnswer {
    #[serde(rename = "type")]
    record_type: u16,
    data: String,
}

fn type_code(record_type: &str) -> Option<u16> {
    match record_type {
        "A" => Some(1),
        "NS" => Some(2),
        "CNAME" => Some(5),
        "SOA" => Some(6),
        "MX" => Some(15),
        "TXT" => Some(16),
        "AAAA" => Some(28),
        _ => None,
    }
}

fn parse_doh_answer(body: &str, record_type: &str) -> Result<Vec<String>, ProbeError> {
    let parsed: DohResponse =
        serde_json::from_str(body).map_err(|e| ProbeError::Parse(format!("doh: {}", e)))?;

    match parsed.status {
        0 => {}
        3 => return Err(ProbeError::Parse("NXDOMAIN".to_string())),
        rcode => return Err(ProbeError::Parse(format!("DNS rcode {}", rcode))),
    }

    let wanted = type_code(record_type);
    let mut values: Vec<String> = parsed
        .answer
        .into_iter()
        .filter(|a| wanted.is_none_or(|code| a.record_type == code))
        .map(|a| {
            let data = a.data.trim();
            let data = data.strip_prefix('"').unwrap_or(data);
            let data = data.strip_suffix('"').unwrap_or(data);
            data.trim_end_matches('.').to_string()
        })
        .collect();
    values.sort();
    values.dedup();
    Ok(values)
}

/// Text value of a vCard property inside an RDAP entity.
fn vcard_text(entity: &Value, property: &str) -> Option<String> {
    entity
        .get("vcardArray")?
        .get(1)?
        .as_array()?
        .iter()
        .find(|p| p.get(0).and_then(Value::as_str) == Some(property))
        .and_then(|p| p.get(3))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn entities_with_role<'a>(body: &'a Value, role: &'a str) -> impl Iterator<Item = &'a Value> {
    body.get("entities")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(move |e| {
            e.get("roles")
                .and_then(Value::as_array)
                .is_some_and(|roles| roles.iter().any(|r| r.as_str() == Some(role)))
        })
}

fn summarize_rdap(body: &Value) -> WhoisSummary {
    let event = |action: &str| {
        body.get("events")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .find(|e| e.get("eventAction").and_then(Value::as_str) == Some(action))
            .and_then(|e| e.get("eventDate"))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    let registrar = entities_with_role(body, "registrar").find_map(|e| vcard_text(e, "fn"));
    let registrant_organization = entities_with_role(body, "registrant")
        .find_map(|e| vcard_text(e, "org").or_else(|| vcard_text(e, "fn")))
        .filter(|org| !org.to_lowercase().contains("redacted"));

    let status = body
        .get("status")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();

    let name_servers = body
        .get("nameservers")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|ns| ns.get("ldhName").and_then(Value::as_str))
        .map(|ns| ns.to_lowercase())
        .collect();

    WhoisSummary {
        registrar,
        registrant_organization,
        created: event("registration"),
        updated: event("last changed"),
        expires: event("expiration"),
        status,
        name_servers,
    }
}

#[async_trait]
impl Probe for DnsWhoisProbe {
    fn capability(&self) -> Capability {
        Capability::DnsWhois
    }

    fn description(&self) -> &str {
        "DNS records and RDAP registration data for the email domain"
    }

    fn applies_to(&self, input: &InvestigationInput) -> bool {
        input.email_domain().is_some()
    }

    async fn execute(&self, ctx: &ProbeContext) -> Result<ProbePayload, ProbeError> {
        let domain = ctx
            .input()
            .email_domain()
            .ok_or_else(|| ProbeError::Unavailable("no email domain".to_string()))?
            .to_string();

        let mut report = DnsWhoisReport {
            domain: domain.clone(),
            ..Default::default()
        };

        for record_type in &self.record_types {
            match self.resolve(ctx, &domain, record_type).await {
                Ok(values) => {
                    report.records.insert(record_type.clone(), values);
                }
                Err(ProbeError::Cancelled) => return Err(ProbeError::Cancelled),
                Err(e) => {
                    tracing::debug!(record_type = %record_type, error = %e, "DNS lookup failed");
                    report.errors.insert(record_type.clone(), e.to_string());
                }
            }
        }

        match self.rdap(ctx, &domain).await {
            Ok(summary) => report.whois = Some(summary),
            Err(ProbeError::Cancelled) => return Err(ProbeError::Cancelled),
            Err(e) => {
                tracing::debug!(error = %e, "RDAP lookup failed");
                report.errors.insert("rdap".to_string(), e.to_string());
            }
        }

        Ok(ProbePayload::DnsWhois(report))
    }
}
