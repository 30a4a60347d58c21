//! Phone number intelligence.
//!
//! Analysis is offline: the E.164 number is parsed and classified with the
//! libphonenumber metadata bundled by the `phonenumber` crate, with NANP
//! overlays for toll-free, premium and the fictional 555-01XX range. When a
//! numverify key is configured the result is enriched with carrier and
//! location data; enrichment failures only add a note.

use crate::probes::{Probe, ProbeContext, ProbeError, endpoint};
use crate::types::payload::{LineType, PhoneReport};
use crate::types::{Capability, InvestigationInput, ProbePayload};
use crate::utils::toml_config::ProbeConfig;
use async_trait::async_trait;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://apilayer.net/api";

const NANP_TOLL_FREE: &[&str] = &["800", "833", "844", "855", "866", "877", "888"];

fn line_type(kind: phonenumber::Type) -> LineType {
    use phonenumber::Type;

    match kind {
        Type::Mobile => LineType::Mobile,
        Type::FixedLine => LineType::FixedLine,
        Type::FixedLineOrMobile => LineType::FixedLineOrMobile,
        Type::Voip => LineType::Voip,
        Type::TollFree => LineType::TollFree,
        Type::PremiumRate => LineType::PremiumRate,
        _ => LineType::Unknown,
    }
}

/// NANP overlays on top of the numbering-plan metadata.
fn apply_nanp_rules(national: &str, report: &mut PhoneReport) {
    let (Some(npa), Some(nxx), Some(line)) =
        (national.get(..3), national.get(3..6), national.get(6..))
    else {
        return;
    };

    if report.valid && report.line_type == LineType::Unknown {
        if NANP_TOLL_FREE.contains(&npa) {
            report.line_type = LineType::TollFree;
        } else if npa == "900" {
            report.line_type = LineType::PremiumRate;
        }
    }

    if nxx == "555" && line.starts_with("01") {
        report.risk_flagged = true;
        report.notes.push("555-01XX is reserved for fictional use".to_string());
    }
}

/// Offline analysis of a normalised E.164 number against libphonenumber metadata.
pub fn analyze(e164: &str) -> PhoneReport {
    let mut report = PhoneReport {
        number: e164.to_string(),
        ..Default::default()
    };

    let parsed = match phonenumber::parse(None, e164) {
        Ok(parsed) => parsed,
        Err(e) => {
            report.notes.push(format!("number could not be parsed: {}", e));
            return report;
        }
    };

    let code = parsed.code().value();
    let national = parsed.national().to_string();
    report.country_calling_code = Some(code.to_string());
    report.national_number = Some(national.clone());
    report.region = parsed.country().id().map(|id| format!("{:?}", id));
    report.valid = phonenumber::is_valid(&parsed);

    if report.valid {
        report.line_type = line_type(parsed.number_type(&phonenumber::metadata::DATABASE));
    } else {
        report
            .notes
            .push(format!("+{} {} is not an assigned number", code, national));
        report.region = None;
    }

    if code == 1 {
        apply_nanp_rules(&national, &mut report);
    }

    report
}

#[derive(Debug, Deserialize)]
struct NumverifyResponse {
    #[serde(default)]
    valid: Option<bool>,
    #[serde(default)]
    country_code: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    carrier: Option<String>,
    #[serde(default)]
    line_type: Option<String>,
    #[serde(default)]
    error: Option<NumverifyError>,
}

#[derive(Debug, Deserialize)]
struct NumverifyError {
    #[serde(default)]
    info: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Fold a numverify response into the offline report.
fn apply_numverify(report: &mut PhoneReport, body: &str) -> Result<(), ProbeError> {
    let raw: NumverifyResponse =
        serde_json::from_str(body).map_err(|e| ProbeError::Parse(format!("numverify: {}", e)))?;

    if let Some(err) = raw.error {
        return Err(ProbeError::Unavailable(format!(
            "numverify: {}",
            err.info.or(err.kind).unwrap_or_else(|| "unknown error".to_string())
        )));
    }

    if raw.valid == Some(false) && report.valid {
        report.notes.push("carrier lookup reports the number as invalid".to_string());
    }
    report.carrier = non_empty(raw.carrier).or(report.carrier.take());
    report.location = non_empty(raw.location).or(report.location.take());
    if report.region.is_none() {
        report.region = non_empty(raw.country_code);
    }

    let remote = match raw.line_type.as_deref() {
        Some("mobile") => Some(LineType::Mobile),
        Some("landline") => Some(LineType::FixedLine),
        Some("toll_free") => Some(LineType::TollFree),
        Some("premium_rate") => Some(LineType::PremiumRate),
        Some("voip") => Some(LineType::Voip),
        _ => None,
    };
    if let Some(line_type) = remote {
        report.line_type = line_type;
    }

    Ok(())
}

pub struct PhoneProbe {
    base_url: String,
}

impl PhoneProbe {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))
    }

    async fn enrich(
        &self,
        ctx: &ProbeContext,
        key: &str,
        report: &mut PhoneReport,
    ) -> Result<(), ProbeError> {
        let mut url = endpoint(&self.base_url, &["validate"])?;
        url.query_pairs_mut()
            .append_pair("access_key", key)
            .append_pair("number", report.number.trim_start_matches('+'));

        let response = ctx.send(ctx.http().get(url)).await?;
        if !response.status().is_success() {
            return Err(ProbeError::UnexpectedStatus {
                source_name: "numverify".to_string(),
                status: response.status().as_u16(),
            });
        }
        apply_numverify(report, &response.text().await?)
    }
}

#[async_trait]
impl Probe for PhoneProbe {
    fn capability(&self) -> Capability {
        Capability::Phone
    }

    fn description(&self) -> &str {
        "Phone number structure, region and line type, with optional carrier lookup"
    }

    fn applies_to(&self, input: &InvestigationInput) -> bool {
        input.phone().is_some()
    }

    async fn execute(&self, ctx: &ProbeContext) -> Result<ProbePayload, ProbeError> {
        let number = ctx
            .input()
            .phone()
            .ok_or_else(|| ProbeError::Unavailable("no phone number".to_string()))?;

        let mut report = analyze(number);

        if let Some(key) = ctx.credential() {
            match self.enrich(ctx, key, &mut report).await {
                Ok(()) => {}
                Err(ProbeError::Cancelled) => return Err(ProbeError::Cancelled),
                Err(e) => {
                    tracing::warn!(error = %e, "carrier lookup failed");
                    report.notes.push(format!("carrier lookup failed: {}", e));
                }
            }
        }

        Ok(ProbePayload::Phone(report))
    }
}
