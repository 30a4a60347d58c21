//! Per-capability payload schemas.
//!
//! Each capability owns its report type. The aggregator only looks at the
//! [`ProbePayload`] tag; the correlator and risk scorer read the typed fields.

use super::Capability;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Payload of a successful probe, tagged by capability id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "capability", content = "data", rename_all = "snake_case")]
pub enum ProbePayload {
    Breach(BreachReport),
    Deliverability(DeliverabilityReport),
    DnsWhois(DnsWhoisReport),
    EmailRegistration(EmailRegistrationReport),
    ExternalTool(ExternalToolReport),
    Phone(PhoneReport),
    Professional(ProfessionalReport),
    Reputation(ReputationReport),
    Search(SearchReport),
    Social(SocialReport),
}

impl ProbePayload {
    /// The capability this payload belongs to.
    pub fn capability(&self) -> Capability {
        match self {
            ProbePayload::Breach(_) => Capability::Breach,
            ProbePayload::Deliverability(_) => Capability::Deliverability,
            ProbePayload::DnsWhois(_) => Capability::DnsWhois,
            ProbePayload::EmailRegistration(_) => Capability::EmailRegistration,
            ProbePayload::ExternalTool(_) => Capability::ExternalTool,
            ProbePayload::Phone(_) => Capability::Phone,
            ProbePayload::Professional(_) => Capability::Professional,
            ProbePayload::Reputation(_) => Capability::Reputation,
            ProbePayload::Search(_) => Capability::Search,
            ProbePayload::Social(_) => Capability::Social,
        }
    }
}

// ============= Breach =============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreachReport {
    pub total_breaches: u32,
    #[serde(default)]
    pub breaches: Vec<BreachEntry>,
    #[serde(default)]
    pub pastes: Vec<PasteEntry>,
    #[serde(default)]
    pub sources_checked: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreachEntry {
    pub name: String,
    pub domain: Option<String>,
    pub breach_date: Option<String>,
    pub pwn_count: Option<u64>,
    #[serde(default)]
    pub data_classes: Vec<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub is_sensitive: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PasteEntry {
    pub source: String,
    pub id: String,
    pub title: Option<String>,
    pub date: Option<String>,
}

// ============= Deliverability =============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliverabilityReport {
    pub email: String,
    /// Verifier verdict: `valid`, `invalid`, `accept_all`, `webmail`,
    /// `disposable` or `unknown`.
    pub status: String,
    /// `deliverable`, `undeliverable` or `risky`.
    pub result: Option<String>,
    /// Confidence 0-100.
    pub score: Option<u8>,
    #[serde(default)]
    pub disposable: bool,
    #[serde(default)]
    pub webmail: bool,
    #[serde(default)]
    pub gibberish: bool,
    #[serde(default)]
    pub mx_records: bool,
    #[serde(default)]
    pub smtp_check: bool,
    #[serde(default)]
    pub accept_all: bool,
    #[serde(default)]
    pub blocked: bool,
    /// Pages the address was seen on.
    #[serde(default)]
    pub sources: Vec<String>,
}

// ============= DNS / WHOIS =============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DnsWhoisReport {
    pub domain: String,
    /// Record type -> values.
    #[serde(default)]
    pub records: BTreeMap<String, Vec<String>>,
    /// Record type (or `rdap`) -> error message.
    #[serde(default)]
    pub errors: BTreeMap<String, String>,
    pub whois: Option<WhoisSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WhoisSummary {
    pub registrar: Option<String>,
    pub registrant_organization: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub expires: Option<String>,
    #[serde(default)]
    pub status: Vec<String>,
    #[serde(default)]
    pub name_servers: Vec<String>,
}

// ============= Email registration =============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailRegistrationReport {
    pub tool: String,
    pub email: String,
    #[serde(default)]
    pub checks: Vec<RegistrationCheck>,
    /// Platforms with an account registered to the address, sorted.
    #[serde(default)]
    pub registered_on: Vec<String>,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationCheck {
    pub platform: String,
    /// `None` when the platform could not answer.
    pub registered: Option<bool>,
    pub message: Option<String>,
}

// ============= External tool =============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalToolReport {
    pub tool: String,
    pub username: String,
    #[serde(default)]
    pub found: Vec<ToolHit>,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolHit {
    pub site: String,
    pub url: String,
}

// ============= Phone =============

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineType {
    Mobile,
    FixedLine,
    FixedLineOrMobile,
    Voip,
    TollFree,
    PremiumRate,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhoneReport {
    pub number: String,
    pub valid: bool,
    pub country_calling_code: Option<String>,
    pub region: Option<String>,
    pub national_number: Option<String>,
    pub line_type: LineType,
    pub carrier: Option<String>,
    pub location: Option<String>,
    /// Number falls in a range known for abuse or reserved for fiction.
    #[serde(default)]
    pub risk_flagged: bool,
    #[serde(default)]
    pub notes: Vec<String>,
}

// ============= Professional =============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfessionalReport {
    #[serde(default)]
    pub candidate_handles: Vec<String>,
    #[serde(default)]
    pub profiles: Vec<ProfessionalProfile>,
    /// Organizations associated with the target, most direct first.
    #[serde(default)]
    pub organizations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfessionalProfile {
    pub platform: String,
    pub username: String,
    pub url: String,
    pub exists: bool,
    pub display_name: Option<String>,
    pub organization: Option<String>,
    /// Free-text location from the profile.
    #[serde(default)]
    pub location: Option<String>,
}

// ============= Reputation =============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReputationReport {
    pub reputation: String,
    pub suspicious: bool,
    pub references: u32,
    #[serde(default)]
    pub blacklisted: bool,
    #[serde(default)]
    pub malicious_activity: bool,
    #[serde(default)]
    pub credentials_leaked: bool,
    #[serde(default)]
    pub data_breach: bool,
    #[serde(default)]
    pub disposable: bool,
    #[serde(default)]
    pub free_provider: bool,
    /// Platform names the service has seen the address on.
    #[serde(default)]
    pub profiles: Vec<String>,
}

// ============= Search =============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchReport {
    #[serde(default)]
    pub queries: Vec<String>,
    #[serde(default)]
    pub hits: Vec<SearchHit>,
    #[serde(default)]
    pub mentioned_usernames: Vec<String>,
    #[serde(default)]
    pub mentioned_organizations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub query: String,
    pub title: String,
    pub url: String,
    pub snippet: Option<String>,
}

// ============= Social =============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialReport {
    #[serde(default)]
    pub candidate_usernames: Vec<String>,
    #[serde(default)]
    pub profiles: Vec<SocialProfile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialProfile {
    pub platform: String,
    pub username: String,
    pub url: String,
    pub exists: bool,
    pub http_status: Option<u16>,
}
