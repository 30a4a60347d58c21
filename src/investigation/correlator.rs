//! Declarative cross-capability correlation.
//!
//! Signals are pulled out of every `ok` slot together with their field paths,
//! then a fixed set of rules looks for agreement between independent
//! capabilities:
//!
//! | Rule | Kind | Fires when |
//! |------|------|-----------|
//! | shared username | `identity-match` | one normalised username in two or more capabilities |
//! | shared organization | `organization-match` | one normalised organization in two or more capabilities |
//! | username reuse | `cross-platform-reuse` | one username confirmed on `cross_platform_min_platforms` platforms |
//! | shared locality | `location-match` | one normalised locality in two or more capabilities |
//! | breached + weak phone | `risk-flag` | breach count at threshold and a weakly validated phone |
//! | suspicious + breached | `risk-flag` | reputation suspicious and at least one breach |
//!
//! Confidence is `min(1, weight * (1 + boost * (sources - 1)))` where
//! `sources` counts distinct contributing capabilities.
//!
//! [`Correlator::timeline`] orders dated breach and paste exposures, newest
//! first, each pointing back at the field it was read from.

use crate::types::payload::{LineType, PhoneReport, ProbePayload, ReputationReport};
use crate::types::{
    Capability, CorrelationFinding, FindingKind, InvestigationRecord, ProbeStatus, Provenance,
    TimelineEvent,
};
use crate::utils::toml_config::CorrelationConfig;
use std::collections::{BTreeMap, BTreeSet};

const MIN_USERNAME_LEN: usize = 3;

const LEGAL_SUFFIXES: &[&str] = &[
    "ag", "co", "company", "corp", "corporation", "gmbh", "inc", "incorporated", "limited", "llc",
    "ltd", "plc", "sa", "sarl",
];

/// One extracted value with where it came from.
#[derive(Debug, Clone)]
struct Signal {
    key: String,
    display: String,
    provenance: Provenance,
}

/// Lowercase, strip a leading `@`, drop `.`, `_` and `-`.
pub fn normalize_username(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('@')
        .chars()
        .filter(|c| !matches!(c, '.' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Lowercase, punctuation to spaces, legal-form suffixes removed.
pub fn normalize_organization(raw: &str) -> String {
    let spaced: String = raw
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .flat_map(char::to_lowercase)
        .collect();
    let mut words: Vec<&str> = spaced.split_whitespace().collect();
    while words.len() > 1 && words.last().is_some_and(|w| LEGAL_SUFFIXES.contains(w)) {
        words.pop();
    }
    words.join(" ")
}

/// The locality part of a free-text location: first comma-separated
/// component, lowercased, whitespace collapsed.
pub fn normalize_location(raw: &str) -> String {
    raw.split(',')
        .next()
        .unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Rule engine over a frozen record.
#[derive(Debug, Clone, Default)]
pub struct Correlator {
    config: CorrelationConfig,
}

impl Correlator {
    pub fn new(config: CorrelationConfig) -> Self {
        Self { config }
    }

    /// Derive findings. Pure: the same record always yields the same list.
    pub fn correlate(&self, record: &InvestigationRecord) -> Vec<CorrelationFinding> {
        let payloads = ok_payloads(record);

        let mut findings = Vec::new();
        findings.extend(self.identity_matches(&payloads));
        findings.extend(self.organization_matches(&payloads));
        findings.extend(self.cross_platform_reuse(&payloads));
        findings.extend(self.location_matches(&payloads));
        findings.extend(self.risk_flags(&payloads));

        dedup_and_order(findings)
    }

    /// Dated exposures from the breach slot, newest first.
    ///
    /// Entries without a date are left out. Empty unless the breach slot is `ok`.
    pub fn timeline(&self, record: &InvestigationRecord) -> Vec<TimelineEvent> {
        let Some(ProbePayload::Breach(report)) = ok_payloads(record).remove(&Capability::Breach)
        else {
            return Vec::new();
        };

        let breaches = report.breaches.iter().enumerate().filter_map(|(i, b)| {
            let date = b.breach_date.as_deref().map(str::trim).filter(|d| !d.is_empty())?;
            Some(TimelineEvent {
                date: date.to_string(),
                event: format!("data breach: {}", b.name),
                source: Provenance::new(Capability::Breach, format!("breaches[{}].breach_date", i)),
            })
        });
        let pastes = report.pastes.iter().enumerate().filter_map(|(i, p)| {
            let date = p.date.as_deref().map(str::trim).filter(|d| !d.is_empty())?;
            Some(TimelineEvent {
                date: date.to_string(),
                event: format!("paste on {}", p.source),
                source: Provenance::new(Capability::Breach, format!("pastes[{}].date", i)),
            })
        });

        let mut events: Vec<TimelineEvent> = breaches.chain(pastes).collect();
        events.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| a.source.cmp(&b.source))
        });
        events
    }

    fn confidence(&self, weight: f64, sources: usize) -> f64 {
        let extra = sources.saturating_sub(1) as f64;
        (weight * (1.0 + self.config.corroboration_boost * extra)).clamp(0.0, 1.0)
    }

    fn finding(
        &self,
        kind: FindingKind,
        weight: f64,
        evidence: impl IntoIterator<Item = Provenance>,
        description: String,
    ) -> CorrelationFinding {
        let evidence: Vec<Provenance> = evidence
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let sources = evidence
            .iter()
            .map(|p| p.capability)
            .collect::<BTreeSet<_>>()
            .len();

        CorrelationFinding {
            kind,
            confidence: self.confidence(weight, sources),
            evidence,
            description,
        }
    }

    /// Emit one finding per key seen in at least two capabilities.
    fn shared_value_findings(
        &self,
        signals: Vec<Signal>,
        kind: FindingKind,
        weight: f64,
        noun: &str,
    ) -> Vec<CorrelationFinding> {
        let mut groups: BTreeMap<String, Vec<Signal>> = BTreeMap::new();
        for signal in signals {
            groups.entry(signal.key.clone()).or_default().push(signal);
        }

        groups
            .into_values()
            .filter_map(|group| {
                let capabilities: BTreeSet<Capability> =
                    group.iter().map(|s| s.provenance.capability).collect();
                if capabilities.len() < 2 {
                    return None;
                }
                let names: Vec<&str> = capabilities.iter().map(|c| c.id()).collect();
                let description = format!(
                    "{} '{}' appears in {}",
                    noun,
                    group[0].display,
                    names.join(", ")
                );
                Some(self.finding(
                    kind,
                    weight,
                    group.into_iter().map(|s| s.provenance),
                    description,
                ))
            })
            .collect()
    }

    fn identity_matches(
        &self,
        payloads: &BTreeMap<Capability, &ProbePayload>,
    ) -> Vec<CorrelationFinding> {
        self.shared_value_findings(
            username_signals(payloads),
            FindingKind::IdentityMatch,
            self.config.identity_weight,
            "username",
        )
    }

    fn organization_matches(
        &self,
        payloads: &BTreeMap<Capability, &ProbePayload>,
    ) -> Vec<CorrelationFinding> {
        self.shared_value_findings(
            organization_signals(payloads),
            FindingKind::OrganizationMatch,
            self.config.organization_weight,
            "organization",
        )
    }

    fn location_matches(
        &self,
        payloads: &BTreeMap<Capability, &ProbePayload>,
    ) -> Vec<CorrelationFinding> {
        self.shared_value_findings(
            location_signals(payloads),
            FindingKind::LocationMatch,
            self.config.location_weight,
            "location",
        )
    }

    fn cross_platform_reuse(
        &self,
        payloads: &BTreeMap<Capability, &ProbePayload>,
    ) -> Vec<CorrelationFinding> {
        // username key -> (display, platform set, evidence)
        let mut seen: BTreeMap<String, (String, BTreeSet<String>, Vec<Provenance>)> =
            BTreeMap::new();
        let mut note = |username: &str, platform: &str, provenance: Provenance| {
            let key = normalize_username(username);
            if key.len() < MIN_USERNAME_LEN {
                return;
            }
            let entry = seen
                .entry(key)
                .or_insert_with(|| (username.to_string(), BTreeSet::new(), Vec::new()));
            entry.1.insert(platform.to_lowercase());
            entry.2.push(provenance);
        };

        if let Some(ProbePayload::Social(report)) = payloads.get(&Capability::Social) {
            for (i, profile) in report.profiles.iter().enumerate() {
                if profile.exists {
                    note(
                        &profile.username,
                        &profile.platform,
                        Provenance::new(Capability::Social, format!("profiles[{}].platform", i)),
                    );
                }
            }
        }
        if let Some(ProbePayload::ExternalTool(report)) = payloads.get(&Capability::ExternalTool) {
            for (i, hit) in report.found.iter().enumerate() {
                note(
                    &report.username,
                    &hit.site,
                    Provenance::new(Capability::ExternalTool, format!("found[{}].site", i)),
                );
            }
        }

        let min_platforms = self.config.cross_platform_min_platforms;
        seen.into_values()
            .filter(|(_, platforms, _)| platforms.len() >= min_platforms)
            .map(|(display, platforms, evidence)| {
                let description = format!(
                    "username '{}' is registered on {} platforms: {}",
                    display,
                    platforms.len(),
                    platforms.into_iter().collect::<Vec<_>>().join(", ")
                );
                self.finding(
                    FindingKind::CrossPlatformReuse,
                    self.config.reuse_weight,
                    evidence,
                    description,
                )
            })
            .collect()
    }

    fn risk_flags(
        &self,
        payloads: &BTreeMap<Capability, &ProbePayload>,
    ) -> Vec<CorrelationFinding> {
        let mut findings = Vec::new();
        let breach = match payloads.get(&Capability::Breach) {
            Some(ProbePayload::Breach(report)) => Some(report),
            _ => None,
        };
        let Some(breach) = breach else {
            return findings;
        };

        if breach.total_breaches >= self.config.breach_risk_threshold
            && let Some(ProbePayload::Phone(phone)) = payloads.get(&Capability::Phone)
            && let Some((field, reason)) = weak_phone(phone)
        {
            findings.push(self.finding(
                FindingKind::RiskFlag,
                self.config.risk_weight,
                [
                    breach_provenance(),
                    Provenance::new(Capability::Phone, field),
                ],
                format!(
                    "{} known breaches combined with a weakly validated phone ({})",
                    breach.total_breaches, reason
                ),
            ));
        }

        if breach.total_breaches >= 1
            && let Some(ProbePayload::Reputation(reputation)) =
                payloads.get(&Capability::Reputation)
            && reputation_is_suspicious(reputation)
        {
            findings.push(self.finding(
                FindingKind::RiskFlag,
                self.config.risk_weight,
                [
                    breach_provenance(),
                    Provenance::new(Capability::Reputation, "suspicious"),
                ],
                format!(
                    "address flagged as suspicious and exposed in {} breaches",
                    breach.total_breaches
                ),
            ));
        }

        findings
    }
}

fn ok_payloads(record: &InvestigationRecord) -> BTreeMap<Capability, &ProbePayload> {
    record
        .slots()
        .filter(|o| o.status == ProbeStatus::Ok)
        .filter_map(|o| o.payload.as_ref().map(|p| (o.capability, p)))
        .collect()
}

fn breach_provenance() -> Provenance {
    Provenance::new(Capability::Breach, "total_breaches")
}

fn reputation_is_suspicious(report: &ReputationReport) -> bool {
    report.suspicious
}

/// The field and reason that make a phone weakly validated, if any.
fn weak_phone(phone: &PhoneReport) -> Option<(&'static str, &'static str)> {
    if !phone.valid {
        return Some(("valid", "invalid number"));
    }
    if phone.risk_flagged {
        return Some(("risk_flagged", "number in a flagged range"));
    }
    match phone.line_type {
        LineType::Voip => Some(("line_type", "VoIP line")),
        LineType::PremiumRate => Some(("line_type", "premium-rate line")),
        LineType::TollFree => Some(("line_type", "toll-free line")),
        LineType::Unknown => Some(("line_type", "unknown line type")),
        LineType::Mobile | LineType::FixedLine | LineType::FixedLineOrMobile => None,
    }
}

fn username_signals(payloads: &BTreeMap<Capability, &ProbePayload>) -> Vec<Signal> {
    let mut signals = Vec::new();
    let mut push = |raw: &str, capability: Capability, path: String| {
        let key = normalize_username(raw);
        if key.len() >= MIN_USERNAME_LEN {
            signals.push(Signal {
                key,
                display: raw.trim().trim_start_matches('@').to_lowercase(),
                provenance: Provenance::new(capability, path),
            });
        }
    };

    for (&capability, payload) in payloads {
        match payload {
            ProbePayload::Social(report) => {
                for (i, p) in report.profiles.iter().enumerate().filter(|(_, p)| p.exists) {
                    push(&p.username, capability, format!("profiles[{}].username", i));
                }
            }
            ProbePayload::Professional(report) => {
                for (i, p) in report.profiles.iter().enumerate().filter(|(_, p)| p.exists) {
                    push(&p.username, capability, format!("profiles[{}].username", i));
                }
            }
            ProbePayload::Search(report) => {
                for (i, u) in report.mentioned_usernames.iter().enumerate() {
                    push(u, capability, format!("mentioned_usernames[{}]", i));
                }
            }
            ProbePayload::ExternalTool(report) if !report.found.is_empty() => {
                push(&report.username, capability, "username".to_string());
            }
            _ => {}
        }
    }

    signals
}

fn organization_signals(payloads: &BTreeMap<Capability, &ProbePayload>) -> Vec<Signal> {
    let mut signals = Vec::new();
    let mut push = |raw: &str, capability: Capability, path: String| {
        let key = normalize_organization(raw);
        if !key.is_empty() {
            signals.push(Signal {
                key,
                display: raw.trim().to_string(),
                provenance: Provenance::new(capability, path),
            });
        }
    };

    for (&capability, payload) in payloads {
        match payload {
            ProbePayload::Professional(report) => {
                for (i, org) in report.organizations.iter().enumerate() {
                    push(org, capability, format!("organizations[{}]", i));
                }
            }
            ProbePayload::Search(report) => {
                for (i, org) in report.mentioned_organizations.iter().enumerate() {
                    push(org, capability, format!("mentioned_organizations[{}]", i));
                }
            }
            ProbePayload::DnsWhois(report) => {
                if let Some(org) = report
                    .whois
                    .as_ref()
                    .and_then(|w| w.registrant_organization.as_deref())
                {
                    push(org, capability, "whois.registrant_organization".to_string());
                }
            }
            _ => {}
        }
    }

    signals
}

fn location_signals(payloads: &BTreeMap<Capability, &ProbePayload>) -> Vec<Signal> {
    let mut signals = Vec::new();
    let mut push = |raw: &str, capability: Capability, path: String| {
        let key = normalize_location(raw);
        if !key.is_empty() {
            signals.push(Signal {
                display: raw.split(',').next().unwrap_or_default().trim().to_string(),
                key,
                provenance: Provenance::new(capability, path),
            });
        }
    };

    for (&capability, payload) in payloads {
        match payload {
            ProbePayload::Phone(report) => {
                if let Some(location) = report.location.as_deref() {
                    push(location, capability, "location".to_string());
                }
            }
            ProbePayload::Professional(report) => {
                for (i, p) in report.profiles.iter().enumerate().filter(|(_, p)| p.exists) {
                    if let Some(location) = p.location.as_deref() {
                        push(location, capability, format!("profiles[{}].location", i));
                    }
                }
            }
            _ => {}
        }
    }

    signals
}

/// Keep the best finding per (kind, evidence) and order deterministically.
fn dedup_and_order(findings: Vec<CorrelationFinding>) -> Vec<CorrelationFinding> {
    let mut best: BTreeMap<(FindingKind, Vec<Provenance>), CorrelationFinding> = BTreeMap::new();

    for finding in findings {
        let key = (finding.kind, finding.evidence.clone());
        match best.get(&key) {
            Some(existing)
                if existing.confidence > finding.confidence
                    || (existing.confidence == finding.confidence
                        && existing.description <= finding.description) => {}
            _ => {
                best.insert(key, finding);
            }
        }
    }

    let mut ordered: Vec<CorrelationFinding> = best.into_values().collect();
    ordered.sort_by(|a, b| {
        let primary = |f: &CorrelationFinding| f.evidence.first().map(|p| p.capability);
        primary(a)
            .cmp(&primary(b))
            .then_with(|| a.kind.cmp(&b.kind))
            .then_with(|| a.evidence.cmp(&b.evidence))
            .then_with(|| a.description.cmp(&b.description))
    });
    ordered
}
