use super::{Capability, InvestigationInput, ProbeOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Derived completeness of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Complete,
    Partial,
}

/// The unified, schema-stable aggregate of all probe outcomes for one run.
///
/// Every capability in [`Capability::ALL`] has a slot, serialized as a
/// top-level key next to `target_info`, `correlations`, `timeline`, `risk`,
/// `timestamp` and `run_status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigationRecord {
    pub target_info: InvestigationInput,
    #[serde(flatten)]
    slots: BTreeMap<Capability, ProbeOutcome>,
    pub correlations: Vec<CorrelationFinding>,
    /// Dated events from the slots, newest first.
    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,
    pub risk: Option<RiskAssessment>,
    pub timestamp: DateTime<Utc>,
    pub run_status: RunStatus,
}

impl InvestigationRecord {
    /// A record with every slot set to the "not run" placeholder.
    pub fn empty(target_info: InvestigationInput, timestamp: DateTime<Utc>) -> Self {
        let slots = Capability::ALL
            .into_iter()
            .map(|c| (c, ProbeOutcome::placeholder(c)))
            .collect();

        Self {
            target_info,
            slots,
            correlations: Vec::new(),
            timeline: Vec::new(),
            risk: None,
            timestamp,
            run_status: RunStatus::Complete,
        }
    }

    /// The slot of one capability.
    pub fn slot(&self, capability: Capability) -> &ProbeOutcome {
        // Every capability is inserted in `empty` and slots are only replaced.
        &self.slots[&capability]
    }

    /// All slots in capability-id order.
    pub fn slots(&self) -> impl Iterator<Item = &ProbeOutcome> {
        self.slots.values()
    }

    pub(crate) fn fill_slot(&mut self, outcome: ProbeOutcome) {
        self.slots.insert(outcome.capability, outcome);
    }

    /// Attach correlator and risk output.
    pub(crate) fn with_analysis(
        mut self,
        correlations: Vec<CorrelationFinding>,
        timeline: Vec<TimelineEvent>,
        risk: RiskAssessment,
    ) -> Self {
        self.correlations = correlations;
        self.timeline = timeline;
        self.risk = Some(risk);
        self
    }

    /// The record as a plain nested key-value structure for collaborators.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// The fixed top-level key set of every record.
    pub fn top_level_keys() -> Vec<&'static str> {
        let mut keys = vec![
            "target_info",
            "correlations",
            "timeline",
            "risk",
            "timestamp",
            "run_status",
        ];
        keys.extend(Capability::ALL.iter().map(|c| c.id()));
        keys.sort_unstable();
        keys
    }
}

// ============= Correlation =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingKind {
    IdentityMatch,
    OrganizationMatch,
    CrossPlatformReuse,
    RiskFlag,
    LocationMatch,
}

/// A dated event pulled from one slot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// ISO 8601 date or timestamp as reported by the source.
    pub date: String,
    pub event: String,
    pub source: Provenance,
}

/// A (capability, field-path) pair justifying a finding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Provenance {
    pub capability: Capability,
    pub field_path: String,
}

impl Provenance {
    pub fn new(capability: Capability, field_path: impl Into<String>) -> Self {
        Self {
            capability,
            field_path: field_path.into(),
        }
    }
}

/// A derived insight connecting independently gathered signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationFinding {
    pub kind: FindingKind,
    /// In `[0, 1]`.
    pub confidence: f64,
    /// Sorted, deduplicated provenance list.
    pub evidence: Vec<Provenance>,
    pub description: String,
}

impl CorrelationFinding {
    /// Number of distinct capabilities contributing evidence.
    pub fn independent_sources(&self) -> usize {
        let mut caps: Vec<Capability> = self.evidence.iter().map(|p| p.capability).collect();
        caps.dedup();
        caps.len()
    }
}

// ============= Risk =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhoneRiskTier {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreachRisk {
    pub breach_count: u32,
    pub sensitive: bool,
    pub points: u32,
    pub level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneRisk {
    pub tier: PhoneRiskTier,
    pub points: u32,
}

/// Output of the risk scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// 0..=100.
    pub score: u32,
    pub level: RiskLevel,
    pub breach: Option<BreachRisk>,
    pub phone: Option<PhoneRisk>,
    pub factors: Vec<String>,
}
