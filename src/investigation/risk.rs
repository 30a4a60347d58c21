use crate::types::payload::{BreachReport, LineType, PhoneReport, ProbePayload};
use crate::types::record::{BreachRisk, PhoneRisk, PhoneRiskTier};
use crate::types::{Capability, InvestigationRecord, ProbeStatus, RiskAssessment, RiskLevel};
use crate::utils::toml_config::RiskConfig;

const MAX_SCORE: u32 = 100;

/// Pure scoring over the breach and phone slots of a record.
#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    config: RiskConfig,
}

impl RiskScorer {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn score(&self, record: &InvestigationRecord) -> RiskAssessment {
        let mut factors = Vec::new();

        let breach = match ok_payload(record, Capability::Breach) {
            Some(ProbePayload::Breach(report)) => Some(self.breach_risk(report, &mut factors)),
            _ => None,
        };
        let phone = match ok_payload(record, Capability::Phone) {
            Some(ProbePayload::Phone(report)) => Some(self.phone_risk(report, &mut factors)),
            _ => None,
        };

        if breach.is_none() && phone.is_none() {
            factors.push("no breach or phone data available".to_string());
        }

        let total =
            breach.as_ref().map_or(0, |b| b.points) + phone.as_ref().map_or(0, |p| p.points);
        let score = total.min(MAX_SCORE);

        RiskAssessment {
            score,
            level: overall_level(score),
            breach,
            phone,
            factors,
        }
    }

    fn breach_risk(&self, report: &BreachReport, factors: &mut Vec<String>) -> BreachRisk {
        let count = report.total_breaches;
        let cap = self.config.breach_cap.max(1);
        let scaled = f64::from(count.min(cap)) / f64::from(cap)
            * f64::from(self.config.breach_max_points);
        let mut points = scaled.round() as u32;

        if count > 0 {
            factors.push(format!("{} breaches (+{} points)", count, points));
        } else {
            factors.push("no known breaches".to_string());
        }

        let sensitive = self.has_sensitive_breach(report);
        if sensitive {
            points += self.config.sensitive_breach_points;
            factors.push(format!(
                "sensitive data exposed (+{} points)",
                self.config.sensitive_breach_points
            ));
        }

        BreachRisk {
            breach_count: count,
            sensitive,
            points,
            level: breach_level(count),
        }
    }

    fn has_sensitive_breach(&self, report: &BreachReport) -> bool {
        report.breaches.iter().any(|b| {
            b.is_sensitive
                || b.data_classes.iter().any(|class| {
                    self.config
                        .sensitive_data_classes
                        .iter()
                        .any(|s| s.eq_ignore_ascii_case(class))
                })
        })
    }

    fn phone_risk(&self, report: &PhoneReport, factors: &mut Vec<String>) -> PhoneRisk {
        let (tier, reason) = phone_tier(report);
        let points = match tier {
            PhoneRiskTier::Low => 0,
            PhoneRiskTier::Medium => self.config.phone_medium_points,
            PhoneRiskTier::High => self.config.phone_high_points,
        };
        factors.push(format!("phone: {} (+{} points)", reason, points));
        PhoneRisk { tier, points }
    }
}

fn ok_payload(record: &InvestigationRecord, capability: Capability) -> Option<&ProbePayload> {
    let slot = record.slot(capability);
    (slot.status == ProbeStatus::Ok)
        .then_some(slot.payload.as_ref())
        .flatten()
}

/// Ordinal phone tier and a short reason.
pub fn phone_tier(report: &PhoneReport) -> (PhoneRiskTier, &'static str) {
    if report.risk_flagged {
        return (PhoneRiskTier::High, "number in a flagged range");
    }
    match report.line_type {
        LineType::Voip => return (PhoneRiskTier::High, "VoIP line"),
        LineType::PremiumRate => return (PhoneRiskTier::High, "premium-rate line"),
        _ => {}
    }
    if !report.valid {
        return (PhoneRiskTier::Medium, "invalid or unassigned number");
    }
    match report.line_type {
        LineType::Unknown => (PhoneRiskTier::Medium, "unknown line type"),
        LineType::TollFree => (PhoneRiskTier::Medium, "toll-free line"),
        LineType::Mobile => (PhoneRiskTier::Low, "valid mobile"),
        _ => (PhoneRiskTier::Low, "valid fixed line"),
    }
}

pub fn breach_level(count: u32) -> RiskLevel {
    match count {
        0 => RiskLevel::Low,
        1..=3 => RiskLevel::Medium,
        4..=7 => RiskLevel::High,
        _ => RiskLevel::Critical,
    }
}

pub fn overall_level(score: u32) -> RiskLevel {
    match score {
        0..25 => RiskLevel::Low,
        25..50 => RiskLevel::Medium,
        50..75 => RiskLevel::High,
        _ => RiskLevel::Critical,
    }
}
