use super::{Capability, ProbePayload};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal status of one probe.
///
/// `no_key` and `unavailable` are expected outcomes; only `timeout` and
/// `error` mark a run as partial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Ok,
    NoKey,
    Unavailable,
    Timeout,
    Error,
}

impl ProbeStatus {
    /// Whether this status flips the run to `partial`.
    pub fn is_failure(&self) -> bool {
        matches!(self, ProbeStatus::Timeout | ProbeStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeStatus::Ok => "ok",
            ProbeStatus::NoKey => "no_key",
            ProbeStatus::Unavailable => "unavailable",
            ProbeStatus::Timeout => "timeout",
            ProbeStatus::Error => "error",
        }
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of running (or declining to run) one capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub capability: Capability,
    pub status: ProbeStatus,
    /// Present iff `status == ok`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ProbePayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl ProbeOutcome {
    /// Slot placeholder for a capability that never ran.
    pub fn placeholder(capability: Capability) -> Self {
        Self {
            capability,
            status: ProbeStatus::Unavailable,
            payload: None,
            error_detail: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn ok(
        payload: ProbePayload,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            capability: payload.capability(),
            status: ProbeStatus::Ok,
            payload: Some(payload),
            error_detail: None,
            started_at: Some(started_at),
            finished_at: Some(finished_at),
        }
    }

    /// A non-ok outcome that was decided without running the probe.
    pub fn skipped(capability: Capability, status: ProbeStatus, detail: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            capability,
            status,
            payload: None,
            error_detail: Some(detail.into()),
            started_at: Some(now),
            finished_at: Some(now),
        }
    }

    /// A non-ok outcome of a probe that did run.
    pub fn failed(
        capability: Capability,
        status: ProbeStatus,
        detail: impl Into<String>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            capability,
            status,
            payload: None,
            error_detail: Some(detail.into()),
            started_at: Some(started_at),
            finished_at: Some(finished_at),
        }
    }

    /// Duration between start and finish, if both are known.
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_statuses() {
        assert!(ProbeStatus::Timeout.is_failure());
        assert!(ProbeStatus::Error.is_failure());
        assert!(!ProbeStatus::Ok.is_failure());
        assert!(!ProbeStatus::NoKey.is_failure());
        assert!(!ProbeStatus::Unavailable.is_failure());
    }

    #[test]
    fn test_placeholder_serializes_status_only() {
        let value = serde_json::to_value(ProbeOutcome::placeholder(Capability::Phone)).unwrap();
        assert_eq!(value, serde_json::json!({"capability": "phone", "status": "unavailable"}));
    }
}
