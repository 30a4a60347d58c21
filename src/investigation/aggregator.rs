use crate::types::{
    Capability, InvestigationInput, InvestigationRecord, ProbeOutcome, ProbeStatus, RunStatus,
};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// Folds probe outcomes into a schema-stable record.
///
/// The fold is order-independent: outcomes are normalised, duplicates for a
/// capability are resolved by a total precedence order, and slots are keyed
/// by capability id. Merging any permutation of the same outcomes, with or
/// without repeats, produces an identical record.
pub struct Aggregator;

impl Aggregator {
    pub fn merge(
        target: InvestigationInput,
        created_at: DateTime<Utc>,
        outcomes: impl IntoIterator<Item = ProbeOutcome>,
    ) -> InvestigationRecord {
        let mut chosen: BTreeMap<Capability, ProbeOutcome> = BTreeMap::new();

        for outcome in outcomes.into_iter().map(normalize) {
            match chosen.entry(outcome.capability) {
                Entry::Vacant(slot) => {
                    slot.insert(outcome);
                }
                Entry::Occupied(mut slot) => {
                    if precedence(&outcome, slot.get()) == Ordering::Greater {
                        slot.insert(outcome);
                    }
                }
            }
        }

        let mut record = InvestigationRecord::empty(target, created_at);
        for outcome in chosen.into_values() {
            record.fill_slot(outcome);
        }
        record.run_status = run_status(&record);
        record
    }
}

/// `complete` unless some slot timed out or errored.
pub fn run_status(record: &InvestigationRecord) -> RunStatus {
    if record.slots().any(|o| o.status.is_failure()) {
        RunStatus::Partial
    } else {
        RunStatus::Complete
    }
}

/// Enforce "payload present iff ok" with a payload tagged for the slot.
fn normalize(mut outcome: ProbeOutcome) -> ProbeOutcome {
    if outcome.status == ProbeStatus::Ok {
        let matches = outcome
            .payload
            .as_ref()
            .is_some_and(|p| p.capability() == outcome.capability);
        if !matches {
            outcome.status = ProbeStatus::Error;
            outcome.payload = None;
            outcome.error_detail = Some("ok outcome without a matching payload".to_string());
        }
    } else {
        outcome.payload = None;
    }
    outcome
}

fn status_rank(status: ProbeStatus) -> u8 {
    match status {
        ProbeStatus::Ok => 4,
        ProbeStatus::Error => 3,
        ProbeStatus::Timeout => 2,
        ProbeStatus::NoKey => 1,
        ProbeStatus::Unavailable => 0,
    }
}

/// Total order over outcomes of one capability; the greater one is kept.
fn precedence(a: &ProbeOutcome, b: &ProbeOutcome) -> Ordering {
    status_rank(a.status)
        .cmp(&status_rank(b.status))
        .then_with(|| a.finished_at.cmp(&b.finished_at))
        .then_with(|| a.started_at.cmp(&b.started_at))
        .then_with(|| a.error_detail.cmp(&b.error_detail))
        .then_with(|| payload_key(a).cmp(&payload_key(b)))
}

fn payload_key(outcome: &ProbeOutcome) -> Option<String> {
    outcome
        .payload
        .as_ref()
        .and_then(|p| serde_json::to_string(p).ok())
}
