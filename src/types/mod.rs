//! Core domain types and the crate-wide error taxonomy.
//!
//! - [`input`] - validated investigation input (normalised email / E.164 phone)
//! - [`capability`] - the fixed set of capability ids
//! - [`outcome`] - per-probe outcomes and their status taxonomy
//! - [`payload`] - strongly typed per-capability payloads
//! - [`record`] - the schema-stable investigation record and derived findings

/// Capability identifiers.
pub mod capability;
/// Investigation input validation and normalisation.
pub mod input;
/// Probe outcomes and statuses.
pub mod outcome;
/// Per-capability payload schemas.
pub mod payload;
/// Investigation record, findings and risk assessment.
pub mod record;

pub use capability::Capability;
pub use input::InvestigationInput;
pub use outcome::{ProbeOutcome, ProbeStatus};
pub use payload::ProbePayload;
pub use record::{
    CorrelationFinding, FindingKind, InvestigationRecord, Provenance, RiskAssessment, RiskLevel,
    RunStatus, TimelineEvent,
};

// ============= Error Types =============

/// Externally visible failures of the investigation core.
///
/// Probe-level failures never surface here: they are contained in the
/// record as `error` / `timeout` slots.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {}", .0.join("; "))]
    InvalidInput(Vec<String>),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Investigation cancelled")]
    Cancelled,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<crate::utils::toml_config::ConfigError> for AppError {
    fn from(err: crate::utils::toml_config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
