//! # footprint - identity signal investigation
//!
//! Concurrent collection of publicly derivable identity signals for an
//! email address and/or phone number, merged into one schema-stable record
//! and correlated across sources.
//!
//! ## Overview
//!
//! footprint can be used in two ways:
//!
//! 1. **As a CLI** - Run the `footprint` binary
//! 2. **As a library** - Embed the pipeline and plug in your own probes
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use footprint::{FootprintConfig, InvestigationInput, Investigator};
//! use tokio_util::sync::CancellationToken;
//!
//! let investigator = Investigator::from_config(FootprintConfig::default())?;
//! let input = InvestigationInput::new(Some("jane@acme.com"), None)?;
//! let record = investigator.investigate(input, None, CancellationToken::new()).await?;
//!
//! for finding in &record.correlations {
//!     println!("{:?} {:.2} {}", finding.kind, finding.confidence, finding.description);
//! }
//! ```
//!
//! ### Custom Probes
//!
//! ```rust,ignore
//! use footprint::{Orchestrator, ProbeRegistry, RunConfig};
//! use std::sync::Arc;
//!
//! let mut registry = ProbeRegistry::new();
//! registry.register(Arc::new(MyBreachProbe::new()));
//!
//! let orchestrator = Orchestrator::new(Arc::new(registry), reqwest::Client::new());
//! let record = orchestrator.run(&input, &RunConfig::new(4), &cancel).await?;
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Inputs, outcomes, payloads, records and errors
//! - [`probes`] - The probe contract, registry and built-in adapters
//! - [`investigation`] - Orchestrator, aggregator, correlator and risk scorer
//! - [`storage`] - Record sinks
//! - [`utils`] - Configuration, credentials and logging
//! - [`cli`] - Command-line parsing and output

#![warn(rustdoc::missing_crate_level_docs)]

/// Command-line interface.
pub mod cli;
/// The investigation pipeline.
pub mod investigation;
/// Probe contract, registry and built-in adapters.
pub mod probes;
/// Record persistence.
pub mod storage;
/// Core types (inputs, outcomes, records, errors).
pub mod types;
/// Configuration, credentials and logging.
pub mod utils;

// Re-export commonly used types
pub use investigation::{
    Aggregator, CapabilityPolicy, Correlator, Investigator, Orchestrator, RiskScorer, RunConfig,
};
pub use probes::{Probe, ProbeContext, ProbeError, ProbeRegistry};
pub use storage::{JsonFileSink, RecordSink};
pub use types::{
    AppError, Capability, CorrelationFinding, InvestigationInput, InvestigationRecord,
    ProbeOutcome, ProbePayload, ProbeStatus, Result, RiskAssessment, RunStatus,
};
pub use utils::toml_config::FootprintConfig;
