//! The investigation pipeline.
//!
//! # Module Structure
//!
//! - [`orchestrator`](crate::investigation::orchestrator) - bounded concurrent probe execution
//! - [`aggregator`](crate::investigation::aggregator) - schema-stable merge of probe outcomes
//! - [`correlator`](crate::investigation::correlator) - findings and the exposure timeline
//! - [`risk`](crate::investigation::risk) - breach and phone risk scoring
//!
//! # Pipeline
//!
//! ```ignore
//! let investigator = Investigator::from_config(config)?;
//! let input = InvestigationInput::new(Some("jane@acme.com"), None)?;
//! let record = investigator.investigate(input, None, CancellationToken::new()).await?;
//! println!("{:?}", record.run_status);
//! ```
//!
//! The returned record is frozen behind an [`Arc`]: storage, reporting and
//! any other consumer share it read-only.

pub mod aggregator;
pub mod correlator;
pub mod orchestrator;
pub mod risk;

pub use aggregator::Aggregator;
pub use correlator::Correlator;
pub use orchestrator::{CapabilityPolicy, Orchestrator, RunConfig};
pub use risk::RiskScorer;

use crate::probes::ProbeRegistry;
use crate::types::{AppError, Capability, InvestigationInput, InvestigationRecord, Result};
use crate::utils::credentials::{CredentialSource, EnvCredentials};
use crate::utils::toml_config::{FootprintConfig, HttpConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Build the HTTP transport shared by every probe of a run.
pub fn build_http_client(config: &HttpConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))
}

/// Runs whole investigations: orchestrate, correlate, score, freeze.
pub struct Investigator {
    orchestrator: Orchestrator,
    config: FootprintConfig,
    credentials: Arc<dyn CredentialSource>,
}

impl Investigator {
    pub fn new(
        registry: Arc<ProbeRegistry>,
        http: reqwest::Client,
        config: FootprintConfig,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        Self {
            orchestrator: Orchestrator::new(registry, http),
            config,
            credentials,
        }
    }

    /// Built-in probes, a fresh HTTP client and credentials from the environment.
    pub fn from_config(config: FootprintConfig) -> Result<Self> {
        let http = build_http_client(&config.http)?;
        let registry = Arc::new(ProbeRegistry::from_config(&config));
        Ok(Self::new(registry, http, config, Arc::new(EnvCredentials)))
    }

    pub fn registry(&self) -> &Arc<ProbeRegistry> {
        self.orchestrator.registry()
    }

    pub fn config(&self) -> &FootprintConfig {
        &self.config
    }

    /// The run configuration for one investigation.
    pub fn run_config(&self, only: Option<&[Capability]>) -> RunConfig {
        RunConfig::from_config(&self.config, self.credentials.as_ref(), only)
    }

    /// Investigate one target.
    ///
    /// `only` restricts the run to a subset of capabilities; the record still
    /// carries a slot for every capability.
    pub async fn investigate(
        &self,
        input: InvestigationInput,
        only: Option<&[Capability]>,
        cancel: CancellationToken,
    ) -> Result<Arc<InvestigationRecord>> {
        let run = self.run_config(only);
        self.investigate_with(input, &run, cancel).await
    }

    /// Investigate with an explicit run configuration.
    pub async fn investigate_with(
        &self,
        input: InvestigationInput,
        run: &RunConfig,
        cancel: CancellationToken,
    ) -> Result<Arc<InvestigationRecord>> {
        tracing::info!(
            email = input.email().unwrap_or("-"),
            phone = input.phone().unwrap_or("-"),
            capabilities = run.requested.len(),
            "starting investigation"
        );

        let record = self.orchestrator.run(&input, run, &cancel).await?;

        let correlator = Correlator::new(self.config.correlation.clone());
        let correlations = correlator.correlate(&record);
        let timeline = correlator.timeline(&record);
        let risk = RiskScorer::new(self.config.risk.clone()).score(&record);
        tracing::info!(
            run_status = ?record.run_status,
            findings = correlations.len(),
            timeline_events = timeline.len(),
            risk_score = risk.score,
            "investigation finished"
        );

        Ok(Arc::new(record.with_analysis(correlations, timeline, risk)))
    }
}
