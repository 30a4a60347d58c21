//! Concurrent probe scheduling.
//!
//! The orchestrator plans every requested capability in capability-id order,
//! short-circuits the ones that cannot run, and executes the rest on a
//! [`JoinSet`] gated by a semaphore. Each probe runs under its own timeout
//! with its own cancellation token, and panics are contained, so no probe
//! can abort or starve its siblings.

use crate::investigation::aggregator::Aggregator;
use crate::probes::{Credential, Probe, ProbeContext, ProbeError, ProbeRegistry, RequestPacer};
use crate::types::{
    AppError, Capability, InvestigationInput, InvestigationRecord, ProbeOutcome, ProbeStatus,
    Result,
};
use crate::utils::credentials::CredentialSource;
use crate::utils::toml_config::FootprintConfig;
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{Instant, timeout};
use tokio_util::sync::CancellationToken;

/// Execution limits and credential for one capability.
#[derive(Debug, Clone)]
pub struct CapabilityPolicy {
    /// Bound on the probe's execution, excluding time spent queued for a slot.
    pub timeout: Duration,
    /// Minimum spacing between the probe's own sub-requests.
    pub request_spacing: Duration,
    pub credential: Option<Credential>,
}

impl Default for CapabilityPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            request_spacing: Duration::ZERO,
            credential: None,
        }
    }
}

/// Explicit per-run configuration.
///
/// Everything a run needs to know about flags and credentials is carried
/// here, so concurrent runs with different settings never interfere.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub max_concurrency: usize,
    pub requested: BTreeSet<Capability>,
    pub policies: BTreeMap<Capability, CapabilityPolicy>,
    pub default_policy: CapabilityPolicy,
}

impl RunConfig {
    /// Request every capability with default policies.
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency,
            requested: Capability::ALL.into_iter().collect(),
            policies: BTreeMap::new(),
            default_policy: CapabilityPolicy::default(),
        }
    }

    /// Restrict the run to the given capabilities.
    pub fn with_capabilities(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.requested = capabilities.into_iter().collect();
        self
    }

    pub fn with_policy(mut self, capability: Capability, policy: CapabilityPolicy) -> Self {
        self.policies.insert(capability, policy);
        self
    }

    pub fn with_default_policy(mut self, policy: CapabilityPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    /// Build from file configuration and a credential source.
    ///
    /// `only` narrows the requested set; `None` requests every capability,
    /// so disabled ones surface as `unavailable` rather than vanishing.
    pub fn from_config(
        config: &FootprintConfig,
        credentials: &dyn CredentialSource,
        only: Option<&[Capability]>,
    ) -> Self {
        let requested: BTreeSet<Capability> = match only {
            Some(caps) => caps.iter().copied().collect(),
            None => Capability::ALL.into_iter().collect(),
        };

        let policies = requested
            .iter()
            .map(|&capability| {
                let credential = config
                    .probe(capability)
                    .api_key_env
                    .as_deref()
                    .and_then(|name| credentials.lookup(name));
                let policy = CapabilityPolicy {
                    timeout: config.probe_timeout(capability),
                    request_spacing: config.probe_request_spacing(capability),
                    credential,
                };
                (capability, policy)
            })
            .collect();

        Self {
            max_concurrency: config.orchestrator.max_concurrency,
            requested,
            policies,
            default_policy: CapabilityPolicy {
                timeout: Duration::from_secs(config.orchestrator.default_timeout_secs),
                request_spacing: Duration::from_millis(
                    config.orchestrator.default_request_spacing_ms,
                ),
                credential: None,
            },
        }
    }

    pub fn policy(&self, capability: Capability) -> &CapabilityPolicy {
        self.policies.get(&capability).unwrap_or(&self.default_policy)
    }
}

/// Runs the probes of one investigation concurrently.
pub struct Orchestrator {
    registry: Arc<ProbeRegistry>,
    http: reqwest::Client,
}

impl Orchestrator {
    pub fn new(registry: Arc<ProbeRegistry>, http: reqwest::Client) -> Self {
        Self { registry, http }
    }

    pub fn registry(&self) -> &Arc<ProbeRegistry> {
        &self.registry
    }

    /// Run every requested capability and aggregate the outcomes.
    pub async fn run(
        &self,
        input: &InvestigationInput,
        run: &RunConfig,
        cancel: &CancellationToken,
    ) -> Result<InvestigationRecord> {
        let created_at = Utc::now();
        let outcomes = self.collect(input, run, cancel).await?;
        Ok(Aggregator::merge(input.clone(), created_at, outcomes))
    }

    /// Run every requested capability and return one outcome per capability,
    /// in capability-id order.
    ///
    /// Fails only when no concurrency slot can be allocated or the run is
    /// cancelled; probe failures are reported in their outcomes.
    pub async fn collect(
        &self,
        input: &InvestigationInput,
        run: &RunConfig,
        cancel: &CancellationToken,
    ) -> Result<Vec<ProbeOutcome>> {
        if run.max_concurrency == 0 {
            return Err(AppError::ResourceExhausted(
                "max_concurrency is 0, no probe can be scheduled".to_string(),
            ));
        }
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let input = Arc::new(input.clone());
        let semaphore = Arc::new(Semaphore::new(run.max_concurrency));
        let run_token = cancel.child_token();

        let mut outcomes = Vec::with_capacity(run.requested.len());
        let mut pending = BTreeSet::new();
        let mut tasks: JoinSet<ProbeOutcome> = JoinSet::new();

        for &capability in &run.requested {
            let Some(probe) = self.registry.resolve(capability) else {
                outcomes.push(ProbeOutcome::skipped(
                    capability,
                    ProbeStatus::Unavailable,
                    "no probe registered for this capability",
                ));
                continue;
            };
            let policy = run.policy(capability);

            if probe.requires_credential() && policy.credential.is_none() {
                outcomes.push(ProbeOutcome::skipped(
                    capability,
                    ProbeStatus::NoKey,
                    "credential required but not configured",
                ));
                continue;
            }
            if !probe.applies_to(&input) {
                outcomes.push(ProbeOutcome::skipped(
                    capability,
                    ProbeStatus::Unavailable,
                    "input lacks the field this capability works from",
                ));
                continue;
            }

            let ctx = ProbeContext::new(
                input.clone(),
                self.http.clone(),
                policy.credential.clone(),
                RequestPacer::new(policy.request_spacing),
                run_token.child_token(),
            );
            tracing::debug!(
                capability = %capability,
                timeout_ms = policy.timeout.as_millis() as u64,
                "scheduling probe"
            );

            pending.insert(capability);
            tasks.spawn(execute_probe(probe, ctx, semaphore.clone(), policy.timeout));
        }

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    run_token.cancel();
                    tasks.abort_all();
                    while tasks.join_next().await.is_some() {}
                    tracing::warn!(in_flight = pending.len(), "investigation cancelled");
                    return Err(AppError::Cancelled);
                }
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok(outcome)) => {
                        pending.remove(&outcome.capability);
                        outcomes.push(outcome);
                    }
                    Some(Err(e)) => tracing::error!(error = %e, "probe task failed to join"),
                },
            }
        }

        for capability in pending {
            outcomes.push(ProbeOutcome::skipped(
                capability,
                ProbeStatus::Error,
                "probe task ended without an outcome",
            ));
        }

        outcomes.sort_by_key(|o| o.capability);
        Ok(outcomes)
    }
}

fn status_for(error: &ProbeError) -> ProbeStatus {
    match error {
        ProbeError::MissingCredential => ProbeStatus::NoKey,
        ProbeError::Unavailable(_) => ProbeStatus::Unavailable,
        _ => ProbeStatus::Error,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Run one probe to a terminal outcome. Never panics, never fails.
async fn execute_probe(
    probe: Arc<dyn Probe>,
    ctx: ProbeContext,
    semaphore: Arc<Semaphore>,
    limit: Duration,
) -> ProbeOutcome {
    let capability = probe.capability();

    let _permit = match semaphore.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            return ProbeOutcome::skipped(
                capability,
                ProbeStatus::Error,
                "concurrency limiter closed",
            );
        }
    };

    let started_at = Utc::now();
    let clock = Instant::now();
    let result = timeout(limit, AssertUnwindSafe(probe.execute(&ctx)).catch_unwind()).await;
    let finished_at = Utc::now();

    let failed = |status: ProbeStatus, detail: String| {
        ProbeOutcome::failed(capability, status, detail, started_at, finished_at)
    };

    let outcome = match result {
        Ok(Ok(Ok(payload))) if payload.capability() == capability => {
            ProbeOutcome::ok(payload, started_at, finished_at)
        }
        Ok(Ok(Ok(payload))) => failed(
            ProbeStatus::Error,
            format!("probe returned a '{}' payload", payload.capability()),
        ),
        Ok(Ok(Err(e))) => failed(status_for(&e), e.to_string()),
        Ok(Err(panic)) => failed(
            ProbeStatus::Error,
            format!("probe panicked: {}", panic_message(panic.as_ref())),
        ),
        Err(_) => {
            ctx.cancellation().cancel();
            failed(
                ProbeStatus::Timeout,
                format!("exceeded time limit of {} ms", limit.as_millis()),
            )
        }
    };

    tracing::info!(
        capability = %capability,
        status = %outcome.status,
        elapsed_ms = clock.elapsed().as_millis() as u64,
        "probe finished"
    );

    outcome
}
