//! Mock probes for testing.
//!
//! A [`MockProbe`] returns a canned payload for its capability after an
//! optional delay, or fails in a chosen way. Shared [`Gauge`]s let tests
//! observe how many probes were in flight at once.

use async_trait::async_trait;
use footprint::types::payload::{
    BreachReport, DeliverabilityReport, DnsWhoisReport, EmailRegistrationReport,
    ExternalToolReport, PhoneReport, ProfessionalReport, ReputationReport, SearchReport,
    SocialReport,
};
use footprint::{Capability, InvestigationInput, Probe, ProbeContext, ProbeError, ProbePayload};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What a mock does once its delay has elapsed.
#[derive(Debug, Clone)]
pub enum Behavior {
    Succeed(ProbePayload),
    Fail(String),
    Unavailable(String),
    Panic(&'static str),
    /// Returns a payload tagged for another capability.
    WrongPayload(ProbePayload),
}

/// Which input field the mock needs.
#[derive(Debug, Clone, Copy)]
pub enum Needs {
    Anything,
    Email,
    Phone,
}

/// Tracks current and peak concurrency across mocks.
#[derive(Debug, Default)]
pub struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
    started: AtomicUsize,
}

impl Gauge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    fn enter(self: &Arc<Self>) -> GaugeGuard {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        GaugeGuard(self.clone())
    }
}

/// Decrements on drop, including when the probe future is aborted.
struct GaugeGuard(Arc<Gauge>);

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct MockProbe {
    capability: Capability,
    behavior: Behavior,
    delay: Duration,
    needs: Needs,
    requires_credential: bool,
    gauge: Option<Arc<Gauge>>,
}

impl MockProbe {
    /// A probe that immediately succeeds with an empty report.
    pub fn ok(capability: Capability) -> Self {
        Self::with_payload(sample_payload(capability))
    }

    pub fn with_payload(payload: ProbePayload) -> Self {
        Self {
            capability: payload.capability(),
            behavior: Behavior::Succeed(payload),
            delay: Duration::ZERO,
            needs: Needs::Anything,
            requires_credential: false,
            gauge: None,
        }
    }

    pub fn failing(capability: Capability, message: &str) -> Self {
        Self {
            behavior: Behavior::Fail(message.to_string()),
            ..Self::ok(capability)
        }
    }

    pub fn unavailable(capability: Capability, message: &str) -> Self {
        Self {
            behavior: Behavior::Unavailable(message.to_string()),
            ..Self::ok(capability)
        }
    }

    pub fn panicking(capability: Capability, message: &'static str) -> Self {
        Self {
            behavior: Behavior::Panic(message),
            ..Self::ok(capability)
        }
    }

    pub fn wrong_payload(capability: Capability, payload: ProbePayload) -> Self {
        Self {
            behavior: Behavior::WrongPayload(payload),
            ..Self::ok(capability)
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn needing(mut self, needs: Needs) -> Self {
        self.needs = needs;
        self
    }

    pub fn requiring_credential(mut self) -> Self {
        self.requires_credential = true;
        self
    }

    pub fn tracked(mut self, gauge: &Arc<Gauge>) -> Self {
        self.gauge = Some(gauge.clone());
        self
    }

    pub fn into_arc(self) -> Arc<dyn Probe> {
        Arc::new(self)
    }
}

#[async_trait]
impl Probe for MockProbe {
    fn capability(&self) -> Capability {
        self.capability
    }

    fn description(&self) -> &str {
        "mock probe"
    }

    fn requires_credential(&self) -> bool {
        self.requires_credential
    }

    fn applies_to(&self, input: &InvestigationInput) -> bool {
        match self.needs {
            Needs::Anything => true,
            Needs::Email => input.email().is_some(),
            Needs::Phone => input.phone().is_some(),
        }
    }

    async fn execute(&self, ctx: &ProbeContext) -> Result<ProbePayload, ProbeError> {
        let _guard = self.gauge.as_ref().map(|g| g.enter());

        if self.requires_credential {
            ctx.require_credential()?;
        }

        if !self.delay.is_zero() {
            tokio::select! {
                _ = ctx.cancellation().cancelled() => return Err(ProbeError::Cancelled),
                _ = tokio::time::sleep(self.delay) => {}
            }
        }

        match &self.behavior {
            Behavior::Succeed(payload) | Behavior::WrongPayload(payload) => Ok(payload.clone()),
            Behavior::Fail(message) => Err(ProbeError::Parse(message.clone())),
            Behavior::Unavailable(message) => Err(ProbeError::Unavailable(message.clone())),
            Behavior::Panic(message) => panic!("{}", message),
        }
    }
}

/// An empty, well-formed payload for a capability.
pub fn sample_payload(capability: Capability) -> ProbePayload {
    match capability {
        Capability::Breach => ProbePayload::Breach(BreachReport::default()),
        Capability::Deliverability => {
            ProbePayload::Deliverability(DeliverabilityReport::default())
        }
        Capability::DnsWhois => ProbePayload::DnsWhois(DnsWhoisReport::default()),
        Capability::EmailRegistration => {
            ProbePayload::EmailRegistration(EmailRegistrationReport::default())
        }
        Capability::ExternalTool => ProbePayload::ExternalTool(ExternalToolReport::default()),
        Capability::Phone => ProbePayload::Phone(PhoneReport::default()),
        Capability::Professional => ProbePayload::Professional(ProfessionalReport::default()),
        Capability::Reputation => ProbePayload::Reputation(ReputationReport::default()),
        Capability::Search => ProbePayload::Search(SearchReport::default()),
        Capability::Social => ProbePayload::Social(SocialReport::default()),
    }
}
