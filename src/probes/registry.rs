use crate::probes::Probe;
use crate::types::Capability;
use crate::utils::toml_config::FootprintConfig;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Maps capability ids to probe instances.
///
/// A capability that is disabled in configuration is simply never
/// registered; the orchestrator reports it as `unavailable` if requested.
pub struct ProbeRegistry {
    probes: BTreeMap<Capability, Arc<dyn Probe>>,
}

impl Default for ProbeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self {
            probes: BTreeMap::new(),
        }
    }

    /// Create a registry with every built-in probe whose feature flag is on.
    pub fn from_config(config: &FootprintConfig) -> Self {
        use crate::probes::{
            breach::BreachProbe, deliverability::DeliverabilityProbe, dns_whois::DnsWhoisProbe,
            email_registration::EmailRegistrationProbe, external_tool::ExternalToolProbe,
            phone::PhoneProbe, professional::ProfessionalProbe, reputation::ReputationProbe,
            search::SearchProbe, social::SocialProbe,
        };

        let mut registry = Self::new();

        for capability in Capability::ALL {
            let probe_config = config.probe(capability);
            if !probe_config.enabled {
                tracing::debug!(capability = %capability, "capability disabled, not registering");
                continue;
            }

            let probe: Arc<dyn Probe> = match capability {
                Capability::Breach => Arc::new(BreachProbe::from_config(&probe_config)),
                Capability::Deliverability => {
                    Arc::new(DeliverabilityProbe::from_config(&probe_config))
                }
                Capability::DnsWhois => Arc::new(DnsWhoisProbe::from_config(&probe_config)),
                Capability::EmailRegistration => {
                    Arc::new(EmailRegistrationProbe::from_config(&probe_config))
                }
                Capability::ExternalTool => {
                    Arc::new(ExternalToolProbe::from_config(&probe_config))
                }
                Capability::Phone => Arc::new(PhoneProbe::from_config(&probe_config)),
                Capability::Professional => {
                    Arc::new(ProfessionalProbe::from_config(&probe_config))
                }
                Capability::Reputation => Arc::new(ReputationProbe::from_config(&probe_config)),
                Capability::Search => Arc::new(SearchProbe::from_config(&probe_config)),
                Capability::Social => Arc::new(SocialProbe::from_config(&probe_config)),
            };
            registry.register(probe);
        }

        registry
    }

    /// Register a probe, replacing any previous probe for the same capability.
    pub fn register(&mut self, probe: Arc<dyn Probe>) {
        self.probes.insert(probe.capability(), probe);
    }

    /// Registered capability ids in capability-id order.
    pub fn capabilities(&self) -> Vec<Capability> {
        self.probes.keys().copied().collect()
    }

    pub fn resolve(&self, capability: Capability) -> Option<Arc<dyn Probe>> {
        self.probes.get(&capability).cloned()
    }

    /// Check if a probe is registered for the capability
    pub fn has_probe(&self, capability: Capability) -> bool {
        self.probes.contains_key(&capability)
    }

    /// (capability, description) pairs for display.
    pub fn describe(&self) -> Vec<(Capability, String)> {
        self.probes
            .iter()
            .map(|(c, p)| (*c, p.description().to_string()))
            .collect()
    }
}
