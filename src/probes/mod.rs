//! Probe capability contract and built-in probe adapters
//!
//! A probe is one asynchronous unit of work that produces a typed payload for
//! a single [`Capability`], or a structured failure. The orchestrator treats
//! every probe uniformly through the [`Probe`] trait.
//!
//! # Module Structure
//!
//! - [`registry`](crate::probes::registry) - capability id -> probe instance
//! - [`pacer`](crate::probes::pacer) - per-capability request spacing
//! - [`breach`], [`deliverability`], [`dns_whois`], [`email_registration`],
//!   [`external_tool`], [`phone`], [`professional`], [`reputation`], [`search`],
//!   [`social`] - thin adapters over public sources and local tools
//!
//! # Writing a probe
//!
//! ```ignore
//! #[async_trait]
//! impl Probe for MyProbe {
//!     fn capability(&self) -> Capability { Capability::Search }
//!     fn description(&self) -> &str { "my search" }
//!     fn applies_to(&self, input: &InvestigationInput) -> bool { input.email().is_some() }
//!     async fn execute(&self, ctx: &ProbeContext) -> Result<ProbePayload, ProbeError> {
//!         let response = ctx.send(ctx.http().get("https://example.com")).await?;
//!         // ...
//!     }
//! }
//! ```
//!
//! All outbound HTTP should go through [`ProbeContext::send`], which applies
//! the capability's request spacing and aborts when the run is cancelled.

/// HaveIBeenPwned breach lookup.
pub mod breach;
/// Hunter email verification.
pub mod deliverability;
/// DNS-over-HTTPS and RDAP lookups for the email domain.
pub mod dns_whois;
/// Email registration checks through a local socialscan-compatible CLI.
pub mod email_registration;
/// Locally installed username enumeration CLI.
pub mod external_tool;
/// Request spacing within one capability.
pub mod pacer;
/// Offline phone number analysis with optional carrier lookup.
pub mod phone;
/// Professional platform presence and employer signals.
pub mod professional;
/// Probe registry.
pub mod registry;
/// Email reputation lookup.
pub mod reputation;
/// Search-engine dorking.
pub mod search;
/// Social platform presence checks.
pub mod social;

pub use pacer::RequestPacer;
pub use registry::ProbeRegistry;

use crate::types::{Capability, InvestigationInput, ProbePayload};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Uniform async contract every capability implements.
#[async_trait]
pub trait Probe: Send + Sync {
    fn capability(&self) -> Capability;

    fn description(&self) -> &str;

    /// Whether the probe cannot run without a credential.
    fn requires_credential(&self) -> bool {
        false
    }

    /// Whether the input carries the field this probe works from.
    fn applies_to(&self, input: &InvestigationInput) -> bool;

    async fn execute(&self, ctx: &ProbeContext) -> Result<ProbePayload, ProbeError>;
}

/// Failures a probe may report.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {source_name}")]
    UnexpectedStatus { source_name: String, status: u16 },

    #[error("malformed response: {0}")]
    Parse(String),

    #[error("credential required but not configured")]
    MissingCredential,

    #[error("{0}")]
    Unavailable(String),

    #[error("probe cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An API key or token; never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Everything one probe execution may touch.
///
/// Owned per execution; the HTTP client is shared read-only by all probes.
#[derive(Debug, Clone)]
pub struct ProbeContext {
    input: Arc<InvestigationInput>,
    http: reqwest::Client,
    credential: Option<Credential>,
    pacer: Arc<RequestPacer>,
    cancel: CancellationToken,
}

impl ProbeContext {
    pub fn new(
        input: Arc<InvestigationInput>,
        http: reqwest::Client,
        credential: Option<Credential>,
        pacer: RequestPacer,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            input,
            http,
            credential,
            pacer: Arc::new(pacer),
            cancel,
        }
    }

    pub fn input(&self) -> &InvestigationInput {
        &self.input
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The configured credential, if any.
    pub fn credential(&self) -> Option<&str> {
        self.credential.as_ref().map(Credential::expose)
    }

    /// The configured credential, or [`ProbeError::MissingCredential`].
    pub fn require_credential(&self) -> Result<&str, ProbeError> {
        self.credential().ok_or(ProbeError::MissingCredential)
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Wait for this capability's next request slot.
    pub async fn pace(&self) -> Result<(), ProbeError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(ProbeError::Cancelled),
            _ = self.pacer.wait() => Ok(()),
        }
    }

    /// Send a request after pacing, racing it against cancellation.
    pub async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ProbeError> {
        self.pace().await?;
        tokio::select! {
            _ = self.cancel.cancelled() => Err(ProbeError::Cancelled),
            response = request.send() => Ok(response?),
        }
    }
}

/// Join path segments onto a base URL, percent-encoding each segment.
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> Result<reqwest::Url, ProbeError> {
    let mut url = reqwest::Url::parse(base)
        .map_err(|e| ProbeError::Parse(format!("invalid base URL '{}': {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| ProbeError::Parse(format!("base URL '{}' cannot take a path", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Derive plausible usernames from an email local part.
///
/// The local part itself comes first, followed by separator-stripped and
/// separator-swapped variants, without duplicates.
pub(crate) fn username_candidates(local_part: &str) -> Vec<String> {
    let base = local_part
        .split('+')
        .next()
        .unwrap_or(local_part)
        .to_lowercase();
    let variants = [
        base.clone(),
        base.replace(['.', '_', '-'], ""),
        base.replace('.', "_"),
        base.replace('_', "."),
    ];

    let mut out: Vec<String> = Vec::new();
    for v in variants {
        if !v.is_empty() && !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_candidates() {
        assert_eq!(
            username_candidates("Jane.Doe+news"),
            vec!["jane.doe", "janedoe", "jane_doe"]
        );
        assert_eq!(username_candidates("jdoe"), vec!["jdoe"]);
        assert_eq!(
            username_candidates("j_doe"),
            vec!["j_doe", "jdoe", "j.doe"]
        );
    }

    #[test]
    fn test_endpoint_joins_and_encodes_segments() {
        let url = endpoint("https://api.example.com/v3/", &["account", "a b@x.com"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v3/account/a%20b@x.com");

        let url = endpoint("http://127.0.0.1:8080", &["users", "jdoe"]).unwrap();
        assert_eq!(url.path(), "/users/jdoe");

        assert!(endpoint("not a url", &["x"]).is_err());
    }

    #[test]
    fn test_credential_is_redacted() {
        let credential = Credential::new("super-secret");
        assert_eq!(format!("{:?}", credential), "Credential(***)");
        assert_eq!(credential.expose(), "super-secret");
    }
}
