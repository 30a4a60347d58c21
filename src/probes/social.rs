//! Social platform presence checks for usernames derived from the email.

use crate::probes::{Probe, ProbeContext, ProbeError, username_candidates};
use crate::types::payload::{SocialProfile, SocialReport};
use crate::types::{Capability, InvestigationInput, ProbePayload};
use crate::utils::toml_config::ProbeConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::BTreeMap;

const DEFAULT_MAX_CANDIDATES: usize = 3;

/// Platform name -> profile URL template, `{}` is replaced by the username.
pub fn default_platforms() -> BTreeMap<String, String> {
    [
        ("github", "https://github.com/{}"),
        ("gitlab", "https://gitlab.com/{}"),
        ("keybase", "https://keybase.io/{}"),
        ("medium", "https://medium.com/@{}"),
        ("reddit", "https://www.reddit.com/user/{}"),
        ("tiktok", "https://www.tiktok.com/@{}"),
    ]
    .into_iter()
    .map(|(name, template)| (name.to_string(), template.to_string()))
    .collect()
}

pub struct SocialProbe {
    platforms: BTreeMap<String, String>,
    max_candidates: usize,
}

impl SocialProbe {
    pub fn new(platforms: BTreeMap<String, String>) -> Self {
        Self {
            platforms,
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        let platforms = config
            .extra_string_table("platforms")
            .filter(|p| !p.is_empty())
            .unwrap_or_else(default_platforms);
        let mut probe = Self::new(platforms);
        if let Some(max) = config
            .extra
            .get("max_candidates")
            .and_then(|v| v.as_integer())
            .and_then(|v| usize::try_from(v).ok())
        {
            probe.max_candidates = max.max(1);
        }
        probe
    }

    async fn check(
        &self,
        ctx: &ProbeContext,
        platform: &str,
        template: &str,
        username: &str,
    ) -> Result<SocialProfile, ProbeError> {
        let url = template.replace("{}", username);
        let response = ctx.send(ctx.http().get(&url)).await?;
        let status = response.status();

        Ok(SocialProfile {
            platform: platform.to_string(),
            username: username.to_string(),
            url,
            exists: status == StatusCode::OK,
            http_status: Some(status.as_u16()),
        })
    }
}

#[async_trait]
impl Probe for SocialProbe {
    fn capability(&self) -> Capability {
        Capability::Social
    }

    fn description(&self) -> &str {
        "Profile existence on social platforms for usernames derived from the email"
    }

    fn applies_to(&self, input: &InvestigationInput) -> bool {
        input.email_local_part().is_some()
    }

    async fn execute(&self, ctx: &ProbeContext) -> Result<ProbePayload, ProbeError> {
        let local_part = ctx
            .input()
            .email_local_part()
            .ok_or_else(|| ProbeError::Unavailable("no email local part".to_string()))?;

        let mut candidates = username_candidates(local_part);
        candidates.truncate(self.max_candidates);

        let mut report = SocialReport {
            candidate_usernames: candidates.clone(),
            profiles: Vec::new(),
        };
        let mut last_error = None;

        for username in &candidates {
            for (platform, template) in &self.platforms {
                match self.check(ctx, platform, template, username).await {
                    Ok(profile) => report.profiles.push(profile),
                    Err(ProbeError::Cancelled) => return Err(ProbeError::Cancelled),
                    Err(e) => {
                        tracing::debug!(
                            platform = %platform,
                            username = %username,
                            error = %e,
                            "profile check failed"
                        );
                        report.profiles.push(SocialProfile {
                            platform: platform.clone(),
                            username: username.clone(),
                            url: template.replace("{}", username),
                            exists: false,
                            http_status: None,
                        });
                        last_error = Some(e);
                    }
                }
            }
        }

        // Every single check failing means the platforms were unreachable, not absent.
        if let Some(e) = last_error
            && report.profiles.iter().all(|p| p.http_status.is_none())
        {
            return Err(e);
        }

        Ok(ProbePayload::Social(report))
    }
}
