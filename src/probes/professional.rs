//! Professional presence: employer hints and developer-platform profiles.
//!
//! The employer is inferred from a corporate email domain. Profiles come from
//! the GitHub REST API, first by searching for the address itself and then by
//! trying usernames derived from the local part. A `company` field on a found
//! profile adds another organization signal.

use crate::probes::{Probe, ProbeContext, ProbeError, endpoint, username_candidates};
use crate::types::payload::{ProfessionalProfile, ProfessionalReport};
use crate::types::{Capability, InvestigationInput, ProbePayload};
use crate::utils::toml_config::ProbeConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

const DEFAULT_MAX_CANDIDATES: usize = 2;

const FREE_MAIL_DOMAINS: &[&str] = &[
    "163.com",
    "aol.com",
    "fastmail.com",
    "gmail.com",
    "gmx.com",
    "gmx.de",
    "googlemail.com",
    "hey.com",
    "hotmail.com",
    "icloud.com",
    "live.com",
    "mac.com",
    "mail.com",
    "me.com",
    "msn.com",
    "outlook.com",
    "proton.me",
    "protonmail.com",
    "qq.com",
    "tutanota.com",
    "web.de",
    "yahoo.com",
    "yandex.com",
    "yandex.ru",
    "ymail.com",
    "zoho.com",
];

const TWO_PART_SUFFIXES: &[&str] = &[
    "ac.uk", "co.in", "co.jp", "co.nz", "co.uk", "co.za", "com.au", "com.br", "com.cn", "org.uk",
];

pub fn is_free_mail(domain: &str) -> bool {
    FREE_MAIL_DOMAINS.contains(&domain)
}

/// Organization name implied by a corporate email domain.
///
/// `jane@mail.acme-labs.co.uk` yields `Acme Labs`; free-mail domains yield
/// nothing.
pub fn organization_from_domain(domain: &str) -> Option<String> {
    let domain = domain.to_lowercase();
    if is_free_mail(&domain) {
        return None;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    let suffix_len = if labels.len() >= 3
        && TWO_PART_SUFFIXES.contains(&labels[labels.len() - 2..].join(".").as_str())
    {
        2
    } else {
        1
    };
    let name = labels.len().checked_sub(suffix_len + 1).map(|i| labels[i])?;

    let words: Vec<String> = name
        .split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();

    (!words.is_empty()).then(|| words.join(" "))
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
    html_url: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubSearch {
    #[serde(default)]
    items: Vec<GitHubSearchItem>,
}

#[derive(Debug, Deserialize)]
struct GitHubSearchItem {
    login: String,
}

fn clean_company(company: Option<String>) -> Option<String> {
    company
        .map(|c| c.trim().trim_start_matches('@').trim().to_string())
        .filter(|c| !c.is_empty())
}

pub struct ProfessionalProbe {
    base_url: String,
    max_candidates: usize,
}

impl ProfessionalProbe {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        let mut probe = Self::new(config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL));
        if let Some(max) = config
            .extra
            .get("max_candidates")
            .and_then(|v| v.as_integer())
            .and_then(|v| usize::try_from(v).ok())
        {
            probe.max_candidates = max;
        }
        probe
    }

    fn request(&self, ctx: &ProbeContext, url: reqwest::Url) -> reqwest::RequestBuilder {
        let request = ctx
            .http()
            .get(url)
            .header("accept", "application/vnd.github+json");
        match ctx.credential() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn search_by_email(
        &self,
        ctx: &ProbeContext,
        email: &str,
    ) -> Result<Vec<String>, ProbeError> {
        let mut url = endpoint(&self.base_url, &["search", "users"])?;
        url.query_pairs_mut()
            .append_pair("q", &format!("{} in:email", email));

        let response = ctx.send(self.request(ctx, url)).await?;
        if !response.status().is_success() {
            return Err(ProbeError::UnexpectedStatus {
                source_name: "github search".to_string(),
                status: response.status().as_u16(),
            });
        }

        let search: GitHubSearch = serde_json::from_str(&response.text().await?)
            .map_err(|e| ProbeError::Parse(format!("github search: {}", e)))?;
        Ok(search.items.into_iter().map(|i| i.login).collect())
    }

    async fn lookup_user(
        &self,
        ctx: &ProbeContext,
        username: &str,
    ) -> Result<ProfessionalProfile, ProbeError> {
        let url = endpoint(&self.base_url, &["users", username])?;
        let response = ctx.send(self.request(ctx, url)).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(ProfessionalProfile {
                platform: "github".to_string(),
                username: username.to_string(),
                url: format!("https://github.com/{}", username),
                exists: false,
                display_name: None,
                organization: None,
                location: None,
            }),
            status if status.is_success() => {
                let user: GitHubUser = serde_json::from_str(&response.text().await?)
                    .map_err(|e| ProbeError::Parse(format!("github user: {}", e)))?;
                Ok(ProfessionalProfile {
                    platform: "github".to_string(),
                    username: user.login.to_lowercase(),
                    url: user.html_url,
                    exists: true,
                    display_name: user.name.filter(|n| !n.trim().is_empty()),
                    organization: clean_company(user.company),
                    location: user
                        .location
                        .map(|l| l.trim().to_string())
                        .filter(|l| !l.is_empty()),
                })
            }
            status => Err(ProbeError::UnexpectedStatus {
                source_name: "github".to_string(),
                status: status.as_u16(),
            }),
        }
    }
}

#[async_trait]
impl Probe for ProfessionalProbe {
    fn capability(&self) -> Capability {
        Capability::Professional
    }

    fn description(&self) -> &str {
        "Employer hints from the email domain and developer profiles (GitHub)"
    }

    fn applies_to(&self, input: &InvestigationInput) -> bool {
        input.email().is_some()
    }

    async fn execute(&self, ctx: &ProbeContext) -> Result<ProbePayload, ProbeError> {
        let input = ctx.input();
        let (Some(email), Some(local_part), Some(domain)) =
            (input.email(), input.email_local_part(), input.email_domain())
        else {
            return Err(ProbeError::Unavailable("no email to look up".to_string()));
        };

        let mut report = ProfessionalReport::default();
        let mut last_error = None;

        if let Some(org) = organization_from_domain(domain) {
            report.organizations.push(org);
        }

        let mut handles = match self.search_by_email(ctx, email).await {
            Ok(logins) => logins.into_iter().map(|l| l.to_lowercase()).collect(),
            Err(ProbeError::Cancelled) => return Err(ProbeError::Cancelled),
            Err(e) => {
                tracing::debug!(error = %e, "github email search failed");
                last_error = Some(e);
                Vec::new()
            }
        };
        for candidate in username_candidates(local_part)
            .into_iter()
            .take(self.max_candidates)
        {
            if !handles.contains(&candidate) {
                handles.push(candidate);
            }
        }
        report.candidate_handles = handles.clone();

        for handle in &handles {
            match self.lookup_user(ctx, handle).await {
                Ok(profile) => {
                    if let Some(org) = &profile.organization
                        && !report
                            .organizations
                            .iter()
                            .any(|o| o.eq_ignore_ascii_case(org))
                    {
                        report.organizations.push(org.clone());
                    }
                    report.profiles.push(profile);
                }
                Err(ProbeError::Cancelled) => return Err(ProbeError::Cancelled),
                Err(e) => {
                    tracing::debug!(handle = %handle, error = %e, "github lookup failed");
                    last_error = Some(e);
                }
            }
        }

        // With nothing learned at all, a lookup failure is the real answer.
        if let Some(e) = last_error
            && report.profiles.is_empty()
            && report.organizations.is_empty()
        {
            return Err(e);
        }

        Ok(ProbePayload::Professional(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("acme.com", Some("Acme"))]
    #[case("mail.acme-labs.co.uk", Some("Acme Labs"))]
    #[case("research.example.org", Some("Example"))]
    #[case("gmail.com", None)]
    #[case("Outlook.com", None)]
    #[case("localhost", None)]
    fn test_organization_from_domain(#[case] domain: &str, #[case] expected: Option<&str>) {
        assert_eq!(organization_from_domain(domain).as_deref(), expected);
    }

    #[test]
    fn test_clean_company() {
        assert_eq!(clean_company(Some("@acme ".to_string())).as_deref(), Some("acme"));
        assert_eq!(clean_company(Some("  ".to_string())), None);
        assert_eq!(clean_company(None), None);
    }
}
