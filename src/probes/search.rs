//! Search-engine dorking over the DuckDuckGo HTML endpoint.
//!
//! Queries are generated from the email and phone, the result pages are
//! parsed with `scraper`, and two kinds of signal are pulled out of the hits:
//! usernames from recognised profile URLs and organizations from result
//! titles.

use crate::probes::{Probe, ProbeContext, ProbeError, endpoint};
use crate::types::payload::{SearchHit, SearchReport};
use crate::types::{Capability, InvestigationInput, ProbePayload};
use crate::utils::toml_config::ProbeConfig;
use async_trait::async_trait;
use scraper::{Html, Selector};

pub const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com";

const DEFAULT_MAX_QUERIES: usize = 4;
const DEFAULT_MAX_RESULTS: usize = 10;

/// Path segments that are site features rather than usernames.
const RESERVED_PATHS: &[&str] = &[
    "about", "explore", "features", "hashtag", "home", "i", "intent", "login", "orgs", "p",
    "pricing", "search", "settings", "share", "signup", "topics", "watch",
];

/// Dork queries for the input, most specific first.
pub fn generate_queries(input: &InvestigationInput) -> Vec<String> {
    let mut queries = Vec::new();

    if let Some(email) = input.email() {
        queries.push(format!("\"{}\"", email));
        queries.push(format!("\"{}\" site:linkedin.com", email));
        queries.push(format!("\"{}\" site:github.com", email));
        if let (Some(user), Some(domain)) = (input.email_local_part(), input.email_domain()) {
            queries.push(format!("\"{}\" site:{}", user, domain));
        }
        queries.push(format!("intext:\"{}\" site:pastebin.com", email));
        queries.push(format!("\"{}\" \"resume\" OR \"cv\"", email));
    }

    if let Some(phone) = input.phone() {
        queries.push(format!("\"{}\"", phone));
        if let Some(national) = phone.strip_prefix("+1").filter(|n| n.len() == 10) {
            queries.push(format!(
                "\"({}) {}-{}\"",
                &national[..3],
                &national[3..6],
                &national[6..]
            ));
            queries.push(format!(
                "\"{}-{}-{}\"",
                &national[..3],
                &national[3..6],
                &national[6..]
            ));
        }
    }

    queries
}

fn selector(css: &str) -> Result<Selector, ProbeError> {
    Selector::parse(css).map_err(|e| ProbeError::Parse(format!("selector '{}': {}", css, e)))
}

/// Resolve a DuckDuckGo redirect link to its target.
fn resolve_result_url(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };
    let url = reqwest::Url::parse(&absolute).ok()?;

    if url.path().starts_with("/l/") {
        return url
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned());
    }
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

/// Parse one HTML result page.
pub fn parse_results(html: &str, query: &str, limit: usize) -> Result<Vec<SearchHit>, ProbeError> {
    let document = Html::parse_document(html);
    let result_sel = selector("div.result")?;
    let link_sel = selector("a.result__a")?;
    let snippet_sel = selector(".result__snippet")?;

    let mut hits = Vec::new();
    for result in document.select(&result_sel) {
        let Some(link) = result.select(&link_sel).next() else {
            continue;
        };
        let Some(url) = link.value().attr("href").and_then(resolve_result_url) else {
            continue;
        };
        let title = link.text().collect::<String>().trim().to_string();
        let snippet = result
            .select(&snippet_sel)
            .next()
            .map(|s| s.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty());

        hits.push(SearchHit {
            query: query.to_string(),
            title,
            url,
            snippet,
        });
        if hits.len() >= limit {
            break;
        }
    }

    Ok(hits)
}

/// Username of a recognised profile URL.
pub fn username_from_url(url: &str) -> Option<String> {
    let url = reqwest::Url::parse(url).ok()?;
    let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();

    let candidate = match (host, segments.as_slice()) {
        ("github.com" | "gitlab.com" | "twitter.com" | "x.com" | "instagram.com"
        | "keybase.io", [user, ..]) => *user,
        ("reddit.com", ["user" | "u", user, ..]) => *user,
        ("linkedin.com", ["in", user, ..]) => *user,
        ("medium.com" | "tiktok.com", [user, ..]) => user.strip_prefix('@')?,
        _ => return None,
    };

    let candidate = candidate.trim_start_matches('@').to_lowercase();
    let valid = !candidate.is_empty()
        && !RESERVED_PATHS.contains(&candidate.as_str())
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    valid.then_some(candidate)
}

/// Organization named in a result title.
///
/// Recognises `Name - Role - Org | LinkedIn` and `... at Org` titles.
pub fn organization_from_title(title: &str) -> Option<String> {
    let clean = |s: &str| {
        let s = s.trim().trim_end_matches(['.', ',', ')']).trim();
        (!s.is_empty() && s.len() <= 80).then(|| s.to_string())
    };

    if let Some(head) = title
        .strip_suffix("| LinkedIn")
        .or_else(|| title.strip_suffix("- LinkedIn"))
    {
        let parts: Vec<&str> = head.split(" - ").collect();
        if parts.len() >= 3 {
            return parts.last().and_then(|org| clean(org));
        }
    }

    let lower = title.to_ascii_lowercase();
    let idx = lower.rfind(" at ")?;
    let rest = &title[idx + 4..];
    let end = [rest.find(['|', '(', ',']), rest.find(" - ")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(rest.len());
    clean(&rest[..end])
}

pub struct SearchProbe {
    base_url: String,
    max_queries: usize,
    max_results: usize,
}

impl SearchProbe {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            max_queries: DEFAULT_MAX_QUERIES,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        let mut probe = Self::new(config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL));
        let int = |key: &str| {
            config
                .extra
                .get(key)
                .and_then(|v| v.as_integer())
                .and_then(|v| usize::try_from(v).ok())
        };
        if let Some(max) = int("max_queries") {
            probe.max_queries = max;
        }
        if let Some(max) = int("max_results") {
            probe.max_results = max;
        }
        probe
    }

    async fn run_query(
        &self,
        ctx: &ProbeContext,
        query: &str,
    ) -> Result<Vec<SearchHit>, ProbeError> {
        let mut url = endpoint(&self.base_url, &["html", ""])?;
        url.query_pairs_mut().append_pair("q", query);

        let response = ctx.send(ctx.http().get(url)).await?;
        if !response.status().is_success() {
            return Err(ProbeError::UnexpectedStatus {
                source_name: "duckduckgo".to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        parse_results(&body, query, self.max_results)
    }
}

#[async_trait]
impl Probe for SearchProbe {
    fn capability(&self) -> Capability {
        Capability::Search
    }

    fn description(&self) -> &str {
        "Search-engine dorks for the email and phone (DuckDuckGo)"
    }

    fn applies_to(&self, input: &InvestigationInput) -> bool {
        input.email().is_some() || input.phone().is_some()
    }

    async fn execute(&self, ctx: &ProbeContext) -> Result<ProbePayload, ProbeError> {
        let mut queries = generate_queries(ctx.input());
        queries.truncate(self.max_queries);

        let mut report = SearchReport {
            queries: queries.clone(),
            ..Default::default()
        };
        let mut failures = 0;
        let mut last_error = None;

        for query in &queries {
            match self.run_query(ctx, query).await {
                Ok(hits) => report.hits.extend(hits),
                Err(ProbeError::Cancelled) => return Err(ProbeError::Cancelled),
                Err(e) => {
                    tracing::debug!(query = %query, error = %e, "search query failed");
                    failures += 1;
                    last_error = Some(e);
                }
            }
        }

        if let Some(e) = last_error
            && failures == queries.len()
        {
            return Err(e);
        }

        for hit in &report.hits {
            if let Some(user) = username_from_url(&hit.url)
                && !report.mentioned_usernames.contains(&user)
            {
                report.mentioned_usernames.push(user);
            }
            if let Some(org) = organization_from_title(&hit.title)
                && !report
                    .mentioned_organizations
                    .iter()
                    .any(|o| o.eq_ignore_ascii_case(&org))
            {
                report.mentioned_organizations.push(org);
            }
        }

        Ok(ProbePayload::Search(report))
    }
}
