//! Built-in probe adapters against mocked upstream services.

use footprint::probes::breach::BreachProbe;
use footprint::probes::deliverability::DeliverabilityProbe;
use footprint::probes::dns_whois::DnsWhoisProbe;
use footprint::probes::email_registration::EmailRegistrationProbe;
use footprint::probes::external_tool::ExternalToolProbe;
use footprint::probes::phone::PhoneProbe;
use footprint::probes::professional::ProfessionalProbe;
use footprint::probes::reputation::ReputationProbe;
use footprint::probes::search::SearchProbe;
use footprint::probes::social::SocialProbe;
use footprint::probes::{Credential, RequestPacer};
use footprint::types::payload::LineType;
use footprint::{InvestigationInput, Probe, ProbeContext, ProbeError, ProbePayload};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn context(email: Option<&str>, phone: Option<&str>, key: Option<&str>) -> ProbeContext {
    ProbeContext::new(
        Arc::new(InvestigationInput::new(email, phone).unwrap()),
        reqwest::Client::new(),
        key.map(Credential::new),
        RequestPacer::unpaced(),
        CancellationToken::new(),
    )
}

fn email_context(key: Option<&str>) -> ProbeContext {
    context(Some("jdoe@acme.com"), None, key)
}

// ============= Breach =============

#[tokio::test]
async fn test_breach_not_found_means_no_breaches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex("^/(breachedaccount|pasteaccount)/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let payload = BreachProbe::new(server.uri())
        .execute(&email_context(Some("k")))
        .await
        .unwrap();

    match payload {
        ProbePayload::Breach(report) => {
            assert_eq!(report.total_breaches, 0);
            assert_eq!(report.sources_checked.len(), 2);
        }
        other => panic!("unexpected payload {:?}", other),
    }
}

#[tokio::test]
async fn test_breach_rejected_key_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = BreachProbe::new(server.uri())
        .execute(&email_context(Some("bad")))
        .await;
    assert!(matches!(result, Err(ProbeError::Unavailable(_))));
}

#[tokio::test]
async fn test_breach_without_key_is_missing_credential() {
    let result = BreachProbe::new("http://127.0.0.1:1")
        .execute(&email_context(None))
        .await;
    assert!(matches!(result, Err(ProbeError::MissingCredential)));
}

// ============= Reputation =============

#[tokio::test]
async fn test_reputation_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/jdoe(@|%40)acme\.com$"))
        .and(header("Key", "k"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"email":"jdoe@acme.com","reputation":"low","suspicious":true,"references":2,
                "details":{"blacklisted":false,"credentials_leaked":true,"data_breach":true,
                           "profiles":["github","twitter"]}}"#,
        ))
        .mount(&server)
        .await;

    let payload = ReputationProbe::new(server.uri())
        .execute(&email_context(Some("k")))
        .await
        .unwrap();

    match payload {
        ProbePayload::Reputation(report) => {
            assert_eq!(report.reputation, "low");
            assert!(report.suspicious);
            assert!(report.credentials_leaked);
            assert_eq!(report.profiles, vec!["github", "twitter"]);
        }
        other => panic!("unexpected payload {:?}", other),
    }
}

// ============= DNS / WHOIS =============

#[tokio::test]
async fn test_dns_whois_keeps_partial_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resolve"))
        .and(query_param("name", "acme.com"))
        .and(query_param("type", "A"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"Status":0,"Answer":[{"name":"acme.com.","type":1,"TTL":300,"data":"93.184.216.34"}]}"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/resolve"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"Status":3}"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/domain/acme.com"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"entities":[
                 {"roles":["registrant"],
                  "vcardArray":["vcard",[["version",{},"text","4.0"],["org",{},"text","Acme, Inc."]]]}
               ],
               "status":["active"],
               "nameservers":[{"ldhName":"NS1.ACME.COM"}]}"#,
        ))
        .mount(&server)
        .await;

    let payload = DnsWhoisProbe::new(server.uri(), server.uri())
        .execute(&email_context(None))
        .await
        .unwrap();

    match payload {
        ProbePayload::DnsWhois(report) => {
            assert_eq!(report.domain, "acme.com");
            assert_eq!(report.records["A"], vec!["93.184.216.34"]);
            assert!(report.errors.contains_key("MX"));
            let whois = report.whois.unwrap();
            assert_eq!(whois.registrant_organization.as_deref(), Some("Acme, Inc."));
            assert_eq!(whois.name_servers, vec!["ns1.acme.com"]);
        }
        other => panic!("unexpected payload {:?}", other),
    }
}

// ============= Social =============

#[tokio::test]
async fn test_social_profile_existence() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gh/jdoe"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gl/jdoe"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let platforms: BTreeMap<String, String> = [
        ("github".to_string(), format!("{}/gh/{{}}", server.uri())),
        ("gitlab".to_string(), format!("{}/gl/{{}}", server.uri())),
    ]
    .into_iter()
    .collect();

    let payload = SocialProbe::new(platforms)
        .execute(&email_context(None))
        .await
        .unwrap();

    match payload {
        ProbePayload::Social(report) => {
            assert_eq!(report.candidate_usernames, vec!["jdoe"]);
            assert_eq!(report.profiles.len(), 2);
            let github = report.profiles.iter().find(|p| p.platform == "github").unwrap();
            assert!(github.exists);
            let gitlab = report.profiles.iter().find(|p| p.platform == "gitlab").unwrap();
            assert!(!gitlab.exists);
            assert_eq!(gitlab.http_status, Some(404));
        }
        other => panic!("unexpected payload {:?}", other),
    }
}

#[tokio::test]
async fn test_social_all_unreachable_is_an_error() {
    let platforms: BTreeMap<String, String> =
        [("github".to_string(), "http://127.0.0.1:1/{}".to_string())]
            .into_iter()
            .collect();

    let result = SocialProbe::new(platforms)
        .execute(&email_context(None))
        .await;
    assert!(matches!(result, Err(ProbeError::Http(_))));
}

// ============= Professional =============

#[tokio::test]
async fn test_professional_github_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/users"))
        .and(query_param("q", "jdoe@acme.com in:email"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"items":[{"login":"JDoe-Dev"}]}"#),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/jdoe-dev"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"login":"JDoe-Dev","html_url":"https://github.com/JDoe-Dev",
                "name":"Jane Doe","company":"@acme","location":" San Francisco, CA "}"#,
        ))
        .mount(&server)
        .await;

    let payload = ProfessionalProbe::new(server.uri())
        .execute(&email_context(Some("tok")))
        .await
        .unwrap();

    match payload {
        ProbePayload::Professional(report) => {
            assert_eq!(report.candidate_handles, vec!["jdoe-dev", "jdoe"]);
            assert_eq!(report.organizations, vec!["Acme"]);

            let found = report.profiles.iter().find(|p| p.exists).unwrap();
            assert_eq!(found.username, "jdoe-dev");
            assert_eq!(found.display_name.as_deref(), Some("Jane Doe"));
            assert_eq!(found.organization.as_deref(), Some("acme"));
            assert_eq!(found.location.as_deref(), Some("San Francisco, CA"));

            // unmatched requests get wiremock's 404
            let missing = report.profiles.iter().find(|p| p.username == "jdoe").unwrap();
            assert!(!missing.exists);
        }
        other => panic!("unexpected payload {:?}", other),
    }
}

// ============= Deliverability =============

#[tokio::test]
async fn test_deliverability_verification() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/email-verifier"))
        .and(query_param("email", "jdoe@acme.com"))
        .and(query_param("api_key", "hk"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"data":{"status":"accept_all","result":"risky","score":62,
                "email":"jdoe@acme.com","disposable":false,"webmail":false,
                "mx_records":true,"smtp_check":true,"accept_all":true,"block":false,
                "sources":[{"domain":"acme.com","uri":"https://acme.com/team"}]}}"#,
        ))
        .mount(&server)
        .await;

    let payload = DeliverabilityProbe::new(server.uri())
        .execute(&email_context(Some("hk")))
        .await
        .unwrap();

    match payload {
        ProbePayload::Deliverability(report) => {
            assert_eq!(report.email, "jdoe@acme.com");
            assert_eq!(report.status, "accept_all");
            assert_eq!(report.score, Some(62));
            assert!(report.accept_all);
            assert_eq!(report.sources, vec!["https://acme.com/team"]);
        }
        other => panic!("unexpected payload {:?}", other),
    }
}

#[tokio::test]
async fn test_deliverability_rejected_key_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = DeliverabilityProbe::new(server.uri())
        .execute(&email_context(Some("bad")))
        .await;
    assert!(matches!(result, Err(ProbeError::Unavailable(_))));
}

#[tokio::test]
async fn test_deliverability_pending_verification_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let result = DeliverabilityProbe::new(server.uri())
        .execute(&email_context(Some("hk")))
        .await;
    assert!(matches!(result, Err(ProbeError::Unavailable(_))));
}

#[tokio::test]
async fn test_deliverability_without_key_is_missing_credential() {
    let result = DeliverabilityProbe::new("http://127.0.0.1:1")
        .execute(&email_context(None))
        .await;
    assert!(matches!(result, Err(ProbeError::MissingCredential)));
}

// ============= Search =============

const RESULTS_PAGE: &str = r##"
<html><body>
<div class="results">
  <div class="result results_links web-result">
    <h2 class="result__title">
      <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fgithub.com%2Fjdoe&amp;rut=abc">jdoe (Jane Doe) · GitHub</a>
    </h2>
    <a class="result__snippet" href="#">Jane Doe has 12 repositories available.</a>
  </div>
  <div class="result results_links web-result">
    <h2 class="result__title">
      <a class="result__a" href="https://www.linkedin.com/in/janedoe">Jane Doe - Staff Engineer - Acme Corp | LinkedIn</a>
    </h2>
  </div>
</div>
</body></html>"##;

#[tokio::test]
async fn test_search_extracts_mentions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RESULTS_PAGE))
        .mount(&server)
        .await;

    let payload = SearchProbe::new(server.uri())
        .execute(&email_context(None))
        .await
        .unwrap();

    match payload {
        ProbePayload::Search(report) => {
            assert_eq!(report.queries.len(), 4);
            assert_eq!(report.hits.len(), 8);
            assert_eq!(report.mentioned_usernames, vec!["jdoe", "janedoe"]);
            assert_eq!(report.mentioned_organizations, vec!["Acme Corp"]);
        }
        other => panic!("unexpected payload {:?}", other),
    }
}

#[tokio::test]
async fn test_search_all_queries_failing_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = SearchProbe::new(server.uri())
        .execute(&email_context(None))
        .await;
    assert!(matches!(
        result,
        Err(ProbeError::UnexpectedStatus { status: 503, .. })
    ));
}

// ============= Phone =============

#[tokio::test]
async fn test_phone_enrichment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/validate"))
        .and(query_param("access_key", "k"))
        .and(query_param("number", "447400123456"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"valid":true,"country_code":"GB","location":"London","carrier":"Vodafone","line_type":"mobile"}"#,
        ))
        .mount(&server)
        .await;

    let payload = PhoneProbe::new(server.uri())
        .execute(&context(None, Some("+447400123456"), Some("k")))
        .await
        .unwrap();

    match payload {
        ProbePayload::Phone(report) => {
            assert!(report.valid);
            assert_eq!(report.line_type, LineType::Mobile);
            assert_eq!(report.carrier.as_deref(), Some("Vodafone"));
            assert_eq!(report.location.as_deref(), Some("London"));
        }
        other => panic!("unexpected payload {:?}", other),
    }
}

#[tokio::test]
async fn test_phone_enrichment_failure_is_a_note() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let payload = PhoneProbe::new(server.uri())
        .execute(&context(None, Some("+447400123456"), Some("k")))
        .await
        .unwrap();

    match payload {
        ProbePayload::Phone(report) => {
            assert!(report.valid);
            assert!(report.carrier.is_none());
            assert!(report.notes.iter().any(|n| n.starts_with("carrier lookup failed")));
        }
        other => panic!("unexpected payload {:?}", other),
    }
}

// ============= Cancellation =============

#[tokio::test]
async fn test_http_probe_observes_cancellation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let ctx = email_context(Some("k"));
    let cancel = ctx.cancellation().clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let started = std::time::Instant::now();
    let result = ReputationProbe::new(server.uri()).execute(&ctx).await;
    assert!(matches!(result, Err(ProbeError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(10));
}

// ============= External tool =============

#[cfg(unix)]
#[tokio::test]
async fn test_external_tool_parses_output() {
    let probe = ExternalToolProbe::new(
        "echo",
        vec!["[+] GitHub: https://github.com/{}".to_string()],
    );

    let payload = probe.execute(&email_context(None)).await.unwrap();
    match payload {
        ProbePayload::ExternalTool(report) => {
            assert_eq!(report.tool, "echo");
            assert_eq!(report.username, "jdoe");
            assert_eq!(report.found.len(), 1);
            assert_eq!(report.found[0].url, "https://github.com/jdoe");
            assert_eq!(report.exit_code, Some(0));
        }
        other => panic!("unexpected payload {:?}", other),
    }
}

#[tokio::test]
async fn test_external_tool_missing_binary_is_unavailable() {
    let probe = ExternalToolProbe::new("footprint-no-such-binary-xyz", vec!["{}".to_string()]);
    let result = probe.execute(&email_context(None)).await;
    assert!(matches!(result, Err(ProbeError::Unavailable(_))));
}

// ============= Email registration =============

#[cfg(unix)]
#[tokio::test]
async fn test_email_registration_reads_tool_json() {
    let probe = EmailRegistrationProbe::new(
        "echo",
        vec![
            r#"{"platform":"GitHub","query":"{}","available":false,"valid":true,"success":true}"#
                .to_string(),
        ],
    );

    let payload = probe.execute(&email_context(None)).await.unwrap();
    match payload {
        ProbePayload::EmailRegistration(report) => {
            assert_eq!(report.tool, "echo");
            assert_eq!(report.email, "jdoe@acme.com");
            assert_eq!(report.checks.len(), 1);
            assert_eq!(report.checks[0].registered, Some(true));
            assert_eq!(report.registered_on, vec!["GitHub"]);
            assert_eq!(report.exit_code, Some(0));
        }
        other => panic!("unexpected payload {:?}", other),
    }
}

#[tokio::test]
async fn test_email_registration_missing_binary_is_unavailable() {
    let probe = EmailRegistrationProbe::new("footprint-no-such-binary-xyz", vec!["{}".to_string()]);
    let result = probe.execute(&email_context(None)).await;
    assert!(matches!(result, Err(ProbeError::Unavailable(_))));
}
