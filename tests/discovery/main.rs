//! End-to-end discovery against a recording mock transport.

mod cache;

use std::sync::Arc;

use mock::*;
use webfinger::{
    ErrorCause, ErrorKind, Leg, Reaction, TransportResponse, WebFinger,
    WebFingerConfig, REL_OPENID, REL_PROFILE,
};

// ============================================================================
// Helpers
// ============================================================================

fn client(transport: &Arc<MockTransport>) -> WebFinger {
    client_with(transport, WebFingerConfig::default())
}

fn client_with(transport: &Arc<MockTransport>, config: WebFingerConfig) -> WebFinger {
    WebFinger::with_transport(transport.clone(), config)
}

fn assert_urls(transport: &MockTransport, expected: &[&str]) {
    assert_eq!(
        transport.requested_urls(),
        expected.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        "requested URL list does not match"
    );
}

fn assert_describes(reaction: &Reaction, account: &str) {
    if let Some(err) = reaction.error() {
        panic!("reaction has an error: {err}");
    }
    assert!(
        reaction.describes(account),
        "reaction does not describe {account:?} but is for {:?}",
        reaction.subject()
    );
}

fn messages(reaction: &Reaction) -> Vec<String> {
    reaction
        .error()
        .map(|err| err.chain().map(|e| e.to_string()).collect())
        .unwrap_or_default()
}

// ============================================================================
// WebFinger leg
// ============================================================================

#[tokio::test]
async fn fetches_webfinger_first() {
    let transport = MockTransport::new();
    transport.jrd(WEBFINGER_HTTPS, WEBFINGER_JRD);

    let reaction = client(&transport).finger("user@example.org").await;

    assert_urls(&transport, &[WEBFINGER_HTTPS]);
    assert_describes(&reaction, "acct:user@example.org");
    assert!(reaction.is_secure());
    assert!(reaction.host_meta_document().is_none());
    assert_eq!(reaction.account(), Some("acct:user@example.org"));
}

#[tokio::test]
async fn webfinger_falls_back_to_http_when_enabled() {
    let transport = MockTransport::new();
    transport
        .fail(WEBFINGER_HTTPS, "No webfinger for you.")
        .jrd(WEBFINGER_HTTP, WEBFINGER_JRD);

    let config = WebFingerConfig {
        fallback_to_http: true,
        ..Default::default()
    };
    let reaction = client_with(&transport, config).finger("user@example.org").await;

    assert_urls(&transport, &[WEBFINGER_HTTPS, WEBFINGER_HTTP]);
    assert_describes(&reaction, "acct:user@example.org");
    assert!(!reaction.is_secure());
}

#[tokio::test]
async fn webfinger_http_fallback_is_off_by_default() {
    let transport = MockTransport::new();
    transport
        .fail(WEBFINGER_HTTPS, "No webfinger for you.")
        .jrd(WEBFINGER_HTTP, WEBFINGER_JRD);

    let reaction = client(&transport).finger("user@example.org").await;

    assert!(!transport.requested_urls().contains(&WEBFINGER_HTTP.to_string()));
    assert!(reaction.primary_document().is_none());
}

#[tokio::test]
async fn webfinger_error_status_falls_back_like_transport_error() {
    let transport = MockTransport::new();
    transport
        .respond(WEBFINGER_HTTPS, TransportResponse::new(404, "not here"))
        .xrd(HOST_META_HTTPS, HOST_META)
        .xrd(LRDD_HTTPS, LRDD);

    let reaction = client(&transport).finger("user@example.org").await;

    assert_urls(&transport, &[WEBFINGER_HTTPS, HOST_META_HTTPS, LRDD_HTTPS]);
    assert_describes(&reaction, "acct:user@example.org");

    let first = &reaction.probes()[0];
    assert_eq!(first.leg, Leg::WebFinger);
    assert_eq!(first.error.as_ref().and_then(|e| e.status()), Some(404));
}

#[tokio::test]
async fn webfinger_subject_mismatch_keeps_document() {
    let transport = MockTransport::new();
    transport.jrd(
        WEBFINGER_HTTPS,
        &WEBFINGER_JRD.replace("acct:user@example.org", "acct:other@example.org"),
    );

    let reaction = client(&transport).finger("user@example.org").await;

    assert_eq!(reaction.error_kind(), Some(ErrorKind::Describe));
    assert!(!reaction.is_secure());
    assert_eq!(reaction.subject(), Some("acct:other@example.org"));
    assert_eq!(transport.requested_urls().len(), 1);
}

// ============================================================================
// host-meta / LRDD legs
// ============================================================================

#[tokio::test]
async fn fetches_host_meta_over_https_before_http() {
    let transport = MockTransport::new();
    transport.fail(WEBFINGER_HTTPS, "No webfinger for you.");

    let reaction = client(&transport).finger("user@example.org").await;

    assert_urls(&transport, &[WEBFINGER_HTTPS, HOST_META_HTTPS, HOST_META_HTTP]);
    let err = reaction.error().unwrap();
    assert_eq!(err.kind(), ErrorKind::NoHostMeta);
    assert_eq!(err.message(), "No .well-known/host-meta file found on example.org");
    let load = err.cause().and_then(ErrorCause::as_load).unwrap();
    assert_eq!(load.url(), HOST_META_HTTP);
    assert!(!reaction.is_secure());
}

#[tokio::test]
async fn follows_lrdd_template() {
    let transport = MockTransport::new();
    transport
        .fail(WEBFINGER_HTTPS, "No webfinger for you.")
        .xrd(HOST_META_HTTPS, HOST_META)
        .xrd(LRDD_HTTPS, LRDD);

    let reaction = client(&transport).finger("user@example.org").await;

    assert_urls(&transport, &[WEBFINGER_HTTPS, HOST_META_HTTPS, LRDD_HTTPS]);
    assert_describes(&reaction, "acct:user@example.org");
    assert!(reaction.is_secure());
    assert!(reaction.host_meta_document().is_some());
}

#[tokio::test]
async fn openid_comes_from_host_meta_when_lrdd_has_none() {
    let transport = MockTransport::new();
    transport
        .fail(WEBFINGER_HTTPS, "No webfinger for you.")
        .xrd(HOST_META_HTTPS, HOST_META_OPENID)
        .xrd(LRDD_HTTPS, LRDD_EMPTY);

    let reaction = client(&transport).finger("user@example.org").await;

    assert_urls(&transport, &[WEBFINGER_HTTPS, HOST_META_HTTPS, LRDD_HTTPS]);
    assert_describes(&reaction, "acct:user@example.org");
    assert_eq!(reaction.openid(), Some("http://id.example.org/"));
    assert_eq!(reaction.get_short("openid"), Some("http://id.example.org/"));
    assert_eq!(reaction.profile(), None);
    assert!(reaction.get_link(REL_PROFILE, None, true).is_none());

    let rels: Vec<&str> = reaction.links().map(|l| l.rel.as_str()).collect();
    assert_eq!(rels, vec![REL_OPENID]);
}

#[tokio::test]
async fn lrdd_falls_back_to_http() {
    let transport = MockTransport::new();
    transport
        .fail(WEBFINGER_HTTPS, "No webfinger for you.")
        .xrd(HOST_META_HTTPS, HOST_META)
        .fail(LRDD_HTTPS, "No SSL lrdd for you.")
        .xrd(LRDD_HTTP, LRDD);

    let reaction = client(&transport).finger("user@example.org").await;

    assert_urls(
        &transport,
        &[WEBFINGER_HTTPS, HOST_META_HTTPS, LRDD_HTTPS, LRDD_HTTP],
    );
    assert_describes(&reaction, "acct:user@example.org");
    assert!(!reaction.is_secure());
}

#[tokio::test]
async fn host_meta_without_lrdd_link() {
    let transport = MockTransport::new();
    transport
        .fail(WEBFINGER_HTTPS, "No webfinger for you.")
        .xrd(HOST_META_HTTPS, HOST_META_EMPTY);

    let reaction = client(&transport).finger("user@example.org").await;

    let err = reaction.error().unwrap();
    assert_eq!(err.kind(), ErrorKind::NoLrddLink);
    assert_eq!(err.message(), "No lrdd link in host-meta for example.org");
    let webfinger = err.cause().and_then(ErrorCause::as_load).unwrap();
    assert_eq!(webfinger.url(), WEBFINGER_HTTPS);
    assert_eq!(
        messages(&reaction),
        vec![
            "No lrdd link in host-meta for example.org".to_string(),
            format!("Error loading {WEBFINGER_HTTPS}: No webfinger for you."),
        ]
    );
    assert!(reaction.host_meta_document().is_some());
    assert!(!reaction.is_secure());
}

#[tokio::test]
async fn plain_http_lrdd_template_is_insecure() {
    let transport = MockTransport::new();
    transport
        .fail(WEBFINGER_HTTPS, "No webfinger for you.")
        .xrd(HOST_META_HTTPS, HOST_META_HTTP_LRDD)
        .xrd(LRDD_HTTP, LRDD);

    let reaction = client(&transport).finger("user@example.org").await;

    assert_urls(&transport, &[WEBFINGER_HTTPS, HOST_META_HTTPS, LRDD_HTTP]);
    assert_describes(&reaction, "acct:user@example.org");
    assert!(!reaction.is_secure());
}

#[tokio::test]
async fn missing_lrdd_file_reports_full_chain() {
    let transport = MockTransport::new();
    transport
        .fail(WEBFINGER_HTTPS, "No webfinger for you.")
        .xrd(HOST_META_HTTPS, HOST_META);

    let reaction = client(&transport).finger("user@example.org").await;

    assert_urls(
        &transport,
        &[WEBFINGER_HTTPS, HOST_META_HTTPS, LRDD_HTTPS, LRDD_HTTP],
    );
    assert_eq!(reaction.error_kind(), Some(ErrorKind::Nothing));
    assert_eq!(
        messages(&reaction),
        vec![
            "No webfinger data found".to_string(),
            "LRDD file not found".to_string(),
            format!("Error loading {LRDD_HTTP}: 400 Bad Request"),
        ]
    );
    let no_lrdd = reaction
        .error()
        .and_then(|err| err.cause())
        .and_then(ErrorCause::as_discovery)
        .unwrap();
    assert_eq!(no_lrdd.kind(), ErrorKind::NoLrdd);
}

// ============================================================================
// Security flag
// ============================================================================

#[tokio::test]
async fn all_https_is_secure() {
    let transport = MockTransport::new();
    transport
        .fail(WEBFINGER_HTTPS, "No webfinger for you.")
        .xrd(HOST_META_HTTPS, HOST_META)
        .xrd(LRDD_HTTPS, LRDD);

    let reaction = client(&transport).finger("user@example.org").await;
    assert!(reaction.is_secure());
    assert!(reaction.probes()[1..].iter().all(|p| p.is_https()));
}

#[tokio::test]
async fn host_meta_over_http_is_insecure() {
    let transport = MockTransport::new();
    transport
        .fail(WEBFINGER_HTTPS, "No webfinger for you.")
        .fail(HOST_META_HTTPS, "No SSL host-meta for you.")
        .xrd(HOST_META_HTTP, HOST_META)
        .xrd(LRDD_HTTPS, LRDD);

    let reaction = client(&transport).finger("user@example.org").await;

    assert_urls(
        &transport,
        &[WEBFINGER_HTTPS, HOST_META_HTTPS, HOST_META_HTTP, LRDD_HTTPS],
    );
    assert_describes(&reaction, "acct:user@example.org");
    assert!(!reaction.is_secure());
}

#[tokio::test]
async fn lrdd_over_http_is_insecure() {
    let transport = MockTransport::new();
    transport
        .fail(WEBFINGER_HTTPS, "No webfinger for you.")
        .xrd(HOST_META_HTTPS, HOST_META)
        .fail(LRDD_HTTPS, "No SSL lrdd for you.")
        .xrd(LRDD_HTTP, LRDD);

    let reaction = client(&transport).finger("user@example.org").await;
    assert_describes(&reaction, "acct:user@example.org");
    assert!(!reaction.is_secure());
}

#[tokio::test]
async fn lrdd_subject_mismatch() {
    let transport = MockTransport::new();
    transport
        .fail(WEBFINGER_HTTPS, "No webfinger for you.")
        .xrd(HOST_META_HTTPS, HOST_META)
        .xrd(LRDD_HTTPS, &LRDD.replace("example.org", "bad.com"));

    let reaction = client(&transport).finger("user@example.org").await;

    let err = reaction.error().unwrap();
    assert_eq!(err.kind(), ErrorKind::Describe);
    assert_eq!(
        err.message(),
        "Webfinger file is not about \"acct:user@example.org\" but \"acct:user@bad.com\""
    );
    assert!(!reaction.is_secure());
    assert_eq!(reaction.subject(), Some("acct:user@bad.com"));
}

// ============================================================================
// Identifiers and output
// ============================================================================

#[tokio::test]
async fn invalid_identifier_makes_no_requests() {
    let transport = MockTransport::new();

    let reaction = client(&transport).finger("user@").await;

    assert_eq!(reaction.error_kind(), Some(ErrorKind::InvalidIdentifier));
    assert!(transport.requested_urls().is_empty());
    assert!(reaction.probes().is_empty());
    assert!(!reaction.is_secure());
    assert_eq!(reaction.account(), None);
}

#[tokio::test]
async fn identifier_is_normalized() {
    let transport = MockTransport::new();
    transport.jrd(WEBFINGER_HTTPS, WEBFINGER_JRD);

    let reaction = client(&transport).finger("acct:User@Example.org").await;

    assert_urls(&transport, &[WEBFINGER_HTTPS]);
    assert_eq!(reaction.identifier(), "acct:User@Example.org");
    assert_describes(&reaction, "acct:user@example.org");
}

#[tokio::test]
async fn probes_record_every_request() {
    let transport = MockTransport::new();
    transport
        .fail(WEBFINGER_HTTPS, "No webfinger for you.")
        .xrd(HOST_META_HTTPS, HOST_META)
        .xrd(LRDD_HTTPS, LRDD);

    let reaction = client(&transport).finger("user@example.org").await;

    let legs: Vec<Leg> = reaction.probes().iter().map(|p| p.leg).collect();
    assert_eq!(legs, vec![Leg::WebFinger, Leg::HostMeta, Leg::Lrdd]);
    assert!(!reaction.probes()[0].succeeded());
    assert!(reaction.probes()[0]
        .error
        .as_ref()
        .unwrap()
        .to_string()
        .contains("No webfinger for you."));
    assert!(reaction.probes()[1..].iter().all(|p| p.succeeded()));
}

#[tokio::test]
async fn reaction_serializes_to_json() {
    let transport = MockTransport::new();
    transport.fail(WEBFINGER_HTTPS, "No webfinger for you.");

    let reaction = client(&transport).finger("user@example.org").await;
    let value = serde_json::to_value(&reaction).unwrap();

    assert_eq!(value["account"], "acct:user@example.org");
    assert_eq!(value["secure"], false);
    assert_eq!(value["error"]["kind"], "NO_HOSTMETA");
    assert_eq!(value["probes"].as_array().unwrap().len(), 3);
    assert_eq!(value["probes"][0]["leg"], "webfinger");
}
