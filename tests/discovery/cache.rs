//! Discovery with a cache store attached.

use std::sync::Arc;

use webfinger::{MemoryCacheStore, WebFinger, WebFingerConfig};

use crate::mock::*;

#[tokio::test]
async fn second_finger_is_served_from_cache() {
    let transport = MockTransport::new();
    transport.jrd(WEBFINGER_HTTPS, WEBFINGER_JRD);
    let client = WebFinger::with_transport(transport.clone(), WebFingerConfig::default())
        .with_cache(Arc::new(MemoryCacheStore::new()));

    let first = client.finger("user@example.org").await;
    assert!(first.describes("acct:user@example.org"));
    assert_eq!(transport.requested_urls(), vec![WEBFINGER_HTTPS.to_string()]);

    transport.clear_log();
    let second = client.finger("user@example.org").await;
    assert!(second.describes("acct:user@example.org"));
    assert!(second.error().is_none());
    assert!(transport.requested_urls().is_empty());
}

#[tokio::test]
async fn failed_loads_are_cached_too() {
    let transport = MockTransport::new();
    transport.fail(WEBFINGER_HTTPS, "No webfinger for you.");
    let client = WebFinger::with_transport(transport.clone(), WebFingerConfig::default())
        .with_cache(Arc::new(MemoryCacheStore::new()));

    let first = client.finger("user@example.org").await;
    assert_eq!(transport.requested_urls().len(), 3);

    transport.clear_log();
    let second = client.finger("user@example.org").await;
    assert!(transport.requested_urls().is_empty());
    assert_eq!(first.error_kind(), second.error_kind());
    assert_eq!(second.probes().len(), 3);
}

#[tokio::test]
async fn cache_is_keyed_by_full_url() {
    let transport = MockTransport::new();
    transport.jrd(WEBFINGER_HTTPS, WEBFINGER_JRD);
    let store = Arc::new(MemoryCacheStore::new());
    let client = WebFinger::with_transport(transport.clone(), WebFingerConfig::default())
        .with_cache(store.clone());

    client.finger("user@example.org").await;
    client.finger("other@example.org").await;

    // other@ misses WebFinger and walks both host-meta URLs
    assert!(transport
        .requested_urls()
        .contains(&"https://example.org/.well-known/webfinger?resource=acct%3Aother%40example.org".to_string()));
    assert_eq!(store.len(), 4);
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn sqlite_cache_survives_new_client() {
    use webfinger::SqliteCacheStore;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("webfinger.sqlite");
    let transport = MockTransport::new();
    transport
        .fail(WEBFINGER_HTTPS, "No webfinger for you.")
        .xrd(HOST_META_HTTPS, HOST_META)
        .xrd(LRDD_HTTPS, LRDD);

    {
        let store = Arc::new(SqliteCacheStore::open(&path).unwrap());
        let client = WebFinger::with_transport(transport.clone(), WebFingerConfig::default())
            .with_cache(store);
        let reaction = client.finger("user@example.org").await;
        assert!(reaction.error().is_none());
    }

    transport.clear_log();
    let store = Arc::new(SqliteCacheStore::open(&path).unwrap());
    let client =
        WebFinger::with_transport(transport.clone(), WebFingerConfig::default()).with_cache(store);
    let reaction = client.finger("user@example.org").await;

    assert!(transport.requested_urls().is_empty());
    assert!(reaction.describes("acct:user@example.org"));
    assert!(reaction.is_secure());
}
