use std::{sync::Arc, time::Duration};

use anyhow::Result;
use notification_feed::{
    clients::{storage::MemoryStorage, transport::EventTransport},
    config::Config,
    models::notification::{DEFAULT_MESSAGE, NotificationKind, SubscriberId},
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

use crate::support::{RecordingToaster, memory_store, notification_frame, sse_response};

/// Test: Decoded notification events land in the store and raise one toast each
#[tokio::test]
async fn test_notification_events_are_stored_and_toasted() -> Result<()> {
    let server = MockServer::start().await;

    let body = [
        "event: connected\ndata: {\"subscriber\":\"42\"}\n\n".to_string(),
        notification_frame(r#"{"id":"1","message":"Post scheduled","type":"info"}"#),
        notification_frame(r#"{"id":2,"title":"Publish failed","type":"error"}"#),
        notification_frame(r#"{"message":"Token expiring","type":"warning"}"#),
    ]
    .concat();

    Mock::given(method("GET"))
        .and(path("/api/notifications/stream/42"))
        .and(header("accept", "text/event-stream"))
        .respond_with(sse_response(body))
        .expect(1)
        .mount(&server)
        .await;

    let config = Config::new(server.uri());
    let store = memory_store(MemoryStorage::new()).into_shared();
    let toaster = Arc::new(RecordingToaster::default());

    let mut transport = EventTransport::new(&config, Arc::clone(&store), toaster.clone())?;
    transport.connect(SubscriberId::parse("42")?).await;
    transport.closed().await;

    let store = store.lock().await;
    let kinds: Vec<NotificationKind> = store.iter().map(|n| n.kind).collect();
    assert_eq!(
        kinds,
        vec![
            NotificationKind::Warning,
            NotificationKind::Error,
            NotificationKind::Info
        ]
    );
    assert_eq!(store.unread_count(), 3);
    assert_eq!(store.get("2").unwrap().message, "Publish failed");

    let toasts = toaster.toasts();
    assert_eq!(toasts.len(), 3);
    assert_eq!(
        toasts[0],
        ("Post scheduled".to_string(), NotificationKind::Info)
    );

    Ok(())
}

/// Test: Malformed payloads are dropped without closing the channel
#[tokio::test]
async fn test_malformed_frame_is_dropped() -> Result<()> {
    let server = MockServer::start().await;

    let body = [
        notification_frame("{not json"),
        notification_frame("\"just a string\""),
        notification_frame(r#"{"id":"ok","message":"Still here"}"#),
    ]
    .concat();

    Mock::given(method("GET"))
        .and(path("/api/notifications/stream/7"))
        .respond_with(sse_response(body))
        .mount(&server)
        .await;

    let config = Config::new(server.uri());
    let store = memory_store(MemoryStorage::new()).into_shared();
    let toaster = Arc::new(RecordingToaster::default());

    let mut transport = EventTransport::new(&config, Arc::clone(&store), toaster.clone())?;
    transport.connect(SubscriberId::parse(7)?).await;
    transport.closed().await;

    let store = store.lock().await;
    assert_eq!(store.len(), 1);
    assert_eq!(store.get("ok").unwrap().kind, NotificationKind::Info);
    assert_eq!(toaster.toasts().len(), 1);

    Ok(())
}

/// Test: A frame made only of malformed data leaves the store unchanged
#[tokio::test]
async fn test_unparsable_only_stream_leaves_store_empty() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/notifications/stream/42"))
        .respond_with(sse_response(notification_frame("<html>")))
        .mount(&server)
        .await;

    let config = Config::new(server.uri());
    let store = memory_store(MemoryStorage::new()).into_shared();
    let toaster = Arc::new(RecordingToaster::default());

    let mut transport = EventTransport::new(&config, Arc::clone(&store), toaster.clone())?;
    transport.connect(SubscriberId::parse("42")?).await;
    transport.closed().await;

    assert!(store.lock().await.is_empty());
    assert!(toaster.toasts().is_empty());

    Ok(())
}

/// Test: Missing fields fall back to generated values
#[tokio::test]
async fn test_missing_fields_use_fallbacks() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/notifications/stream/42"))
        .respond_with(sse_response(
            [notification_frame("{}"), notification_frame(r#"{"type":"urgent"}"#)].concat(),
        ))
        .mount(&server)
        .await;

    let config = Config::new(server.uri());
    let store = memory_store(MemoryStorage::new()).into_shared();
    let toaster = Arc::new(RecordingToaster::default());

    let mut transport = EventTransport::new(&config, Arc::clone(&store), toaster)?;
    transport.connect(SubscriberId::parse("42")?).await;
    transport.closed().await;

    let store = store.lock().await;
    assert_eq!(store.len(), 2);

    let notifications = store.notifications();
    assert_ne!(notifications[0].id, notifications[1].id);
    assert!(notifications.iter().all(|n| n.message == DEFAULT_MESSAGE));
    assert!(notifications.iter().all(|n| n.kind == NotificationKind::Info));
    assert!(notifications.iter().all(|n| !n.timestamp.is_empty() && !n.read));

    Ok(())
}

/// Test: A rejected channel closes and is not retried
#[tokio::test]
async fn test_server_error_closes_channel_without_retry() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/notifications/stream/42"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let config = Config::new(server.uri());
    let store = memory_store(MemoryStorage::new()).into_shared();
    let toaster = Arc::new(RecordingToaster::default());

    let mut transport = EventTransport::new(&config, Arc::clone(&store), toaster)?;
    transport.connect(SubscriberId::parse("42")?).await;
    transport.closed().await;

    assert!(!transport.is_open());
    assert!(store.lock().await.is_empty());

    tokio::time::sleep(Duration::from_millis(200)).await;

    Ok(())
}

/// Test: Connecting a second subscriber replaces the first channel
#[tokio::test]
async fn test_connect_new_subscriber_replaces_channel() -> Result<()> {
    let server = MockServer::start().await;

    for subscriber in ["42", "43"] {
        Mock::given(method("GET"))
            .and(path(format!("/api/notifications/stream/{}", subscriber)))
            .respond_with(sse_response(String::new()).set_delay(Duration::from_secs(30)))
            .mount(&server)
            .await;
    }

    let config = Config::new(server.uri());
    let store = memory_store(MemoryStorage::new()).into_shared();
    let toaster = Arc::new(RecordingToaster::default());

    let mut transport = EventTransport::new(&config, store, toaster)?;

    transport.connect(SubscriberId::parse("42")?).await;
    assert!(transport.is_open());

    transport.connect(SubscriberId::parse("43")?).await;
    assert!(transport.is_open());
    assert_eq!(transport.subscriber().map(|s| s.as_str()), Some("43"));

    transport.disconnect().await;
    assert!(!transport.is_open());
    assert!(transport.subscriber().is_none());

    Ok(())
}

/// Test: Reconnecting the same open subscriber keeps the existing channel
#[tokio::test]
async fn test_connect_same_subscriber_is_noop() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/notifications/stream/42"))
        .respond_with(sse_response(String::new()).set_delay(Duration::from_secs(30)))
        .expect(1)
        .mount(&server)
        .await;

    let config = Config::new(server.uri());
    let store = memory_store(MemoryStorage::new()).into_shared();
    let toaster = Arc::new(RecordingToaster::default());

    let mut transport = EventTransport::new(&config, store, toaster)?;

    transport.connect(SubscriberId::parse("42")?).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    transport.connect(SubscriberId::parse(42)?).await;

    assert!(transport.is_open());
    transport.disconnect().await;

    Ok(())
}

/// Test: Disconnecting twice, or before connecting, is harmless
#[tokio::test]
async fn test_disconnect_is_idempotent() -> Result<()> {
    let config = Config::new("http://127.0.0.1:9");
    let store = memory_store(MemoryStorage::new()).into_shared();
    let toaster = Arc::new(RecordingToaster::default());

    let mut transport = EventTransport::new(&config, store, toaster)?;

    transport.disconnect().await;
    transport.disconnect().await;
    assert!(!transport.is_open());

    Ok(())
}

/// Test: Empty subscriber identities are rejected
#[test]
fn test_empty_subscriber_is_rejected() {
    assert!(SubscriberId::parse("").is_err());
    assert!(SubscriberId::parse("   ").is_err());
    assert_eq!(SubscriberId::parse(42).unwrap().as_str(), "42");
}

/// Test: Non-string fields fall back instead of dropping the frame
#[tokio::test]
async fn test_non_string_fields_are_tolerated() -> Result<()> {
    let server = MockServer::start().await;

    let body = [
        notification_frame(
            r#"{"id":"a","message":"Post published","type":"success","timestamp":1700000000000}"#,
        ),
        notification_frame(r#"{"id":"b","message":42,"title":"Fallback title"}"#),
        notification_frame(r#"{"id":"c","message":null,"title":["x"],"timestamp":{"at":1}}"#),
    ]
    .concat();

    Mock::given(method("GET"))
        .and(path("/api/notifications/stream/42"))
        .respond_with(sse_response(body))
        .mount(&server)
        .await;

    let config = Config::new(server.uri());
    let store = memory_store(MemoryStorage::new()).into_shared();
    let toaster = Arc::new(RecordingToaster::default());

    let mut transport = EventTransport::new(&config, Arc::clone(&store), toaster.clone())?;
    transport.connect(SubscriberId::parse("42")?).await;
    transport.closed().await;

    let store = store.lock().await;
    assert_eq!(store.len(), 3);

    let published = store.get("a").unwrap();
    assert_eq!(published.message, "Post published");
    assert_eq!(published.kind, NotificationKind::Success);
    assert_eq!(published.timestamp, "2023-11-14T22:13:20.000Z");

    assert_eq!(store.get("b").unwrap().message, "Fallback title");

    let fallback = store.get("c").unwrap();
    assert_eq!(fallback.message, DEFAULT_MESSAGE);
    assert!(!fallback.timestamp.is_empty());

    assert_eq!(toaster.toasts().len(), 3);

    Ok(())
}

/// Test: Subscriber ids are sent as a single encoded path segment
#[tokio::test]
async fn test_subscriber_id_is_path_encoded() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/notifications/stream/team%2Fa%3Fb%23c"))
        .respond_with(sse_response(notification_frame(r#"{"id":"x","message":"hi"}"#)))
        .expect(1)
        .mount(&server)
        .await;

    let config = Config::new(server.uri());
    let store = memory_store(MemoryStorage::new()).into_shared();
    let toaster = Arc::new(RecordingToaster::default());

    let mut transport = EventTransport::new(&config, Arc::clone(&store), toaster)?;
    transport.connect(SubscriberId::parse("team/a?b#c")?).await;
    transport.closed().await;

    assert!(store.lock().await.contains("x"));

    Ok(())
}

/// Test: Nothing reaches the store once disconnect has returned
#[tokio::test]
async fn test_disconnect_stops_processing() -> Result<()> {
    let server = MockServer::start().await;

    let body: String = (0..500)
        .map(|i| notification_frame(&format!(r#"{{"id":"{}","message":"bulk"}}"#, i)))
        .collect();

    Mock::given(method("GET"))
        .and(path("/api/notifications/stream/42"))
        .respond_with(sse_response(body))
        .mount(&server)
        .await;

    let config = Config::new(server.uri());
    let store = memory_store(MemoryStorage::new()).into_shared();
    let toaster = Arc::new(RecordingToaster::default());

    let mut transport = EventTransport::new(&config, Arc::clone(&store), toaster)?;
    transport.connect(SubscriberId::parse("42")?).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    transport.disconnect().await;

    let seen = store.lock().await.len();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(store.lock().await.len(), seen);
    assert!(!transport.is_open());

    Ok(())
}
