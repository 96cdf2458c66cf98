//! Hot reload behaviour against a running proxy.

use std::time::Duration;

use hostbounce::config::ReloadRequest;
use hostbounce::reload::ReloadOutcome;
use serde_json::json;
use tokio::sync::mpsc;

mod common;

use common::{start_mock_backend, write_config, TestProxy};

#[tokio::test]
async fn test_reload_switches_routes() {
    let first = start_mock_backend("first").await;
    let second = start_mock_backend("second").await;
    let proxy = TestProxy::start(&json!({ "hosts": { "a.example.com": first } })).await;
    assert_eq!(proxy.get("a.example.com").await.text().await.unwrap(), "first");

    write_config(proxy.config_path(), &json!({ "hosts": { "a.example.com": second } }));
    assert!(proxy.controller.reload().is_accepted());

    assert_eq!(proxy.get("a.example.com").await.text().await.unwrap(), "second");
}

#[tokio::test]
async fn test_loop_to_listen_port_is_rejected_and_old_table_serves() {
    let a = start_mock_backend("backend a").await;
    let proxy = TestProxy::start(&json!({ "hosts": { "a.example.com": a } })).await;
    let before = proxy.controller.snapshots().load();

    write_config(
        proxy.config_path(),
        &json!({ "hosts": { "a.example.com": proxy.port() } }),
    );
    assert!(matches!(proxy.controller.reload(), ReloadOutcome::Rejected(_)));

    let after = proxy.controller.snapshots().load();
    assert!(std::sync::Arc::ptr_eq(&before, &after));
    assert_eq!(proxy.get("a.example.com").await.text().await.unwrap(), "backend a");
}

#[tokio::test]
async fn test_startup_with_loop_serves_empty_table() {
    let proxy = TestProxy::start_with(|port| json!({ "hosts": { "a.example.com": port } })).await;

    let snapshot = proxy.controller.snapshots().load();
    assert_eq!(snapshot.version(), 0);
    assert!(snapshot.routes().is_empty());
    assert_eq!(proxy.get("a.example.com").await.status(), 404);
}

#[tokio::test]
async fn test_invalid_startup_recovers_on_reload() {
    let a = start_mock_backend("backend a").await;
    let proxy = TestProxy::start(&json!({ "hosts": "not a mapping" })).await;
    assert_eq!(proxy.controller.snapshots().load().version(), 0);
    assert_eq!(proxy.get("a.example.com").await.status(), 404);

    write_config(proxy.config_path(), &json!({ "hosts": { "a.example.com": a } }));
    assert!(proxy.controller.reload().is_accepted());
    assert_eq!(proxy.get("a.example.com").await.text().await.unwrap(), "backend a");
}

#[tokio::test]
async fn test_invalid_reload_keeps_serving() {
    let a = start_mock_backend("backend a").await;
    let proxy = TestProxy::start(&json!({ "hosts": { "a.example.com": a } })).await;

    std::fs::write(proxy.config_path(), "{ definitely not json").unwrap();
    assert!(matches!(proxy.controller.reload(), ReloadOutcome::Rejected(_)));

    std::fs::remove_file(proxy.config_path()).unwrap();
    assert!(matches!(proxy.controller.reload(), ReloadOutcome::Skipped));

    assert_eq!(proxy.get("a.example.com").await.text().await.unwrap(), "backend a");
}

#[tokio::test]
async fn test_reload_loop_applies_requests() {
    let first = start_mock_backend("first").await;
    let second = start_mock_backend("second").await;
    let proxy = TestProxy::start(&json!({ "hosts": { "a.example.com": first } })).await;

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(proxy.controller.clone().run(rx, proxy.shutdown.subscribe()));

    write_config(proxy.config_path(), &json!({ "hosts": { "a.example.com": second } }));
    let completed = proxy.controller.completed();
    let notified = completed.notified();
    tx.send(ReloadRequest {
        path: proxy.config_path().to_path_buf(),
    })
    .unwrap();
    tokio::time::timeout(Duration::from_secs(5), notified)
        .await
        .expect("reload did not complete");

    assert_eq!(proxy.controller.snapshots().load().version(), 2);
    assert_eq!(proxy.get("a.example.com").await.text().await.unwrap(), "second");
}
