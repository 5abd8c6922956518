//! Contract: the resource cache mirrors the watch stream and never blocks reads.

mod common;

use common::*;
use f5_dns_source::{Selector, SourceError};
use kube::runtime::watcher;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn start_times_out_without_initial_listing() {
    let (cache, _tx) = fake_cache(Some("default"));

    let err = assert_err!(cache.start(Duration::from_millis(100)).await);

    assert!(matches!(err, SourceError::SyncTimeout { .. }), "got {err}");
    assert!(!cache.has_synced());
}

#[tokio::test]
async fn start_fails_when_watch_ends_before_sync() {
    let (cache, tx) = fake_cache(None);
    drop(tx);

    let err = assert_err!(cache.start(SYNC_TIMEOUT).await);
    assert!(matches!(err, SourceError::CacheRead(_)), "got {err}");
}

#[tokio::test]
async fn list_reflects_initial_listing_in_stable_order() {
    let (cache, _tx) = synced_cache(vec![
        virtual_server(Vs { namespace: "b", name: "vs2", ..Default::default() }),
        virtual_server(Vs { namespace: "a", name: "vs9", ..Default::default() }),
        virtual_server(Vs { namespace: "b", name: "vs1", ..Default::default() }),
    ])
    .await;

    let objects = assert_ok!(cache.list(None, &Selector::everything()));
    let keys: Vec<(String, String)> = objects
        .iter()
        .map(|o| {
            (
                o.metadata.namespace.clone().unwrap_or_default(),
                o.metadata.name.clone().unwrap_or_default(),
            )
        })
        .collect();

    assert_eq!(
        keys,
        vec![
            ("a".to_string(), "vs9".to_string()),
            ("b".to_string(), "vs1".to_string()),
            ("b".to_string(), "vs2".to_string()),
        ]
    );
}

#[tokio::test]
async fn list_narrows_by_namespace_and_labels() {
    let (cache, _tx) = synced_cache(vec![
        virtual_server(Vs { namespace: "edge", name: "vs1", labels: &[("tier", "web")], ..Default::default() }),
        virtual_server(Vs { namespace: "edge", name: "vs2", labels: &[("tier", "db")], ..Default::default() }),
        virtual_server(Vs { namespace: "core", name: "vs3", labels: &[("tier", "web")], ..Default::default() }),
    ])
    .await;

    let selector = Selector::parse("tier=web").unwrap();

    assert_eq!(cache.list(Some("edge"), &Selector::everything()).unwrap().len(), 2);
    assert_eq!(cache.list(None, &selector).unwrap().len(), 2);
    assert_eq!(cache.list(Some("edge"), &selector).unwrap().len(), 1);
}

#[tokio::test]
async fn applied_and_deleted_events_update_snapshot() {
    let (cache, tx) = synced_cache(vec![]).await;
    assert!(cache.list(None, &Selector::everything()).unwrap().is_empty());

    let vs = virtual_server(Vs::default());
    tx.unbounded_send(Ok(watcher::Event::Applied(vs.clone()))).unwrap();
    settle().await;
    assert_eq!(cache.list(None, &Selector::everything()).unwrap().len(), 1);

    tx.unbounded_send(Ok(watcher::Event::Deleted(vs))).unwrap();
    settle().await;
    assert!(cache.list(None, &Selector::everything()).unwrap().is_empty());
}

#[tokio::test]
async fn relist_replaces_snapshot() {
    let (cache, tx) = synced_cache(vec![
        virtual_server(Vs { name: "old", ..Default::default() }),
    ])
    .await;

    tx.unbounded_send(Ok(watcher::Event::Restarted(vec![
        virtual_server(Vs { name: "new", ..Default::default() }),
    ])))
    .unwrap();
    settle().await;

    let objects = cache.list(None, &Selector::everything()).unwrap();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].metadata.name.as_deref(), Some("new"));
}

#[tokio::test]
async fn list_fails_once_watch_has_ended() {
    let (cache, tx) = synced_cache(vec![virtual_server(Vs::default())]).await;

    drop(tx);
    settle().await;

    let err = assert_err!(cache.list(None, &Selector::everything()));
    assert!(matches!(err, SourceError::CacheRead(_)), "got {err}");
}
