//! Shared fixtures: a cache fed by a hand-driven watcher event channel.

#![allow(dead_code)]

use f5_dns_source::source::api_resource;
use f5_dns_source::ResourceCache;
use futures::channel::mpsc::{unbounded, UnboundedSender};
use kube::api::DynamicObject;
use kube::runtime::watcher;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;

pub type EventSender = UnboundedSender<watcher::Result<watcher::Event<DynamicObject>>>;

pub const SYNC_TIMEOUT: Duration = Duration::from_secs(5);

/// Cache plus the sender standing in for the API server watch
pub fn fake_cache(namespace: Option<&str>) -> (ResourceCache, EventSender) {
    let (tx, rx) = unbounded();
    let cache = ResourceCache::from_stream(api_resource(), namespace, rx);
    (cache, tx)
}

/// Cache that has already observed `initial` as its first listing
pub async fn synced_cache(initial: Vec<DynamicObject>) -> (ResourceCache, EventSender) {
    let (cache, tx) = fake_cache(None);
    tx.unbounded_send(Ok(watcher::Event::Restarted(initial)))
        .expect("watch channel open");
    cache.start(SYNC_TIMEOUT).await.expect("cache syncs");
    (cache, tx)
}

/// Describes one VirtualServer fixture
pub struct Vs<'a> {
    pub namespace: &'a str,
    pub name: &'a str,
    pub host: &'a str,
    pub spec_address: &'a str,
    pub status_address: &'a str,
    pub annotations: &'a [(&'a str, &'a str)],
    pub labels: &'a [(&'a str, &'a str)],
}

impl Default for Vs<'_> {
    fn default() -> Self {
        Self {
            namespace: "default",
            name: "vs1",
            host: "a.example.com",
            spec_address: "",
            status_address: "10.0.0.5",
            annotations: &[],
            labels: &[],
        }
    }
}

fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn virtual_server(vs: Vs<'_>) -> DynamicObject {
    serde_json::from_value(json!({
        "apiVersion": "cis.f5.com/v1",
        "kind": "VirtualServer",
        "metadata": {
            "name": vs.name,
            "namespace": vs.namespace,
            "annotations": map(vs.annotations),
            "labels": map(vs.labels),
        },
        "spec": {
            "host": vs.host,
            "virtualServerAddress": vs.spec_address,
        },
        "status": {
            "vsAddress": vs.status_address,
        }
    }))
    .expect("valid VirtualServer fixture")
}

/// Let the cache task drain everything sent so far
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
