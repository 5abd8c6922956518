//! Resource cache
//!
//! Local mirror of one watched resource kind, kept up to date by a single
//! background task driving a kube watcher through a reflector store.
//!
//! ## How It Works
//!
//! 1. The watcher lists, then watches, the resource in one namespace (or all)
//! 2. The reflector applies every event to the store
//! 3. After the store is updated, registered event handlers are notified
//! 4. `list` reads a snapshot of the store without touching the network

use futures::{Stream, StreamExt};
use kube::api::{Api, DynamicObject};
use kube::discovery::ApiResource;
use kube::runtime::reflector::{self, store::Writer, Store};
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Client, ResourceExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Result, SourceError};
use crate::events::{EventHandler, EventRelay};
use crate::selector::Selector;

pub struct ResourceCache {
    resource: String,
    store: Store<DynamicObject>,
    relay: EventRelay,
    synced: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl ResourceCache {
    /// Watch `api_resource` in `namespace` (`None` for all namespaces)
    pub fn watch(client: Client, api_resource: ApiResource, namespace: Option<&str>) -> Self {
        let api: Api<DynamicObject> = match namespace {
            Some(ns) => Api::namespaced_with(client, ns, &api_resource),
            None => Api::all_with(client, &api_resource),
        };

        let stream = watcher(api, watcher::Config::default()).default_backoff();
        Self::from_stream(api_resource, namespace, stream)
    }

    /// Build a cache fed by an arbitrary watcher event stream
    ///
    /// Must be called within a tokio runtime.
    pub fn from_stream<S>(api_resource: ApiResource, namespace: Option<&str>, stream: S) -> Self
    where
        S: Stream<Item = watcher::Result<watcher::Event<DynamicObject>>> + Send + 'static,
    {
        let resource = match namespace {
            Some(ns) => format!("{}/{} in namespace {}", api_resource.api_version, api_resource.plural, ns),
            None => format!("{}/{}", api_resource.api_version, api_resource.plural),
        };

        let writer = Writer::new(api_resource);
        let store = writer.as_reader();
        let relay = EventRelay::new();
        let (synced_tx, synced) = watch::channel(false);

        let task = tokio::spawn(drive(
            reflector::reflector(writer, stream),
            relay.clone(),
            synced_tx,
            resource.clone(),
        ));

        Self {
            resource,
            store,
            relay,
            synced,
            task,
        }
    }

    /// Wait until the initial listing has been applied
    pub async fn start(&self, timeout: Duration) -> Result<()> {
        let mut synced = self.synced.clone();
        // Release the watch::Ref before `synced` goes out of scope.
        let waited = tokio::time::timeout(timeout, synced.wait_for(|done| *done))
            .await
            .map(|r| r.map(|_| ()));

        match waited {
            Ok(Ok(())) => {
                info!(resource = %self.resource, "Cache synced");
                Ok(())
            }
            Ok(Err(_)) => Err(SourceError::CacheRead(format!(
                "watch for {} ended before initial sync",
                self.resource
            ))),
            Err(_) => Err(SourceError::SyncTimeout {
                resource: self.resource.clone(),
                timeout,
            }),
        }
    }

    pub fn has_synced(&self) -> bool {
        *self.synced.borrow()
    }

    /// Snapshot of cached objects, ordered by namespace then name
    ///
    /// `namespace` narrows the result further; `selector` matches object labels.
    pub fn list(&self, namespace: Option<&str>, selector: &Selector) -> Result<Vec<Arc<DynamicObject>>> {
        if self.task.is_finished() {
            return Err(SourceError::CacheRead(format!(
                "watch for {} is no longer running",
                self.resource
            )));
        }

        let mut objects: Vec<Arc<DynamicObject>> = self
            .store
            .state()
            .into_iter()
            .filter(|obj| namespace.map_or(true, |ns| obj.metadata.namespace.as_deref() == Some(ns)))
            .filter(|obj| selector.matches(obj.labels()))
            .collect();

        objects.sort_by(|a, b| {
            (&a.metadata.namespace, &a.metadata.name).cmp(&(&b.metadata.namespace, &b.metadata.name))
        });

        Ok(objects)
    }

    pub fn add_event_handler(&self, handler: EventHandler) {
        self.relay.add(handler);
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl Drop for ResourceCache {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("resource", &self.resource)
            .field("synced", &self.has_synced())
            .field("relay", &self.relay)
            .finish()
    }
}

/// Consume the reflector stream, notifying handlers after each applied event
async fn drive<S>(stream: S, relay: EventRelay, synced: watch::Sender<bool>, resource: String)
where
    S: Stream<Item = watcher::Result<watcher::Event<DynamicObject>>>,
{
    futures::pin_mut!(stream);

    info!(resource = %resource, "Starting watch");

    while let Some(event) = stream.next().await {
        match event {
            Ok(watcher::Event::Applied(obj)) => {
                debug!(
                    namespace = %obj.namespace().unwrap_or_default(),
                    name = %obj.name_any(),
                    "Object applied"
                );
                relay.dispatch();
            }
            Ok(watcher::Event::Deleted(obj)) => {
                debug!(
                    namespace = %obj.namespace().unwrap_or_default(),
                    name = %obj.name_any(),
                    "Object deleted"
                );
                relay.dispatch();
            }
            Ok(watcher::Event::Restarted(objs)) => {
                debug!(resource = %resource, count = objs.len(), "Watch (re)listed");
                relay.dispatch();
                // Handlers see the relist before `start` returns.
                synced.send_replace(true);
            }
            Err(e) => {
                warn!(resource = %resource, error = %e, "Watch error");
            }
        }
    }

    warn!(resource = %resource, "Watch stream ended");
}
