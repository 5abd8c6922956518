//! F5 VirtualServer endpoint source
//!
//! Reads VirtualServers from the local cache, decodes them, applies the
//! annotation filter and synthesizes DNS endpoints. Change notifications are
//! relayed from the cache so callers know when to ask again.

use async_trait::async_trait;
use kube::discovery::ApiResource;
use kube::{Client, ResourceExt};
use tracing::{debug, info};

use crate::cache::ResourceCache;
use crate::config::SourceConfig;
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::events::EventHandler;
use crate::selector::Selector;
use crate::synthesizer::endpoints_from_virtual_servers;
use crate::virtualserver::{self, VirtualServer};

/// Producer of DNS endpoints for a reconciler
#[async_trait]
pub trait Source: Send + Sync {
    /// Endpoints for every host/target combination currently known
    async fn endpoints(&self) -> Result<Vec<Endpoint>>;

    /// Register a callback invoked on every add, update or delete
    fn add_event_handler(&self, handler: EventHandler);
}

/// Source of endpoints from F5 CIS VirtualServer resources
#[derive(Debug)]
pub struct F5VirtualServerSource {
    cache: ResourceCache,
    namespace: Option<String>,
    annotation_filter: Selector,
}

impl F5VirtualServerSource {
    /// Watch VirtualServers and wait for the cache to sync
    ///
    /// Fails fast on a malformed annotation filter, before any watch is started.
    pub async fn new(client: Client, config: &SourceConfig) -> Result<Self> {
        let annotation_filter = Selector::parse(&config.annotation_filter)?;

        let cache = ResourceCache::watch(client, api_resource(), config.namespace());
        cache.start(config.sync_timeout).await?;

        info!(
            namespace = config.namespace().unwrap_or("<all>"),
            annotation_filter = %annotation_filter,
            "F5 VirtualServer source ready"
        );

        Ok(Self {
            cache,
            namespace: config.namespace().map(str::to_string),
            annotation_filter,
        })
    }

    /// Source over an existing cache
    pub fn with_cache(cache: ResourceCache, annotation_filter: Selector) -> Self {
        Self {
            cache,
            namespace: None,
            annotation_filter,
        }
    }

    /// Decoded VirtualServers from the current cache snapshot
    ///
    /// A single decode failure fails the whole call.
    pub fn virtual_servers(&self) -> Result<Vec<VirtualServer>> {
        self.cache
            .list(self.namespace.as_deref(), &Selector::everything())?
            .iter()
            .map(|obj| virtualserver::from_dynamic(obj))
            .collect()
    }

    /// Keep only VirtualServers whose annotations match the filter
    pub fn filter_by_annotations(&self, virtual_servers: Vec<VirtualServer>) -> Vec<VirtualServer> {
        if self.annotation_filter.is_empty() {
            return virtual_servers;
        }

        virtual_servers
            .into_iter()
            .filter(|vs| self.annotation_filter.matches(vs.annotations()))
            .collect()
    }

    pub fn annotation_filter(&self) -> &Selector {
        &self.annotation_filter
    }
}

#[async_trait]
impl Source for F5VirtualServerSource {
    async fn endpoints(&self) -> Result<Vec<Endpoint>> {
        let virtual_servers = self.filter_by_annotations(self.virtual_servers()?);
        let endpoints = endpoints_from_virtual_servers(&virtual_servers);

        debug!(
            virtual_servers = virtual_servers.len(),
            endpoints = endpoints.len(),
            "Produced endpoints"
        );

        Ok(endpoints)
    }

    fn add_event_handler(&self, handler: EventHandler) {
        debug!("Adding event handler for VirtualServer");
        self.cache.add_event_handler(handler);
    }
}

/// Dynamic API resource for `virtualservers.cis.f5.com/v1`
pub fn api_resource() -> ApiResource {
    ApiResource::erase::<VirtualServer>(&())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_resource() {
        let ar = api_resource();
        assert_eq!(ar.group, "cis.f5.com");
        assert_eq!(ar.version, "v1");
        assert_eq!(ar.api_version, "cis.f5.com/v1");
        assert_eq!(ar.kind, "VirtualServer");
        assert_eq!(ar.plural, "virtualservers");
    }
}
