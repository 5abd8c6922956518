//! Endpoint synthesis for VirtualServers
//!
//! Pure transformation from typed, already-filtered VirtualServers to DNS
//! endpoints. Nothing here fails: objects without usable data are logged and
//! produce no endpoints.
//!
//! Target precedence, first non-empty source wins and sources are never merged:
//!
//! 1. `external-dns.alpha.kubernetes.io/target` annotation
//! 2. `spec.virtualServerAddress`
//! 3. `status.vsAddress`

use kube::ResourceExt;
use tracing::{debug, warn};

use crate::annotations::{targets_from_target_annotation, ttl_from_annotations};
use crate::endpoint::{endpoints_for_hostname, Endpoint, Targets};
use crate::virtualserver::VirtualServer;

/// Endpoints for every VirtualServer, in input order
pub fn endpoints_from_virtual_servers(virtual_servers: &[VirtualServer]) -> Vec<Endpoint> {
    virtual_servers
        .iter()
        .flat_map(endpoints_for_virtual_server)
        .collect()
}

/// Endpoints for one VirtualServer, each with sorted targets
pub fn endpoints_for_virtual_server(vs: &VirtualServer) -> Vec<Endpoint> {
    let namespace = vs.namespace().unwrap_or_default();
    let name = vs.name_any();

    if !vs.has_valid_address() {
        warn!(
            namespace = %namespace,
            name = %name,
            "F5 VirtualServer is missing a valid IP address, skipping endpoint creation"
        );
        return Vec::new();
    }

    let host = vs.spec.host.strip_suffix('.').unwrap_or(&vs.spec.host);
    if host.is_empty() {
        warn!(
            namespace = %namespace,
            name = %name,
            "F5 VirtualServer has no host, skipping endpoint creation"
        );
        return Vec::new();
    }

    let resource = vs.resource_tag();
    let ttl = ttl_from_annotations(vs.annotations(), &resource);
    let targets = resolve_targets(vs);

    if targets.is_empty() {
        debug!(resource = %resource, "No targets resolved");
        return Vec::new();
    }

    let mut endpoints = endpoints_for_hostname(&vs.spec.host, &targets, ttl, &[], "", &resource);
    for endpoint in &mut endpoints {
        endpoint.targets.sort();
    }
    endpoints
}

/// Targets from the highest-precedence source that yields any
pub fn resolve_targets(vs: &VirtualServer) -> Targets {
    let targets = targets_from_target_annotation(vs.annotations());
    if !targets.is_empty() {
        return targets;
    }

    if !vs.spec.virtual_server_address.is_empty() {
        return Targets::new(vec![vs.spec.virtual_server_address.clone()]);
    }

    let status_address = vs.status_address();
    if !status_address.is_empty() {
        return Targets::new(vec![status_address.to_string()]);
    }

    Targets::default()
}
