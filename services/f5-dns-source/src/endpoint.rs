//! Endpoint records
//!
//! The canonical (hostname, targets, TTL) tuples handed to the reconciler.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Label key holding the provenance tag of the object that produced a record
pub const RESOURCE_LABEL_KEY: &str = "resource";

/// DNS record type, chosen by the address family of the targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    #[allow(clippy::upper_case_acronyms)]
    AAAA,
    #[allow(clippy::upper_case_acronyms)]
    CNAME,
}

impl RecordType {
    /// Record type a single target would need
    pub fn for_target(target: &str) -> Self {
        if target.parse::<Ipv4Addr>().is_ok() {
            RecordType::A
        } else if target.parse::<Ipv6Addr>().is_ok() {
            RecordType::AAAA
        } else {
            RecordType::CNAME
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordType::A => write!(f, "A"),
            RecordType::AAAA => write!(f, "AAAA"),
            RecordType::CNAME => write!(f, "CNAME"),
        }
    }
}

/// Record TTL in seconds. `None` on an endpoint means "provider default".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ttl(pub u32);

impl Ttl {
    pub fn seconds(self) -> u32 {
        self.0
    }
}

/// Ordered target list of one record
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Targets(Vec<String>);

impl Targets {
    pub fn new(targets: Vec<String>) -> Self {
        Self(targets)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn push(&mut self, target: impl Into<String>) {
        self.0.push(target.into());
    }

    /// Lexicographic sort so repeated synthesis is byte-for-byte stable
    pub fn sort(&mut self) {
        self.0.sort();
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for Targets {
    fn from(targets: Vec<String>) -> Self {
        Self(targets)
    }
}

impl<'a> IntoIterator for &'a Targets {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Record labels. This source only ever sets [`RESOURCE_LABEL_KEY`].
pub type Labels = BTreeMap<String, String>;

/// Provider-specific property attached to a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderSpecificProperty {
    pub name: String,
    pub value: String,
}

/// A DNS endpoint produced from one watched object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub dns_name: String,
    pub targets: Targets,
    pub record_type: RecordType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub set_identifier: String,
    #[serde(rename = "recordTTL", default, skip_serializing_if = "Option::is_none")]
    pub record_ttl: Option<Ttl>,
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provider_specific: Vec<ProviderSpecificProperty>,
}

impl Endpoint {
    /// Build an endpoint; one trailing dot is trimmed from the name and each target
    pub fn new(dns_name: &str, record_type: RecordType, ttl: Option<Ttl>, targets: Vec<String>) -> Self {
        let targets = targets
            .into_iter()
            .map(|t| t.strip_suffix('.').map(str::to_string).unwrap_or(t))
            .collect();

        Self {
            dns_name: dns_name.strip_suffix('.').unwrap_or(dns_name).to_string(),
            targets: Targets::new(targets),
            record_type,
            set_identifier: String::new(),
            record_ttl: ttl,
            labels: Labels::new(),
            provider_specific: Vec::new(),
        }
    }

    /// Provenance tag, if one was attached
    pub fn resource(&self) -> Option<&str> {
        self.labels.get(RESOURCE_LABEL_KEY).map(String::as_str)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} [{}]", self.dns_name, self.record_type, self.targets.as_slice().join(","))?;
        if let Some(ttl) = self.record_ttl {
            write!(f, " ttl={}", ttl.seconds())?;
        }
        Ok(())
    }
}

/// Endpoints for one hostname, one per address family present in `targets`
///
/// Targets are grouped into A, AAAA and CNAME records (in that order); empty
/// groups produce nothing, so an empty target list yields no endpoints. A
/// hostname that is empty once its trailing dot is removed yields none either.
pub fn endpoints_for_hostname(
    hostname: &str,
    targets: &Targets,
    ttl: Option<Ttl>,
    provider_specific: &[ProviderSpecificProperty],
    set_identifier: &str,
    resource: &str,
) -> Vec<Endpoint> {
    if hostname.strip_suffix('.').unwrap_or(hostname).is_empty() {
        return Vec::new();
    }

    let mut groups: BTreeMap<RecordType, Vec<String>> = BTreeMap::new();
    for target in targets {
        groups
            .entry(RecordType::for_target(target))
            .or_default()
            .push(target.clone());
    }

    groups
        .into_iter()
        .map(|(record_type, group)| {
            let mut endpoint = Endpoint::new(hostname, record_type, ttl, group);
            endpoint.provider_specific = provider_specific.to_vec();
            endpoint.set_identifier = set_identifier.to_string();
            if !resource.is_empty() {
                endpoint
                    .labels
                    .insert(RESOURCE_LABEL_KEY.to_string(), resource.to_string());
            }
            endpoint
        })
        .collect()
}
