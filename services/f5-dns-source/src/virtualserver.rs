//! F5 CIS VirtualServer resource
//!
//! Typed view of `virtualservers.cis.f5.com/v1` and the decode step from the
//! untyped objects held in the watch cache.

use kube::api::DynamicObject;
use kube::{CustomResource, Resource, ResourceExt};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SourceError};

/// Kind prefix used in provenance tags
pub const RESOURCE_KIND: &str = "f5-virtualserver";

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "cis.f5.com",
    version = "v1",
    kind = "VirtualServer",
    plural = "virtualservers",
    namespaced,
    status = "VirtualServerStatus",
    schema = "disabled",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct VirtualServerSpec {
    /// Hostname the DNS record is created for
    #[serde(default)]
    pub host: String,
    /// Address requested by the user
    #[serde(default)]
    pub virtual_server_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipam_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_server_name: Option<String>,
    #[serde(
        rename = "virtualServerHTTPPort",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub virtual_server_http_port: Option<i32>,
    #[serde(
        rename = "virtualServerHTTPSPort",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub virtual_server_https_port: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualServerStatus {
    /// Address assigned by the controller (may be IPAM-allocated)
    #[serde(default)]
    pub vs_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VirtualServer {
    /// `f5-virtualserver/<namespace>/<name>`
    pub fn resource_tag(&self) -> String {
        format!(
            "{}/{}/{}",
            RESOURCE_KIND,
            self.namespace().unwrap_or_default(),
            self.name_any()
        )
    }

    /// Observed address from status, empty when no status was reported
    pub fn status_address(&self) -> &str {
        self.status
            .as_ref()
            .map(|s| s.vs_address.as_str())
            .unwrap_or_default()
    }

    /// Whether the controller has assigned a usable address
    pub fn has_valid_address(&self) -> bool {
        let normalized = self.status_address().to_lowercase();
        !normalized.is_empty() && normalized != "none"
    }
}

impl TryFrom<&DynamicObject> for VirtualServer {
    type Error = SourceError;

    fn try_from(obj: &DynamicObject) -> Result<Self> {
        from_dynamic(obj)
    }
}

/// Decode an untyped cache object into a [`VirtualServer`]
///
/// Fails when the object carries a different apiVersion/kind, has no name, or
/// its spec/status do not deserialize. The input is never modified.
pub fn from_dynamic(obj: &DynamicObject) -> Result<VirtualServer> {
    let identity = format!(
        "{}/{}/{}",
        RESOURCE_KIND,
        obj.metadata.namespace.as_deref().unwrap_or_default(),
        obj.metadata.name.as_deref().unwrap_or("<unnamed>")
    );

    if let Some(types) = &obj.types {
        let api_version = VirtualServer::api_version(&());
        let kind = VirtualServer::kind(&());
        if types.api_version != api_version || types.kind != kind {
            return Err(SourceError::conversion(
                identity,
                format!(
                    "unexpected type {}/{}, expected {}/{}",
                    types.api_version, types.kind, api_version, kind
                ),
            ));
        }
    }

    if obj.metadata.name.as_deref().map_or(true, str::is_empty) {
        return Err(SourceError::conversion(identity, "metadata.name is missing"));
    }

    let value = serde_json::to_value(obj).map_err(|e| SourceError::conversion(&identity, e))?;
    serde_json::from_value(value).map_err(|e| SourceError::conversion(identity, e))
}
