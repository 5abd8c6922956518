//! Source configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long construction waits for the initial listing
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SourceConfig {
    /// Namespace to watch; empty for all namespaces
    pub namespace: String,
    /// Annotation filter expression in label-selector syntax; empty matches everything
    pub annotation_filter: String,
    /// Deadline for the initial cache sync
    #[serde(with = "humantime_serde")]
    pub sync_timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            annotation_filter: String::new(),
            sync_timeout: DEFAULT_SYNC_TIMEOUT,
        }
    }
}

impl SourceConfig {
    pub fn namespace(&self) -> Option<&str> {
        match self.namespace.trim() {
            "" => None,
            ns => Some(ns),
        }
    }
}

mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SourceConfig::default();
        assert_eq!(config.namespace(), None);
        assert_eq!(config.annotation_filter, "");
        assert_eq!(config.sync_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: SourceConfig = serde_json::from_str(
            r#"{"namespace": "edge", "syncTimeout": "2m 30s"}"#,
        )
        .unwrap();

        assert_eq!(config.namespace(), Some("edge"));
        assert_eq!(config.annotation_filter, "");
        assert_eq!(config.sync_timeout, Duration::from_secs(150));
    }

    #[test]
    fn test_blank_namespace_means_all() {
        let config = SourceConfig {
            namespace: "  ".to_string(),
            ..Default::default()
        };
        assert_eq!(config.namespace(), None);
    }
}
