//! Source errors
//!
//! Only upstream failures surface here. Per-object data problems (no usable
//! address, empty target list) are logged and skipped, never returned.

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SourceError>;

#[derive(Error, Debug)]
pub enum SourceError {
    /// Initial listing did not complete before the deadline. Fatal at construction.
    #[error("failed to sync {resource} with timeout {timeout:?}")]
    SyncTimeout { resource: String, timeout: Duration },

    /// Malformed annotation filter expression. Fatal at construction.
    #[error("invalid annotation filter {expression:?}: {reason}")]
    FilterSyntax { expression: String, reason: String },

    /// The local cache could not be read (watch task gone).
    #[error("cache read failed: {0}")]
    CacheRead(String),

    /// A cached object does not have the expected shape.
    #[error("failed to convert {resource}: {reason}")]
    Conversion { resource: String, reason: String },
}

impl SourceError {
    pub(crate) fn filter_syntax(expression: &str, reason: impl Into<String>) -> Self {
        Self::FilterSyntax {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn conversion(resource: impl Into<String>, reason: impl ToString) -> Self {
        Self::Conversion {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_timeout_message() {
        let err = SourceError::SyncTimeout {
            resource: "cis.f5.com/v1/virtualservers".to_string(),
            timeout: Duration::from_secs(60),
        };

        assert_eq!(
            err.to_string(),
            "failed to sync cis.f5.com/v1/virtualservers with timeout 60s"
        );
    }

    #[test]
    fn test_conversion_message_names_resource() {
        let err = SourceError::conversion("f5-virtualserver/default/vs1", "missing field `name`");
        assert!(err.to_string().contains("f5-virtualserver/default/vs1"));
    }
}
