//! Contract: constructing the source against a real client.
//!
//! - A malformed annotation filter is rejected before any watch starts
//! - A cache that never lists fails construction with `SyncTimeout`

use f5_dns_source::{F5VirtualServerSource, SourceConfig, SourceError};
use kube::{Client, Config};
use std::time::{Duration, Instant};

/// Client pointed at a port nothing listens on; every request fails.
fn unreachable_client() -> Client {
    let config = Config::new("http://127.0.0.1:9".parse().unwrap());
    Client::try_from(config).unwrap()
}

#[tokio::test]
async fn malformed_filter_fails_before_watching() {
    let config = SourceConfig {
        annotation_filter: "environment in prod".to_string(),
        sync_timeout: Duration::from_secs(30),
        ..Default::default()
    };

    let started = Instant::now();
    let err = F5VirtualServerSource::new(unreachable_client(), &config)
        .await
        .unwrap_err();

    assert!(matches!(err, SourceError::FilterSyntax { .. }), "got {err}");
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn unreachable_api_times_out_sync() {
    let config = SourceConfig {
        annotation_filter: "environment=prod".to_string(),
        sync_timeout: Duration::from_millis(200),
        ..Default::default()
    };

    let err = F5VirtualServerSource::new(unreachable_client(), &config)
        .await
        .unwrap_err();

    assert!(matches!(err, SourceError::SyncTimeout { .. }), "got {err}");
}
