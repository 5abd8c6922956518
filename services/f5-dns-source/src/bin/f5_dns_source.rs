//! F5 DNS Source - Standalone Binary
//!
//! Prints the DNS endpoints derived from F5 VirtualServers as JSON, once or
//! every time the watched resources change.

use anyhow::{Context, Result};
use clap::Parser;
use kube::Client;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use f5_dns_source::{notify_channel, F5VirtualServerSource, Source, SourceConfig};

/// F5 DNS Source - DNS endpoints from F5 VirtualServers
#[derive(Parser, Debug)]
#[command(name = "f5-dns-source", version, about)]
struct Args {
    /// Namespace to watch (empty for all namespaces)
    #[arg(long, default_value = "", env = "NAMESPACE")]
    namespace: String,

    /// Annotation filter in label-selector syntax (e.g., "environment=prod")
    #[arg(long, default_value = "", env = "ANNOTATION_FILTER")]
    annotation_filter: String,

    /// Deadline for the initial cache sync (e.g., "60s", "2m")
    #[arg(long, default_value = "60s", env = "SYNC_TIMEOUT", value_parser = humantime::parse_duration)]
    sync_timeout: Duration,

    /// Minimum delay between two recomputations in watch mode
    #[arg(long, default_value = "1s", env = "MIN_INTERVAL", value_parser = humantime::parse_duration)]
    min_interval: Duration,

    /// Print endpoints once and exit
    #[arg(long, default_value = "false")]
    once: bool,

    /// Emit logs as JSON
    #[arg(long, default_value = "false", env = "JSON_LOGS")]
    json_logs: bool,
}

impl Args {
    fn source_config(&self) -> SourceConfig {
        SourceConfig {
            namespace: self.namespace.clone(),
            annotation_filter: self.annotation_filter.clone(),
            sync_timeout: self.sync_timeout,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if args.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }

    info!(
        namespace = %args.namespace,
        annotation_filter = %args.annotation_filter,
        "Starting F5 DNS source"
    );

    let client = Client::try_default()
        .await
        .context("Failed to create K8s client")?;

    let source = F5VirtualServerSource::new(client, &args.source_config())
        .await
        .context("Failed to start F5 VirtualServer source")?;

    if args.once {
        print_endpoints(&source).await?;
        return Ok(());
    }

    let (handler, mut changes) = notify_channel();
    source.add_event_handler(handler);

    let mut last = print_endpoints(&source).await?;

    loop {
        tokio::select! {
            changed = changes.recv() => {
                if changed.is_none() {
                    break;
                }
                // Let bursts of events settle into one recomputation.
                tokio::time::sleep(args.min_interval).await;
                let _ = changes.try_recv();

                match render(&source).await {
                    Ok(current) if current != last => {
                        println!("{}", current);
                        last = current;
                    }
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "Failed to produce endpoints"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}

async fn render(source: &F5VirtualServerSource) -> Result<String> {
    let endpoints = source.endpoints().await?;
    info!(count = endpoints.len(), "Produced endpoints");
    serde_json::to_string_pretty(&endpoints).context("Failed to serialize endpoints")
}

async fn print_endpoints(source: &F5VirtualServerSource) -> Result<String> {
    let rendered = render(source).await?;
    println!("{}", rendered);
    Ok(rendered)
}
