//! F5 VirtualServer DNS Source
//!
//! Mirrors F5 CIS VirtualServer resources and turns them into DNS endpoint
//! records for an external-dns style reconciler.
//!
//! ## Pipeline
//!
//! - **cache**: watch + reflector store, readable without blocking
//! - **virtualserver**: decode of untyped cache objects into typed resources
//! - **selector**: annotation filter compiled once at construction
//! - **synthesizer**: target precedence, TTL and record construction
//! - **events**: payload-free change notifications for the reconciler

pub mod annotations;
pub mod cache;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod events;
pub mod selector;
pub mod source;
pub mod synthesizer;
pub mod virtualserver;

pub use cache::ResourceCache;
pub use config::SourceConfig;
pub use endpoint::{Endpoint, RecordType, Targets, Ttl};
pub use error::{Result, SourceError};
pub use events::{notify_channel, EventHandler};
pub use selector::Selector;
pub use source::{F5VirtualServerSource, Source};
pub use virtualserver::VirtualServer;
