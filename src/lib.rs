//! Nextcloud Exporter Library
//!
//! Scrapes the serverinfo endpoint of a Nextcloud instance and republishes
//! the returned metrics in Prometheus exposition format.
//!
//! # Architecture
//!
//! The system follows an explicit data flow, triggered per scrape:
//!
//! ```text
//! exposition server → collector → client → serverinfo endpoint
//! ```
//!
//! # Design Principles
//!
//! - **One scrape, one fetch**: each scrape of `/metrics` performs exactly one
//!   best-effort request against the serverinfo endpoint
//! - **No history**: the status document is an immutable snapshot, discarded
//!   after metric extraction
//! - **Failures are observable**: a failed scrape sets `nextcloud_up` to 0 and
//!   counts the error by cause instead of failing the exposition endpoint
//! - **All-or-nothing**: a scrape either emits the full domain sample set or
//!   none of it
//!
//! # Example
//!
//! ```no_run
//! use nextcloud_exporter::client::{Auth, ClientConfig, StatusClient};
//! use nextcloud_exporter::collector::NextcloudCollector;
//! use prometheus::Registry;
//! use std::time::Duration;
//!
//! let client = StatusClient::new(ClientConfig {
//!     url: "https://cloud.example.com/ocs/v2.php/apps/serverinfo/api/v1/info?format=json".into(),
//!     auth: Auth::Token("token".into()),
//!     timeout: Duration::from_secs(5),
//!     user_agent: nextcloud_exporter::config::user_agent(),
//!     tls_skip_verify: false,
//! }).unwrap();
//!
//! let registry = Registry::new();
//! NextcloudCollector::new(Box::new(client))
//!     .unwrap()
//!     .register(&registry)
//!     .unwrap();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod client;
pub mod collector;
pub mod config;
pub mod server;
pub mod serverinfo;

// Re-export commonly used types at crate root
pub use client::{Auth, ClientConfig, ClientError, InfoClient, StatusClient};
pub use collector::NextcloudCollector;
pub use config::{Cli, ConfigError, Settings};
pub use server::{MetricsServer, MetricsServerConfig};
pub use serverinfo::ServerInfo;

/// Exporter version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
