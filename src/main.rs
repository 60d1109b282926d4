//! Nextcloud Exporter
//!
//! Command-line entry point: resolves configuration, registers the collector
//! and serves the exposition endpoint.

use clap::Parser;
use nextcloud_exporter::client::{ClientConfig, StatusClient};
use nextcloud_exporter::collector::NextcloudCollector;
use nextcloud_exporter::config::{self, Cli, Settings};
use nextcloud_exporter::server::{MetricsServer, MetricsServerConfig};
use prometheus::Registry;
use tracing::info;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Nextcloud Exporter v{}", nextcloud_exporter::VERSION);

    let settings = match Settings::resolve(Cli::parse()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!(url = %settings.info_url, "Scraping server info");
    if settings.tls_skip_verify {
        info!("TLS certificate verification is disabled");
    }

    let client = match StatusClient::new(ClientConfig {
        url: settings.info_url,
        auth: settings.auth,
        timeout: settings.timeout,
        user_agent: config::user_agent(),
        tls_skip_verify: settings.tls_skip_verify,
    }) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to create client: {}", e);
            std::process::exit(1);
        }
    };

    let registry = Registry::new();
    let collector = match NextcloudCollector::new(Box::new(client)) {
        Ok(collector) => collector,
        Err(e) => {
            eprintln!("Failed to create collector: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = collector.register(&registry) {
        eprintln!("Failed to register collector: {}", e);
        std::process::exit(1);
    }

    let server = MetricsServer::new(
        MetricsServerConfig {
            bind_addr: settings.listen_address,
        },
        registry,
    );
    if let Err(e) = server.run().await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
