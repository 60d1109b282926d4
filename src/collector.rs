//! Prometheus collector for Nextcloud serverinfo metrics.
//!
//! Every scrape of the exposition endpoint triggers exactly one fetch of the
//! status document, which is then decomposed into independent samples.
//!
//! # Metrics Exposed
//!
//! ## Scrape Health
//! - `nextcloud_up` - Whether the last scrape of the serverinfo endpoint succeeded
//! - `nextcloud_scrape_errors_total{cause}` - Scrape errors by cause (`auth`/`other`)
//!
//! ## System
//! - `nextcloud_system_info{version}` - Server version as a label, value is always 1
//! - `nextcloud_apps_installed_total` - Installed apps
//! - `nextcloud_apps_updates_available_total` - Apps with pending updates
//! - `nextcloud_free_space_bytes` - Free space in the data directory
//!
//! ## Usage
//! - `nextcloud_users_total`, `nextcloud_files_total`, `nextcloud_active_users_total`
//! - `nextcloud_shares_total{type}` - Shares by type (`user`/`group`/`link`/`authlink`)
//! - `nextcloud_shares_federated_total{direction}` - Federated shares (`sent`/`received`)
//!
//! ## Runtime
//! - `nextcloud_php_info{version}`, `nextcloud_php_memory_limit_bytes`,
//!   `nextcloud_php_upload_max_size_bytes`
//! - `nextcloud_php_opcache_{hits,misses,scripts,keys}_total`
//! - `nextcloud_php_apcu_{hits,misses,inserts,keys}_total`
//! - `nextcloud_database_size_bytes{version,type}`
//!
//! A failed scrape emits only the health metrics: no domain data rather than
//! partial data. Errors are logged and never propagate to the metrics server.

use crate::client::{ClientError, InfoClient};
use crate::serverinfo::ServerInfo;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{CounterVec, Gauge, GaugeVec, Opts, Registry};
use std::collections::HashMap;
use thiserror::Error;

const CAUSE_AUTH: &str = "auth";
const CAUSE_OTHER: &str = "other";

struct ScalarMetric {
    name: &'static str,
    help: &'static str,
    value: fn(&ServerInfo) -> f64,
}

/// Unlabeled gauges read directly from one field of the status document.
const SCALAR_METRICS: &[ScalarMetric] = &[
    ScalarMetric {
        name: "nextcloud_apps_installed_total",
        help: "Number of currently installed apps",
        value: |s| s.data.nextcloud.system.apps.installed as f64,
    },
    ScalarMetric {
        name: "nextcloud_apps_updates_available_total",
        help: "Number of apps that have available updates",
        value: |s| s.data.nextcloud.system.apps.available_updates as f64,
    },
    ScalarMetric {
        name: "nextcloud_users_total",
        help: "Number of users of the instance.",
        value: |s| s.data.nextcloud.storage.users as f64,
    },
    ScalarMetric {
        name: "nextcloud_files_total",
        help: "Number of files served by the instance.",
        value: |s| s.data.nextcloud.storage.files as f64,
    },
    ScalarMetric {
        name: "nextcloud_free_space_bytes",
        help: "Free disk space in data directory in bytes.",
        value: |s| s.data.nextcloud.system.free_space as f64,
    },
    ScalarMetric {
        name: "nextcloud_active_users_total",
        help: "Number of active users for the last five minutes.",
        value: |s| s.data.active_users.last_five_minutes as f64,
    },
    ScalarMetric {
        name: "nextcloud_php_memory_limit_bytes",
        help: "Configured PHP memory limit in bytes.",
        value: |s| s.data.server.php.memory_limit as f64,
    },
    ScalarMetric {
        name: "nextcloud_php_upload_max_size_bytes",
        help: "Configured maximum upload size in bytes.",
        value: |s| s.data.server.php.upload_max_filesize as f64,
    },
    ScalarMetric {
        name: "nextcloud_php_opcache_hits_total",
        help: "Number of hits to scripts cached in OpCache.",
        value: |s| s.data.server.php.opcache.statistics.hits as f64,
    },
    ScalarMetric {
        name: "nextcloud_php_opcache_misses_total",
        help: "Number of misses in OpCache.",
        value: |s| s.data.server.php.opcache.statistics.misses as f64,
    },
    ScalarMetric {
        name: "nextcloud_php_opcache_scripts_total",
        help: "Number of scripts cached in OpCache.",
        value: |s| s.data.server.php.opcache.statistics.cached_scripts as f64,
    },
    ScalarMetric {
        name: "nextcloud_php_opcache_keys_total",
        help: "Number of keys in OpCache.",
        value: |s| s.data.server.php.opcache.statistics.cached_keys as f64,
    },
    ScalarMetric {
        name: "nextcloud_php_apcu_hits_total",
        help: "Number of hits in APCu cache.",
        value: |s| s.data.server.php.apcu.cache.hits as f64,
    },
    ScalarMetric {
        name: "nextcloud_php_apcu_misses_total",
        help: "Number of misses in APCu cache.",
        value: |s| s.data.server.php.apcu.cache.misses as f64,
    },
    ScalarMetric {
        name: "nextcloud_php_apcu_inserts_total",
        help: "Number of inserts into APCu cache.",
        value: |s| s.data.server.php.apcu.cache.inserts as f64,
    },
    ScalarMetric {
        name: "nextcloud_php_apcu_keys_total",
        help: "Number of entries cached in APCu.",
        value: |s| s.data.server.php.apcu.cache.entries as f64,
    },
];

const SHARES_NAME: &str = "nextcloud_shares_total";
const SHARES_HELP: &str = "Number of shares by type.";
const FEDERATED_NAME: &str = "nextcloud_shares_federated_total";
const FEDERATED_HELP: &str = "Number of federated shares by direction.";
const DATABASE_SIZE_NAME: &str = "nextcloud_database_size_bytes";
const DATABASE_SIZE_HELP: &str = "Size of database in bytes as reported from engine.";
const SYSTEM_INFO_NAME: &str = "nextcloud_system_info";
const SYSTEM_INFO_HELP: &str = "Contains meta information about Nextcloud as labels. Value is always 1.";
const PHP_INFO_NAME: &str = "nextcloud_php_info";
const PHP_INFO_HELP: &str = "Contains meta information about PHP as labels. Value is always 1.";

/// Labeled metrics and their variable label names.
const LABELED_METRICS: &[(&str, &str, &[&str])] = &[
    (SHARES_NAME, SHARES_HELP, &["type"]),
    (FEDERATED_NAME, FEDERATED_HELP, &["direction"]),
    (DATABASE_SIZE_NAME, DATABASE_SIZE_HELP, &["version", "type"]),
    (SYSTEM_INFO_NAME, SYSTEM_INFO_HELP, &["version"]),
    (PHP_INFO_NAME, PHP_INFO_HELP, &["version"]),
];

/// Errors that can occur within a single scrape.
#[derive(Debug, Error)]
enum ScrapeError {
    #[error(transparent)]
    Fetch(#[from] ClientError),
    #[error("error creating metric: {0}")]
    Mapping(#[from] prometheus::Error),
}

/// Prometheus collector that scrapes a Nextcloud instance on demand.
///
/// Domain samples are constructed fresh on every scrape and discarded after
/// emission; only the two scrape-health instruments persist across scrapes.
pub struct NextcloudCollector {
    client: Box<dyn InfoClient + Send + Sync>,
    descs: Vec<Desc>,
    up: Gauge,
    scrape_errors: CounterVec,
}

impl NextcloudCollector {
    /// Creates a collector that fetches the status document via `client`.
    pub fn new(client: Box<dyn InfoClient + Send + Sync>) -> Result<Self, prometheus::Error> {
        let up = Gauge::with_opts(Opts::new(
            "nextcloud_up",
            "Indicates if the metrics could be scraped by the exporter.",
        ))?;
        let scrape_errors = CounterVec::new(
            Opts::new(
                "nextcloud_scrape_errors_total",
                "Counts the number of scrape errors by this collector.",
            ),
            &["cause"],
        )?;

        Ok(Self {
            client,
            descs: build_descs()?,
            up,
            scrape_errors,
        })
    }

    /// Registers the collector, surfacing descriptor collisions at startup.
    pub fn register(self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self))
    }

    fn scrape(&self) -> Result<Vec<MetricFamily>, ScrapeError> {
        let status = self.client.fetch()?;
        Ok(read_metrics(&status)?)
    }
}

impl Collector for NextcloudCollector {
    fn desc(&self) -> Vec<&Desc> {
        let mut descs: Vec<&Desc> = Vec::new();
        descs.extend(self.up.desc());
        descs.extend(self.scrape_errors.desc());
        descs.extend(self.descs.iter());
        descs
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut families = match self.scrape() {
            Ok(families) => {
                self.up.set(1.0);
                families
            }
            Err(err) => {
                tracing::error!("Error during scrape: {}", err);

                let cause = match err {
                    ScrapeError::Fetch(ClientError::NotAuthorized) => CAUSE_AUTH,
                    _ => CAUSE_OTHER,
                };
                self.scrape_errors.with_label_values(&[cause]).inc();
                self.up.set(0.0);
                Vec::new()
            }
        };

        families.extend(self.up.collect());
        families.extend(self.scrape_errors.collect());
        families
    }
}

fn build_descs() -> Result<Vec<Desc>, prometheus::Error> {
    let mut descs = Vec::new();
    for metric in SCALAR_METRICS {
        descs.push(Desc::new(
            metric.name.to_string(),
            metric.help.to_string(),
            Vec::new(),
            HashMap::new(),
        )?);
    }
    for (name, help, labels) in LABELED_METRICS {
        descs.push(Desc::new(
            name.to_string(),
            help.to_string(),
            labels.iter().map(|l| l.to_string()).collect(),
            HashMap::new(),
        )?);
    }
    Ok(descs)
}

/// Maps one status document to its full sample set.
///
/// Any sample-construction failure aborts the remaining mapping: a malformed
/// mapping invalidates the whole scrape rather than emitting a partial set.
fn read_metrics(status: &ServerInfo) -> Result<Vec<MetricFamily>, prometheus::Error> {
    let mut families = Vec::new();

    for metric in SCALAR_METRICS {
        let gauge = Gauge::with_opts(Opts::new(metric.name, metric.help))?;
        gauge.set((metric.value)(status));
        families.extend(gauge.collect());
    }

    let shares = &status.data.nextcloud.shares;
    families.extend(labeled_gauge(
        SHARES_NAME,
        SHARES_HELP,
        "type",
        &[
            ("user", shares.user),
            ("group", shares.group),
            ("link", shares.link),
            // Password-protected link shares. Not clamped; inconsistent
            // upstream counters pass through as a negative value.
            ("authlink", shares.link - shares.link_no_password),
        ],
    )?);
    families.extend(labeled_gauge(
        FEDERATED_NAME,
        FEDERATED_HELP,
        "direction",
        &[
            ("sent", shares.federated_sent),
            ("received", shares.federated_received),
        ],
    )?);

    let database = &status.data.server.database;
    let size = GaugeVec::new(
        Opts::new(DATABASE_SIZE_NAME, DATABASE_SIZE_HELP),
        &["version", "type"],
    )?;
    size.get_metric_with_label_values(&[&database.version, &database.db_type])?
        .set(database.size as f64);
    families.extend(size.collect());

    families.extend(info_metric(
        SYSTEM_INFO_NAME,
        SYSTEM_INFO_HELP,
        &status.data.nextcloud.system.version,
    )?);
    families.extend(info_metric(
        PHP_INFO_NAME,
        PHP_INFO_HELP,
        &status.data.server.php.version,
    )?);

    Ok(families)
}

fn labeled_gauge(
    name: &str,
    help: &str,
    label: &str,
    values: &[(&str, i64)],
) -> Result<Vec<MetricFamily>, prometheus::Error> {
    let vec = GaugeVec::new(Opts::new(name, help), &[label])?;
    for (label_value, value) in values {
        vec.get_metric_with_label_values(&[label_value])?
            .set(*value as f64);
    }
    Ok(vec.collect())
}

fn info_metric(name: &str, help: &str, version: &str) -> Result<Vec<MetricFamily>, prometheus::Error> {
    let vec = GaugeVec::new(Opts::new(name, help), &["version"])?;
    vec.get_metric_with_label_values(&[version])?.set(1.0);
    Ok(vec.collect())
}
