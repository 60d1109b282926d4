//! Parsed representation of the Nextcloud serverinfo status document.
//!
//! Field names and nesting mirror the JSON returned by the serverinfo app
//! (`/ocs/v2.php/apps/serverinfo/api/v1/info?format=json`). Parsing is
//! all-or-nothing: a document missing required fields is rejected as a
//! whole rather than producing a partial snapshot.

use serde::{Deserialize, Deserializer};

/// Top-level status document, unwrapped from the `ocs` envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerInfo {
    /// OCS response metadata.
    pub meta: Meta,
    /// Payload with the actual server information.
    pub data: Data,
}

/// OCS response metadata block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Meta {
    /// Response status text (`"ok"` on success).
    #[serde(default)]
    pub status: String,
    /// Numeric OCS status code.
    #[serde(default, rename = "statuscode")]
    pub status_code: i64,
    /// Human-readable status message.
    #[serde(default)]
    pub message: String,
}

/// Payload of the status document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Data {
    /// Nextcloud application statistics.
    pub nextcloud: Nextcloud,
    /// Host server runtime information.
    pub server: Server,
    /// Recently active user counts.
    #[serde(rename = "activeUsers")]
    pub active_users: ActiveUsers,
}

/// Application-level statistics.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Nextcloud {
    /// System information (version, apps, free space).
    pub system: System,
    /// Storage counters.
    pub storage: Storage,
    /// Share counters.
    pub shares: Shares,
}

/// System information group.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct System {
    /// Nextcloud version string.
    pub version: String,
    /// Free disk space in the data directory, in bytes.
    #[serde(rename = "freespace")]
    pub free_space: i64,
    /// Installed application counters.
    pub apps: Apps,
}

/// Installed application counters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Apps {
    /// Number of installed apps.
    #[serde(rename = "num_installed")]
    pub installed: i64,
    /// Number of apps with an available update.
    #[serde(rename = "num_updates_available")]
    pub available_updates: i64,
}

/// Storage counters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    /// Number of users known to the instance.
    #[serde(rename = "num_users")]
    pub users: i64,
    /// Number of files served by the instance.
    #[serde(rename = "num_files")]
    pub files: i64,
    /// Number of configured storages.
    #[serde(default, rename = "num_storages")]
    pub storages: i64,
}

/// Share counters, by type and federation direction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Shares {
    /// Total number of shares.
    #[serde(default, rename = "num_shares")]
    pub total: i64,
    /// Shares with a single user.
    #[serde(rename = "num_shares_user")]
    pub user: i64,
    /// Shares with a group.
    #[serde(rename = "num_shares_groups")]
    pub group: i64,
    /// Link shares, with or without password.
    #[serde(rename = "num_shares_link")]
    pub link: i64,
    /// Link shares without a password.
    #[serde(rename = "num_shares_link_no_password")]
    pub link_no_password: i64,
    /// Federated shares sent to other servers.
    #[serde(rename = "num_fed_shares_sent")]
    pub federated_sent: i64,
    /// Federated shares received from other servers.
    #[serde(rename = "num_fed_shares_received")]
    pub federated_received: i64,
}

/// Host server runtime information.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Server {
    /// Webserver identification string.
    #[serde(default)]
    pub webserver: String,
    /// PHP runtime information.
    pub php: Php,
    /// Database engine information.
    pub database: Database,
}

/// PHP runtime information.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Php {
    /// PHP version string.
    pub version: String,
    /// Configured memory limit in bytes.
    #[serde(rename = "memory_limit")]
    pub memory_limit: i64,
    /// Configured maximum execution time in seconds.
    #[serde(default, rename = "max_execution_time")]
    pub max_execution_time: i64,
    /// Configured maximum upload size in bytes.
    #[serde(rename = "upload_max_filesize")]
    pub upload_max_filesize: i64,
    /// OpCache statistics.
    #[serde(default)]
    pub opcache: OpCache,
    /// APCu cache statistics.
    #[serde(default)]
    pub apcu: Apcu,
}

/// OpCache statistics wrapper.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpCache {
    /// Statistics block as reported by `opcache_get_status()`.
    #[serde(default, rename = "opcache_statistics")]
    pub statistics: OpCacheStatistics,
}

/// OpCache statistics block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpCacheStatistics {
    /// Hits on cached scripts.
    #[serde(default)]
    pub hits: i64,
    /// Cache misses.
    #[serde(default)]
    pub misses: i64,
    /// Number of cached scripts.
    #[serde(default, rename = "num_cached_scripts")]
    pub cached_scripts: i64,
    /// Number of cached keys.
    #[serde(default, rename = "num_cached_keys")]
    pub cached_keys: i64,
}

/// APCu statistics wrapper.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Apcu {
    /// Cache statistics block.
    #[serde(default)]
    pub cache: ApcuCache,
}

/// APCu cache statistics.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApcuCache {
    /// Cache hits.
    #[serde(default, rename = "num_hits")]
    pub hits: i64,
    /// Cache misses.
    #[serde(default, rename = "num_misses")]
    pub misses: i64,
    /// Cache inserts.
    #[serde(default, rename = "num_inserts")]
    pub inserts: i64,
    /// Entries currently cached.
    #[serde(default, rename = "num_entries")]
    pub entries: i64,
}

/// Database engine information.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Database {
    /// Engine type (`mysql`, `pgsql`, `sqlite3`, ...).
    #[serde(rename = "type")]
    pub db_type: String,
    /// Engine version string.
    pub version: String,
    /// Database size in bytes. MySQL deployments report this as a string.
    #[serde(deserialize_with = "number_or_string")]
    pub size: i64,
}

/// Recently active user counts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActiveUsers {
    /// Users active within the last five minutes.
    #[serde(rename = "last5minutes")]
    pub last_five_minutes: i64,
    /// Users active within the last hour.
    #[serde(default, rename = "last1hour")]
    pub last_hour: i64,
    /// Users active within the last day.
    #[serde(default, rename = "last24hours")]
    pub last_day: i64,
}

#[derive(Deserialize)]
struct OcsEnvelope {
    ocs: ServerInfo,
}

/// Parses a serverinfo JSON document, unwrapping the `ocs` envelope.
pub fn parse_json(body: &str) -> Result<ServerInfo, serde_json::Error> {
    let envelope: OcsEnvelope = serde_json::from_str(body)?;
    Ok(envelope.ocs)
}

fn number_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Realistic serverinfo document shared by tests across the crate.
#[cfg(test)]
pub(crate) const SAMPLE_JSON: &str = r#"{
      "ocs": {
        "meta": {"status": "ok", "statuscode": 200, "message": "OK"},
        "data": {
          "nextcloud": {
            "system": {
              "version": "28.0.1.1",
              "freespace": 10000000000,
              "apps": {"num_installed": 47, "num_updates_available": 2}
            },
            "storage": {"num_users": 120, "num_files": 58930, "num_storages": 121},
            "shares": {
              "num_shares": 17,
              "num_shares_user": 5,
              "num_shares_groups": 2,
              "num_shares_link": 10,
              "num_shares_link_no_password": 3,
              "num_fed_shares_sent": 1,
              "num_fed_shares_received": 0
            }
          },
          "server": {
            "webserver": "nginx",
            "php": {
              "version": "8.2.13",
              "memory_limit": 536870912,
              "max_execution_time": 3600,
              "upload_max_filesize": 536870912,
              "opcache": {
                "opcache_statistics": {
                  "hits": 9000,
                  "misses": 120,
                  "num_cached_scripts": 830,
                  "num_cached_keys": 1240
                }
              },
              "apcu": {
                "cache": {"num_hits": 500, "num_misses": 20, "num_inserts": 130, "num_entries": 42}
              }
            },
            "database": {"type": "mysql", "version": "10.11.6", "size": "141557760"}
          },
          "activeUsers": {"last5minutes": 3, "last1hour": 10, "last24hours": 44}
        }
      }
    }"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sample_document() {
        let status = parse_json(SAMPLE_JSON).unwrap();

        assert_eq!(status.meta.status, "ok");
        assert_eq!(status.data.nextcloud.system.version, "28.0.1.1");
        assert_eq!(status.data.nextcloud.system.free_space, 10_000_000_000);
        assert_eq!(status.data.nextcloud.system.apps.installed, 47);
        assert_eq!(status.data.nextcloud.storage.users, 120);
        assert_eq!(status.data.nextcloud.storage.files, 58930);
        assert_eq!(status.data.nextcloud.shares.link, 10);
        assert_eq!(status.data.nextcloud.shares.link_no_password, 3);
        assert_eq!(status.data.server.php.opcache.statistics.hits, 9000);
        assert_eq!(status.data.server.php.apcu.cache.entries, 42);
        assert_eq!(status.data.active_users.last_five_minutes, 3);
    }

    #[test]
    fn test_database_size_as_string() {
        let status = parse_json(SAMPLE_JSON).unwrap();
        assert_eq!(status.data.server.database.size, 141_557_760);
        assert_eq!(status.data.server.database.db_type, "mysql");
    }

    #[test]
    fn test_database_size_as_number() {
        let body = SAMPLE_JSON.replace(r#""size": "141557760""#, r#""size": 141557760"#);
        let status = parse_json(&body).unwrap();
        assert_eq!(status.data.server.database.size, 141_557_760);
    }

    #[test]
    fn test_missing_caches_default_to_zero() {
        let minimal = r#"{
          "ocs": {
            "meta": {"status": "ok", "statuscode": 200, "message": "OK"},
            "data": {
              "nextcloud": {
                "system": {"version": "28.0.1.1", "freespace": 1, "apps": {"num_installed": 1, "num_updates_available": 0}},
                "storage": {"num_users": 1, "num_files": 1},
                "shares": {
                  "num_shares_user": 0, "num_shares_groups": 0,
                  "num_shares_link": 0, "num_shares_link_no_password": 0,
                  "num_fed_shares_sent": 0, "num_fed_shares_received": 0
                }
              },
              "server": {
                "php": {"version": "8.2.13", "memory_limit": 1, "upload_max_filesize": 1},
                "database": {"type": "sqlite3", "version": "3.45.0", "size": 4096}
              },
              "activeUsers": {"last5minutes": 0}
            }
          }
        }"#;

        let status = parse_json(minimal).unwrap();
        assert_eq!(status.data.server.php.opcache.statistics.hits, 0);
        assert_eq!(status.data.server.php.apcu.cache.entries, 0);
        assert_eq!(status.data.active_users.last_hour, 0);
    }

    #[test]
    fn test_malformed_document_rejected() {
        assert!(parse_json("{not json").is_err());
        assert!(parse_json(r#"{"ocs": {"meta": {}, "data": {}}}"#).is_err());
        assert!(parse_json("<?xml version=\"1.0\"?><ocs></ocs>").is_err());
    }
}
