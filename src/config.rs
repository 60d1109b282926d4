//! Exporter configuration.
//!
//! Settings are resolved from three layers: command-line flags, environment
//! variables (`NEXTCLOUD_*` prefix, handled by clap) and an optional TOML
//! config file underneath both. Flags win over the file.

use crate::client::Auth;
use clap::Parser;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Path of the serverinfo endpoint below the server root.
pub const INFO_PATH: &str = "/ocs/v2.php/apps/serverinfo/api/v1/info";

const DEFAULT_LISTEN_ADDRESS: &str = ":9205";
const DEFAULT_TIMEOUT_SECONDS: u64 = 5;

/// Configuration resolution errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("no server URL configured")]
    MissingServer,
    #[error("need username and password or an auth token")]
    MissingCredentials,
    #[error("invalid listen address: {0}")]
    InvalidListenAddress(String),
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Command-line interface of the exporter.
#[derive(Debug, Default, Parser)]
#[command(name = "nextcloud-exporter", version, about = "Prometheus exporter for Nextcloud serverinfo metrics")]
pub struct Cli {
    /// URL of the Nextcloud server or of its serverinfo endpoint.
    #[arg(short, long, env = "NEXTCLOUD_SERVER")]
    pub server: Option<String>,

    /// Username of the user scraping the metrics.
    #[arg(short, long, env = "NEXTCLOUD_USERNAME")]
    pub username: Option<String>,

    /// Password of the user scraping the metrics.
    #[arg(short, long, env = "NEXTCLOUD_PASSWORD")]
    pub password: Option<String>,

    /// Authentication token (takes precedence over username/password).
    #[arg(long, env = "NEXTCLOUD_AUTH_TOKEN")]
    pub auth_token: Option<String>,

    /// Address the exposition endpoint listens on (":9205" binds all interfaces).
    #[arg(short = 'a', long, env = "NEXTCLOUD_LISTEN_ADDRESS")]
    pub listen_address: Option<String>,

    /// Timeout for the serverinfo request, in seconds.
    #[arg(short, long, env = "NEXTCLOUD_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Skip TLS certificate verification (self-signed deployments).
    #[arg(long, env = "NEXTCLOUD_TLS_SKIP_VERIFY")]
    pub tls_skip_verify: bool,

    /// Path to a TOML config file.
    #[arg(short, long, env = "NEXTCLOUD_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,
}

/// Config file format. Every field is optional; flags win over the file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    /// URL of the Nextcloud server or of its serverinfo endpoint.
    pub server: Option<String>,
    /// Username of the user scraping the metrics.
    pub username: Option<String>,
    /// Password of the user scraping the metrics.
    pub password: Option<String>,
    /// Authentication token.
    pub auth_token: Option<String>,
    /// Address the exposition endpoint listens on.
    pub listen_address: Option<String>,
    /// Timeout for the serverinfo request, in seconds.
    pub timeout: Option<u64>,
    /// Skip TLS certificate verification.
    pub tls_skip_verify: Option<bool>,
}

impl FileConfig {
    /// Loads a config file from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Full URL of the serverinfo endpoint, JSON format requested.
    pub info_url: String,
    /// Authentication mechanism for the endpoint.
    pub auth: Auth,
    /// Address the exposition endpoint listens on.
    pub listen_address: SocketAddr,
    /// Timeout for the serverinfo request.
    pub timeout: Duration,
    /// Skip TLS certificate verification.
    pub tls_skip_verify: bool,
}

impl Settings {
    /// Resolves settings from CLI flags and the optional config file.
    pub fn resolve(cli: Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config_file {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };

        let server = cli
            .server
            .or(file.server)
            .ok_or(ConfigError::MissingServer)?;
        let username = cli.username.or(file.username).unwrap_or_default();
        let password = cli.password.or(file.password).unwrap_or_default();
        let auth_token = cli.auth_token.or(file.auth_token).unwrap_or_default();

        if auth_token.is_empty() && (username.is_empty() || password.is_empty()) {
            return Err(ConfigError::MissingCredentials);
        }

        let listen_address = cli
            .listen_address
            .or(file.listen_address)
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDRESS.to_string());
        let timeout = cli
            .timeout
            .or(file.timeout)
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS);

        Ok(Settings {
            info_url: info_url(&server),
            auth: Auth::from_credentials(&username, &password, &auth_token),
            listen_address: parse_listen_address(&listen_address)?,
            timeout: Duration::from_secs(timeout),
            tls_skip_verify: cli.tls_skip_verify || file.tls_skip_verify.unwrap_or(false),
        })
    }
}

/// Returns the `User-Agent` value sent with every serverinfo request.
pub fn user_agent() -> String {
    format!("nextcloud-exporter/{}", crate::VERSION)
}

/// Normalizes a server URL into the full serverinfo endpoint URL.
///
/// Operators may configure either the server root or the complete endpoint;
/// the serverinfo path and the `format=json` parameter are added when absent.
fn info_url(server: &str) -> String {
    let mut url = if server.contains(INFO_PATH) {
        server.to_string()
    } else {
        format!("{}{}", server.trim_end_matches('/'), INFO_PATH)
    };

    if !url.contains("format=json") {
        let separator = if url.contains('?') { '&' } else { '?' };
        url.push(separator);
        url.push_str("format=json");
    }
    url
}

/// Parses a listen address, accepting the `:port` shorthand for all interfaces.
fn parse_listen_address(address: &str) -> Result<SocketAddr, ConfigError> {
    let full = if address.starts_with(':') {
        format!("0.0.0.0{}", address)
    } else {
        address.to_string()
    };
    full.parse()
        .map_err(|_| ConfigError::InvalidListenAddress(address.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with_server() -> Cli {
        Cli {
            server: Some("https://cloud.example.com".to_string()),
            auth_token: Some("token".to_string()),
            ..Cli::default()
        }
    }

    #[test]
    fn test_info_url_from_server_root() {
        assert_eq!(
            info_url("https://cloud.example.com/"),
            "https://cloud.example.com/ocs/v2.php/apps/serverinfo/api/v1/info?format=json"
        );
    }

    #[test]
    fn test_info_url_passthrough() {
        let full = "https://cloud.example.com/ocs/v2.php/apps/serverinfo/api/v1/info?format=json";
        assert_eq!(info_url(full), full);
    }

    #[test]
    fn test_info_url_appends_format_parameter() {
        assert_eq!(
            info_url("https://cloud.example.com/ocs/v2.php/apps/serverinfo/api/v1/info"),
            "https://cloud.example.com/ocs/v2.php/apps/serverinfo/api/v1/info?format=json"
        );
    }

    #[test]
    fn test_listen_address_shorthand() {
        let settings = Settings::resolve(cli_with_server()).unwrap();
        assert_eq!(settings.listen_address.port(), 9205);
        assert!(settings.listen_address.ip().is_unspecified());
    }

    #[test]
    fn test_invalid_listen_address() {
        let cli = Cli {
            listen_address: Some("not-an-address".to_string()),
            ..cli_with_server()
        };
        assert!(matches!(
            Settings::resolve(cli),
            Err(ConfigError::InvalidListenAddress(_))
        ));
    }

    #[test]
    fn test_missing_server() {
        assert!(matches!(
            Settings::resolve(Cli::default()),
            Err(ConfigError::MissingServer)
        ));
    }

    #[test]
    fn test_missing_credentials() {
        let cli = Cli {
            server: Some("https://cloud.example.com".to_string()),
            username: Some("metrics".to_string()),
            ..Cli::default()
        };
        assert!(matches!(
            Settings::resolve(cli),
            Err(ConfigError::MissingCredentials)
        ));
    }

    #[test]
    fn test_token_precedence() {
        let cli = Cli {
            username: Some("metrics".to_string()),
            password: Some("secret".to_string()),
            ..cli_with_server()
        };
        let settings = Settings::resolve(cli).unwrap();
        assert!(matches!(settings.auth, Auth::Token(ref t) if t == "token"));
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(cli_with_server()).unwrap();
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert!(!settings.tls_skip_verify);
    }

    #[test]
    fn test_file_config_merge() {
        let dir = std::env::temp_dir().join("nextcloud-exporter-config-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            r#"
server = "https://file.example.com"
username = "metrics"
password = "from-file"
timeout = 30
"#,
        )
        .unwrap();

        // Flags win over the file where both are set.
        let cli = Cli {
            password: Some("from-flag".to_string()),
            config_file: Some(path.clone()),
            ..Cli::default()
        };
        let settings = Settings::resolve(cli).unwrap();
        assert!(settings.info_url.starts_with("https://file.example.com/"));
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert!(
            matches!(settings.auth, Auth::Basic { ref password, .. } if password == "from-flag")
        );

        std::fs::remove_file(path).unwrap();
    }
}
