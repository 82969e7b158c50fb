use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Everything a session needs to know about the gateway and the grid
///  it fronts. Serialized as `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ServerConfig {
    #[serde(default)]
    pub nfs_server: NfsServerConfig,
    #[serde(default)]
    pub irods_server: IrodsServerConfig,
    #[serde(default)]
    pub irods_proxy_admin_account: ProxyAdminAccountConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NfsServerConfig {
    /// Port the NFS front end listens on
    #[serde(default = "default_nfs_port")]
    pub port: u16,
    /// Grid collection every session is rooted at
    #[serde(default = "default_mount_point")]
    pub irods_mount_point: String,
    /// How long cached user information stays valid
    #[serde(default = "default_refresh_ms")]
    pub user_information_refresh_time_ms: u64,
}

fn default_nfs_port() -> u16 {
    2049
}

fn default_mount_point() -> String {
    "/tempZone/home".to_string()
}

fn default_refresh_ms() -> u64 {
    1000
}

impl Default for NfsServerConfig {
    fn default() -> Self {
        Self {
            port: default_nfs_port(),
            irods_mount_point: default_mount_point(),
            user_information_refresh_time_ms: default_refresh_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IrodsServerConfig {
    #[serde(default = "default_irods_host")]
    pub host: String,
    #[serde(default = "default_irods_port")]
    pub port: u16,
    #[serde(default = "default_zone")]
    pub zone: String,
    #[serde(default = "default_resource")]
    pub default_resource: String,
}

fn default_irods_host() -> String {
    "localhost".to_string()
}

fn default_irods_port() -> u16 {
    1247
}

fn default_zone() -> String {
    "tempZone".to_string()
}

fn default_resource() -> String {
    "demoResc".to_string()
}

impl Default for IrodsServerConfig {
    fn default() -> Self {
        Self {
            host: default_irods_host(),
            port: default_irods_port(),
            zone: default_zone(),
            default_resource: default_resource(),
        }
    }
}

/// Administrative account the gateway proxies every user through
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct ProxyAdminAccountConfig {
    #[serde(default = "default_admin")]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn default_admin() -> String {
    "rods".to_string()
}

impl Default for ProxyAdminAccountConfig {
    fn default() -> Self {
        Self {
            username: default_admin(),
            password: String::new(),
        }
    }
}

impl fmt::Debug for ProxyAdminAccountConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyAdminAccountConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// In-process backend settings.
///
/// The grid namespace is projected onto `root` on local disk; `users`
///  stands in for the grid's user catalog.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BackendConfig {
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default)]
    pub users: HashMap<String, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// One of trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for log files (logs to stdout only if not set)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.nfs_server.port, 2049);
        assert_eq!(config.irods_server.port, 1247);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_sections_fill_in_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            [nfs_server]
            irods_mount_point = "/zoneA/home"

            [irods_server]
            zone = "zoneA"

            [backend]
            root = "/srv/grid"

            [backend.users]
            alice = 1001
            "#,
        )
        .unwrap();

        assert_eq!(config.nfs_server.irods_mount_point, "/zoneA/home");
        assert_eq!(config.nfs_server.port, 2049);
        assert_eq!(config.irods_server.zone, "zoneA");
        assert_eq!(config.irods_server.host, "localhost");
        assert_eq!(config.backend.root, Some(PathBuf::from("/srv/grid")));
        assert_eq!(config.backend.users.get("alice"), Some(&1001));
    }

    #[test]
    fn test_debug_redacts_admin_password() {
        let account = ProxyAdminAccountConfig {
            username: "rods".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{:?}", account);
        assert!(rendered.contains("rods"));
        assert!(!rendered.contains("hunter2"));
    }
}
