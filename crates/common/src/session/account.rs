use std::fmt;

use crate::config::ServerConfig;

/// A grid account acting on behalf of `username`, authenticated as the
///  proxy admin.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub zone: String,
    pub default_resource: String,
    /// Collection the account is anchored at
    pub home: String,
    pub proxy_username: String,
    proxy_password: String,
}

impl Account {
    /// Build the proxied account for `username` out of the server config.
    pub fn proxied(username: &str, config: &ServerConfig) -> Self {
        let server = &config.irods_server;
        let admin = &config.irods_proxy_admin_account;

        Self {
            host: server.host.clone(),
            port: server.port,
            username: username.to_string(),
            zone: server.zone.clone(),
            default_resource: server.default_resource.clone(),
            home: config.nfs_server.irods_mount_point.clone(),
            proxy_username: admin.username.clone(),
            proxy_password: admin.password.clone(),
        }
    }

    pub fn proxy_password(&self) -> &str {
        &self.proxy_password
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("zone", &self.zone)
            .field("default_resource", &self.default_resource)
            .field("home", &self.home)
            .field("proxy_username", &self.proxy_username)
            .finish_non_exhaustive()
    }
}
