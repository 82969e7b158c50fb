use std::path::PathBuf;

use clap::Args;

use common::config::ServerConfig;

use crate::state::AppState;

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Grid collection every session is rooted at
    #[arg(long, default_value = "/tempZone/home")]
    pub mount_point: String,

    /// Grid zone
    #[arg(long, default_value = "tempZone")]
    pub zone: String,

    /// Grid server host
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// Local directory the grid namespace is projected onto
    #[arg(long)]
    pub backend_root: Option<PathBuf>,

    /// User catalog entries for the local backend, as name=id (repeatable)
    #[arg(long = "user", value_parser = parse_user)]
    pub users: Vec<(String, u32)>,
}

fn parse_user(s: &str) -> Result<(String, u32), String> {
    let (name, id) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=id, got {:?}", s))?;
    if name.is_empty() {
        return Err("user name cannot be empty".to_string());
    }
    let id = id
        .parse::<u32>()
        .map_err(|e| format!("invalid user id {:?}: {}", id, e))?;
    Ok((name.to_string(), id))
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
}

#[async_trait::async_trait]
impl crate::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut config = ServerConfig::default();
        config.nfs_server.irods_mount_point = self.mount_point.clone();
        config.irods_server.zone = self.zone.clone();
        config.irods_server.host = self.host.clone();
        config.backend.root = self.backend_root.clone();
        config.backend.users = self.users.iter().cloned().collect();

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        let backend_root = match &state.config.backend.root {
            Some(root) => root.display().to_string(),
            None => "not set (required for 'nfsrods check')".to_string(),
        };

        let output = format!(
            "Initialized nfsrods directory at: {}\n\
             - Config: {}\n\
             - Mount point: {}\n\
             - Zone: {}\n\
             - Backend root: {}\n\
             - Users: {}",
            state.app_dir.display(),
            state.config_path.display(),
            state.config.nfs_server.irods_mount_point,
            state.config.irods_server.zone,
            backend_root,
            state.config.backend.users.len()
        );

        Ok(output)
    }
}
