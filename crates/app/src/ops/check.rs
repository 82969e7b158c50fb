//! Establish sessions for a set of users and report their roots

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use serde::Serialize;

use common::inode::Handle;
use common::session::{LocalBackend, SessionRegistry};

use crate::logging::init_logging;
use crate::state::AppState;

#[derive(Args, Debug, Clone)]
#[command(about = "Verify that sessions can be rooted for the given users")]
pub struct Check {
    /// Users to establish sessions for
    #[arg(required = true)]
    pub usernames: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionReport {
    pub username: String,
    pub user_id: u32,
    pub root_handle: Handle,
    pub root_path: PathBuf,
}

#[derive(Debug)]
pub struct CheckOutput {
    reports: Vec<SessionReport>,
    json: bool,
}

impl fmt::Display for CheckOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.json {
            let json = serde_json::to_string_pretty(&self.reports).map_err(|_| fmt::Error)?;
            return write!(f, "{}", json);
        }

        writeln!(f, "{:<20}  {:<8}  {:<6}  ROOT", "USER", "UID", "HANDLE")?;
        writeln!(f, "{}", "-".repeat(60))?;
        for report in &self.reports {
            writeln!(
                f,
                "{:<20}  {:<8}  {:<6}  {}",
                report.username,
                report.user_id,
                report.root_handle,
                report.root_path.display()
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("state error: {0}")]
    State(#[from] crate::state::StateError),

    #[error("no backend root configured; set [backend] root in config.toml")]
    MissingBackendRoot,

    #[error("{failed} of {total} sessions could not be established")]
    SessionsFailed { failed: usize, total: usize },
}

#[async_trait::async_trait]
impl crate::op::Op for Check {
    type Error = CheckError;
    type Output = CheckOutput;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(ctx.config_path.clone())?;
        let _guards = init_logging(&state.config.logging);

        let backend = {
            let backend = &state.config.backend;
            let root = backend.root.clone().ok_or(CheckError::MissingBackendRoot)?;
            LocalBackend::new(root, backend.users.clone())
        };
        tracing::debug!(root = %backend.root().display(), "using local backend");

        let registry = SessionRegistry::new(state.config.clone(), Arc::new(backend));

        let mut reports = Vec::new();
        let mut failed = 0;
        for username in &self.usernames {
            match registry.session(username).await {
                Ok(session) => reports.push(SessionReport {
                    username: session.username().to_string(),
                    user_id: session.user_id(),
                    root_handle: session.inodes().root_handle(),
                    root_path: session.root_path().to_path_buf(),
                }),
                Err(e) => {
                    tracing::error!(username = %username, error = %e, "session failed");
                    failed += 1;
                }
            }
        }
        registry.close_all();

        if failed > 0 {
            return Err(CheckError::SessionsFailed {
                failed,
                total: self.usernames.len(),
            });
        }

        Ok(CheckOutput {
            reports,
            json: self.json,
        })
    }
}
