use std::path::{Path, PathBuf};

use crate::config::ServerConfig;
use crate::inode::{InodeError, InodeTable};

use super::account::Account;
use super::backend::{Backend, BackendError};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    /// The configured mount point is missing or unreadable for this user.
    ///  Fatal: a session without a root is never handed out.
    #[error("cannot establish root at {0}")]
    RootNotFound(String),
    #[error("failed to root inode table: {0}")]
    Inode(#[from] InodeError),
}

/// One authenticated user's view of the grid.
///
/// Owns the user's inode table; dropping or closing the session ends it.
#[derive(Debug)]
pub struct UserSession {
    username: String,
    user_id: u32,
    account: Account,
    root: PathBuf,
    inodes: InodeTable,
}

impl UserSession {
    /// Set up a session for `username`: build the proxied account, resolve
    ///  the user, then root a fresh inode table at the mount point.
    pub async fn establish(
        username: &str,
        config: &ServerConfig,
        backend: &dyn Backend,
    ) -> Result<Self, SessionError> {
        let account = Account::proxied(username, config);
        tracing::debug!(
            username,
            mount_point = %account.home,
            "creating proxied session"
        );

        let user = backend.find_user(&account, username).await?;

        let root = match backend.canonicalize(&account, &account.home).await? {
            Some(root) => root,
            None => {
                tracing::error!(
                    username,
                    mount_point = %account.home,
                    "root does not exist or cannot be read"
                );
                return Err(SessionError::RootNotFound(account.home.clone()));
            }
        };

        let inodes = InodeTable::with_root(root.clone())?;
        tracing::info!(
            username,
            user_id = user.id,
            root = %root.display(),
            "session established"
        );

        Ok(Self {
            username: username.to_string(),
            user_id: user.id,
            account,
            root,
            inodes,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn user_id(&self) -> u32 {
        self.user_id
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Canonical absolute path of the session root
    pub fn root_path(&self) -> &Path {
        &self.root
    }

    pub fn inodes(&self) -> &InodeTable {
        &self.inodes
    }

    /// A session is usable until its table closes, either through
    ///  [`UserSession::close`] or a corrupt-state escalation.
    pub fn is_open(&self) -> bool {
        !self.inodes.is_closed()
    }

    pub fn close(&self) {
        tracing::debug!(username = %self.username, "closing session");
        self.inodes.close();
    }
}
