use std::path::PathBuf;

use async_trait::async_trait;

use super::account::Account;

/// A user record as the grid reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendUser {
    pub id: u32,
    pub name: String,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("user not found: {0}")]
    UserNotFound(String),
    /// The account was rejected before the request could be served
    #[error("access denied for {0}")]
    AccessDenied(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// The grid as seen from session setup.
///
/// Only consulted while a session is being established; the inode table
///  never calls out to the backend.
#[async_trait]
pub trait Backend: Send + Sync + std::fmt::Debug + 'static {
    /// Resolve a user name to the grid's record for it
    ///
    /// # Arguments
    /// * `account` - The proxied account making the request
    /// * `username` - The user to look up
    async fn find_user(&self, account: &Account, username: &str)
        -> Result<BackendUser, BackendError>;

    /// Canonical absolute form of `path`, or `None` if it does not exist
    ///  or cannot be read by `account`
    async fn canonicalize(
        &self,
        account: &Account,
        path: &str,
    ) -> Result<Option<PathBuf>, BackendError>;
}
