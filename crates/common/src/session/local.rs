//! Backend that projects the grid namespace onto a local directory.
//!
//! `/zoneA/home/alice` is looked up as `<root>/zoneA/home/alice`. Handy for
//! trying out session setup without a grid to talk to.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use super::account::Account;
use super::backend::{Backend, BackendError, BackendUser};

#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
    users: HashMap<String, u32>,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>, users: HashMap<String, u32>) -> Self {
        Self {
            root: root.into(),
            users,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Grid path -> (canonical grid path, location on disk)
    fn resolve(&self, path: &str) -> (PathBuf, PathBuf) {
        let mut grid = PathBuf::from("/");
        let mut local = self.root.clone();
        for component in Path::new(path).components() {
            match component {
                Component::Normal(part) => {
                    grid.push(part);
                    local.push(part);
                }
                // Never climb above the projected root
                Component::ParentDir => {
                    if grid.pop() {
                        local.pop();
                    }
                }
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            }
        }
        (grid, local)
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn find_user(
        &self,
        _account: &Account,
        username: &str,
    ) -> Result<BackendUser, BackendError> {
        self.users
            .get(username)
            .map(|id| BackendUser {
                id: *id,
                name: username.to_string(),
            })
            .ok_or_else(|| BackendError::UserNotFound(username.to_string()))
    }

    async fn canonicalize(
        &self,
        _account: &Account,
        path: &str,
    ) -> Result<Option<PathBuf>, BackendError> {
        let (grid, local) = self.resolve(path);
        match tokio::fs::metadata(&local).await {
            Ok(_) => Ok(Some(grid)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                tracing::debug!(path = %local.display(), "root not readable");
                Ok(None)
            }
            Err(e) => Err(BackendError::Unavailable(format!(
                "{}: {}",
                local.display(),
                e
            ))),
        }
    }
}
