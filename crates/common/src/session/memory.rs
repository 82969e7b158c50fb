use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::account::Account;
use super::backend::{Backend, BackendError, BackendUser};

/// In-memory backend: a user catalog and a set of existing collections
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<RwLock<MemoryBackendInner>>,
}

#[derive(Debug, Default)]
struct MemoryBackendInner {
    users: HashMap<String, u32>,
    paths: HashSet<PathBuf>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, name: &str, id: u32) -> Self {
        self.add_user(name, id);
        self
    }

    pub fn with_path(self, path: &str) -> Self {
        self.add_path(path);
        self
    }

    pub fn add_user(&self, name: &str, id: u32) {
        self.inner.write().users.insert(name.to_string(), id);
    }

    /// Register `path` and all of its ancestors
    pub fn add_path(&self, path: &str) {
        let normalized = normalize(Path::new(path));
        let mut inner = self.inner.write();
        for ancestor in normalized.ancestors() {
            inner.paths.insert(ancestor.to_path_buf());
        }
    }

    pub fn remove_path(&self, path: &str) {
        self.inner.write().paths.remove(&normalize(Path::new(path)));
    }
}

/// Lexically resolve `.` and `..` against the root
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::ParentDir => {
                out.pop();
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    out
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn find_user(
        &self,
        _account: &Account,
        username: &str,
    ) -> Result<BackendUser, BackendError> {
        let inner = self.inner.read();
        inner
            .users
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
        let normalized = normalize(Path::new(path));
        let inner = self.inner.read();
        Ok(inner.paths.contains(&normalized).then_some(normalized))
    }
}
