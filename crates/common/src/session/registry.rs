use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::config::ServerConfig;

use super::backend::Backend;
use super::user::{SessionError, UserSession};

/// Live sessions keyed by user name.
///
/// Owned by whoever serves requests and passed around explicitly; there is
///  no process-wide instance.
#[derive(Debug)]
pub struct SessionRegistry {
    config: ServerConfig,
    backend: Arc<dyn Backend>,
    sessions: DashMap<String, Arc<UserSession>>,
}

impl SessionRegistry {
    pub fn new(config: ServerConfig, backend: Arc<dyn Backend>) -> Self {
        Self {
            config,
            backend,
            sessions: DashMap::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The live session for `username`, establishing one if needed.
    ///
    /// Closed sessions are replaced. If two callers race to establish the
    ///  same user, both get the session that landed first.
    pub async fn session(&self, username: &str) -> Result<Arc<UserSession>, SessionError> {
        if let Some(session) = self.get(username) {
            return Ok(session);
        }

        let fresh = Arc::new(
            UserSession::establish(username, &self.config, self.backend.as_ref()).await?,
        );

        let (session, lost) = match self.sessions.entry(username.to_string()) {
            Entry::Occupied(mut existing) if !existing.get().is_open() => {
                existing.insert(fresh.clone());
                (fresh, None)
            }
            Entry::Occupied(existing) => (existing.get().clone(), Some(fresh)),
            Entry::Vacant(slot) => {
                slot.insert(fresh.clone());
                (fresh, None)
            }
        };

        if let Some(lost) = lost {
            tracing::debug!(username, "session established concurrently, discarding ours");
            lost.close();
        }
        Ok(session)
    }

    /// The live session for `username`, if any. Closed sessions are evicted.
    pub fn get(&self, username: &str) -> Option<Arc<UserSession>> {
        let session = self.sessions.get(username).map(|s| s.value().clone())?;
        if session.is_open() {
            return Some(session);
        }

        tracing::warn!(username, "evicting closed session");
        self.sessions
            .remove_if(username, |_, current| Arc::ptr_eq(current, &session));
        None
    }

    /// End the session for `username`. Returns whether one was live.
    pub fn close(&self, username: &str) -> bool {
        match self.sessions.remove(username) {
            Some((_, session)) => {
                let was_open = session.is_open();
                session.close();
                was_open
            }
            None => false,
        }
    }

    pub fn close_all(&self) {
        let usernames: Vec<String> = self.sessions.iter().map(|s| s.key().clone()).collect();
        for username in usernames {
            self.close(&username);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
