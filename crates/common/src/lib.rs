/**
 * Gateway configuration as read from `config.toml`.
 *  Shared by the sessions and the binary that loads it.
 */
pub mod config;
/**
 * Inode handle <-> path identity.
 *  One table per session, safe to share between
 *  request handlers without outside locking.
 */
pub mod inode;
/**
 * Session bootstrap against the grid.
 *  Proxied accounts, the backend collaborator,
 *  and the registry of live sessions.
 */
pub mod session;

pub mod prelude {
    pub use crate::config::ServerConfig;
    pub use crate::inode::{Handle, InodeError, InodeTable, TableState, ROOT_HANDLE};
    pub use crate::session::{
        Account, Backend, BackendError, LocalBackend, MemoryBackend, SessionError,
        SessionRegistry, UserSession,
    };
}
