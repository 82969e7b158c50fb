//! Per-user sessions against the grid
//!
//! A session is the proxied account for one user plus the inode table that
//! gives the user's objects stable handles. Setting one up is the only time
//! the backend is consulted.

mod account;
mod backend;
mod local;
mod memory;
mod registry;
mod user;

pub use account::Account;
pub use backend::{Backend, BackendError, BackendUser};
pub use local::LocalBackend;
pub use memory::MemoryBackend;
pub use registry::SessionRegistry;
pub use user::{SessionError, UserSession};
