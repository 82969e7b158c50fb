//! Inode handle <-> path identity
//!
//! The NFS side of the gateway only speaks in numeric handles, the grid
//! only speaks in paths. Every session owns one [`InodeTable`] that keeps
//! the two views in a strict one-to-one correspondence.

mod allocator;
mod table;

use std::path::PathBuf;

pub use allocator::{AllocatorError, HandleAllocator, FIRST_HANDLE};
pub use table::{InodeTable, TableState};

/// Client-visible inode number. 0 is never issued.
pub type Handle = u64;

/// Handle every session root is mapped to
pub const ROOT_HANDLE: Handle = FIRST_HANDLE;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InodeError {
    #[error("handle {0} is already mapped")]
    AlreadyMappedHandle(Handle),
    #[error("path is already mapped: {0}")]
    AlreadyMappedPath(PathBuf),
    #[error("invalid mapping: handle {handle} is not mapped to {path}")]
    InvalidMapping { handle: Handle, path: PathBuf },
    #[error("inode table state is corrupt: {0}")]
    CorruptState(String),
    #[error("handle not found: {0}")]
    NotFoundHandle(Handle),
    #[error("path not found: {0}")]
    NotFoundPath(PathBuf),
    #[error("inode table is closed")]
    TableClosed,
    #[error("handle {0} is still mapped and cannot be released")]
    HandleInUse(Handle),
    #[error("the session root (handle {0}) cannot be unmapped")]
    RootPinned(Handle),
    #[error("allocator error: {0}")]
    Allocator(#[from] AllocatorError),
}

impl InodeError {
    /// Whether the error leaves the owning session unusable
    pub fn is_fatal(&self) -> bool {
        matches!(self, InodeError::CorruptState(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            InodeError::NotFoundHandle(_) | InodeError::NotFoundPath(_)
        )
    }

    pub fn is_already_mapped(&self) -> bool {
        matches!(
            self,
            InodeError::AlreadyMappedHandle(_) | InodeError::AlreadyMappedPath(_)
        )
    }
}
