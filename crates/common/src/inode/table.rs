//! Bidirectional mapping between inode handles and grid paths
//!
//! Both directions live in their own sharded concurrent map, so lookups and
//! mutations on unrelated keys never contend. There is no lock spanning the
//! two maps: a mapping is written forward-first and the reverse insert is the
//! commit point. A conflicting reverse insert rolls the forward entry back.
//!
//! Lookups only report committed pairs (both directions agree), so a caller
//! never sees a handle whose mapping is half written or half torn down.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::allocator::HandleAllocator;
use super::{Handle, InodeError};

const STATE_ROOTED: u8 = 1;
const STATE_ACTIVE: u8 = 2;
const STATE_CLOSED: u8 = 3;

/// Lifecycle of a table. A table is only ever handed out once it is rooted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    /// Only the root mapping exists
    Rooted,
    /// At least one mapping operation has gone through since rooting
    Active,
    /// Torn down, every operation fails with [`InodeError::TableClosed`]
    Closed,
}

/// Per-session handle <-> path table
#[derive(Debug)]
pub struct InodeTable {
    forward: DashMap<Handle, PathBuf>,
    reverse: DashMap<PathBuf, Handle>,
    allocator: HandleAllocator,
    root_handle: Handle,
    root_path: PathBuf,
    state: AtomicU8,
}

impl InodeTable {
    /// Build a table whose first handle is mapped to `root`.
    ///
    /// Whether `root` actually exists is the session's business; by the time
    ///  we get here it has been checked against the backend.
    pub fn with_root(root: impl Into<PathBuf>) -> Result<Self, InodeError> {
        let root_path = root.into();
        let mut table = Self {
            forward: DashMap::new(),
            reverse: DashMap::new(),
            allocator: HandleAllocator::new(),
            root_handle: 0,
            root_path: root_path.clone(),
            state: AtomicU8::new(STATE_ROOTED),
        };
        table.root_handle = table.establish_root(&root_path)?;
        Ok(table)
    }

    fn establish_root(&self, root: &Path) -> Result<Handle, InodeError> {
        tracing::debug!(root = %root.display(), "mapping root");
        let handle = self.allocator.allocate()?;
        self.insert_pair(handle, root)?;
        tracing::debug!(handle, "root mapped");
        Ok(handle)
    }

    pub fn root_handle(&self) -> Handle {
        self.root_handle
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn state(&self) -> TableState {
        match self.state.load(Ordering::Acquire) {
            STATE_ROOTED => TableState::Rooted,
            STATE_ACTIVE => TableState::Active,
            _ => TableState::Closed,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state() == TableState::Closed
    }

    /// Number of live mappings, root included
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Number of released handles waiting for reuse
    pub fn free_handles(&self) -> usize {
        self.allocator.free_count()
    }

    /// Hand out a handle that is neither live nor reserved.
    ///
    /// Handles that callers mapped by hand can collide with the allocator's
    ///  counter or free set; those are skipped.
    pub fn allocate(&self) -> Result<Handle, InodeError> {
        self.ensure_open()?;
        loop {
            let handle = self.allocator.allocate()?;
            if !self.forward.contains_key(&handle) {
                return Ok(handle);
            }
            tracing::warn!(handle, "allocator produced a live handle, skipping");
        }
    }

    /// Give `handle` back to the allocator. It must no longer be mapped.
    pub fn release(&self, handle: Handle) -> Result<(), InodeError> {
        self.ensure_open()?;
        if self.forward.contains_key(&handle) {
            return Err(InodeError::HandleInUse(handle));
        }
        self.allocator.release(handle)?;
        Ok(())
    }

    /// Associate `handle` with `path`. Neither may be mapped already.
    pub fn map(&self, handle: Handle, path: &Path) -> Result<(), InodeError> {
        self.ensure_open()?;
        tracing::debug!(handle, path = %path.display(), "map");
        self.insert_pair(handle, path)?;
        self.mark_active();
        Ok(())
    }

    /// Drop the association between `handle` and `path`.
    ///
    /// With `recycle` set the handle goes back to the allocator once both
    ///  directions are gone.
    pub fn unmap(&self, handle: Handle, path: &Path, recycle: bool) -> Result<(), InodeError> {
        self.ensure_open()?;
        if handle == self.root_handle {
            return Err(InodeError::RootPinned(handle));
        }
        tracing::debug!(handle, path = %path.display(), recycle, "unmap");
        self.remove_pair(handle, path)?;
        if recycle {
            self.allocator.release(handle)?;
        }
        self.mark_active();
        Ok(())
    }

    /// Move `handle` from `old_path` to `new_path`, keeping the handle.
    ///
    /// The two halves are not atomic: between them the handle resolves to
    ///  nothing. If the new path is taken the old mapping is put back. When
    ///  that is no longer possible the handle stays live but unresolvable;
    ///  only an explicit [`InodeTable::release`] returns it to the allocator.
    pub fn remap(&self, handle: Handle, old_path: &Path, new_path: &Path) -> Result<(), InodeError> {
        self.ensure_open()?;
        if handle == self.root_handle {
            return Err(InodeError::RootPinned(handle));
        }
        tracing::debug!(
            handle,
            old_path = %old_path.display(),
            new_path = %new_path.display(),
            "remap"
        );

        self.remove_pair(handle, old_path)?;
        let err = match self.insert_pair(handle, new_path) {
            Ok(()) => {
                self.mark_active();
                return Ok(());
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => err,
        };

        tracing::warn!(handle, error = %err, "remap target rejected, restoring old mapping");
        self.restore_mapping(handle, old_path)?;
        Err(err)
    }

    /// Put `(handle, path)` back after a failed remap. Only corruption is an
    ///  error here; anything else leaves the handle out of circulation.
    fn restore_mapping(&self, handle: Handle, path: &Path) -> Result<(), InodeError> {
        match self.insert_pair(handle, path) {
            Ok(()) => Ok(()),
            Err(restore) if restore.is_fatal() => Err(restore),
            Err(InodeError::AlreadyMappedPath(_)) => {
                tracing::warn!(
                    handle,
                    path = %path.display(),
                    "old path taken during remap, handle left unmapped"
                );
                Ok(())
            }
            Err(restore) => {
                tracing::warn!(handle, error = %restore, "could not restore mapping");
                Ok(())
            }
        }
    }

    /// Resolve a handle to its path
    pub fn lookup_path(&self, handle: Handle) -> Result<PathBuf, InodeError> {
        self.ensure_open()?;
        let path = self
            .forward
            .get(&handle)
            .map(|entry| entry.value().clone())
            .ok_or(InodeError::NotFoundHandle(handle))?;

        // Half written or half removed pairs are not visible yet
        match self.reverse.get(&path) {
            Some(entry) if *entry.value() == handle => Ok(path),
            _ => Err(InodeError::NotFoundHandle(handle)),
        }
    }

    /// Resolve a path to its handle
    pub fn lookup_handle(&self, path: &Path) -> Result<Handle, InodeError> {
        self.ensure_open()?;
        let handle = self
            .reverse
            .get(path)
            .map(|entry| *entry.value())
            .ok_or_else(|| InodeError::NotFoundPath(path.to_path_buf()))?;

        match self.forward.get(&handle) {
            Some(entry) if entry.value().as_path() == path => Ok(handle),
            _ => Err(InodeError::NotFoundPath(path.to_path_buf())),
        }
    }

    /// Handle for `path`, mapping it to a fresh handle on first sight
    pub fn get_or_map(&self, path: &Path) -> Result<Handle, InodeError> {
        loop {
            match self.lookup_handle(path) {
                Ok(handle) => return Ok(handle),
                Err(InodeError::NotFoundPath(_)) => {}
                Err(err) => return Err(err),
            }

            let handle = self.allocate()?;
            match self.map(handle, path) {
                Ok(()) => return Ok(handle),
                Err(InodeError::AlreadyMappedPath(_)) => {
                    // Lost the race for this path; hand the spare back and
                    //  pick up the winner's handle on the next pass.
                    self.allocator.release(handle)?;
                }
                // Mapped by hand in the meantime, so it is live. Try another.
                Err(InodeError::AlreadyMappedHandle(_)) => {}
                Err(err) => return Err(err),
            }
        }
    }

    /// Forget `path` and recycle its handle
    pub fn evict(&self, path: &Path) -> Result<Handle, InodeError> {
        let handle = self.lookup_handle(path)?;
        self.unmap(handle, path, true)?;
        Ok(handle)
    }

    /// Tear the table down. Idempotent.
    pub fn close(&self) {
        if self.state.swap(STATE_CLOSED, Ordering::AcqRel) == STATE_CLOSED {
            return;
        }
        tracing::debug!(
            root = %self.root_path.display(),
            mappings = self.forward.len(),
            "closing inode table"
        );
        self.forward.clear();
        self.reverse.clear();
        self.allocator.clear();
    }

    fn ensure_open(&self) -> Result<(), InodeError> {
        if self.is_closed() {
            return Err(InodeError::TableClosed);
        }
        Ok(())
    }

    fn mark_active(&self) {
        let _ = self.state.compare_exchange(
            STATE_ROOTED,
            STATE_ACTIVE,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Insert `(handle, path)` into both maps or into neither.
    ///
    /// Forward goes first. If the reverse slot is taken the forward entry is
    ///  removed again; finding anything other than our own entry there means
    ///  someone mutated the map behind our back.
    fn insert_pair(&self, handle: Handle, path: &Path) -> Result<(), InodeError> {
        if handle == 0 {
            return Err(super::AllocatorError::ReservedHandle.into());
        }

        match self.forward.entry(handle) {
            Entry::Occupied(_) => return Err(InodeError::AlreadyMappedHandle(handle)),
            Entry::Vacant(slot) => {
                slot.insert(path.to_path_buf());
            }
        }
        // Out of the free set before the pair becomes visible, so an unmap
        //  racing the commit can always release it again.
        let was_free = self.allocator.claim(handle);

        let conflict = match self.reverse.entry(path.to_path_buf()) {
            Entry::Occupied(existing) => Some(*existing.get()),
            Entry::Vacant(slot) => {
                slot.insert(handle);
                None
            }
        };

        match conflict {
            None => Ok(()),
            Some(other) => {
                tracing::warn!(
                    handle,
                    other,
                    path = %path.display(),
                    "path already mapped, rolling back"
                );
                self.rollback_forward(handle, path, was_free)?;
                Err(InodeError::AlreadyMappedPath(path.to_path_buf()))
            }
        }
    }

    fn rollback_forward(
        &self,
        handle: Handle,
        path: &Path,
        was_free: bool,
    ) -> Result<(), InodeError> {
        match self.forward.remove(&handle) {
            Some((_, removed)) if removed == path => {
                if was_free {
                    self.allocator.unclaim(handle);
                }
                Ok(())
            }
            Some((_, removed)) => Err(self.corrupt(format!(
                "rollback of handle {} removed {} instead of {}",
                handle,
                removed.display(),
                path.display()
            ))),
            None => Err(self.corrupt(format!(
                "rollback of handle {} found no entry for {}",
                handle,
                path.display()
            ))),
        }
    }

    /// Remove `(handle, path)` from both maps, leaving the table untouched
    ///  when the caller's view is stale.
    fn remove_pair(&self, handle: Handle, path: &Path) -> Result<(), InodeError> {
        self.forward
            .remove_if(&handle, |_, mapped| mapped == path)
            .ok_or_else(|| InodeError::InvalidMapping {
                handle,
                path: path.to_path_buf(),
            })?;

        if self
            .reverse
            .remove_if(path, |_, mapped| *mapped == handle)
            .is_some()
        {
            return Ok(());
        }

        Err(self.restore_forward(handle, path))
    }

    /// The reverse side disagreed with a removal; put the forward entry back
    ///  so the table is exactly as we found it.
    fn restore_forward(&self, handle: Handle, path: &Path) -> InodeError {
        let restored = match self.forward.entry(handle) {
            Entry::Vacant(slot) => {
                slot.insert(path.to_path_buf());
                true
            }
            Entry::Occupied(_) => false,
        };
        if restored {
            return InodeError::InvalidMapping {
                handle,
                path: path.to_path_buf(),
            };
        }
        self.corrupt(format!(
            "handle {} was remapped while removing {}",
            handle,
            path.display()
        ))
    }

    /// Record an invariant breach. The table is closed so the owning session
    ///  fails instead of serving from a broken mapping.
    fn corrupt(&self, detail: String) -> InodeError {
        tracing::error!(root = %self.root_path.display(), %detail, "inode table corrupt");
        self.close();
        InodeError::CorruptState(detail)
    }
}
