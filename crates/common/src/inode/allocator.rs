//! Handle allocation with recycling
//!
//! Fresh handles come from a monotonically increasing counter that starts
//! at 1; released handles go into a free set and are preferred over the
//! counter. Handle 0 is never issued.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::Handle;

/// First handle issued by a fresh allocator. Sessions root themselves here.
pub const FIRST_HANDLE: Handle = 1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocatorError {
    /// The counter reached `u64::MAX`. We never wrap around, since that would
    ///  hand out handles that are still live.
    #[error("handle space exhausted")]
    Exhausted,
    #[error("handle 0 is reserved and cannot be released")]
    ReservedHandle,
    #[error("handle {0} was never issued by this allocator")]
    NeverIssued(Handle),
    #[error("handle {0} is already free")]
    AlreadyFree(Handle),
}

/// Issues handles that are not in circulation.
///
/// The allocator does not know about the table it feeds; the table is
///  responsible for only releasing handles it no longer maps.
#[derive(Debug)]
pub struct HandleAllocator {
    next: AtomicU64,
    free: Mutex<HashSet<Handle>>,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(FIRST_HANDLE),
            free: Mutex::new(HashSet::new()),
        }
    }

    /// Take a recycled handle if one is available, otherwise the next
    ///  value of the counter.
    ///
    /// Recycled handles come back in no particular order.
    pub fn allocate(&self) -> Result<Handle, AllocatorError> {
        if let Some(handle) = self.take_free() {
            return Ok(handle);
        }

        // Stop at u64::MAX rather than wrapping back to 0
        self.next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |next| {
                if next == Handle::MAX {
                    None
                } else {
                    Some(next + 1)
                }
            })
            .map_err(|_| AllocatorError::Exhausted)
    }

    /// Return a handle to the free set.
    pub fn release(&self, handle: Handle) -> Result<(), AllocatorError> {
        if handle == 0 {
            return Err(AllocatorError::ReservedHandle);
        }
        if handle >= self.next.load(Ordering::Acquire) {
            return Err(AllocatorError::NeverIssued(handle));
        }
        if !self.free.lock().insert(handle) {
            return Err(AllocatorError::AlreadyFree(handle));
        }
        Ok(())
    }

    /// Note that `handle` went into circulation without coming from
    ///  [`HandleAllocator::allocate`]: it leaves the free set and the
    ///  counter moves past it.
    ///
    /// Returns whether the handle was sitting in the free set.
    pub fn claim(&self, handle: Handle) -> bool {
        let was_free = self.free.lock().remove(&handle);
        self.next.fetch_max(handle.saturating_add(1), Ordering::AcqRel);
        was_free
    }

    /// Undo a [`HandleAllocator::claim`] that took `handle` out of the free set.
    pub(crate) fn unclaim(&self, handle: Handle) {
        self.free.lock().insert(handle);
    }

    /// Number of handles waiting to be reused
    pub fn free_count(&self) -> usize {
        self.free.lock().len()
    }

    /// Whether `handle` is currently sitting in the free set
    pub fn is_free(&self, handle: Handle) -> bool {
        self.free.lock().contains(&handle)
    }

    /// Peek at the next value the counter would hand out
    pub fn next_fresh(&self) -> Handle {
        self.next.load(Ordering::Acquire)
    }

    /// Drop every recycled handle. Used when the owning table closes.
    pub(crate) fn clear(&self) {
        self.free.lock().clear();
    }

    fn take_free(&self) -> Option<Handle> {
        let mut free = self.free.lock();
        let handle = free.iter().next().copied()?;
        free.remove(&handle);
        Some(handle)
    }

    #[cfg(test)]
    fn starting_at(next: Handle) -> Self {
        Self {
            next: AtomicU64::new(next),
            free: Mutex::new(HashSet::new()),
        }
    }
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_handles_start_at_one() {
        let alloc = HandleAllocator::new();
        assert_eq!(alloc.allocate().unwrap(), 1);
        assert_eq!(alloc.allocate().unwrap(), 2);
        assert_eq!(alloc.allocate().unwrap(), 3);
        assert_eq!(alloc.next_fresh(), 4);
    }

    #[test]
    fn test_released_handle_is_reused_before_counter() {
        let alloc = HandleAllocator::new();
        let a = alloc.allocate().unwrap();
        let _b = alloc.allocate().unwrap();

        alloc.release(a).unwrap();
        assert!(alloc.is_free(a));
        assert_eq!(alloc.allocate().unwrap(), a);
        assert!(!alloc.is_free(a));
        assert_eq!(alloc.allocate().unwrap(), 3);
    }

    #[test]
    fn test_release_rejects_reserved_and_unissued() {
        let alloc = HandleAllocator::new();
        alloc.allocate().unwrap();

        assert_eq!(alloc.release(0), Err(AllocatorError::ReservedHandle));
        assert_eq!(alloc.release(7), Err(AllocatorError::NeverIssued(7)));
    }

    #[test]
    fn test_double_release_is_rejected() {
        let alloc = HandleAllocator::new();
        let h = alloc.allocate().unwrap();
        alloc.release(h).unwrap();
        assert_eq!(alloc.release(h), Err(AllocatorError::AlreadyFree(h)));
        assert_eq!(alloc.free_count(), 1);
    }

    #[test]
    fn test_exhaustion_does_not_wrap() {
        let alloc = HandleAllocator::starting_at(Handle::MAX - 1);
        assert_eq!(alloc.allocate().unwrap(), Handle::MAX - 1);
        assert_eq!(alloc.allocate(), Err(AllocatorError::Exhausted));
        assert_eq!(alloc.allocate(), Err(AllocatorError::Exhausted));
    }

    #[test]
    fn test_exhausted_allocator_still_serves_free_handles() {
        let alloc = HandleAllocator::starting_at(Handle::MAX - 1);
        let h = alloc.allocate().unwrap();
        alloc.release(h).unwrap();
        assert_eq!(alloc.allocate().unwrap(), h);
    }

    #[test]
    fn test_claim_moves_counter_and_leaves_free_set() {
        let alloc = HandleAllocator::new();
        assert!(!alloc.claim(5));
        assert_eq!(alloc.next_fresh(), 6);
        alloc.release(5).unwrap();
        assert!(alloc.is_free(5));

        assert!(alloc.claim(5));
        assert!(!alloc.is_free(5));
        // Claiming below the counter leaves it alone
        assert!(!alloc.claim(2));
        assert_eq!(alloc.allocate().unwrap(), 6);
    }

    #[test]
    fn test_unclaim_returns_handle_to_free_set() {
        let alloc = HandleAllocator::new();
        let h = alloc.allocate().unwrap();
        alloc.release(h).unwrap();

        assert!(alloc.claim(h));
        alloc.unclaim(h);
        assert!(alloc.is_free(h));
        assert_eq!(alloc.allocate().unwrap(), h);
    }

    #[test]
    fn test_clear_drops_recycled_handles() {
        let alloc = HandleAllocator::new();
        let h = alloc.allocate().unwrap();
        alloc.release(h).unwrap();
        alloc.clear();
        assert_eq!(alloc.free_count(), 0);
        assert_eq!(alloc.allocate().unwrap(), 2);
    }
}
