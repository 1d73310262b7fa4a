use std::sync::atomic::{AtomicUsize, Ordering};

use uuid::Uuid;

/// Allocates preview handles and counts the ones not yet released.
#[derive(Debug, Default)]
pub struct PreviewPool {
    allocated: AtomicUsize,
    released: AtomicUsize,
}

/// Revocable preview of a pending file.
///
/// Not `Clone`: [`PreviewPool::release`] consumes the handle, so each one is
/// released at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct PreviewHandle {
    id: Uuid,
}

impl PreviewHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn uri(&self) -> String {
        format!("preview:{}", self.id)
    }
}

impl PreviewPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&self) -> PreviewHandle {
        self.allocated.fetch_add(1, Ordering::Relaxed);
        PreviewHandle { id: Uuid::new_v4() }
    }

    pub fn release(&self, handle: PreviewHandle) {
        self.released.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(preview = %handle.id, "Released preview");
    }

    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::Relaxed)
    }

    pub fn outstanding(&self) -> usize {
        self.allocated().saturating_sub(self.released())
    }
}
