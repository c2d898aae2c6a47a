//! Resource Handle Registry.
//!
//! Every buffer handed out during a session (extracted files, the
//! download-all bundle, one-shot archives) lives here until it is
//! released. Release is explicit and idempotent; once released, reading
//! through a handle fails instead of returning stale bytes.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Error, Result};

/// Opaque reference to a registered byte buffer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    id: u64,
    len: usize,
}

impl ResourceHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Length of the buffer the handle was created over
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob:{}", self.id)
    }
}

/// Lifetime counters of a registry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub created: u64,
    pub released: u64,
    pub live: usize,
}

#[derive(Default)]
struct Inner {
    buffers: HashMap<u64, Arc<[u8]>>,
    next_id: u64,
    created: u64,
    released: u64,
}

/// Tracks ephemeral buffers and frees each exactly once
#[derive(Default)]
pub struct HandleRegistry {
    inner: Mutex<Inner>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a buffer and return the handle that owns it.
    pub fn create(&self, bytes: impl Into<Arc<[u8]>>) -> ResourceHandle {
        let bytes = bytes.into();
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        inner.created += 1;

        let handle = ResourceHandle {
            id: inner.next_id,
            len: bytes.len(),
        };
        inner.buffers.insert(handle.id, bytes);

        debug!("Created handle {} ({} bytes)", handle, handle.len);
        handle
    }

    /// Read the buffer behind a live handle.
    pub fn read(&self, handle: &ResourceHandle) -> Result<Arc<[u8]>> {
        self.inner
            .lock()
            .buffers
            .get(&handle.id)
            .cloned()
            .ok_or_else(|| Error::HandleReleased(handle.to_string()))
    }

    /// Free the buffer behind `handle`.
    ///
    /// Returns `true` if this call freed it; releasing an unknown or
    /// already released handle is a no-op returning `false`.
    pub fn release(&self, handle: &ResourceHandle) -> bool {
        let mut inner = self.inner.lock();
        if inner.buffers.remove(&handle.id).is_none() {
            return false;
        }
        inner.released += 1;
        debug!("Released handle {}", handle);
        true
    }

    /// Release a batch of handles, returning how many were actually freed.
    pub fn release_all<'a, I>(&self, handles: I) -> usize
    where
        I: IntoIterator<Item = &'a ResourceHandle>,
    {
        handles
            .into_iter()
            .filter(|handle| self.release(handle))
            .count()
    }

    pub fn is_live(&self, handle: &ResourceHandle) -> bool {
        self.inner.lock().buffers.contains_key(&handle.id)
    }

    pub fn live_count(&self) -> usize {
        self.inner.lock().buffers.len()
    }

    pub fn stats(&self) -> RegistryStats {
        let inner = self.inner.lock();
        RegistryStats {
            created: inner.created,
            released: inner.released,
            live: inner.buffers.len(),
        }
    }
}
