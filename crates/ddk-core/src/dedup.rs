// # Update Dedup Registry
//
// Process-wide set of addresses whose post-update hook has already run.
//
// Every worker on a host shares the same external address, so one physical
// change is typically reported as "updated" by several records within the
// same tick window. The hook is a machine-wide event and must run once per
// address, not once per record.
//
// Entries are never evicted and are not persisted: a restart starts with
// an empty registry.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::{Mutex, PoisonError};

/// Shared registry of addresses whose hook already fired
///
/// Share it between workers with an `Arc`.
#[derive(Debug, Default)]
pub struct UpdateDedupRegistry {
    seen: Mutex<HashSet<IpAddr>>,
}

impl UpdateDedupRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically check and mark `address`
    ///
    /// Returns `true` exactly once per address: the caller that gets `true`
    /// runs the hook, everyone else skips it.
    pub fn mark_if_first(&self, address: IpAddr) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        seen.insert(address)
    }

    /// Whether the hook already fired for `address`
    pub fn contains(&self, address: IpAddr) -> bool {
        let seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        seen.contains(&address)
    }

    /// Number of addresses marked so far
    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Check if nothing has been marked yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
