//! Subscriber types for the reactive system.
//!
//! A Subscriber is any computation that depends on reactive values: a
//! watcher, a computed value, a render function owned by an outer layer.
//! The core never runs subscribers itself; it only needs the capability set
//! defined by [`Subscriber`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::Dep;

/// Unique identifier for a subscriber.
///
/// Ids are handed out in creation order, so sorting by id runs subscribers
/// in the order they were created (parents before children, for example).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Next id from the process-wide counter.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// The capability set a dependency registry needs from its subscribers.
///
/// Registries hold subscribers weakly; whoever creates a subscriber keeps
/// it alive.
pub trait Subscriber: Send + Sync {
    /// Creation-order identity.
    fn id(&self) -> SubscriberId;

    /// Called by [`Dep::depend`] while this subscriber is the active one.
    ///
    /// The subscriber records `dep` and is expected to call
    /// [`Dep::add_sub`] back exactly once per edge; the registry itself does
    /// not deduplicate.
    fn add_dep(self: Arc<Self>, dep: &Arc<Dep>);

    /// Called by [`Dep::notify`] when something this subscriber read has
    /// changed.
    fn update(&self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_do_not_repeat() {
        let ids: HashSet<SubscriberId> = (0..64).map(|_| SubscriberId::new()).collect();
        assert_eq!(ids.len(), 64);
    }

    #[test]
    fn subscriber_ids_follow_creation_order() {
        let first = SubscriberId::new();
        let second = SubscriberId::new();
        assert!(first < second);
        assert!(first.raw() < second.raw());
    }
}
