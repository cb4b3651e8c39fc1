//! Dependency Registry
//!
//! A [`Dep`] is a publish point. Every reactive field owns one, and every
//! observer owns one for structural changes of its container. Subscribers
//! that read through the publish point are recorded here and told to update
//! when it fires.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::trace;

use super::context::ReactiveContext;
use super::{Subscriber, SubscriberId};
use crate::config;

/// Creation-order identifier of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DepId(u64);

impl DepId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// An ordered list of subscribers plus the ability to notify them.
///
/// Subscribers are held weakly. The list may contain the same subscriber
/// twice if a caller registers it twice; subscribers are responsible for
/// registering each edge once.
pub struct Dep {
    id: DepId,
    subs: Mutex<Vec<Weak<dyn Subscriber>>>,
}

impl Dep {
    pub fn new() -> Self {
        Self {
            id: DepId::next(),
            subs: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> DepId {
        self.id
    }

    /// Append `sub`.
    pub fn add_sub(&self, sub: &Arc<dyn Subscriber>) {
        self.subs.lock().push(Arc::downgrade(sub));
    }

    /// Remove the first registration of the subscriber with `id`.
    ///
    /// Registrations whose subscriber has been dropped are pruned on the
    /// way.
    pub fn remove_sub(&self, id: SubscriberId) {
        let mut subs = self.subs.lock();
        subs.retain(|weak| weak.strong_count() > 0);
        if let Some(pos) = subs
            .iter()
            .position(|weak| weak.upgrade().is_some_and(|s| s.id() == id))
        {
            subs.remove(pos);
        }
    }

    /// Offer this registry to the current subscriber, if any.
    pub fn depend(self: &Arc<Self>) {
        if let Some(target) = ReactiveContext::current() {
            target.add_dep(self);
        }
    }

    /// Tell every subscriber registered right now to update.
    ///
    /// The list is snapshotted first, so subscribers may add or remove
    /// registrations while being notified. With synchronous notification the
    /// snapshot is run in subscriber creation order; with batched
    /// notification the scheduler orders the work instead.
    pub fn notify(&self) {
        let mut subs: Vec<Arc<dyn Subscriber>> =
            self.subs.lock().iter().filter_map(Weak::upgrade).collect();

        if !config::async_notification() {
            subs.sort_by_key(|s| s.id());
        }

        trace!(dep = self.id.0, subscribers = subs.len(), "notify");
        for sub in subs {
            sub.update();
        }
    }

    /// Number of live registrations.
    pub fn subscriber_count(&self) -> usize {
        self.subs
            .lock()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Ids of live registrations, in registration order.
    pub fn subscriber_ids(&self) -> Vec<SubscriberId> {
        self.subs
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .map(|s| s.id())
            .collect()
    }

    pub fn has_subscriber(&self, id: SubscriberId) -> bool {
        self.subscriber_ids().contains(&id)
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.id)
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
