//! Observable Wrapper
//!
//! An [`Observer`] is attached to each observed container. Attaching one
//! converts a record's keys into reactive fields, or observes every element
//! of a sequence, and gives the container a registry for structural
//! changes (keys added or removed through the mutation helpers, sequence
//! mutators).

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::trace;

use super::field::define_reactive;
use super::Dep;
use crate::value::{Record, Sequence, Value};

thread_local! {
    static SHOULD_OBSERVE: Cell<bool> = const { Cell::new(true) };
}

/// Whether `observe` currently creates new observers on this thread.
pub fn should_observe() -> bool {
    SHOULD_OBSERVE.with(Cell::get)
}

/// Turn creation of new observers on or off for this thread.
///
/// Existing observers are still returned while observation is off. Callers
/// must restore the previous state; [`ObservingPaused`] does it for you.
pub fn toggle_observing(value: bool) {
    SHOULD_OBSERVE.with(|flag| flag.set(value));
}

/// Guard that disables observation until dropped, then restores the
/// previous state.
pub struct ObservingPaused {
    previous: bool,
}

impl ObservingPaused {
    pub fn new() -> Self {
        let previous = should_observe();
        toggle_observing(false);
        Self { previous }
    }
}

impl Default for ObservingPaused {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ObservingPaused {
    fn drop(&mut self) {
        toggle_observing(self.previous);
    }
}

/// Which kind of container an observer is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Record,
    Sequence,
}

/// The observer attached to one record or sequence.
pub struct Observer {
    id: u64,
    kind: ContainerKind,
    dep: Arc<Dep>,
    root_count: AtomicUsize,
}

impl Observer {
    fn new(kind: ContainerKind) -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self {
            id: COUNTER.fetch_add(1, Ordering::Relaxed),
            kind,
            dep: Arc::new(Dep::new()),
            root_count: AtomicUsize::new(0),
        }
    }

    /// Attach a fresh observer to `record` and make its keys reactive.
    ///
    /// The observer is attached before the keys are walked so that a record
    /// reachable from its own fields resolves to this observer instead of
    /// recursing.
    fn attach_record(record: &Record) -> Arc<Observer> {
        let ob = Arc::clone(
            record
                .observer_slot()
                .get_or_init(|| Arc::new(Observer::new(ContainerKind::Record))),
        );
        trace!(observer = ob.id, keys = record.len(), "observing record");
        for key in record.keys() {
            define_reactive(record, &key, None, None, false);
        }
        ob
    }

    /// Attach a fresh observer to `seq` and observe its elements.
    fn attach_sequence(seq: &Sequence) -> Arc<Observer> {
        let ob = Arc::clone(
            seq.observer_slot()
                .get_or_init(|| Arc::new(Observer::new(ContainerKind::Sequence))),
        );
        trace!(observer = ob.id, len = seq.len(), "observing sequence");
        observe_items(&seq.to_vec());
        ob
    }

    /// Debugging identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    /// Registry for structural changes of the container.
    pub fn dep(&self) -> &Arc<Dep> {
        &self.dep
    }

    /// Number of root consumers that use the container as their whole
    /// top-level state.
    pub fn root_count(&self) -> usize {
        self.root_count.load(Ordering::SeqCst)
    }

    fn add_root(&self) {
        self.root_count.fetch_add(1, Ordering::SeqCst);
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("dep", &self.dep.id())
            .field("root_count", &self.root_count())
            .finish()
    }
}

/// Observe `value`, returning its observer.
///
/// An already observed container returns its existing observer. Otherwise a
/// new one is created if observation is enabled on this thread and the
/// value is an extensible record (not an owner instance) or an unfrozen
/// sequence. Primitives and null are never observed.
///
/// With `as_root`, the returned observer's root count is incremented.
pub fn observe(value: &Value, as_root: bool) -> Option<Arc<Observer>> {
    let ob = match value {
        Value::Record(record) => record.observer().or_else(|| {
            (should_observe() && record.is_extensible() && !record.is_owner())
                .then(|| Observer::attach_record(record))
        }),
        Value::Sequence(seq) => seq.observer().or_else(|| {
            (should_observe() && !seq.is_frozen()).then(|| Observer::attach_sequence(seq))
        }),
        _ => None,
    };

    if as_root {
        if let Some(ob) = &ob {
            ob.add_root();
        }
    }
    ob
}

/// Observe every element of a list.
fn observe_items(items: &[Value]) {
    for item in items {
        observe(item, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observe_is_idempotent() {
        let value = Value::from([("a", 1)].into_iter().collect::<Record>());
        let first = observe(&value, false).unwrap();
        let second = observe(&value, false).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&value.observer().unwrap(), &first));
    }

    #[test]
    fn primitives_are_not_observed() {
        assert!(observe(&Value::Null, false).is_none());
        assert!(observe(&Value::from(1), true).is_none());
        assert!(observe(&Value::from("s"), false).is_none());
    }

    #[test]
    fn frozen_and_owner_containers_are_skipped() {
        let frozen = Record::new();
        frozen.freeze();
        assert!(observe(&Value::from(frozen), false).is_none());

        let owner = Record::new_owner();
        assert!(observe(&Value::from(owner), false).is_none());

        let seq = Sequence::new();
        seq.freeze();
        assert!(observe(&Value::from(seq), false).is_none());
    }

    #[test]
    fn as_root_counts_consumers() {
        let value = Value::from(Record::new());
        observe(&value, true);
        observe(&value, false);
        let ob = observe(&value, true).unwrap();
        assert_eq!(ob.root_count(), 2);
    }

    #[test]
    fn observe_walks_record_keys() {
        let record: Record = [("a", 1), ("b", 2)].into_iter().collect();
        observe(&Value::from(record.clone()), false);
        assert!(record.field("a").is_some());
        assert!(record.field("b").is_some());
    }

    #[test]
    fn observe_reaches_nested_containers() {
        let inner: Record = [("x", 1)].into_iter().collect();
        let seq: Sequence = [Value::from(inner.clone())].into_iter().collect();
        let outer: Record = [("list", Value::from(seq.clone()))].into_iter().collect();

        observe(&Value::from(outer), false);
        assert!(seq.observer().is_some());
        assert!(inner.observer().is_some());
        assert!(inner.field("x").is_some());
    }

    #[test]
    fn self_referencing_record_terminates() {
        let record = Record::new();
        record.set("me", Value::from(record.clone()));
        let ob = observe(&Value::from(record.clone()), false).unwrap();
        assert!(Arc::ptr_eq(&record.observer().unwrap(), &ob));
    }

    #[test]
    fn paused_observation_is_restored() {
        {
            let _paused = ObservingPaused::new();
            assert!(!should_observe());
            assert!(observe(&Value::from(Record::new()), false).is_none());
        }
        assert!(should_observe());
    }

    #[test]
    fn paused_observation_still_returns_existing_observer() {
        let value = Value::from(Record::new());
        let ob = observe(&value, false).unwrap();

        let _paused = ObservingPaused::new();
        let again = observe(&value, false).unwrap();
        assert!(Arc::ptr_eq(&ob, &again));
    }
}
