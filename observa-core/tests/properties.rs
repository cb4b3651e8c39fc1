//! Property-based tests for observation and notification.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use proptest::prelude::*;

use observa_core::reactive::{
    define_reactive, observe, Dep, ReactiveContext, Subscriber, SubscriberId,
};
use observa_core::value::{Record, Sequence, Value};

struct Counter {
    id: SubscriberId,
    updates: AtomicUsize,
}

impl Counter {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            id: SubscriberId::new(),
            updates: AtomicUsize::new(0),
        })
    }
}

impl Subscriber for Counter {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn add_dep(self: Arc<Self>, dep: &Arc<Dep>) {
        let me: Arc<dyn Subscriber> = self;
        dep.add_sub(&me);
    }

    fn update(&self) {
        self.updates.fetch_add(1, Ordering::SeqCst);
    }
}

fn primitive() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        (-1.0e6f64..1.0e6).prop_map(Value::from),
        Just(Value::from(f64::NAN)),
        "[a-z]{0,8}".prop_map(Value::from),
    ]
}

#[derive(Debug, Clone)]
enum SeqOp {
    Push(i32),
    Pop,
    Shift,
    Unshift(i32),
    Reverse,
}

fn seq_op() -> impl Strategy<Value = SeqOp> {
    prop_oneof![
        any::<i32>().prop_map(SeqOp::Push),
        Just(SeqOp::Pop),
        Just(SeqOp::Shift),
        any::<i32>().prop_map(SeqOp::Unshift),
        Just(SeqOp::Reverse),
    ]
}

// ============================================================================
// Observation
// ============================================================================

proptest! {
    /// Observing any record twice yields the same observer, stored on the
    /// record.
    #[test]
    fn prop_observe_is_idempotent(
        entries in prop::collection::hash_map("[a-z]{1,6}", primitive(), 0..8)
    ) {
        let record: Record = entries.into_iter().collect();
        let value = Value::from(record.clone());

        let first = observe(&value, false).expect("records are observable");
        let second = observe(&value, false).expect("records are observable");
        prop_assert!(Arc::ptr_eq(&first, &second));
        prop_assert!(Arc::ptr_eq(&record.observer().expect("attached"), &first));
    }

    /// A freshly defined field reads back the value it was defined with.
    #[test]
    fn prop_defined_field_reads_back(
        entries in prop::collection::hash_map("[a-z]{1,6}", primitive(), 1..8)
    ) {
        let record = Record::new();
        for (key, value) in &entries {
            define_reactive(&record, key, Some(value.clone()), None, false);
        }
        for (key, value) in &entries {
            let read = record.get(key).expect("defined");
            prop_assert!(read.same_value(value), "{key}: {read:?} != {value:?}");
        }
    }
}

// ============================================================================
// Notification
// ============================================================================

proptest! {
    /// A write notifies each subscriber once, unless the new value is the
    /// same value as the old one.
    #[test]
    fn prop_write_notifies_only_on_change(
        old in primitive(),
        new in primitive(),
        subscribers in 1usize..5,
    ) {
        let record = Record::new();
        define_reactive(&record, "k", Some(old.clone()), None, false);

        let subs: Vec<_> = (0..subscribers).map(|_| Counter::new()).collect();
        for s in &subs {
            let _ctx = ReactiveContext::enter(Some(Arc::clone(s) as Arc<dyn Subscriber>));
            record.get("k");
        }

        record.set("k", new.clone());

        let expected = usize::from(!old.same_value(&new));
        for s in &subs {
            prop_assert_eq!(s.updates.load(Ordering::SeqCst), expected);
        }
    }

    /// Every intercepted mutator notifies the sequence's observer once.
    #[test]
    fn prop_sequence_mutators_notify_once_each(
        initial in prop::collection::vec(any::<i32>(), 0..6),
        ops in prop::collection::vec(seq_op(), 0..12),
    ) {
        let seq: Sequence = initial.into_iter().collect();
        let ob = observe(&Value::from(seq.clone()), false).expect("sequences are observable");

        let s = Counter::new();
        {
            let _ctx = ReactiveContext::enter(Some(Arc::clone(&s) as Arc<dyn Subscriber>));
            ob.dep().depend();
        }

        for op in &ops {
            match op {
                SeqOp::Push(n) => { seq.push(Value::from(*n)); }
                SeqOp::Pop => { seq.pop(); }
                SeqOp::Shift => { seq.shift(); }
                SeqOp::Unshift(n) => { seq.unshift(vec![Value::from(*n)]); }
                SeqOp::Reverse => seq.reverse(),
            }
        }

        prop_assert_eq!(s.updates.load(Ordering::SeqCst), ops.len());
    }
}
