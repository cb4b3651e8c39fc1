//! Sequences: ordered lists whose structural mutations are intercepted.
//!
//! Element access by index cannot be tracked per element, so an observed
//! sequence reports every structural change through its observer's
//! registry instead. Readers depend on that registry when they read the
//! field holding the sequence.

use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use super::Value;
use crate::reactive::{observe, Observer};

struct SequenceInner {
    items: RwLock<Vec<Value>>,
    observer: OnceLock<Arc<Observer>>,
    frozen: AtomicBool,
}

/// A shared handle to an ordered list of values.
///
/// Only the mutators below change the contents. On an observed sequence
/// each of them observes the elements it inserts and then notifies the
/// observer's registry. A frozen sequence ignores every mutator.
#[derive(Clone)]
pub struct Sequence(Arc<SequenceInner>);

impl Sequence {
    pub fn new() -> Self {
        Self::from(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The element at `index`. Never registers a dependency.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.items.read().get(index).cloned()
    }

    /// A copy of the current elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.items.read().clone()
    }

    /// Append `value`; returns the new length.
    pub fn push(&self, value: Value) -> usize {
        if self.is_frozen() {
            return self.len();
        }
        let len = {
            let mut items = self.0.items.write();
            items.push(value.clone());
            items.len()
        };
        self.mutated(&[value]);
        len
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Option<Value> {
        if self.is_frozen() {
            return None;
        }
        let removed = self.0.items.write().pop();
        self.mutated(&[]);
        removed
    }

    /// Remove and return the first element.
    pub fn shift(&self) -> Option<Value> {
        if self.is_frozen() {
            return None;
        }
        let removed = {
            let mut items = self.0.items.write();
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        };
        self.mutated(&[]);
        removed
    }

    /// Insert `values` at the front, keeping their order; returns the new
    /// length.
    pub fn unshift(&self, values: Vec<Value>) -> usize {
        if self.is_frozen() {
            return self.len();
        }
        let len = {
            let mut items = self.0.items.write();
            items.splice(0..0, values.iter().cloned());
            items.len()
        };
        self.mutated(&values);
        len
    }

    /// Remove `delete_count` elements starting at `start` and insert
    /// `values` in their place. Out-of-range arguments are clamped. Returns
    /// the removed elements.
    pub fn splice(&self, start: usize, delete_count: usize, values: Vec<Value>) -> Vec<Value> {
        if self.is_frozen() {
            return Vec::new();
        }
        let removed = {
            let mut items = self.0.items.write();
            let start = start.min(items.len());
            let end = start + delete_count.min(items.len() - start);
            items.splice(start..end, values.iter().cloned()).collect()
        };
        self.mutated(&values);
        removed
    }

    /// Sort in place with `compare`.
    ///
    /// The comparator runs without the sequence locked, so it may read
    /// reactive data (including this sequence).
    pub fn sort_by<F>(&self, compare: F)
    where
        F: FnMut(&Value, &Value) -> CmpOrdering,
    {
        if self.is_frozen() {
            return;
        }
        let mut items = self.to_vec();
        items.sort_by(compare);
        *self.0.items.write() = items;
        self.mutated(&[]);
    }

    pub fn reverse(&self) {
        if self.is_frozen() {
            return;
        }
        self.0.items.write().reverse();
        self.mutated(&[]);
    }

    /// Make the sequence immutable. Frozen sequences are not observed.
    pub fn freeze(&self) {
        self.0.frozen.store(true, Ordering::SeqCst);
    }

    pub fn is_frozen(&self) -> bool {
        self.0.frozen.load(Ordering::SeqCst)
    }

    /// The observer attached to this sequence, if any.
    pub fn observer(&self) -> Option<Arc<Observer>> {
        self.0.observer.get().cloned()
    }

    pub fn ptr_eq(&self, other: &Sequence) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn as_ptr(&self) -> *const () {
        Arc::as_ptr(&self.0) as *const ()
    }

    /// Pad with nulls up to `len` without notifying.
    pub(crate) fn grow_to(&self, len: usize) {
        if self.is_frozen() {
            return;
        }
        let mut items = self.0.items.write();
        if items.len() < len {
            items.resize(len, Value::Null);
        }
    }

    pub(crate) fn observer_slot(&self) -> &OnceLock<Arc<Observer>> {
        &self.0.observer
    }

    fn mutated(&self, inserted: &[Value]) {
        if let Some(ob) = self.observer() {
            for value in inserted {
                observe(value, false);
            }
            ob.dep().notify();
        }
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<Value>> for Sequence {
    fn from(items: Vec<Value>) -> Self {
        Self(Arc::new(SequenceInner {
            items: RwLock::new(items),
            observer: OnceLock::new(),
            frozen: AtomicBool::new(false),
        }))
    }
}

impl<V: Into<Value>> FromIterator<V> for Sequence {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self::from(iter.into_iter().map(Into::into).collect::<Vec<_>>())
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("len", &self.len())
            .field("observed", &self.0.observer.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(seq: &Sequence) -> Vec<f64> {
        seq.to_vec().iter().filter_map(Value::as_f64).collect()
    }

    #[test]
    fn push_pop_shift_unshift() {
        let seq: Sequence = [1, 2, 3].into_iter().collect();

        assert_eq!(seq.push(Value::from(4)), 4);
        assert_eq!(seq.pop(), Some(Value::from(4)));
        assert_eq!(seq.shift(), Some(Value::from(1)));
        assert_eq!(seq.unshift(vec![Value::from(0), Value::from(1)]), 4);
        assert_eq!(numbers(&seq), vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn shift_on_empty_returns_none() {
        let seq = Sequence::new();
        assert_eq!(seq.shift(), None);
        assert_eq!(seq.pop(), None);
    }

    #[test]
    fn splice_clamps_its_range() {
        let seq: Sequence = [1, 2, 3].into_iter().collect();

        let removed = seq.splice(1, 10, vec![Value::from(9)]);
        assert_eq!(removed, vec![Value::from(2), Value::from(3)]);
        assert_eq!(numbers(&seq), vec![1.0, 9.0]);

        let removed = seq.splice(5, 1, vec![Value::from(7)]);
        assert!(removed.is_empty());
        assert_eq!(numbers(&seq), vec![1.0, 9.0, 7.0]);
    }

    #[test]
    fn sort_and_reverse() {
        let seq: Sequence = [3, 1, 2].into_iter().collect();
        seq.sort_by(|a, b| {
            a.as_f64()
                .partial_cmp(&b.as_f64())
                .unwrap_or(CmpOrdering::Equal)
        });
        assert_eq!(numbers(&seq), vec![1.0, 2.0, 3.0]);

        seq.reverse();
        assert_eq!(numbers(&seq), vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn frozen_sequences_ignore_mutation() {
        let seq: Sequence = [1].into_iter().collect();
        seq.freeze();

        assert_eq!(seq.push(Value::from(2)), 1);
        assert_eq!(seq.pop(), None);
        assert_eq!(numbers(&seq), vec![1.0]);
    }

    #[test]
    fn grow_to_pads_with_null() {
        let seq: Sequence = [1].into_iter().collect();
        seq.grow_to(3);
        assert_eq!(seq.to_vec(), vec![Value::from(1), Value::Null, Value::Null]);
        seq.grow_to(1);
        assert_eq!(seq.len(), 3);

        seq.freeze();
        seq.grow_to(5);
        assert_eq!(seq.len(), 3);
    }
}
