//! Structural Mutation
//!
//! Adding a key to a record, or writing a sequence slot by index, cannot be
//! seen by the accessors already installed. These helpers perform such
//! mutations in a way that keeps the container reactive and notifies its
//! observer.
//!
//! The `try_*` variants report refusals as [`ReactiveError`]. The plain
//! variants log the refusal (outside production) and carry on, so calling
//! code never has to handle a failure in an update path.

use std::fmt;

use tracing::warn;

use super::field::define_reactive;
use crate::config;
use crate::error::{ReactiveError, Result};
use crate::value::{Record, Value};

/// A record key or a sequence index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Name(String),
    Index(usize),
}

impl Key {
    /// The key as a sequence index. Names that spell a non-negative integer
    /// count as indices.
    fn as_index(&self) -> Option<usize> {
        match self {
            Key::Name(name) => name.parse().ok(),
            Key::Index(index) => Some(*index),
        }
    }

    /// The key as a record property name.
    fn into_name(self) -> String {
        match self {
            Key::Name(name) => name,
            Key::Index(index) => index.to_string(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => f.write_str(name),
            Key::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_owned())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

fn not_a_container(op: &'static str, target: &Value) -> ReactiveError {
    ReactiveError::NotAContainer {
        op,
        found: target.kind().to_owned(),
    }
}

fn is_counted_root(record: &Record) -> bool {
    record.is_owner() || record.observer().is_some_and(|ob| ob.root_count() > 0)
}

/// Set `key` on `target`, adding it reactively if it is new.
///
/// - Sequence + index: the sequence grows (null-padded) to at least
///   `index`, then `value` is spliced in at `index`.
/// - Record with `key` already present: plain assignment.
/// - Unobserved record: plain assignment.
/// - Observed record: the key becomes a reactive field and the record's
///   observer is notified.
///
/// Refused for primitives, non-numeric keys on sequences, owner instances and
/// observed root records. Returns `value` on success.
pub fn try_set(target: &Value, key: impl Into<Key>, value: Value) -> Result<Value> {
    let key = key.into();
    match target {
        Value::Sequence(seq) => match key.as_index() {
            Some(index) => {
                seq.grow_to(seq.len().max(index));
                seq.splice(index, 1, vec![value.clone()]);
                Ok(value)
            }
            None => Err(ReactiveError::NonIndexKey {
                key: key.into_name(),
            }),
        },
        Value::Record(record) => {
            let key = key.into_name();
            if record.contains_key(&key) {
                record.set(&key, value.clone());
                return Ok(value);
            }
            if is_counted_root(record) {
                return Err(ReactiveError::RootAddition { key });
            }
            match record.observer() {
                None => record.set(&key, value.clone()),
                Some(ob) => {
                    define_reactive(record, &key, Some(value.clone()), None, false);
                    ob.dep().notify();
                }
            }
            Ok(value)
        }
        _ => Err(not_a_container("set", target)),
    }
}

/// Like [`try_set`], but a refusal is logged and `value` is returned anyway.
pub fn set(target: &Value, key: impl Into<Key>, value: Value) -> Value {
    match try_set(target, key, value.clone()) {
        Ok(value) => value,
        Err(err) => {
            report(&err);
            value
        }
    }
}

/// Remove `key` from `target`, notifying its observer.
///
/// - Sequence + index: the element is spliced out (no-op past the end).
/// - Record: an absent key is a no-op; otherwise the property is removed
///   and the record's observer, if any, is notified.
///
/// Refused for primitives, non-numeric keys on sequences, owner instances and
/// observed root records.
pub fn try_delete(target: &Value, key: impl Into<Key>) -> Result<()> {
    let key = key.into();
    match target {
        Value::Sequence(seq) => match key.as_index() {
            Some(index) => {
                seq.splice(index, 1, Vec::new());
                Ok(())
            }
            None => Err(ReactiveError::NonIndexKey {
                key: key.into_name(),
            }),
        },
        Value::Record(record) => {
            let key = key.into_name();
            if is_counted_root(record) {
                return Err(ReactiveError::RootDeletion { key });
            }
            if !record.contains_key(&key) {
                return Ok(());
            }
            record.remove(&key);
            if let Some(ob) = record.observer() {
                ob.dep().notify();
            }
            Ok(())
        }
        _ => Err(not_a_container("delete", target)),
    }
}

/// Like [`try_delete`], but a refusal is logged instead of returned.
pub fn delete(target: &Value, key: impl Into<Key>) {
    if let Err(err) = try_delete(target, key) {
        report(&err);
    }
}

fn report(err: &ReactiveError) {
    if !config::is_production() {
        warn!("{err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::observe;
    use crate::value::Sequence;

    #[test]
    fn set_on_primitive_is_refused() {
        let err = try_set(&Value::from(1), "a", Value::from(2)).unwrap_err();
        assert!(matches!(err, ReactiveError::NotAContainer { op: "set", .. }));

        // The infallible form still hands the value back.
        assert_eq!(set(&Value::Null, "a", Value::from(2)), Value::from(2));
    }

    #[test]
    fn set_on_unobserved_record_assigns() {
        let record = Record::new();
        set(&Value::from(record.clone()), "a", Value::from(1));
        assert_eq!(record.get("a"), Some(Value::from(1)));
        assert!(record.field("a").is_none());
    }

    #[test]
    fn set_on_observed_record_defines_a_reactive_field() {
        let record = Record::new();
        let value = Value::from(record.clone());
        observe(&value, false);

        set(&value, "a", Value::from(1));
        assert!(record.field("a").is_some());
        assert_eq!(record.get("a"), Some(Value::from(1)));
    }

    #[test]
    fn set_on_root_record_refuses_new_keys_but_allows_existing() {
        let record: Record = [("a", 1)].into_iter().collect();
        let value = Value::from(record.clone());
        observe(&value, true);

        let err = try_set(&value, "b", Value::from(2)).unwrap_err();
        assert_eq!(err, ReactiveError::RootAddition { key: "b".into() });
        assert!(!record.contains_key("b"));

        assert_eq!(try_set(&value, "a", Value::from(3)), Ok(Value::from(3)));
        assert_eq!(record.get("a"), Some(Value::from(3)));
    }

    #[test]
    fn set_on_owner_record_is_refused() {
        let owner = Value::from(Record::new_owner());
        assert!(try_set(&owner, "a", Value::from(1)).is_err());
        assert!(try_delete(&owner, "a").is_err());
    }

    #[test]
    fn set_index_grows_the_sequence() {
        let seq: Sequence = [1].into_iter().collect();
        let value = Value::from(seq.clone());

        set(&value, 3usize, Value::from(9));
        assert_eq!(
            seq.to_vec(),
            vec![Value::from(1), Value::Null, Value::Null, Value::from(9)]
        );

        set(&value, 0usize, Value::from(5));
        assert_eq!(seq.get(0), Some(Value::from(5)));
        assert_eq!(seq.len(), 4);
    }

    #[test]
    fn named_key_on_sequence_is_refused() {
        let value = Value::from(Sequence::new());
        assert_eq!(
            try_set(&value, "length", Value::from(1)),
            Err(ReactiveError::NonIndexKey {
                key: "length".into()
            })
        );
    }

    #[test]
    fn numeric_name_on_sequence_is_an_index() {
        let seq: Sequence = [1, 2].into_iter().collect();
        let value = Value::from(seq.clone());

        assert_eq!(try_set(&value, "1", Value::from(7)), Ok(Value::from(7)));
        assert_eq!(seq.to_vec(), vec![Value::from(1), Value::from(7)]);

        assert_eq!(try_delete(&value, "0"), Ok(()));
        assert_eq!(seq.to_vec(), vec![Value::from(7)]);

        assert!(matches!(
            try_set(&value, "-1", Value::Null),
            Err(ReactiveError::NonIndexKey { .. })
        ));
    }

    #[test]
    fn set_index_on_frozen_sequence_changes_nothing() {
        let seq: Sequence = [1].into_iter().collect();
        seq.freeze();

        set(&Value::from(seq.clone()), 3usize, Value::from(9));
        assert_eq!(seq.to_vec(), vec![Value::from(1)]);
    }

    #[test]
    fn index_key_on_record_is_a_name() {
        let record = Record::new();
        set(&Value::from(record.clone()), 2usize, Value::from(1));
        assert_eq!(record.get("2"), Some(Value::from(1)));
    }

    #[test]
    fn delete_removes_record_keys() {
        let record: Record = [("a", 1)].into_iter().collect();
        let value = Value::from(record.clone());
        observe(&value, false);

        delete(&value, "a");
        assert!(!record.contains_key("a"));

        // Absent keys are a no-op.
        assert_eq!(try_delete(&value, "missing"), Ok(()));
    }

    #[test]
    fn delete_on_root_record_is_refused() {
        let record: Record = [("a", 1)].into_iter().collect();
        let value = Value::from(record.clone());
        observe(&value, true);

        assert_eq!(
            try_delete(&value, "a"),
            Err(ReactiveError::RootDeletion { key: "a".into() })
        );
        assert!(record.contains_key("a"));
    }

    #[test]
    fn delete_splices_sequences() {
        let seq: Sequence = [1, 2, 3].into_iter().collect();
        let value = Value::from(seq.clone());
        delete(&value, 1usize);
        assert_eq!(seq.to_vec(), vec![Value::from(1), Value::from(3)]);

        delete(&value, 10usize);
        assert_eq!(seq.len(), 2);
    }

    #[test]
    fn delete_on_primitive_is_refused() {
        assert!(matches!(
            try_delete(&Value::from("s"), "a"),
            Err(ReactiveError::NotAContainer { op: "delete", .. })
        ));
    }
}
