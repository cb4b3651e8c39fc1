//! Reactive Fields
//!
//! [`define_reactive`] replaces one key of a record with an intercepted
//! accessor. Reads made while a subscriber is evaluating register that
//! subscriber with the field's registry (and with the registry of the
//! container stored in the field); writes that change the value notify the
//! field's registry.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::context::ReactiveContext;
use super::observer::observe;
use super::{Dep, Observer};
use crate::config;
use crate::value::{Getter, Property, Record, Sequence, Setter, Value};

/// Hook invoked on every effective write to a field, in development builds
/// only (see [`ReactiveConfig::production`](crate::config::ReactiveConfig)).
pub type CustomSetter = Arc<dyn Fn() + Send + Sync>;

/// The accessor installed on one reactive key.
pub struct ReactiveField {
    key: String,
    dep: Arc<Dep>,
    /// Shadow value, used when there is no preserved getter.
    value: RwLock<Value>,
    getter: Option<Getter>,
    setter: Option<Setter>,
    /// Observer of the current value; replaced on every write.
    child: RwLock<Option<Arc<Observer>>>,
    custom_setter: Option<CustomSetter>,
    shallow: bool,
}

impl ReactiveField {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The registry notified when this field is written.
    pub fn dep(&self) -> &Arc<Dep> {
        &self.dep
    }

    /// The observer of the value currently stored in the field.
    pub fn child_observer(&self) -> Option<Arc<Observer>> {
        self.child.read().clone()
    }

    fn current(&self) -> Value {
        match &self.getter {
            Some(getter) => getter(),
            None => self.value.read().clone(),
        }
    }

    /// Read the field, registering the active subscriber if there is one.
    pub fn get(&self) -> Value {
        let value = self.current();
        if ReactiveContext::is_active() {
            self.dep.depend();
            if let Some(child) = self.child_observer() {
                child.dep().depend();
                if let Value::Sequence(seq) = &value {
                    depend_sequence(seq);
                }
            }
        }
        value
    }

    /// Write the field and notify its subscribers if the value changed.
    pub fn set(&self, new_value: Value) {
        let old = self.current();
        if new_value.same_value(&old) {
            return;
        }
        if let Some(hook) = &self.custom_setter {
            if !config::is_production() {
                hook();
            }
        }
        // Accessor without a setter: the field is read-only.
        if self.getter.is_some() && self.setter.is_none() {
            return;
        }

        let child = if self.shallow {
            None
        } else {
            observe(&new_value, false)
        };
        match &self.setter {
            Some(setter) => setter(new_value),
            None => *self.value.write() = new_value,
        }
        *self.child.write() = child;
        self.dep.notify();
    }
}

impl fmt::Debug for ReactiveField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveField")
            .field("key", &self.key)
            .field("dep", &self.dep.id())
            .field("shallow", &self.shallow)
            .finish()
    }
}

/// Make `key` of `record` reactive.
///
/// - A non-configurable key is left alone.
/// - An existing getter/setter pair (including a previously installed
///   reactive accessor) is preserved and called through.
/// - The initial value is `value` if given; otherwise the key's current
///   value, unless the key only has a getter, in which case it is null.
/// - Unless `shallow`, the initial value is observed.
///
/// Returns the installed field, or `None` if nothing was installed (fixed
/// key, or new key on a non-extensible record).
pub fn define_reactive(
    record: &Record,
    key: &str,
    value: Option<Value>,
    custom_setter: Option<CustomSetter>,
    shallow: bool,
) -> Option<Arc<ReactiveField>> {
    let existing = record.property(key);
    if existing.as_ref().is_some_and(|p| !p.configurable()) {
        return None;
    }

    let (getter, setter, stored) = match existing {
        Some(Property::Data { value, .. }) => (None, None, Some(value)),
        Some(Property::Accessor { get, set, .. }) => (get, set, None),
        Some(Property::Reactive { field, .. }) => {
            let (read, write) = (Arc::clone(&field), field);
            let get: Getter = Arc::new(move || read.get());
            let set: Setter = Arc::new(move |v: Value| write.set(v));
            (Some(get), Some(set), None)
        }
        None => (None, None, None),
    };

    let initial = match value {
        Some(v) => v,
        None if getter.is_none() || setter.is_some() => match (&getter, stored) {
            (Some(get), _) => get(),
            (None, stored) => stored.unwrap_or_default(),
        },
        None => Value::Null,
    };

    let child = if shallow {
        None
    } else {
        observe(&initial, false)
    };

    let field = Arc::new(ReactiveField {
        key: key.to_owned(),
        dep: Arc::new(Dep::new()),
        value: RwLock::new(initial),
        getter,
        setter,
        child: RwLock::new(child),
        custom_setter,
        shallow,
    });

    let installed = record.install(
        key,
        Property::Reactive {
            field: Arc::clone(&field),
            configurable: true,
        },
    );
    installed.then_some(field)
}

/// Register the active subscriber with the observer of every element of
/// `seq`, descending into nested sequences.
///
/// Element reads cannot be intercepted, so touching a sequence field counts
/// as touching everything inside it.
fn depend_sequence(seq: &Sequence) {
    for item in seq.to_vec() {
        if let Some(ob) = item.observer() {
            ob.dep().depend();
        }
        if let Value::Sequence(inner) = &item {
            depend_sequence(inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn define_reads_back_the_value() {
        let record = Record::new();
        define_reactive(&record, "a", Some(Value::from(1)), None, false).unwrap();
        assert_eq!(record.get("a"), Some(Value::from(1)));
    }

    #[test]
    fn define_without_value_keeps_current_data() {
        let record: Record = [("a", 5)].into_iter().collect();
        define_reactive(&record, "a", None, None, false).unwrap();
        assert_eq!(record.get("a"), Some(Value::from(5)));
    }

    #[test]
    fn fixed_keys_are_skipped() {
        let record = Record::new();
        record.define_fixed("k", Value::from(1));
        assert!(define_reactive(&record, "k", None, None, false).is_none());
        assert!(record.field("k").is_none());
    }

    #[test]
    fn new_key_on_non_extensible_record_is_skipped() {
        let record = Record::new();
        record.prevent_extensions();
        assert!(define_reactive(&record, "k", Some(Value::from(1)), None, false).is_none());
    }

    #[test]
    fn preserved_getter_is_called_through() {
        let record = Record::new();
        record.define_accessor("g", Some(Arc::new(|| Value::from(42))), None);
        define_reactive(&record, "g", None, None, false).unwrap();
        assert_eq!(record.get("g"), Some(Value::from(42)));

        // Getter without setter: writes are ignored.
        record.set("g", Value::from(1));
        assert_eq!(record.get("g"), Some(Value::from(42)));
    }

    #[test]
    fn preserved_setter_receives_writes() {
        let stored = Arc::new(RwLock::new(Value::from(1)));
        let (read, write) = (Arc::clone(&stored), Arc::clone(&stored));

        let record = Record::new();
        record.define_accessor(
            "s",
            Some(Arc::new(move || read.read().clone())),
            Some(Arc::new(move |v: Value| *write.write() = v)),
        );
        define_reactive(&record, "s", None, None, false).unwrap();

        record.set("s", Value::from(2));
        assert_eq!(*stored.read(), Value::from(2));
        assert_eq!(record.get("s"), Some(Value::from(2)));
    }

    #[test]
    fn shallow_fields_do_not_observe_their_value() {
        let inner = Record::new();
        let record = Record::new();
        let field =
            define_reactive(&record, "r", Some(Value::from(inner.clone())), None, true).unwrap();
        assert!(inner.observer().is_none());
        assert!(field.child_observer().is_none());
    }

    #[test]
    fn writes_replace_the_child_observer() {
        let first = Record::new();
        let second = Record::new();
        let record = Record::new();
        let field =
            define_reactive(&record, "r", Some(Value::from(first.clone())), None, false).unwrap();
        let before = field.child_observer().unwrap();
        assert!(Arc::ptr_eq(&before, &first.observer().unwrap()));

        record.set("r", Value::from(second.clone()));
        let after = field.child_observer().unwrap();
        assert!(Arc::ptr_eq(&after, &second.observer().unwrap()));

        record.set("r", Value::from(1));
        assert!(field.child_observer().is_none());
    }

    #[test]
    fn custom_setter_runs_on_effective_writes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let hook_calls = Arc::clone(&calls);
        let record = Record::new();
        define_reactive(
            &record,
            "a",
            Some(Value::from(1)),
            Some(Arc::new(move || {
                hook_calls.fetch_add(1, Ordering::SeqCst);
            })),
            false,
        );

        record.set("a", Value::from(1));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        record.set("a", Value::from(2));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn redefining_wraps_the_previous_field() {
        let record = Record::new();
        let first = define_reactive(&record, "a", Some(Value::from(1)), None, false).unwrap();
        let second = define_reactive(&record, "a", None, None, false).unwrap();
        assert!(!Arc::ptr_eq(first.dep(), second.dep()));

        record.set("a", Value::from(3));
        assert_eq!(first.get(), Value::from(3));
        assert_eq!(record.get("a"), Some(Value::from(3)));
    }
}
