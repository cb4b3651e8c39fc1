//! Records: insertion-ordered, string-keyed property maps.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::Value;
use crate::reactive::{Observer, ReactiveField};

/// A user-defined property getter.
pub type Getter = Arc<dyn Fn() -> Value + Send + Sync>;

/// A user-defined property setter.
pub type Setter = Arc<dyn Fn(Value) + Send + Sync>;

/// How a single key of a record is stored.
#[derive(Clone)]
pub(crate) enum Property {
    /// A plain stored value.
    Data { value: Value, configurable: bool },

    /// A user-defined getter/setter pair. Either half may be missing.
    Accessor {
        get: Option<Getter>,
        set: Option<Setter>,
        configurable: bool,
    },

    /// An intercepted accessor installed by `define_reactive`.
    Reactive {
        field: Arc<ReactiveField>,
        configurable: bool,
    },
}

impl Property {
    pub(crate) fn configurable(&self) -> bool {
        match self {
            Property::Data { configurable, .. }
            | Property::Accessor { configurable, .. }
            | Property::Reactive { configurable, .. } => *configurable,
        }
    }

    fn make_fixed(&mut self) {
        match self {
            Property::Data { configurable, .. }
            | Property::Accessor { configurable, .. }
            | Property::Reactive { configurable, .. } => *configurable = false,
        }
    }
}

struct RecordInner {
    props: RwLock<IndexMap<String, Property>>,
    observer: OnceLock<Arc<Observer>>,
    extensible: AtomicBool,
    owner: bool,
}

/// A shared handle to a string-keyed property map.
///
/// Reads and writes through [`get`](Record::get) and [`set`](Record::set)
/// call through any accessor installed on the key, which is how reactive
/// fields observe access.
#[derive(Clone)]
pub struct Record(Arc<RecordInner>);

/// What a write resolved to once the property lock is released.
enum Assign {
    Setter(Option<Setter>),
    Field(Arc<ReactiveField>),
}

impl Record {
    /// Create an empty, extensible record.
    pub fn new() -> Self {
        Self::with_owner_flag(false)
    }

    /// Create a record that stands for a subscriber-owning instance (for
    /// example a component).
    ///
    /// Owner records are never observed themselves, and `set`/`delete`
    /// refuse to add or remove their keys.
    pub fn new_owner() -> Self {
        Self::with_owner_flag(true)
    }

    fn with_owner_flag(owner: bool) -> Self {
        Self(Arc::new(RecordInner {
            props: RwLock::new(IndexMap::new()),
            observer: OnceLock::new(),
            extensible: AtomicBool::new(true),
            owner,
        }))
    }

    pub fn is_owner(&self) -> bool {
        self.0.owner
    }

    /// Read `key`, calling through its getter if it has one.
    ///
    /// Returns `None` when the key is absent.
    pub fn get(&self, key: &str) -> Option<Value> {
        let prop = self.0.props.read().get(key).cloned()?;
        Some(match prop {
            Property::Data { value, .. } => value,
            Property::Accessor { get, .. } => get.map(|g| g()).unwrap_or_default(),
            Property::Reactive { field, .. } => field.get(),
        })
    }

    /// Assign `value` to `key`.
    ///
    /// Existing accessors are called; a getter-only accessor ignores the
    /// write. An absent key becomes a plain (non-reactive) data property,
    /// unless the record is no longer extensible, in which case the write is
    /// dropped. Use [`crate::reactive::set`] to add a key reactively.
    pub fn set(&self, key: &str, value: Value) {
        let assign = {
            let mut props = self.0.props.write();
            match props.get_mut(key) {
                Some(Property::Data { value: slot, .. }) => {
                    *slot = value;
                    return;
                }
                Some(Property::Accessor { set, .. }) => Assign::Setter(set.clone()),
                Some(Property::Reactive { field, .. }) => Assign::Field(Arc::clone(field)),
                None => {
                    if self.is_extensible() {
                        props.insert(
                            key.to_owned(),
                            Property::Data {
                                value,
                                configurable: true,
                            },
                        );
                    }
                    return;
                }
            }
        };

        match assign {
            Assign::Setter(Some(setter)) => setter(value),
            Assign::Setter(None) => {}
            Assign::Field(field) => field.set(value),
        }
    }

    /// Whether `key` is an own property.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.props.read().contains_key(key)
    }

    /// Own keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.0.props.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.props.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Define (or redefine) a configurable data property.
    ///
    /// Returns false if the key exists and is not configurable, or is new
    /// and the record is not extensible.
    pub fn define_property(&self, key: &str, value: Value) -> bool {
        self.install(
            key,
            Property::Data {
                value,
                configurable: true,
            },
        )
    }

    /// Define a data property that can never be redefined or deleted.
    pub fn define_fixed(&self, key: &str, value: Value) -> bool {
        self.install(
            key,
            Property::Data {
                value,
                configurable: false,
            },
        )
    }

    /// Define a configurable accessor property.
    pub fn define_accessor(&self, key: &str, get: Option<Getter>, set: Option<Setter>) -> bool {
        self.install(
            key,
            Property::Accessor {
                get,
                set,
                configurable: true,
            },
        )
    }

    /// Remove `key`. Non-configurable keys stay; returns whether a property
    /// was removed.
    ///
    /// This is a raw removal: use [`crate::reactive::delete`] to notify
    /// observers of the structural change.
    pub fn remove(&self, key: &str) -> bool {
        let mut props = self.0.props.write();
        match props.get(key) {
            Some(prop) if prop.configurable() => props.shift_remove(key).is_some(),
            _ => false,
        }
    }

    /// Forbid adding new keys. Such records are not observed.
    pub fn prevent_extensions(&self) {
        self.0.extensible.store(false, Ordering::SeqCst);
    }

    /// Forbid adding keys and make every existing key non-configurable.
    pub fn freeze(&self) {
        self.prevent_extensions();
        for prop in self.0.props.write().values_mut() {
            prop.make_fixed();
        }
    }

    pub fn is_extensible(&self) -> bool {
        self.0.extensible.load(Ordering::SeqCst)
    }

    /// The observer attached to this record, if any.
    pub fn observer(&self) -> Option<Arc<Observer>> {
        self.0.observer.get().cloned()
    }

    /// The reactive accessor installed on `key`, if any.
    pub fn field(&self, key: &str) -> Option<Arc<ReactiveField>> {
        match self.0.props.read().get(key) {
            Some(Property::Reactive { field, .. }) => Some(Arc::clone(field)),
            _ => None,
        }
    }

    pub fn ptr_eq(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn as_ptr(&self) -> *const () {
        Arc::as_ptr(&self.0) as *const ()
    }

    pub(crate) fn property(&self, key: &str) -> Option<Property> {
        self.0.props.read().get(key).cloned()
    }

    /// Put `prop` under `key`, honouring configurability and extensibility.
    pub(crate) fn install(&self, key: &str, prop: Property) -> bool {
        let mut props = self.0.props.write();
        match props.get_mut(key) {
            Some(existing) if !existing.configurable() => false,
            Some(existing) => {
                *existing = prop;
                true
            }
            None if self.is_extensible() => {
                props.insert(key.to_owned(), prop);
                true
            }
            None => false,
        }
    }

    pub(crate) fn observer_slot(&self) -> &OnceLock<Arc<Observer>> {
        &self.0.observer
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let record = Record::new();
        {
            let mut props = record.0.props.write();
            for (key, value) in iter {
                props.insert(
                    key.into(),
                    Property::Data {
                        value: value.into(),
                        configurable: true,
                    },
                );
            }
        }
        record
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("keys", &self.keys())
            .field("observed", &self.0.observer.get().is_some())
            .field("owner", &self.0.owner)
            .finish()
    }
}
