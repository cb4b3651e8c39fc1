//! Dynamic Values
//!
//! Reactive state is made of plain, dynamically shaped data: records (string
//! keyed property maps) and sequences, nested to any depth, with primitive
//! leaves. This module defines that data model.
//!
//! # Identity
//!
//! Containers are shared handles. Cloning a [`Record`] or [`Sequence`]
//! clones the handle, not the contents, and two values compare equal only
//! when they point at the same container. Primitives compare by value, with
//! the exception that two NaN numbers are considered the same value. This
//! is the comparison reactive setters use to decide whether a write is a
//! change.
//!
//! # Interception
//!
//! All reads and writes go through [`Record::get`] / [`Record::set`] and the
//! [`Sequence`] mutators. Those are the points where the reactive core hooks
//! in, so there is no raw mutable access to container contents.

mod record;
mod sequence;

pub use record::{Getter, Record, Setter};
pub use sequence::Sequence;

pub(crate) use record::Property;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::reactive::{untracked, Observer};

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Record(Record),
    Sequence(Sequence),
}

impl Value {
    /// The identity test used by reactive setters.
    ///
    /// Containers are the same only if they are the same handle. Numbers use
    /// `==`, except that NaN is the same as NaN.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a.ptr_eq(b),
            (Value::Sequence(a), Value::Sequence(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Whether this is a record or a sequence.
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Record(_) | Value::Sequence(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Value::Sequence(s) => Some(s),
            _ => None,
        }
    }

    /// The observer attached to this value, if it is an observed container.
    pub fn observer(&self) -> Option<Arc<Observer>> {
        match self {
            Value::Record(r) => r.observer(),
            Value::Sequence(s) => s.observer(),
            _ => None,
        }
    }

    /// Short type name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Record(_) => "record",
            Value::Sequence(_) => "sequence",
        }
    }

    /// Snapshot this value as JSON without registering any dependency.
    ///
    /// A container that (directly or indirectly) contains itself is written
    /// as `null` at the point where the cycle closes.
    pub fn to_json(&self) -> serde_json::Value {
        untracked(|| self.to_json_inner(&mut Vec::new()))
    }

    fn to_json_inner(&self, ancestors: &mut Vec<*const ()>) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Str(s) => Json::String(s.clone()),
            Value::Record(record) => {
                let ptr = record.as_ptr();
                if ancestors.contains(&ptr) {
                    return Json::Null;
                }
                ancestors.push(ptr);
                let mut map = serde_json::Map::new();
                for key in record.keys() {
                    let value = record.get(&key).unwrap_or_default();
                    map.insert(key, value.to_json_inner(ancestors));
                }
                ancestors.pop();
                Json::Object(map)
            }
            Value::Sequence(seq) => {
                let ptr = seq.as_ptr();
                if ancestors.contains(&ptr) {
                    return Json::Null;
                }
                ancestors.push(ptr);
                let items = seq
                    .to_vec()
                    .iter()
                    .map(|item| item.to_json_inner(ancestors))
                    .collect();
                ancestors.pop();
                Json::Array(items)
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_value(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::Record(r) => fmt::Debug::fmt(r, f),
            Value::Sequence(s) => fmt::Debug::fmt(s, f),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}

impl From<Sequence> for Value {
    fn from(s: Sequence) -> Self {
        Value::Sequence(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Build fresh, unobserved containers from JSON.
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::Str(s),
            Json::Array(items) => {
                Value::Sequence(items.into_iter().map(Value::from).collect())
            }
            Json::Object(map) => {
                Value::Record(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}
