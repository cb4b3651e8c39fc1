// ----------------------------------------------------------------------------
// Python Bindings
// ----------------------------------------------------------------------------

//! Python-facing wrappers.
//!
//! Python dicts, lists and scalars are converted into [`Value`]s on the way
//! in. Nested records come back out as `ReactiveRecord` handles that share
//! the underlying record, so writes made from Python go through the same
//! reactive paths as writes made from Rust.

use pyo3::exceptions::{PyKeyError, PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict, PyFloat, PyList, PyLong, PyString};

use crate::reactive;
use crate::value::{Record, Sequence, Value};

fn record_from_dict(dict: &Bound<'_, PyDict>) -> PyResult<Record> {
    let record = Record::new();
    for (key, value) in dict.iter() {
        let key: String = key.extract()?;
        record.set(&key, to_value(&value)?);
    }
    Ok(record)
}

fn to_value(obj: &Bound<'_, PyAny>) -> PyResult<Value> {
    if obj.is_none() {
        return Ok(Value::Null);
    }
    // `bool` subclasses `int`, so it has to be checked first.
    if let Ok(b) = obj.downcast::<PyBool>() {
        return Ok(Value::Bool(b.is_true()));
    }
    if obj.is_instance_of::<PyLong>() || obj.is_instance_of::<PyFloat>() {
        return Ok(Value::Number(obj.extract()?));
    }
    if obj.is_instance_of::<PyString>() {
        return Ok(Value::Str(obj.extract()?));
    }
    if let Ok(dict) = obj.downcast::<PyDict>() {
        return Ok(Value::Record(record_from_dict(dict)?));
    }
    if let Ok(list) = obj.downcast::<PyList>() {
        let items = list
            .iter()
            .map(|item| to_value(&item))
            .collect::<PyResult<Vec<_>>>()?;
        return Ok(Value::Sequence(Sequence::from(items)));
    }
    if let Ok(wrapper) = obj.downcast::<PyReactiveRecord>() {
        return Ok(Value::Record(wrapper.borrow().record.clone()));
    }
    Err(PyTypeError::new_err(format!(
        "cannot store {obj} in reactive data"
    )))
}

fn from_value(py: Python<'_>, value: &Value) -> PyResult<PyObject> {
    Ok(match value {
        Value::Null => py.None(),
        Value::Bool(b) => b.into_py(py),
        Value::Number(n) => n.into_py(py),
        Value::Str(s) => s.as_str().into_py(py),
        Value::Record(record) => Py::new(
            py,
            PyReactiveRecord {
                record: record.clone(),
            },
        )?
        .into_py(py),
        Value::Sequence(seq) => {
            let items = seq
                .to_vec()
                .iter()
                .map(|item| from_value(py, item))
                .collect::<PyResult<Vec<_>>>()?;
            PyList::new_bound(py, items).into_any().unbind()
        }
    })
}

/// Python-exposed reactive record.
#[pyclass(name = "ReactiveRecord")]
pub struct PyReactiveRecord {
    record: Record,
}

impl PyReactiveRecord {
    fn value(&self) -> Value {
        Value::Record(self.record.clone())
    }
}

#[pymethods]
impl PyReactiveRecord {
    /// Create a record, optionally from a dict.
    #[new]
    #[pyo3(signature = (data = None))]
    fn new(data: Option<&Bound<'_, PyDict>>) -> PyResult<Self> {
        let record = match data {
            Some(dict) => record_from_dict(dict)?,
            None => Record::new(),
        };
        Ok(Self { record })
    }

    /// Make the record reactive. Returns whether it is observed afterwards.
    #[pyo3(signature = (as_root = false))]
    fn observe(&self, as_root: bool) -> bool {
        reactive::observe(&self.value(), as_root).is_some()
    }

    fn is_observed(&self) -> bool {
        self.record.observer().is_some()
    }

    fn keys(&self) -> Vec<String> {
        self.record.keys()
    }

    fn to_json(&self) -> String {
        self.value().to_json().to_string()
    }

    fn __getitem__(&self, py: Python<'_>, key: &str) -> PyResult<PyObject> {
        match self.record.get(key) {
            Some(value) => from_value(py, &value),
            None => Err(PyKeyError::new_err(key.to_owned())),
        }
    }

    fn __setitem__(&self, key: &str, value: &Bound<'_, PyAny>) -> PyResult<()> {
        reactive::try_set(&self.value(), key, to_value(value)?)
            .map(drop)
            .map_err(|err| PyValueError::new_err(err.to_string()))
    }

    fn __delitem__(&self, key: &str) -> PyResult<()> {
        if !self.record.contains_key(key) {
            return Err(PyKeyError::new_err(key.to_owned()));
        }
        reactive::try_delete(&self.value(), key)
            .map_err(|err| PyValueError::new_err(err.to_string()))
    }

    fn __contains__(&self, key: &str) -> bool {
        self.record.contains_key(key)
    }

    fn __len__(&self) -> usize {
        self.record.len()
    }

    fn __repr__(&self) -> String {
        format!("ReactiveRecord({})", self.to_json())
    }
}

/// Turn creation of new observers on or off for the calling thread.
#[pyfunction]
pub fn toggle_observing(value: bool) {
    reactive::toggle_observing(value);
}
