//! Observa Core
//!
//! This crate provides the dependency-tracking core of the Observa reactive
//! state engine. It turns plain records and sequences into observable data:
//! reads made while a subscriber is evaluating are recorded as dependencies,
//! and writes notify every subscriber that read the changed data.
//!
//! It implements:
//!
//! - A dynamic value model (records, sequences, primitives)
//! - Observers, reactive fields and dependency registries
//! - Structural mutation helpers for keys and indices
//! - Reference subscribers (watchers, computed values) and a batching
//!   scheduler
//!
//! The crate is designed to be used both as a native Rust library and, with
//! the `python` feature, as a Python extension module via PyO3.
//!
//! # Architecture
//!
//! - `value`: the data model that reactive state is made of
//! - `reactive`: dependency tracking and the subscribers built on it
//! - `scheduler`: batching of watcher re-runs
//! - `config`: per-thread runtime configuration
//!
//! # Example
//!
//! ```rust
//! use observa_core::reactive::{observe, Watcher, WatcherOptions};
//! use observa_core::value::{Record, Value};
//!
//! let state: Record = [("count", 0)].into_iter().collect();
//! observe(&Value::from(state.clone()), true);
//!
//! let reader = state.clone();
//! let watcher = Watcher::new(
//!     move || reader.get("count").unwrap_or_default(),
//!     WatcherOptions { sync: true, ..WatcherOptions::default() },
//! );
//!
//! state.set("count", Value::from(5));
//! assert_eq!(watcher.value(), Value::from(5));
//! ```

pub mod config;
pub mod error;
pub mod reactive;
pub mod scheduler;
pub mod value;

#[cfg(feature = "python")]
mod python;

pub use error::{ConfigError, ReactiveError};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Python module definition.
///
/// This function is called by Python when importing the module.
/// It registers all Python-exposed types and functions.
#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::PyReactiveRecord>()?;
    m.add_function(wrap_pyfunction!(python::toggle_observing, m)?)?;

    // Add version info
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
