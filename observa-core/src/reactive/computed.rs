//! Computed Values
//!
//! A Computed is a cached derived value backed by a lazy [`Watcher`].
//!
//! # How Computed Values Work
//!
//! 1. Nothing runs at creation. The first `get()` evaluates the getter and
//!    caches the result.
//!
//! 2. When a dependency changes, the watcher is only marked dirty.
//!
//! 3. The next `get()` re-evaluates. Reads that hit a clean cache skip the
//!    getter entirely.
//!
//! 4. When `get()` runs inside another subscriber's evaluation, the
//!    computed value forwards its own dependencies to that subscriber, so the
//!    outer subscriber updates whenever the computed inputs change.

use std::fmt;
use std::sync::Arc;

use super::context::ReactiveContext;
use super::{Watcher, WatcherOptions};
use crate::value::Value;

/// A lazily evaluated, cached derived value.
#[derive(Clone)]
pub struct Computed {
    watcher: Arc<Watcher>,
}

impl Computed {
    /// Create a computed value. The getter runs on first access.
    pub fn new<F>(getter: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self {
            watcher: Watcher::new(
                getter,
                WatcherOptions {
                    lazy: true,
                    ..WatcherOptions::default()
                },
            ),
        }
    }

    /// Get the current value, re-evaluating if a dependency changed.
    pub fn get(&self) -> Value {
        if self.watcher.is_dirty() {
            self.watcher.evaluate();
        }
        if ReactiveContext::is_active() {
            self.watcher.depend();
        }
        self.watcher.value()
    }

    /// Whether the next `get()` will re-evaluate.
    pub fn is_dirty(&self) -> bool {
        self.watcher.is_dirty()
    }

    /// The lazy watcher backing this value.
    pub fn watcher(&self) -> &Arc<Watcher> {
        &self.watcher
    }
}

impl fmt::Debug for Computed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.watcher.id())
            .field("dirty", &self.is_dirty())
            .field("run_count", &self.watcher.run_count())
            .finish()
    }
}
