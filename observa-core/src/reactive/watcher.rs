//! Watcher Implementation
//!
//! A Watcher is the reference [`Subscriber`]: it evaluates a getter inside
//! a reactive context, remembers which registries the getter read through,
//! and re-evaluates when any of them fires.
//!
//! # How Watchers Work
//!
//! 1. `get()` pushes the watcher as the current target and runs the getter.
//!    Every reactive read offers its registry through `add_dep`.
//!
//! 2. Within one evaluation each registry is recorded once (`new_dep_ids`);
//!    a registry seen for the first time also gets the watcher added as a
//!    subscriber.
//!
//! 3. After the evaluation, registries that were not read this time drop the
//!    watcher, so conditional reads do not leave stale edges behind.
//!
//! # Update Modes
//!
//! - lazy: `update()` only marks the watcher dirty (used by [`Computed`]).
//! - sync: `update()` re-runs immediately.
//! - default: `update()` queues the watcher on the thread's scheduler.
//!
//! [`Computed`]: super::Computed

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::debug;

use super::context::ReactiveContext;
use super::{Dep, DepId, Subscriber, SubscriberId};
use crate::scheduler;
use crate::value::Value;

/// Callback invoked by [`Watcher::run`] with `(new, old)` values.
pub type WatchCallback = Box<dyn Fn(&Value, &Value) + Send + Sync>;

type WatchGetter = Box<dyn Fn() -> Value + Send + Sync>;

/// How a watcher reacts to updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatcherOptions {
    /// Defer evaluation until the value is requested.
    pub lazy: bool,
    /// Re-run inside `update()` instead of going through the scheduler.
    pub sync: bool,
    /// Read every nested field of the result so that any nested change
    /// triggers the watcher.
    pub deep: bool,
}

struct WatcherState {
    value: Value,
    dirty: bool,
    active: bool,
    deps: SmallVec<[Arc<Dep>; 4]>,
    dep_ids: HashSet<DepId>,
    new_deps: SmallVec<[Arc<Dep>; 4]>,
    new_dep_ids: HashSet<DepId>,
    run_count: usize,
}

/// A computation that re-evaluates when the reactive data it read changes.
pub struct Watcher {
    id: SubscriberId,
    this: Weak<Watcher>,
    getter: WatchGetter,
    callback: Option<WatchCallback>,
    options: WatcherOptions,
    state: Mutex<WatcherState>,
}

impl Watcher {
    /// Create a watcher over `getter`.
    ///
    /// Unless the watcher is lazy, the getter runs immediately to collect
    /// the initial dependencies.
    pub fn new<F>(getter: F, options: WatcherOptions) -> Arc<Self>
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self::build(Box::new(getter), None, options)
    }

    /// Create a watcher that calls `callback(new, old)` whenever a re-run
    /// produces a changed value.
    pub fn with_callback<F, C>(getter: F, callback: C, options: WatcherOptions) -> Arc<Self>
    where
        F: Fn() -> Value + Send + Sync + 'static,
        C: Fn(&Value, &Value) + Send + Sync + 'static,
    {
        Self::build(Box::new(getter), Some(Box::new(callback)), options)
    }

    fn build(
        getter: WatchGetter,
        callback: Option<WatchCallback>,
        options: WatcherOptions,
    ) -> Arc<Self> {
        let watcher = Arc::new_cyclic(|this| Self {
            id: SubscriberId::new(),
            this: this.clone(),
            getter,
            callback,
            options,
            state: Mutex::new(WatcherState {
                value: Value::Null,
                dirty: options.lazy,
                active: true,
                deps: SmallVec::new(),
                dep_ids: HashSet::new(),
                new_deps: SmallVec::new(),
                new_dep_ids: HashSet::new(),
                run_count: 0,
            }),
        });

        if !options.lazy {
            let value = watcher.get();
            watcher.state.lock().value = value;
        }
        debug!(watcher = watcher.id.raw(), ?options, "watcher created");
        watcher
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn options(&self) -> WatcherOptions {
        self.options
    }

    /// Evaluate the getter and re-collect dependencies.
    pub fn get(&self) -> Value {
        let target = self
            .this
            .upgrade()
            .map(|this| this as Arc<dyn Subscriber>);
        let value = {
            let _ctx = ReactiveContext::enter(target);
            let value = (self.getter)();
            if self.options.deep {
                traverse(&value, &mut HashSet::new());
            }
            value
        };
        self.cleanup_deps();
        self.state.lock().run_count += 1;
        value
    }

    /// Swap the dependencies collected by the last evaluation in, and drop
    /// this watcher from registries it no longer reads.
    fn cleanup_deps(&self) {
        let stale: Vec<Arc<Dep>> = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let stale = state
                .deps
                .iter()
                .filter(|dep| !state.new_dep_ids.contains(&dep.id()))
                .cloned()
                .collect();
            state.dep_ids = std::mem::take(&mut state.new_dep_ids);
            state.deps = std::mem::take(&mut state.new_deps);
            stale
        };
        for dep in stale {
            dep.remove_sub(self.id);
        }
    }

    /// Re-evaluate and, if the value changed, invoke the callback.
    ///
    /// Container values and deep watchers always count as changed, since
    /// their contents may have been mutated in place.
    pub fn run(&self) {
        if !self.is_active() {
            return;
        }
        let value = self.get();
        let old = {
            let mut state = self.state.lock();
            let changed =
                !value.same_value(&state.value) || value.is_container() || self.options.deep;
            if !changed {
                return;
            }
            std::mem::replace(&mut state.value, value.clone())
        };
        if let Some(callback) = &self.callback {
            callback(&value, &old);
        }
    }

    /// Evaluate a lazy watcher and clear its dirty flag.
    pub fn evaluate(&self) {
        let value = self.get();
        let mut state = self.state.lock();
        state.value = value;
        state.dirty = false;
    }

    /// Offer every registry this watcher depends on to the current target.
    ///
    /// Lets an outer evaluation depend on whatever a computed value read.
    pub fn depend(&self) {
        let deps = self.state.lock().deps.clone();
        for dep in deps {
            dep.depend();
        }
    }

    /// Remove this watcher from every registry and stop it from running.
    pub fn teardown(&self) {
        let deps = {
            let mut state = self.state.lock();
            if !state.active {
                return;
            }
            state.active = false;
            state.dep_ids.clear();
            std::mem::take(&mut state.deps)
        };
        for dep in &deps {
            dep.remove_sub(self.id);
        }
        debug!(watcher = self.id.raw(), deps = deps.len(), "watcher torn down");
    }

    /// The value produced by the last evaluation.
    pub fn value(&self) -> Value {
        self.state.lock().value.clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.state.lock().dirty
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    /// Number of times the getter has been evaluated.
    pub fn run_count(&self) -> usize {
        self.state.lock().run_count
    }

    /// Number of registries this watcher currently depends on.
    pub fn dependency_count(&self) -> usize {
        self.state.lock().deps.len()
    }

    pub fn depends_on(&self, dep: &Dep) -> bool {
        self.state.lock().dep_ids.contains(&dep.id())
    }
}

impl Subscriber for Watcher {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn add_dep(self: Arc<Self>, dep: &Arc<Dep>) {
        let subscribe = {
            let mut state = self.state.lock();
            if !state.new_dep_ids.insert(dep.id()) {
                return;
            }
            state.new_deps.push(Arc::clone(dep));
            !state.dep_ids.contains(&dep.id())
        };
        if subscribe {
            let me: Arc<dyn Subscriber> = self;
            dep.add_sub(&me);
        }
    }

    fn update(&self) {
        if self.options.lazy {
            self.state.lock().dirty = true;
        } else if self.options.sync {
            self.run();
        } else if let Some(this) = self.this.upgrade() {
            scheduler::queue_watcher(this);
        }
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.id)
            .field("options", &self.options)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Read every nested field of `value` so the current target depends on all
/// of them.
fn traverse(value: &Value, seen: &mut HashSet<*const ()>) {
    match value {
        Value::Record(record) => {
            if !seen.insert(record.as_ptr()) {
                return;
            }
            for key in record.keys() {
                if let Some(child) = record.get(&key) {
                    traverse(&child, seen);
                }
            }
        }
        Value::Sequence(seq) => {
            if !seen.insert(seq.as_ptr()) {
                return;
            }
            for item in seq.to_vec() {
                traverse(&item, seen);
            }
        }
        _ => {}
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
