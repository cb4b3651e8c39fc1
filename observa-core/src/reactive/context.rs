//! Reactive Context
//!
//! The reactive context tracks which subscriber is currently evaluating.
//! This enables automatic dependency tracking: when a reactive field is
//! read, the field's registry can hand itself to the current subscriber.
//!
//! # Implementation
//!
//! We use a thread-local stack of targets. When a subscriber starts
//! evaluating it pushes itself; when it finishes it pops. A target may be
//! `None`, which suspends tracking for the duration of that entry (useful
//! for running user hooks inside an evaluation without capturing their
//! reads).
//!
//! This design supports nested evaluations (e.g., a computed value read
//! while a watcher is evaluating): popping the inner target restores the
//! outer one.

use std::cell::RefCell;
use std::sync::Arc;

use super::{Subscriber, SubscriberId};

thread_local! {
    static TARGET_STACK: RefCell<Vec<Option<Arc<dyn Subscriber>>>> = RefCell::new(Vec::new());
}

/// Make `target` the current subscriber.
///
/// Every push must be matched by exactly one [`pop_target`]. Prefer
/// [`ReactiveContext::enter`], which pops on drop.
pub fn push_target(target: Option<Arc<dyn Subscriber>>) {
    TARGET_STACK.with(|stack| stack.borrow_mut().push(target));
}

/// Restore the previous subscriber.
pub fn pop_target() {
    TARGET_STACK.with(|stack| {
        stack.borrow_mut().pop();
    });
}

/// Run `f` with tracking suspended.
pub fn untracked<T>(f: impl FnOnce() -> T) -> T {
    let _ctx = ReactiveContext::enter(None);
    f()
}

/// Guard that pops the context when dropped.
///
/// This keeps the stack balanced even if the evaluation panics.
pub struct ReactiveContext {
    subscriber_id: Option<SubscriberId>,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given target.
    ///
    /// While the guard is alive, reactive reads register `target` as a
    /// dependent (or register nothing, if `target` is `None`).
    pub fn enter(target: Option<Arc<dyn Subscriber>>) -> Self {
        let subscriber_id = target.as_ref().map(|t| t.id());
        push_target(target);
        Self { subscriber_id }
    }

    /// Check if a subscriber is currently collecting dependencies.
    pub fn is_active() -> bool {
        TARGET_STACK.with(|stack| matches!(stack.borrow().last(), Some(Some(_))))
    }

    /// The current subscriber, if any.
    pub fn current() -> Option<Arc<dyn Subscriber>> {
        TARGET_STACK.with(|stack| stack.borrow().last().cloned().flatten())
    }

    /// Get the current subscriber ID, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        TARGET_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .and_then(|entry| entry.as_ref().map(|t| t.id()))
        })
    }

    /// Number of entries on the stack, including `None` entries.
    pub fn depth() -> usize {
        TARGET_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        TARGET_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Verify we're popping the right context.
            // This helps catch bugs where contexts are mismatched.
            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.as_ref().map(|t| t.id()),
                    self.subscriber_id,
                    "ReactiveContext mismatch: expected {:?}",
                    self.subscriber_id,
                );
            }
        });
    }
}
