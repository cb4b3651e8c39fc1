//! Dependency Tracking
//!
//! This module implements the reactive core: registries, observers, reactive
//! fields, the active-subscriber context and the structural mutation
//! helpers, plus the reference subscribers built on them.
//!
//! # Concepts
//!
//! ## Registries
//!
//! A [`Dep`] is a publish point. Each reactive field has one, and each
//! observed container has one for structural changes. A registry knows its
//! subscribers and can tell all of them to update.
//!
//! ## Observers
//!
//! An [`Observer`] is attached to a record or sequence by [`observe`]. It
//! turns every key of a record into a [`ReactiveField`] and observes nested
//! containers recursively.
//!
//! ## Subscribers
//!
//! A [`Subscriber`] is whatever depends on reactive data. While it evaluates
//! it is the current target of the [`ReactiveContext`]; reactive reads
//! register it with the registries they pass through. [`Watcher`] and
//! [`Computed`] are the subscribers shipped with the crate.
//!
//! # Implementation Notes
//!
//! The context stack, the `should_observe` flag and the scheduler queue are
//! thread-local. Data handles are shareable, but tracking state is not: a
//! subscriber evaluating on one thread never captures reads made on another.

mod computed;
mod context;
mod dep;
mod field;
mod mutation;
mod observer;
mod subscriber;
mod watcher;

pub use computed::Computed;
pub use context::{pop_target, push_target, untracked, ReactiveContext};
pub use dep::{Dep, DepId};
pub use field::{define_reactive, CustomSetter, ReactiveField};
pub use mutation::{delete, set, try_delete, try_set, Key};
pub use observer::{
    observe, should_observe, toggle_observing, ContainerKind, Observer, ObservingPaused,
};
pub use subscriber::{Subscriber, SubscriberId};
pub use watcher::{WatchCallback, Watcher, WatcherOptions};
