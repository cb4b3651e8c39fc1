//! Update Scheduler
//!
//! Batches watcher re-runs. Registries notify watchers as soon as data
//! changes; a watcher that is neither lazy nor sync only enqueues itself
//! here, and the owner of the event loop decides when to [`flush`].
//!
//! # Algorithm
//!
//! 1. A watcher is queued at most once per flush (deduplicated by id).
//! 2. `flush` sorts the queue by watcher id, i.e. creation order, so
//!    watchers created earlier (parents) run before later ones (children).
//! 3. A watcher queued while a flush is running is spliced into the
//!    remaining part of the queue at its id position.
//! 4. A watcher that re-queues itself more than [`MAX_UPDATE_COUNT`] times
//!    in one flush is reported as an infinite update loop and the flush is
//!    abandoned.
//!
//! With synchronous notification (see
//! [`ReactiveConfig::async_notification`](crate::config::ReactiveConfig))
//! the queue is flushed immediately on every enqueue.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{trace, warn};

use crate::config;
use crate::reactive::{SubscriberId, Watcher};

/// Re-runs of one watcher, within one flush, after which the flush stops.
pub const MAX_UPDATE_COUNT: usize = 100;

#[derive(Default)]
struct UpdateQueue {
    queue: Vec<Arc<Watcher>>,
    has: HashSet<SubscriberId>,
    circular: HashMap<SubscriberId, usize>,
    flushing: bool,
    index: usize,
}

thread_local! {
    static QUEUE: RefCell<UpdateQueue> = RefCell::new(UpdateQueue::default());
}

/// Enqueue `watcher` unless it is already waiting.
pub fn queue_watcher(watcher: Arc<Watcher>) {
    let id = watcher.id();
    let flush_now = QUEUE.with(|q| {
        let mut q = q.borrow_mut();
        if !q.has.insert(id) {
            return false;
        }
        if q.flushing {
            let mut pos = q.queue.len();
            while pos > q.index && q.queue[pos - 1].id() > id {
                pos -= 1;
            }
            q.queue.insert(pos, watcher);
        } else {
            q.queue.push(watcher);
        }
        !q.flushing && !config::async_notification()
    });

    if flush_now {
        flush();
    }
}

/// Clears the queue when a flush ends, including by a panicking watcher.
struct ResetOnExit;

impl Drop for ResetOnExit {
    fn drop(&mut self) {
        QUEUE.with(|q| *q.borrow_mut() = UpdateQueue::default());
    }
}

/// Run every queued watcher in id order. Returns how many runs happened.
///
/// Calling `flush` while a flush is already running does nothing.
pub fn flush() -> usize {
    let started = QUEUE.with(|q| {
        let mut q = q.borrow_mut();
        if q.flushing {
            return false;
        }
        q.flushing = true;
        q.index = 0;
        q.queue.sort_by_key(|w| w.id());
        true
    });
    if !started {
        return 0;
    }

    let _reset = ResetOnExit;
    let mut ran = 0;
    loop {
        let next = QUEUE.with(|q| {
            let mut q = q.borrow_mut();
            let watcher = q.queue.get(q.index).cloned()?;
            q.index += 1;
            q.has.remove(&watcher.id());
            Some(watcher)
        });
        let Some(watcher) = next else {
            break;
        };

        watcher.run();
        ran += 1;

        let runaway = QUEUE.with(|q| {
            let mut q = q.borrow_mut();
            let id = watcher.id();
            if !q.has.contains(&id) {
                return false;
            }
            let count = q.circular.entry(id).or_insert(0);
            *count += 1;
            *count > MAX_UPDATE_COUNT
        });
        if runaway {
            warn!(
                watcher = watcher.id().raw(),
                "you may have an infinite update loop; abandoning flush"
            );
            break;
        }
    }

    trace!(ran, "flushed update queue");
    ran
}

/// Number of watchers waiting to run.
pub fn pending() -> usize {
    QUEUE.with(|q| {
        let q = q.borrow();
        q.queue.len().saturating_sub(q.index)
    })
}
