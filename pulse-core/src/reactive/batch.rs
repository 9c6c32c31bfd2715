//! Batch transactions and the notification queue.
//!
//! Subscribers are never notified from inside a write. A write marks the
//! derived values downstream stale and parks its subscribers in a pending
//! set. Outside a batch the set is drained before the write returns; while
//! a batch is open it is drained when the outermost batch closes. Either
//! way each pending subscriber is notified once and observes the final
//! committed values.
//!
//! # Draining
//!
//! Subscribers of derived values are drained before plain ones, so a
//! computed has refreshed (and queued its own subscribers) before any
//! effect runs. Notifications raised while draining join the same pending
//! set instead of recursing.
//!
//! A subscriber that keeps re-triggering itself is dropped after
//! `MAX_RUNS_PER_FLUSH` runs in one drain, with a warning.
//!
//! # Nesting
//!
//! Batch state is a depth counter, not a flag: an inner `batch` closing does
//! not flush, only the outermost one does.
//!
//! # Failures
//!
//! Each pending notification runs inside its own `catch_unwind` boundary, so
//! a panicking subscriber does not starve the rest of the pending set. Once
//! every pending subscriber has been notified, the first panic is resumed.
//! A panic raised by the batch body itself still closes the batch and
//! flushes before it is resumed.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use indexmap::IndexMap;

use super::subscriber::{Subscriber, SubscriberId};

const MAX_RUNS_PER_FLUSH: u32 = 100;

thread_local! {
    static DEPTH: Cell<u32> = const { Cell::new(0) };
    static FLUSHING: Cell<bool> = const { Cell::new(false) };
    static PENDING: RefCell<IndexMap<SubscriberId, Arc<Subscriber>>> = RefCell::new(IndexMap::new());
}

/// Run `f` as one transaction and return its result.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicI32, Ordering};
/// use pulse_core::{batch, effect, signal};
///
/// let count = signal(0);
/// let runs = Arc::new(AtomicI32::new(0));
///
/// let (c, r) = (count.clone(), runs.clone());
/// let _effect = effect(move || {
///     c.get();
///     r.fetch_add(1, Ordering::SeqCst);
/// });
///
/// batch(|| {
///     count.set(1);
///     count.set(2);
///     count.set(3);
/// });
///
/// assert_eq!(runs.load(Ordering::SeqCst), 2);
/// ```
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    DEPTH.with(|depth| depth.set(depth.get() + 1));

    let outcome = panic::catch_unwind(AssertUnwindSafe(f));

    let remaining = DEPTH.with(|depth| {
        let next = depth.get().saturating_sub(1);
        depth.set(next);
        next
    });
    let flushed = if remaining == 0 {
        tracing::debug!(pending = pending_count(), "closing batch");
        flush()
    } else {
        Ok(())
    };

    let value = match outcome {
        Ok(value) => value,
        Err(payload) => panic::resume_unwind(payload),
    };
    if let Err(payload) = flushed {
        panic::resume_unwind(payload);
    }
    value
}

/// Check if the current thread is inside a batch.
pub fn is_batching() -> bool {
    DEPTH.with(|depth| depth.get() > 0)
}

/// Queue `subscribers`, draining right away unless a batch is open.
///
/// A panic raised by a subscriber is resumed once the queue is empty.
pub(crate) fn schedule<I>(subscribers: I)
where
    I: IntoIterator<Item = Arc<Subscriber>>,
{
    enqueue(subscribers);
    if is_batching() {
        return;
    }
    if let Err(payload) = flush() {
        panic::resume_unwind(payload);
    }
}

fn enqueue<I>(subscribers: I)
where
    I: IntoIterator<Item = Arc<Subscriber>>,
{
    PENDING.with(|pending| {
        let mut pending = pending.borrow_mut();
        for subscriber in subscribers {
            pending.entry(subscriber.id()).or_insert(subscriber);
        }
    });
}

fn pending_count() -> usize {
    PENDING.with(|pending| pending.borrow().len())
}

/// Take the next subscriber to notify: the oldest derived one if any,
/// otherwise the oldest one.
fn next_pending() -> Option<(SubscriberId, Arc<Subscriber>)> {
    PENDING.with(|pending| {
        let mut pending = pending.borrow_mut();
        let index = pending
            .values()
            .position(|subscriber| subscriber.is_derived())
            .unwrap_or(0);
        pending.shift_remove_index(index)
    })
}

/// Marks the thread as draining; cleared on drop.
struct Flushing;

impl Flushing {
    /// `None` if a drain is already running further up the stack.
    fn enter() -> Option<Self> {
        if FLUSHING.with(|flushing| flushing.replace(true)) {
            None
        } else {
            Some(Flushing)
        }
    }
}

impl Drop for Flushing {
    fn drop(&mut self) {
        FLUSHING.with(|flushing| flushing.set(false));
    }
}

/// Notify pending subscribers until none are left, isolating panics.
///
/// A nested call returns immediately; the outer drain picks up whatever was
/// queued.
fn flush() -> std::thread::Result<()> {
    let Some(_flushing) = Flushing::enter() else {
        return Ok(());
    };

    let mut runs: HashMap<SubscriberId, u32> = HashMap::new();
    let mut first_panic = None;
    while let Some((id, subscriber)) = next_pending() {
        let count = runs.entry(id).or_default();
        *count += 1;
        if *count > MAX_RUNS_PER_FLUSH {
            tracing::warn!(
                subscriber = id.raw(),
                runs = MAX_RUNS_PER_FLUSH,
                "subscriber keeps re-triggering itself, dropping notification"
            );
            continue;
        }

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| subscriber.notify())) {
            tracing::warn!(subscriber = id.raw(), "subscriber panicked while being notified");
            first_panic.get_or_insert(payload);
        }
    }

    match first_panic {
        Some(payload) => Err(payload),
        None => Ok(()),
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
