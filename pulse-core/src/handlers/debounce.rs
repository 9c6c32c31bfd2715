//! Debounced signals.
//!
//! [`debounce`] mirrors a readable value into a new signal, but only after
//! the source has stopped changing for `delay`. Each change restarts the
//! timer; the pending write is aborted, never queued.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::reactive::{Effect, ReadOnly, Readable, Signal, Subscription};

/// A value that trails its source by a quiet period.
pub struct Debounced<T>
where
    T: Clone + Send + Sync + 'static,
{
    value: Signal<T>,
    effect: Effect,
    timer: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl<T> Debounced<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Read the settled value, tracking the read.
    pub fn get(&self) -> T {
        self.value.get()
    }

    /// Read the settled value without tracking.
    pub fn peek(&self) -> T {
        self.value.peek()
    }

    /// Call `callback` after every settled change.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.value.subscribe(callback)
    }

    /// A read-only view of the settled value.
    pub fn as_readonly(&self) -> ReadOnly<T> {
        self.value.as_readonly()
    }

    /// Stop following the source and cancel any pending write.
    pub fn dispose(&self) {
        self.effect.dispose();
        if let Some(pending) = self.timer.lock().take() {
            pending.abort();
        }
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.effect.is_disposed()
    }
}

impl<T> Drop for Debounced<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Follow `source`, writing its value only after `delay` without changes.
///
/// The returned value starts at the source's current value.
///
/// # Panics
///
/// Panics if called outside of a Tokio runtime.
pub fn debounce<T, S>(source: S, delay: Duration) -> Debounced<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
    S: Readable<T> + Send + Sync + 'static,
{
    let value = Signal::new(source.peek());
    let timer: Arc<Mutex<Option<JoinHandle<()>>>> = Arc::new(Mutex::new(None));

    let effect = {
        let value = value.clone();
        let timer = timer.clone();
        Effect::new(move || {
            let next = source.get();
            let target = value.clone();
            let handle = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                target.set(next);
            });
            if let Some(previous) = timer.lock().replace(handle) {
                previous.abort();
            }
        })
    };

    Debounced {
        value,
        effect,
        timer,
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
