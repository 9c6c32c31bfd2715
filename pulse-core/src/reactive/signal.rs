//! Signal Implementation
//!
//! A Signal is the source node of the graph: a mutable cell that remembers
//! who read it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read with `get()` while a subscriber is active, the
//!    two are linked in both directions.
//!
//! 2. When a signal is written, the new value is compared with the current
//!    one. Equal values are dropped without a trace.
//!
//! 3. A changed value is committed and the subscribers are notified, either
//!    right away or, inside a batch, when the batch closes.
//!
//! # Thread Safety
//!
//! The value sits behind a `parking_lot::RwLock` and the subscriber set
//! behind a mutex, so a signal can be cloned into async tasks. Locks are
//! released before any subscriber runs.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use super::equality::{same_value, EqualsFn};
use super::source::{Source, Subscription};

struct SignalInner<T> {
    source: Arc<Source>,
    value: RwLock<T>,
    equals: EqualsFn<T>,
}

/// A reactive signal holding a value of type T.
///
/// Cloning a signal yields another handle to the same cell.
///
/// # Example
///
/// ```rust
/// use pulse_core::Signal;
///
/// let count = Signal::new(0);
/// count.set(5);
/// count.update(|n| n + 1);
/// assert_eq!(count.get(), 6);
/// ```
pub struct Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<SignalInner<T>>,
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self
    where
        T: PartialEq,
    {
        Self::with_equality(value, same_value::<T>)
    }

    /// Create a signal that uses `equals` to decide whether a write changes it.
    pub fn with_equality(value: T, equals: EqualsFn<T>) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                source: Source::new(),
                value: RwLock::new(value),
                equals,
            }),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.source.id()
    }

    /// Get the current value.
    ///
    /// If called while a subscriber is active, that subscriber now depends
    /// on this signal.
    pub fn get(&self) -> T {
        self.inner.source.track();
        self.peek()
    }

    /// Get the current value without tracking dependencies.
    pub fn peek(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Borrow the current value for the duration of `f`, tracking the read.
    ///
    /// `f` runs with the value locked for reading and must not write to this
    /// signal.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.source.track();
        f(&self.inner.value.read())
    }

    /// Set a new value and notify subscribers if it differs from the current one.
    pub fn set(&self, value: T) {
        {
            let mut current = self.inner.value.write();
            if (self.inner.equals)(&current, &value) {
                return;
            }
            *current = value;
        }

        tracing::trace!(signal = self.id(), "signal changed");
        self.inner.source.notify();
    }

    /// Update the value using a function of the current value.
    ///
    /// The read does not create a dependency.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let current = self.peek();
        self.set(f(&current));
    }

    /// Call `callback` after every committed change.
    ///
    /// The callback is not a tracked consumer; it should read the signal with
    /// [`peek`](Signal::peek).
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.source.subscribe(callback)
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.source.subscriber_count()
    }

    /// Whether two handles point at the same signal.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id())
            .field("value", &self.peek())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
