//! Computed Implementation
//!
//! A Computed is a memoized derivation. It is both a subscriber (of whatever
//! its getter reads) and a trackable source (for whoever reads it).
//!
//! # How Computeds Work
//!
//! 1. Nothing runs at construction. The first read evaluates the getter
//!    under tracking and caches the result.
//!
//! 2. Reads while clean return the cache.
//!
//! 3. From then on the computed is eager. When an input changes, the
//!    computed (and every computed downstream of it) is marked dirty at
//!    once, before any subscriber runs. Its own subscriber then recomputes
//!    it as part of the same drain, even if nobody is currently reading it.
//!    A read in between recomputes on demand, so no reader ever sees a
//!    value that mixes old and new inputs.
//!
//! 4. The recomputed value is compared with the last committed one. Only a
//!    real change is propagated to downstream subscribers.
//!
//! Every recompute first drops all edges recorded by the previous one, so
//! branches that are no longer taken stop triggering it.
//!
//! # Failures
//!
//! If the getter panics, the cache is left untouched and the computed stays
//! dirty; the next read retries.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::context::ReactiveContext;
use super::equality::{same_value, EqualsFn};
use super::source::{Source, Subscription};
use super::subscriber::Subscriber;
use crate::error::{Error, Result};

struct ComputedInner<T> {
    /// Downstream edges.
    source: Arc<Source>,
    /// Upstream edges.
    subscriber: Arc<Subscriber>,
    getter: Box<dyn Fn() -> T + Send + Sync>,
    /// Last committed value. Only valid while `dirty` is false.
    value: RwLock<Option<T>>,
    dirty: AtomicBool,
    computing: AtomicBool,
    /// The committed value changed and downstream has not been told yet.
    changed: AtomicBool,
    equals: EqualsFn<T>,
}

/// Resets the re-entrancy flag even if the getter panics.
struct ComputingGuard<'a>(&'a AtomicBool);

impl Drop for ComputingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<T> ComputedInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn current(&self) -> Result<T> {
        if !self.dirty.load(Ordering::Acquire) {
            if let Some(value) = self.value.read().clone() {
                return Ok(value);
            }
        }
        self.recompute()
    }

    /// Evaluate the getter under tracking and store the result directly,
    /// without notifying anyone.
    fn recompute(&self) -> Result<T> {
        if self.computing.swap(true, Ordering::AcqRel) {
            return Err(Error::CircularDependency {
                computed: self.source.id(),
            });
        }
        let _computing = ComputingGuard(&self.computing);

        self.subscriber.clear_dependencies();

        let value = {
            let _ctx = ReactiveContext::enter(Arc::clone(&self.subscriber));
            (self.getter)()
        };

        {
            let mut slot = self.value.write();
            if let Some(previous) = slot.as_ref() {
                if !(self.equals)(previous, &value) {
                    self.changed.store(true, Ordering::Release);
                }
            }
            *slot = Some(value.clone());
        }
        self.dirty.store(false, Ordering::Release);
        Ok(value)
    }

    /// An input is about to change: invalidate this value and everything
    /// derived from it.
    fn mark_stale(&self) {
        if !self.dirty.swap(true, Ordering::AcqRel) {
            self.source.mark_subscribers_stale();
        }
    }

    /// An input changed: bring the value up to date and propagate if it
    /// differs from what downstream last saw.
    fn refresh(&self) {
        if self.dirty.load(Ordering::Acquire) {
            if let Err(err) = self.recompute() {
                tracing::warn!(
                    computed = self.source.id(),
                    error = %err,
                    "skipping computed refresh"
                );
                return;
            }
        }

        if self.changed.swap(false, Ordering::AcqRel) {
            tracing::trace!(computed = self.source.id(), "computed changed");
            self.source.notify();
        }
    }
}

impl<T> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        self.subscriber.clear_dependencies();
    }
}

/// A cached derived value that recomputes when its inputs change.
///
/// # Example
///
/// ```rust
/// use pulse_core::{Computed, Signal};
///
/// let count = Signal::new(2);
/// let c = count.clone();
/// let doubled = Computed::new(move || c.get() * 2);
///
/// assert_eq!(doubled.get(), 4);
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<ComputedInner<T>>,
}

impl<T> Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new computed with the given getter.
    ///
    /// The getter is not run until the first read.
    pub fn new<F>(getter: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: PartialEq,
    {
        Self::with_equality(getter, same_value::<T>)
    }

    /// Create a computed that uses `equals` to decide whether a recompute
    /// changed its value.
    pub fn with_equality<F>(getter: F, equals: EqualsFn<T>) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let inner = Arc::new_cyclic(|weak: &Weak<ComputedInner<T>>| {
            let (on_notify, on_stale) = (weak.clone(), weak.clone());
            ComputedInner {
                source: Source::new(),
                subscriber: Subscriber::derived(
                    move || {
                        if let Some(inner) = on_notify.upgrade() {
                            inner.refresh();
                        }
                    },
                    move || {
                        if let Some(inner) = on_stale.upgrade() {
                            inner.mark_stale();
                        }
                    },
                ),
                getter: Box::new(getter),
                value: RwLock::new(None),
                dirty: AtomicBool::new(true),
                computing: AtomicBool::new(false),
                changed: AtomicBool::new(false),
                equals,
            }
        });

        Self { inner }
    }

    /// Get the computed's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.source.id()
    }

    /// Get the current value, recomputing first if necessary.
    ///
    /// Registers a dependency for the active subscriber, if any.
    ///
    /// # Panics
    ///
    /// Panics if the computed is read from inside its own getter, and
    /// propagates any panic raised by the getter.
    pub fn get(&self) -> T {
        match self.try_get() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Like [`get`](Computed::get), but reports a circular read as an error.
    pub fn try_get(&self) -> Result<T> {
        let value = self.inner.current()?;
        self.inner.source.track();
        Ok(value)
    }

    /// Get the current value without registering a dependency.
    ///
    /// A computed is never read stale: this recomputes first if needed.
    pub fn peek(&self) -> T {
        match self.inner.current() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Call `callback` whenever the computed value changes.
    ///
    /// Subscribing evaluates a computed that has never been read, so that it
    /// starts following its inputs.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        if self.inner.value.read().is_none() {
            if let Err(err) = self.inner.current() {
                tracing::warn!(
                    computed = self.id(),
                    error = %err,
                    "could not evaluate computed on subscribe"
                );
            }
        }
        self.inner.source.subscribe(callback)
    }

    /// Whether the cached value needs recomputation.
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.load(Ordering::Acquire)
    }

    /// Number of sources read by the last evaluation.
    pub fn dependency_count(&self) -> usize {
        self.inner.subscriber.dependency_count()
    }

    /// Get the number of dependents.
    pub fn subscriber_count(&self) -> usize {
        self.inner.source.subscriber_count()
    }

    /// Whether two handles point at the same computed.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Clone for Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Computed<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.id())
            .field("dirty", &self.is_dirty())
            .field("dependency_count", &self.dependency_count())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
