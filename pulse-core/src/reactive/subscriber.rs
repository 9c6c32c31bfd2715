//! Subscriber types for the reactive system.
//!
//! A Subscriber is the generic graph node that reacts to changes. Every
//! effect owns one, every computed owns one for its own inputs, and
//! `subscribe(cb)` creates an ad-hoc one per callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::source::Source;

/// Unique identifier for a subscriber.
///
/// Subscriber sets and the batch pending set are keyed by this id, which is
/// what makes re-registration and re-enqueueing idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A node that is notified when any of its dependencies change.
///
/// The subscriber owns its dependency set; the sources it depends on hold it
/// in their subscriber sets. Both sides of every edge are removed together by
/// [`Subscriber::clear_dependencies`].
pub struct Subscriber {
    id: SubscriberId,
    notify: Box<dyn Fn() + Send + Sync>,
    /// Set for the subscriber owned by a computed. Invalidates the cached
    /// value ahead of `notify`, and makes the subscriber run before plain
    /// ones when pending notifications are drained.
    mark_stale: Option<Box<dyn Fn() + Send + Sync>>,
    /// Sources read during the last tracked evaluation, keyed by source id.
    /// Weak so that a subscriber never keeps its inputs alive.
    dependencies: Mutex<IndexMap<u64, Weak<Source>>>,
}

impl Subscriber {
    /// Create a new subscriber with the given notification callback.
    pub fn new<F>(notify: F) -> Arc<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        Arc::new(Self {
            id: SubscriberId::new(),
            notify: Box::new(notify),
            mark_stale: None,
            dependencies: Mutex::new(IndexMap::new()),
        })
    }

    /// Create the subscriber of a derived value.
    pub(crate) fn derived<N, M>(notify: N, mark_stale: M) -> Arc<Self>
    where
        N: Fn() + Send + Sync + 'static,
        M: Fn() + Send + Sync + 'static,
    {
        Arc::new(Self {
            id: SubscriberId::new(),
            notify: Box::new(notify),
            mark_stale: Some(Box::new(mark_stale)),
            dependencies: Mutex::new(IndexMap::new()),
        })
    }

    /// Create a subscriber whose callback needs a handle to the subscriber itself.
    pub(crate) fn new_cyclic<B, F>(build: B) -> Arc<Self>
    where
        B: FnOnce(Weak<Subscriber>) -> F,
        F: Fn() + Send + Sync + 'static,
    {
        Arc::new_cyclic(|weak| Self {
            id: SubscriberId::new(),
            notify: Box::new(build(weak.clone())),
            mark_stale: None,
            dependencies: Mutex::new(IndexMap::new()),
        })
    }

    /// Get the subscriber's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Notify the subscriber that one of its dependencies changed.
    pub fn notify(&self) {
        (self.notify)();
    }

    /// Whether this subscriber belongs to a derived value.
    pub fn is_derived(&self) -> bool {
        self.mark_stale.is_some()
    }

    /// One of the dependencies is about to change.
    pub(crate) fn mark_stale(&self) {
        if let Some(mark_stale) = &self.mark_stale {
            mark_stale();
        }
    }

    /// Number of sources this subscriber currently depends on.
    pub fn dependency_count(&self) -> usize {
        self.dependencies.lock().len()
    }

    pub(crate) fn add_dependency(&self, source: &Arc<Source>) {
        self.dependencies
            .lock()
            .entry(source.id())
            .or_insert_with(|| Arc::downgrade(source));
    }

    /// Remove every edge between this subscriber and its dependencies.
    ///
    /// Called before each tracked re-evaluation and on disposal.
    pub(crate) fn clear_dependencies(&self) {
        let dependencies = std::mem::take(&mut *self.dependencies.lock());
        for source in dependencies.values().filter_map(Weak::upgrade) {
            source.unsubscribe(self.id);
        }
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("dependency_count", &self.dependency_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicI32};

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn subscriber_notify_calls_callback() {
        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();

        let subscriber = Subscriber::new(move || {
            called_clone.store(true, Ordering::SeqCst);
        });

        assert!(!called.load(Ordering::SeqCst));
        subscriber.notify();
        assert!(called.load(Ordering::SeqCst));
    }

    #[test]
    fn cyclic_subscriber_sees_itself() {
        let seen = Arc::new(AtomicI32::new(-1));
        let seen_clone = seen.clone();

        let subscriber = Subscriber::new_cyclic(move |me| {
            move || {
                if let Some(me) = me.upgrade() {
                    seen_clone.store(me.id().raw() as i32, Ordering::SeqCst);
                }
            }
        });

        subscriber.notify();
        assert_eq!(seen.load(Ordering::SeqCst), subscriber.id().raw() as i32);
    }

    #[test]
    fn clearing_dependencies_removes_both_edge_ends() {
        let source = Source::new();
        let subscriber = Subscriber::new(|| {});

        source.link(&subscriber);
        assert_eq!(source.subscriber_count(), 1);
        assert_eq!(subscriber.dependency_count(), 1);

        subscriber.clear_dependencies();
        assert_eq!(source.subscriber_count(), 0);
        assert_eq!(subscriber.dependency_count(), 0);
    }

    #[test]
    fn only_derived_subscribers_are_marked() {
        let marked = Arc::new(AtomicI32::new(0));
        let marked_clone = marked.clone();

        let plain = Subscriber::new(|| {});
        let derived = Subscriber::derived(
            || {},
            move || {
                marked_clone.fetch_add(1, Ordering::SeqCst);
            },
        );

        plain.mark_stale();
        derived.mark_stale();

        assert!(!plain.is_derived());
        assert!(derived.is_derived());
        assert_eq!(marked.load(Ordering::SeqCst), 1);
    }
}
