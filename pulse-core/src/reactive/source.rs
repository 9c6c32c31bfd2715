//! Trackable sources.
//!
//! A [`Source`] is the "trackable" half of every readable node: it owns the
//! set of subscribers interested in a value and knows how to link the
//! active subscriber on read and how to notify subscribers on change.
//! `Signal` and `Computed` both embed one; the value itself lives in the
//! owning node.
//!
//! # Edges
//!
//! Edges are mutual. The source holds its subscribers strongly (an effect
//! with no handle stays alive while something can still trigger it); the
//! subscriber holds its sources weakly. Every edge is removed from both ends
//! at once by `Subscriber::clear_dependencies`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use smallvec::SmallVec;

use super::batch;
use super::context::ReactiveContext;
use super::subscriber::{Subscriber, SubscriberId};

/// Counter for generating unique source IDs.
static SOURCE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_source_id() -> u64 {
    SOURCE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Subscriber snapshot taken before notifying. Most sources have few
/// subscribers, so this usually stays on the stack.
type Snapshot = SmallVec<[Arc<Subscriber>; 4]>;

pub(crate) struct Source {
    id: u64,
    subscribers: Mutex<IndexMap<SubscriberId, Arc<Subscriber>>>,
}

impl Source {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            id: next_source_id(),
            subscribers: Mutex::new(IndexMap::new()),
        })
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Link the active subscriber to this source, if there is one.
    pub(crate) fn track(self: &Arc<Self>) {
        if let Some(subscriber) = ReactiveContext::current() {
            self.link(&subscriber);
        }
    }

    /// Register a bidirectional edge. Linking twice is a no-op.
    pub(crate) fn link(self: &Arc<Self>, subscriber: &Arc<Subscriber>) {
        self.subscribers
            .lock()
            .entry(subscriber.id())
            .or_insert_with(|| Arc::clone(subscriber));
        subscriber.add_dependency(self);
    }

    pub(crate) fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.lock().shift_remove(&id);
    }

    /// Attach an ad-hoc subscriber whose only dependency is this source.
    ///
    /// Never consults the tracking context.
    pub(crate) fn subscribe<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let subscriber = Subscriber::new(callback);
        self.link(&subscriber);
        Subscription {
            source: Arc::downgrade(self),
            subscriber: Some(subscriber),
        }
    }

    /// Propagate a committed change.
    ///
    /// Every derived value downstream is marked stale first, so that nothing
    /// notified afterwards can read an outdated cache. The subscribers are
    /// then queued: inside a batch they wait for it to close, otherwise they
    /// are drained before this returns.
    pub(crate) fn notify(&self) {
        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            return;
        }

        for subscriber in &snapshot {
            subscriber.mark_stale();
        }

        tracing::trace!(source = self.id, count = snapshot.len(), "scheduling subscribers");
        batch::schedule(snapshot);
    }

    /// Mark every derived subscriber stale, without notifying anyone.
    pub(crate) fn mark_subscribers_stale(&self) {
        for subscriber in self.snapshot() {
            subscriber.mark_stale();
        }
    }

    /// Copy of the subscriber set, so no lock is held while subscribers run.
    fn snapshot(&self) -> Snapshot {
        self.subscribers.lock().values().cloned().collect()
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("id", &self.id)
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Handle returned by `subscribe`.
///
/// Removes the callback when [`unsubscribe`](Subscription::unsubscribe)d or
/// dropped. Call [`detach`](Subscription::detach) to keep the callback for
/// the life of the source instead.
#[must_use = "dropping a Subscription unsubscribes the callback"]
pub struct Subscription {
    source: Weak<Source>,
    subscriber: Option<Arc<Subscriber>>,
}

impl Subscription {
    /// Remove the callback from the source.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Keep the callback registered for as long as the source lives.
    pub fn detach(mut self) {
        self.subscriber = None;
    }

    /// Whether the callback is still registered.
    pub fn is_active(&self) -> bool {
        self.subscriber.is_some() && self.source.strong_count() > 0
    }

    fn release(&mut self) {
        if let Some(subscriber) = self.subscriber.take() {
            subscriber.clear_dependencies();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
