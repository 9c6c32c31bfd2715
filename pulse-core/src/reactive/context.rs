//! Reactive Context
//!
//! The reactive context records which subscriber is currently evaluating.
//! When a signal is read, the active subscriber (if any) is linked to it.
//!
//! # Implementation
//!
//! Each thread owns a single "active subscriber" slot. Entering a context
//! swaps a new value into the slot and hands back a guard holding the
//! previous one; dropping the guard restores it. Nested evaluations (a
//! computed read from inside an effect, an `untracked` block inside a
//! computed) therefore unwind correctly, including when user code panics.

use std::cell::RefCell;
use std::sync::Arc;

use super::subscriber::{Subscriber, SubscriberId};

thread_local! {
    static ACTIVE: RefCell<Option<Arc<Subscriber>>> = const { RefCell::new(None) };
}

/// Guard that restores the previously active subscriber when dropped.
#[must_use = "the context is exited as soon as the guard is dropped"]
pub struct ReactiveContext {
    previous: Option<Arc<Subscriber>>,
}

impl ReactiveContext {
    /// Make `subscriber` the active consumer until the guard is dropped.
    pub fn enter(subscriber: Arc<Subscriber>) -> Self {
        Self::swap(Some(subscriber))
    }

    /// Clear the active consumer until the guard is dropped.
    pub fn untracked() -> Self {
        Self::swap(None)
    }

    fn swap(next: Option<Arc<Subscriber>>) -> Self {
        let previous = ACTIVE.with(|slot| slot.replace(next));
        Self { previous }
    }

    /// Check if there is an active reactive context.
    pub fn is_active() -> bool {
        ACTIVE.with(|slot| slot.borrow().is_some())
    }

    /// Get the current subscriber ID, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        ACTIVE.with(|slot| slot.borrow().as_ref().map(|sub| sub.id()))
    }

    pub(crate) fn current() -> Option<Arc<Subscriber>> {
        ACTIVE.with(|slot| slot.borrow().clone())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE.with(|slot| *slot.borrow_mut() = previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_tracks_subscriber() {
        let sub = Subscriber::new(|| {});

        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_subscriber().is_none());

        {
            let _ctx = ReactiveContext::enter(sub.clone());

            assert!(ReactiveContext::is_active());
            assert_eq!(ReactiveContext::current_subscriber(), Some(sub.id()));
        }

        // Context should be cleaned up after drop
        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_subscriber().is_none());
    }

    #[test]
    fn nested_contexts() {
        let sub1 = Subscriber::new(|| {});
        let sub2 = Subscriber::new(|| {});

        {
            let _ctx1 = ReactiveContext::enter(sub1.clone());
            assert_eq!(ReactiveContext::current_subscriber(), Some(sub1.id()));

            {
                let _ctx2 = ReactiveContext::enter(sub2.clone());
                assert_eq!(ReactiveContext::current_subscriber(), Some(sub2.id()));
            }

            // After inner context drops, outer should be current
            assert_eq!(ReactiveContext::current_subscriber(), Some(sub1.id()));
        }

        assert!(ReactiveContext::current_subscriber().is_none());
    }

    #[test]
    fn untracked_clears_and_restores() {
        let sub = Subscriber::new(|| {});
        let _ctx = ReactiveContext::enter(sub.clone());

        {
            let _quiet = ReactiveContext::untracked();
            assert!(!ReactiveContext::is_active());
        }

        assert_eq!(ReactiveContext::current_subscriber(), Some(sub.id()));
    }

    #[test]
    fn context_is_restored_after_panic() {
        let sub = Subscriber::new(|| {});

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ctx = ReactiveContext::enter(sub);
            panic!("boom");
        }));

        assert!(result.is_err());
        assert!(!ReactiveContext::is_active());
    }
}
