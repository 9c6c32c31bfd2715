//! Effect Implementation
//!
//! An Effect is a side-effecting computation that re-runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its body immediately under tracking to
//!    establish its initial dependencies.
//!
//! 2. When any dependency changes, the effect runs again. Inside a batch it
//!    runs once, after the batch closes.
//!
//! 3. Every run starts by tearing down the previous one: the last cleanup is
//!    invoked and every old dependency edge is removed. Dependencies are
//!    then rebuilt from what the body actually reads.
//!
//! # Cleanup
//!
//! The body may return a [`Cleanup`]. It is invoked exactly once: before the
//! next run, or on disposal, whichever comes first.
//!
//! # Failures
//!
//! A panic in the body propagates to whoever triggered the run. Reads made
//! before the panic stay tracked, so the next change to any of them runs
//! the effect again.
//!
//! An effect that writes a signal it reads is not re-entered while it runs;
//! the nested trigger is skipped with a warning.
//!
//! # Lifetime
//!
//! An effect stays alive while any of its dependencies can still trigger
//! it, even if its handle is dropped. Call [`Effect::dispose`] to stop it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::context::ReactiveContext;
use super::subscriber::Subscriber;

/// Cleanup returned by an effect body.
pub type Cleanup = Box<dyn FnOnce() + Send>;

/// Box a closure as a [`Cleanup`].
pub fn cleanup<F>(f: F) -> Cleanup
where
    F: FnOnce() + Send + 'static,
{
    Box::new(f)
}

/// Values an effect body may return.
pub trait EffectOutput {
    /// Convert into the cleanup to run before the next execution, if any.
    fn into_cleanup(self) -> Option<Cleanup>;
}

impl EffectOutput for () {
    fn into_cleanup(self) -> Option<Cleanup> {
        None
    }
}

impl EffectOutput for Cleanup {
    fn into_cleanup(self) -> Option<Cleanup> {
        Some(self)
    }
}

impl EffectOutput for Option<Cleanup> {
    fn into_cleanup(self) -> Option<Cleanup> {
        self
    }
}

type Body = Box<dyn Fn() -> Option<Cleanup> + Send + Sync>;

struct EffectState {
    body: Body,
    cleanup: Mutex<Option<Cleanup>>,
    disposed: AtomicBool,
    running: AtomicBool,
    run_count: AtomicUsize,
}

/// Clears the running flag on drop, including on unwind.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl EffectState {
    fn execute(&self, subscriber: &Arc<Subscriber>) {
        if self.running.swap(true, Ordering::AcqRel) {
            tracing::warn!(
                effect = subscriber.id().raw(),
                "effect triggered itself while running, skipping"
            );
            return;
        }
        let _running = RunningGuard(&self.running);

        self.teardown(subscriber);

        let outcome = {
            let _ctx = ReactiveContext::enter(Arc::clone(subscriber));
            panic::catch_unwind(AssertUnwindSafe(|| (self.body)()))
        };

        self.run_count.fetch_add(1, Ordering::Relaxed);
        match outcome {
            Ok(cleanup) => *self.cleanup.lock() = cleanup,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /// Invoke the pending cleanup and drop every dependency edge.
    fn teardown(&self, subscriber: &Subscriber) {
        let cleanup = self.cleanup.lock().take();
        if let Some(cleanup) = cleanup {
            cleanup();
        }
        subscriber.clear_dependencies();
    }
}

/// A side-effecting computation that runs when dependencies change.
///
/// # Example
///
/// ```rust
/// use pulse_core::{Effect, Signal};
///
/// let count = Signal::new(0);
/// let c = count.clone();
/// let effect = Effect::new(move || {
///     println!("Count is: {}", c.get());
/// });
///
/// count.set(5); // Prints: "Count is: 5"
/// effect.dispose();
/// ```
pub struct Effect {
    subscriber: Arc<Subscriber>,
    state: Arc<EffectState>,
}

impl Effect {
    /// Create a new effect and run it once.
    pub fn new<F, R>(body: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: EffectOutput,
    {
        let state = Arc::new(EffectState {
            body: Box::new(move || body().into_cleanup()),
            cleanup: Mutex::new(None),
            disposed: AtomicBool::new(false),
            running: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
        });

        let subscriber = Subscriber::new_cyclic(|me| {
            let state = Arc::clone(&state);
            move || {
                if state.disposed.load(Ordering::Acquire) {
                    return;
                }
                if let Some(me) = me.upgrade() {
                    state.execute(&me);
                }
            }
        });

        let effect = Self { subscriber, state };
        effect.state.execute(&effect.subscriber);
        effect
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> u64 {
        self.subscriber.id().raw()
    }

    /// Run the body again now, re-arming a disposed effect.
    pub fn run(&self) {
        self.state.disposed.store(false, Ordering::Release);
        self.state.execute(&self.subscriber);
    }

    /// Dispose of the effect.
    ///
    /// Invokes the pending cleanup and removes all dependency edges. After
    /// disposal, the effect will not run again unless [`run`](Effect::run)
    /// is called. Disposing twice is a no-op.
    pub fn dispose(&self) {
        if !self.state.disposed.swap(true, Ordering::AcqRel) {
            tracing::debug!(effect = self.id(), "disposing effect");
        }
        self.state.teardown(&self.subscriber);
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.state.disposed.load(Ordering::Acquire)
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.state.run_count.load(Ordering::Relaxed)
    }

    /// Get the number of dependencies.
    pub fn dependency_count(&self) -> usize {
        self.subscriber.dependency_count()
    }
}

impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            subscriber: Arc::clone(&self.subscriber),
            state: Arc::clone(&self.state),
        }
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
