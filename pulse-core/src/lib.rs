//! Pulse Core
//!
//! This crate provides the fine-grained reactive core for Pulse: mutable
//! signals that propagate changes to memoized computeds and side-effecting
//! effects, with no tree diffing in between.
//!
//! It implements:
//!
//! - Reactive primitives (signals, computeds, effects) with automatic
//!   dependency tracking
//! - Batch transactions that coalesce notifications
//! - Helpers built on top: actions, untracked reads, read-only views and
//!   rollback of optimistic updates
//! - Async collaborators: data-fetching resources, debounced signals and
//!   view bindings
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `reactive`: The dependency graph, propagation and batching
//! - `handlers`: Consumers of the public reactive API that talk to the
//!   outside world
//!
//! # Example
//!
//! ```rust
//! use pulse_core::{computed, effect, signal};
//!
//! // Create a signal
//! let count = signal(0);
//!
//! // Create a derived value
//! let c = count.clone();
//! let doubled = computed(move || c.get() * 2);
//!
//! // Create an effect
//! let (c, d) = (count.clone(), doubled.clone());
//! let _effect = effect(move || {
//!     println!("Count: {}, Doubled: {}", c.get(), d.get());
//! });
//!
//! // Update the signal
//! count.set(5);
//! // Effect automatically runs, prints: "Count: 5, Doubled: 10"
//! ```

pub mod error;
pub mod handlers;
pub mod reactive;

pub use error::{Error, Result};
pub use reactive::{
    action, as_readonly, batch, cleanup, is_batching, is_tracking, untracked, with_reversion,
    Cleanup, Computed, Effect, EffectOutput, ReadOnly, Readable, Signal, Subscription,
};

/// Create a new signal.
pub fn signal<T>(value: T) -> Signal<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    Signal::new(value)
}

/// Create a new computed. The getter runs on first read.
pub fn computed<T, F>(getter: F) -> Computed<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    Computed::new(getter)
}

/// Create and run a new effect.
pub fn effect<F, R>(body: F) -> Effect
where
    F: Fn() -> R + Send + Sync + 'static,
    R: EffectOutput,
{
    Effect::new(body)
}
