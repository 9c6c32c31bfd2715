//! Reactive Primitives
//!
//! This module implements the reactive core: signals, computeds, effects and
//! batch transactions. Everything else in the crate is built from these.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! within a tracking context (a computed or effect), the signal registers
//! that context as a dependent. When the signal's value changes, all
//! dependents are notified.
//!
//! ## Computeds
//!
//! A Computed is a derived value that caches its result. It is lazy until
//! first read and eager afterwards: it recomputes as soon as an input
//! changes and only propagates when its own value actually changed.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change. Effects are used to synchronize reactive state with
//! external systems, such as a view or a log.
//!
//! ## Batches
//!
//! A batch defers notifications until it closes, so a subscriber reachable
//! from several writes runs once and sees only the final values.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local tracking slot to detect
//! dependencies automatically. When a signal is read, we check if there is
//! an active subscriber and, if so, link the two.
//!
//! This approach (sometimes called "automatic dependency tracking" or
//! "transparent reactivity") is used by SolidJS, Vue 3, and Leptos.

mod action;
mod batch;
mod computed;
mod context;
mod effect;
pub mod equality;
mod readonly;
mod reversion;
mod signal;
mod source;
mod subscriber;

pub use action::{action, is_tracking, untracked};
pub use batch::{batch, is_batching};
pub use computed::Computed;
pub use context::ReactiveContext;
pub use effect::{cleanup, Cleanup, Effect, EffectOutput};
pub use readonly::{as_readonly, ReadOnly, Readable};
pub use reversion::{with_reversion, Checkpoint, Revertible};
pub use signal::Signal;
pub use source::Subscription;
pub use subscriber::{Subscriber, SubscriberId};
