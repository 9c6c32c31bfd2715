//! Actions and untracked reads.

use super::batch::batch;
use super::context::ReactiveContext;

/// Wrap `f` so that every call runs inside one batch.
///
/// Arguments are passed as a single value; use a tuple for several.
///
/// ```rust
/// use pulse_core::{action, signal};
///
/// let first = signal(String::new());
/// let last = signal(String::new());
///
/// let (f, l) = (first.clone(), last.clone());
/// let rename = action(move |(a, b): (String, String)| {
///     f.set(a);
///     l.set(b);
/// });
///
/// rename(("Ada".to_string(), "Lovelace".to_string()));
/// assert_eq!(last.peek(), "Lovelace");
/// ```
pub fn action<A, R, F>(f: F) -> impl Fn(A) -> R
where
    F: Fn(A) -> R,
{
    move |args| batch(|| f(args))
}

/// Run `f` with tracking switched off.
///
/// Reads inside `f` create no dependency for whatever subscriber was active.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::untracked();
    f()
}

/// Whether reads on this thread are currently being tracked.
pub fn is_tracking() -> bool {
    ReactiveContext::is_active()
}
