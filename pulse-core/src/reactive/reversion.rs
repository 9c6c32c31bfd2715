//! Optimistic updates with rollback.
//!
//! [`with_reversion`] snapshots a set of signals, runs an async task, and
//! if the task fails restores every snapshot inside one batch, so observers
//! see a single corrective update. The failure is handed back unchanged.
//!
//! Snapshots are taken when `with_reversion` is called, before the task is
//! first polled. Writes made by unrelated operations while the task is in
//! flight are not detected: the rollback overwrites them.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use futures_util::FutureExt;

use super::batch::batch;
use super::signal::Signal;

/// A captured value that can be written back.
pub struct Checkpoint {
    restore: Box<dyn FnOnce() + Send>,
}

impl Checkpoint {
    /// Write the captured value back.
    pub fn restore(self) {
        (self.restore)();
    }
}

/// Something whose current value can be captured and later restored.
pub trait Revertible {
    /// Capture the current value without tracking it.
    fn checkpoint(&self) -> Checkpoint;
}

impl<T> Revertible for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn checkpoint(&self) -> Checkpoint {
        let signal = self.clone();
        let value = self.peek();
        Checkpoint {
            restore: Box::new(move || signal.set(value)),
        }
    }
}

fn rollback(checkpoints: Vec<Checkpoint>) {
    let count = checkpoints.len();
    batch(|| checkpoints.into_iter().for_each(Checkpoint::restore));
    tracing::error!(signals = count, "operation failed, state reverted");
}

/// Run `task`; on failure, roll `signals` back to their values at call time.
///
/// A panic inside the task also rolls back before it is resumed.
///
/// ```rust
/// use pulse_core::{signal, with_reversion};
///
/// # futures_util::FutureExt::now_or_never(async {
/// let likes = signal(10);
/// let l = likes.clone();
/// let result: Result<(), &str> = with_reversion(&[&likes], async move {
///     l.set(11);
///     Err("server rejected the like")
/// })
/// .await;
///
/// assert!(result.is_err());
/// assert_eq!(likes.peek(), 10);
/// # });
/// ```
pub fn with_reversion<Fut, R, E>(
    signals: &[&dyn Revertible],
    task: Fut,
) -> impl Future<Output = Result<R, E>>
where
    Fut: Future<Output = Result<R, E>>,
{
    let checkpoints: Vec<Checkpoint> = signals.iter().map(|signal| signal.checkpoint()).collect();

    async move {
        match AssertUnwindSafe(task).catch_unwind().await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                rollback(checkpoints);
                Err(err)
            }
            Err(payload) => {
                rollback(checkpoints);
                panic::resume_unwind(payload)
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
