//! Bindings from reactive values to an external view.
//!
//! A [`Binding`] pushes the current value of a signal or computed into a
//! callback whenever it changes. Reads go through `peek`, so creating or
//! refreshing a binding inside an effect never links the effect to the
//! bound value.

use crate::reactive::{ReadOnly, Subscription};

/// A live link from a reactive value to a callback.
///
/// Dropping the binding unsubscribes.
pub struct Binding<T>
where
    T: Clone + Send + Sync + 'static,
{
    source: ReadOnly<T>,
    subscription: Subscription,
}

impl<T> Binding<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Current value of the bound source, untracked.
    pub fn current(&self) -> T {
        self.source.peek()
    }

    /// Whether the binding still receives updates.
    pub fn is_bound(&self) -> bool {
        self.subscription.is_active()
    }

    /// Stop receiving updates.
    pub fn unbind(self) {
        self.subscription.unsubscribe();
    }
}

/// Call `on_change` with the new value every time `source` changes.
pub fn bind<T, S, F>(source: S, on_change: F) -> Binding<T>
where
    T: Clone + Send + Sync + 'static,
    S: Into<ReadOnly<T>>,
    F: Fn(T) + Send + Sync + 'static,
{
    let source = source.into();
    let reader = source.clone();
    let subscription = source.subscribe(move || on_change(reader.peek()));

    Binding {
        source,
        subscription,
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
