//! Read-only access to reactive values.
//!
//! [`Readable`] is the capability shared by everything that can be read and
//! subscribed to. It is implemented by exactly three types: [`Signal`],
//! [`Computed`] and the [`ReadOnly`] facade over either of them.

use super::computed::Computed;
use super::signal::Signal;
use super::source::Subscription;

/// Something that can be read, peeked at and subscribed to.
pub trait Readable<T> {
    /// Read the value, tracking the read.
    fn get(&self) -> T;

    /// Read the value without tracking.
    fn peek(&self) -> T;

    /// Call `callback` after every change.
    fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static;
}

impl<T> Readable<T> for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn get(&self) -> T {
        Signal::get(self)
    }

    fn peek(&self) -> T {
        Signal::peek(self)
    }

    fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        Signal::subscribe(self, callback)
    }
}

impl<T> Readable<T> for Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn get(&self) -> T {
        Computed::get(self)
    }

    fn peek(&self) -> T {
        Computed::peek(self)
    }

    fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        Computed::subscribe(self, callback)
    }
}

enum Node<T>
where
    T: Clone + Send + Sync + 'static,
{
    Signal(Signal<T>),
    Computed(Computed<T>),
}

/// A view over a signal or computed that cannot be written through.
///
/// Tracking is unaffected: reading a view with `get()` links the reader to
/// the underlying node.
pub struct ReadOnly<T>
where
    T: Clone + Send + Sync + 'static,
{
    node: Node<T>,
}

impl<T> ReadOnly<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Read the value, tracking the read.
    pub fn get(&self) -> T {
        match &self.node {
            Node::Signal(signal) => signal.get(),
            Node::Computed(computed) => computed.get(),
        }
    }

    /// Read the value without tracking.
    pub fn peek(&self) -> T {
        match &self.node {
            Node::Signal(signal) => signal.peek(),
            Node::Computed(computed) => computed.peek(),
        }
    }

    /// Call `callback` after every change.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        match &self.node {
            Node::Signal(signal) => signal.subscribe(callback),
            Node::Computed(computed) => computed.subscribe(callback),
        }
    }

    /// Id of the underlying node.
    pub fn id(&self) -> u64 {
        match &self.node {
            Node::Signal(signal) => signal.id(),
            Node::Computed(computed) => computed.id(),
        }
    }
}

impl<T> Readable<T> for ReadOnly<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn get(&self) -> T {
        ReadOnly::get(self)
    }

    fn peek(&self) -> T {
        ReadOnly::peek(self)
    }

    fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        ReadOnly::subscribe(self, callback)
    }
}

impl<T> Clone for ReadOnly<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        let node = match &self.node {
            Node::Signal(signal) => Node::Signal(signal.clone()),
            Node::Computed(computed) => Node::Computed(computed.clone()),
        };
        Self { node }
    }
}

impl<T> From<Signal<T>> for ReadOnly<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn from(signal: Signal<T>) -> Self {
        Self {
            node: Node::Signal(signal),
        }
    }
}

impl<T> From<Computed<T>> for ReadOnly<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn from(computed: Computed<T>) -> Self {
        Self {
            node: Node::Computed(computed),
        }
    }
}

impl<T> std::fmt::Debug for ReadOnly<T>
where
    T: Clone + Send + Sync + std::fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadOnly")
            .field("id", &self.id())
            .field("value", &self.peek())
            .finish()
    }
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// A read-only view of this signal.
    pub fn as_readonly(&self) -> ReadOnly<T> {
        ReadOnly::from(self.clone())
    }
}

impl<T> Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// A read-only view of this computed.
    pub fn as_readonly(&self) -> ReadOnly<T> {
        ReadOnly::from(self.clone())
    }
}

/// Wrap a signal or computed in a read-only view.
pub fn as_readonly<T, S>(source: S) -> ReadOnly<T>
where
    T: Clone + Send + Sync + 'static,
    S: Into<ReadOnly<T>>,
{
    source.into()
}
