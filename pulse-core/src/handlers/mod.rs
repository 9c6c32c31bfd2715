//! Collaborators
//!
//! Consumers of the public reactive API that talk to the outside world:
//! async resources, debounced values and view bindings. Nothing here has
//! access to graph internals; everything goes through signals, computeds,
//! effects and batches.

mod binding;
mod debounce;
mod resource;

pub use binding::{bind, Binding};
pub use debounce::{debounce, Debounced};
pub use resource::{invalidate, resource, Fetcher, Resource, ResourceConfig};
