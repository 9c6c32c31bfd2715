//! Error types for the reactive core.
//!
//! The core raises almost nothing on its own. Failures in user code (getters,
//! effect bodies, subscriber callbacks) are panics and propagate to whoever
//! triggered them. The variants here cover misuse the graph itself can detect.

use thiserror::Error;

/// Errors reported by the reactive core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A computed value was read while its own getter was still running.
    #[error("computed {computed} was read while it was recomputing (circular dependency)")]
    CircularDependency {
        /// Id of the computed that was re-entered.
        computed: u64,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
