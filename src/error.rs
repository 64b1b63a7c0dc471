//! Error types.
//!
//! Argument validation fails synchronously at the call site; redundant
//! lifecycle calls (double connect, double disconnect) are defined no-ops and
//! never produce an error. Duplicate reconciler keys are a documented
//! consistency risk, reported through the logging sink rather than here.

use thiserror::Error;

/// Errors returned by fallible operations across the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A `NodeKey` that no longer refers to a live node in the tree arena.
    #[error("stale node handle")]
    StaleNode,

    /// `add_child` would make a node an ancestor of itself.
    #[error("node cycle: child is an ancestor of the requested parent")]
    NodeCycle,

    /// A store with this name is already registered.
    #[error("store `{0}` is already registered")]
    DuplicateStore(String),

    /// No store registered under this name.
    #[error("no store named `{0}`")]
    UnknownStore(String),

    /// The store exists but its exports are of a different type.
    #[error("store `{0}` exports a different type")]
    StoreTypeMismatch(String),
}

impl Error {
    /// Whether this error is a call-boundary validation failure (as opposed
    /// to a genuinely invalid lifecycle sequence).
    pub fn is_validation(&self) -> bool {
        !matches!(self, Error::NodeCycle)
    }
}
