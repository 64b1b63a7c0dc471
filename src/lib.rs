//! # cinder-ui
//!
//! Reactive UI core: observable cells, derived views, lifecycle nodes and
//! keyed list reconciliation.
//!
//! cinder-ui is the state-and-lifecycle layer of a UI, with the rendering
//! surface abstracted behind the [`host`] capability traits. It owns the
//! flow of values and the flow of mount/unmount, and nothing else: no
//! layout, no drawing, no event loop.
//!
//! ## Architecture
//!
//! Values live in [`Cell`]s and flow out through the [`Source`] capability:
//! ```text
//! Cell → map (DerivedView) / merge (MergedView) → subscribers
//!                                               → KeyedList / BranchView → Tree → HostSurface
//! ```
//! Every notification path is equality-suppressed on the value actually
//! observed, so unchanged data never reaches the tree.
//!
//! Nodes live in a [`Tree`] arena keyed by [`NodeKey`]. Connecting a node
//! builds its host resource and fires its lifecycle hooks; connecting an
//! already-mounted node only repositions it. The [`KeyedList`] reconciler
//! and the [`view`] branch slots drive the tree from reactive sources,
//! batching surface mutations per frame through the host's
//! [`FrameScheduler`].
//!
//! ## Modules
//!
//! - [`reactive`] - Cells, derived views, merged views, subscriptions
//! - [`tree`] - Lifecycle node arena, hooks, connect/disconnect
//! - [`list`] - Keyed list reconciliation with per-frame commits
//! - [`view`] - Conditional and async branch slots
//! - [`store`] - Named store registry
//! - [`host`] - Surface and frame-scheduler capabilities (consumed, never
//!   implemented here)

pub mod error;
pub mod host;
pub mod list;
pub mod reactive;
pub mod store;
pub mod tree;
pub mod view;

// Re-export commonly used items
pub use error::Error;

pub use reactive::{
    merge, merge3, merge_all, BoxedObserver, Cell, DerivedView, MergedView, Source,
    Subscription,
};

pub use tree::{NodeKey, NodeSpec, Tree};

pub use list::{KeyedItem, KeyedList};

pub use view::{async_boundary, conditional, AsyncState, BranchView, ViewBuilder};

pub use store::{StoreCtx, StoreRegistry};

pub use host::{
    FrameScheduler, HostSurface, ImmediateScheduler, ManualScheduler, ResourceId,
};
