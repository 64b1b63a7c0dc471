//! Reactive primitives: cells, derived views, merged views.
//!
//! Values flow out of a [`Cell`] through the [`Source`] capability:
//! `get()` pulls the current value, `subscribe()` pushes changes. Views
//! compose - [`Source::map`] derives, [`merge`]/[`merge3`]/[`merge_all`]
//! combine - and every notification path is equality-suppressed on the
//! value actually observed.

pub mod cell;
pub mod derived;
pub mod merged;
pub mod observers;
pub mod source;

pub use cell::Cell;
pub use derived::DerivedView;
pub use merged::{MergedView, merge, merge3, merge_all};
pub use observers::{BoxedObserver, Subscription};
pub use source::Source;
