//! The `Source` capability trait.
//!
//! A [`Source<T>`] is anything that can report a current value and notify
//! observers of changes: a [`Cell`](crate::Cell), a
//! [`DerivedView`](crate::DerivedView), or a
//! [`MergedView`](crate::MergedView). The trait is sealed - the set of
//! source types is closed, so downstream code matches on capability rather
//! than probing shapes at runtime.

use super::derived::DerivedView;
use super::observers::{BoxedObserver, Subscription};

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// Readable, observable value source.
///
/// `subscribe` always invokes the observer once, synchronously, with the
/// current value before returning. Subsequent invocations fire per change,
/// suppressed when the observed value is equal to the previous one.
pub trait Source<T: Clone + 'static>: sealed::Sealed {
    /// Current value.
    fn get(&self) -> T;

    /// Type-erased subscribe; prefer [`subscribe`](Source::subscribe).
    fn subscribe_boxed(&self, observer: BoxedObserver<T>) -> Subscription;

    /// Register an observer. Invoked immediately with the current value,
    /// then once per (non-equal) change.
    fn subscribe(&self, observer: impl FnMut(&T) + 'static) -> Subscription
    where
        Self: Sized,
    {
        self.subscribe_boxed(Box::new(observer))
    }

    /// Derive a read-only view through `transform`.
    ///
    /// Change notifications on the view are equality-filtered on the
    /// *transformed* value: source changes that map to the same output
    /// produce no notification downstream.
    fn map<U>(&self, transform: impl Fn(&T) -> U + 'static) -> DerivedView<U>
    where
        Self: Clone + Sized + 'static,
        U: Clone + PartialEq + 'static,
    {
        DerivedView::over(self.clone(), transform)
    }
}
