//! DerivedView - a read-only transform over another source.
//!
//! Stateless besides its reference to the upstream source: `get()`
//! recomputes on every read, and `subscribe` delegates to the upstream,
//! wrapping the observer so notifications are equality-filtered on the
//! transformed value. An upstream change that transforms to the same output
//! is invisible downstream.
//!
//! # Example
//!
//! ```ignore
//! use cinder_ui::{Cell, Source};
//!
//! #[derive(Clone, PartialEq)]
//! struct State { a: u32, b: u32 }
//!
//! let state = Cell::new(State { a: 1, b: 2 });
//! let a = state.map(|s| s.a);
//!
//! let _sub = a.subscribe(|a| println!("a = {a}")); // prints 1
//! state.update(|s| s.b = 9); // `a` unchanged: no notification
//! state.update(|s| s.a = 3); // prints 3
//! ```

use std::rc::Rc;

use super::observers::{BoxedObserver, Subscription};
use super::source::{Source, sealed};

/// Read-only computed view over a [`Source`]. Cloning shares the upstream
/// reference and transform.
pub struct DerivedView<T> {
    read: Rc<dyn Fn() -> T>,
    attach: Rc<dyn Fn(BoxedObserver<T>) -> Subscription>,
}

impl<T> Clone for DerivedView<T> {
    fn clone(&self) -> Self {
        Self {
            read: Rc::clone(&self.read),
            attach: Rc::clone(&self.attach),
        }
    }
}

impl<T: Clone + PartialEq + 'static> DerivedView<T> {
    /// Build a view of `source` through `transform`. Used by
    /// [`Source::map`]; views compose, so mapping a view chains transforms.
    pub(crate) fn over<S, Src>(source: Src, transform: impl Fn(&S) -> T + 'static) -> Self
    where
        S: Clone + 'static,
        Src: Source<S> + Clone + 'static,
    {
        let transform = Rc::new(transform);

        let read_source = source.clone();
        let read_transform = Rc::clone(&transform);
        let read = Rc::new(move || read_transform(&read_source.get()));

        let attach = Rc::new(move |mut observer: BoxedObserver<T>| {
            let transform = Rc::clone(&transform);
            // The first upstream invocation (subscribe's immediate call)
            // always passes through; after that, equal transformed values
            // are suppressed.
            let mut last: Option<T> = None;
            source.subscribe_boxed(Box::new(move |upstream: &S| {
                let next = transform(upstream);
                let changed = match &last {
                    Some(previous) => *previous != next,
                    None => true,
                };
                if changed {
                    last = Some(next.clone());
                    observer(&next);
                }
            }))
        });

        Self { read, attach }
    }
}

impl<T> sealed::Sealed for DerivedView<T> {}

impl<T: Clone + PartialEq + 'static> Source<T> for DerivedView<T> {
    fn get(&self) -> T {
        (self.read)()
    }

    fn subscribe_boxed(&self, observer: BoxedObserver<T>) -> Subscription {
        (self.attach)(observer)
    }
}

impl<T> std::fmt::Debug for DerivedView<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedView").finish_non_exhaustive()
    }
}
