//! Observer registration and the [`Subscription`] handle.
//!
//! Every observable type in this crate stores its observers in an
//! [`ObserverList`]: callbacks keyed by a monotonically increasing id,
//! notified in registration order. Notification iterates over a snapshot,
//! so an observer may cancel its own subscription from inside its callback
//! without corrupting the in-progress loop.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Boxed observer callback, invoked with a reference to the new value.
pub type BoxedObserver<T> = Box<dyn FnMut(&T) + 'static>;

// =============================================================================
// Subscription
// =============================================================================

/// Handle returned by `subscribe`; cancelling removes the observer from the
/// owning cell or view.
///
/// Cancellation is explicit. Dropping the handle without calling
/// [`cancel`](Subscription::cancel) leaves the observer registered for the
/// lifetime of its source; lifecycle nodes cancel the subscriptions they own
/// as part of their disconnect step.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub(crate) fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Remove the observer. Safe to call from within the observer's own
    /// notification callback.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

// =============================================================================
// Observer List
// =============================================================================

type Entry<T> = (u64, Rc<RefCell<BoxedObserver<T>>>);

/// Registration-ordered observer storage shared by [`Cell`](crate::Cell) and
/// [`MergedView`](crate::MergedView).
pub(crate) struct ObserverList<T> {
    entries: RefCell<Vec<Entry<T>>>,
    next_id: Cell<u64>,
}

impl<T> ObserverList<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    pub(crate) fn add(&self, observer: BoxedObserver<T>) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.entries
            .borrow_mut()
            .push((id, Rc::new(RefCell::new(observer))));
        id
    }

    pub(crate) fn remove(&self, id: u64) {
        self.entries.borrow_mut().retain(|(entry_id, _)| *entry_id != id);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Notify every observer, in registration order, with `value`.
    ///
    /// Iterates a snapshot and re-checks membership before each call, so
    /// observers removed mid-loop (including self-removal) are skipped and
    /// the loop itself never holds the list borrow across a callback.
    pub(crate) fn notify(&self, value: &T) {
        let snapshot: Vec<Entry<T>> = self.entries.borrow().clone();
        for (id, observer) in snapshot {
            let still_registered = self
                .entries
                .borrow()
                .iter()
                .any(|(entry_id, _)| *entry_id == id);
            if still_registered {
                (observer.borrow_mut())(value);
            }
        }
    }

    /// Invoke a single observer by id (the immediate first call on
    /// subscribe).
    pub(crate) fn invoke_one(&self, id: u64, value: &T) {
        let observer = self
            .entries
            .borrow()
            .iter()
            .find(|(entry_id, _)| *entry_id == id)
            .map(|(_, observer)| observer.clone());
        if let Some(observer) = observer {
            (observer.borrow_mut())(value);
        }
    }
}
