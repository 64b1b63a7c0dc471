//! Cell - the mutable observable value container.
//!
//! A `Cell<T>` owns its value exclusively; the only mutation paths are
//! [`set`](Cell::set) and [`update`](Cell::update), both of which suppress
//! notification when the result is equal to the current value. Observers are
//! notified synchronously, in registration order, at the moment of the write.
//!
//! # Example
//!
//! ```ignore
//! use cinder_ui::{Cell, Source};
//!
//! let count = Cell::new(0);
//! let sub = count.subscribe(|n| println!("count = {n}")); // prints 0 now
//!
//! count.set(1);      // prints 1
//! count.set(1);      // equal value: no notification
//! count.update(|n| *n += 1); // prints 2
//! sub.cancel();
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use super::observers::{BoxedObserver, ObserverList, Subscription};
use super::source::{Source, sealed};

struct CellInner<T> {
    value: RefCell<T>,
    observers: ObserverList<T>,
}

/// Mutable observable value container. Cloning produces another handle to
/// the **same** value.
pub struct Cell<T> {
    inner: Rc<CellInner<T>>,
}

impl<T> Clone for Cell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Cell<T> {
    /// Create a cell holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(CellInner {
                value: RefCell::new(value),
                observers: ObserverList::new(),
            }),
        }
    }

    /// Read the value through a closure without cloning it.
    pub fn with<R>(&self, read: impl FnOnce(&T) -> R) -> R {
        read(&self.inner.value.borrow())
    }

    /// Replace the value. A no-op (no notification) when `value` equals the
    /// current value.
    pub fn set(&self, value: T) {
        {
            let current = self.inner.value.borrow();
            if *current == value {
                return;
            }
        }
        *self.inner.value.borrow_mut() = value.clone();
        // Notify from a local so observers may re-read the cell freely.
        self.inner.observers.notify(&value);
    }

    /// Mutate a draft of the value. The draft is a clone, never the live
    /// stored value; the result is compared against the current value and
    /// applied (with notification) only when different.
    pub fn update(&self, mutate: impl FnOnce(&mut T)) {
        let mut draft = self.inner.value.borrow().clone();
        mutate(&mut draft);
        self.set(draft);
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.inner.observers.len()
    }
}

impl Cell<bool> {
    /// Flip a boolean cell.
    pub fn toggle(&self) {
        self.update(|v| *v = !*v);
    }
}

impl<T> sealed::Sealed for Cell<T> {}

impl<T: Clone + PartialEq + 'static> Source<T> for Cell<T> {
    fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    fn subscribe_boxed(&self, observer: BoxedObserver<T>) -> Subscription {
        let id = self.inner.observers.add(observer);

        // First-value guarantee: invoke once, synchronously, before return.
        let current = self.get();
        self.inner.observers.invoke_one(id, &current);

        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.observers.remove(id);
            }
        })
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Cell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cell")
            .field("value", &self.inner.value.borrow())
            .field("observers", &self.inner.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell as StdCell;

    #[test]
    fn get_returns_initial_value() {
        assert_eq!(Cell::new(42).get(), 42);
        assert_eq!(Cell::new("hi".to_string()).get(), "hi");
    }

    #[test]
    fn subscribe_invokes_immediately_with_current_value() {
        let cell = Cell::new(7);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let seen_inner = seen.clone();
        let _sub = cell.subscribe(move |v| seen_inner.borrow_mut().push(*v));

        assert_eq!(*seen.borrow(), vec![7], "observer runs before subscribe returns");
    }

    #[test]
    fn set_notifies_once_and_suppresses_equal_values() {
        let cell = Cell::new(1);
        let notifications = Rc::new(RefCell::new(Vec::new()));

        let inner = notifications.clone();
        let _sub = cell.subscribe(move |v| inner.borrow_mut().push(*v));

        cell.set(2);
        assert_eq!(*notifications.borrow(), vec![1, 2]);

        // Setting back to the (now) current value fires nothing.
        cell.set(2);
        assert_eq!(*notifications.borrow(), vec![1, 2]);
    }

    #[test]
    fn update_clones_a_draft_and_compares() {
        #[derive(Clone, PartialEq, Debug)]
        struct State {
            a: u32,
            b: u32,
        }

        let cell = Cell::new(State { a: 1, b: 2 });
        let fired = Rc::new(StdCell::new(0));

        let fired_inner = fired.clone();
        let _sub = cell.subscribe(move |_| fired_inner.set(fired_inner.get() + 1));
        assert_eq!(fired.get(), 1); // immediate invoke

        // Draft mutated to an equal value: suppressed.
        cell.update(|s| s.a = 1);
        assert_eq!(fired.get(), 1);

        cell.update(|s| s.a = 5);
        assert_eq!(fired.get(), 2);
        assert_eq!(cell.get().a, 5);
    }

    #[test]
    fn cancel_stops_notifications() {
        let cell = Cell::new(0);
        let count = Rc::new(StdCell::new(0));

        let inner = count.clone();
        let sub = cell.subscribe(move |_| inner.set(inner.get() + 1));
        assert_eq!(count.get(), 1);

        sub.cancel();
        cell.set(1);
        assert_eq!(count.get(), 1);
        assert_eq!(cell.observer_count(), 0);
    }

    #[test]
    fn observer_may_cancel_itself_during_notification() {
        let cell = Cell::new(0);
        let count = Rc::new(StdCell::new(0));

        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let slot_inner = slot.clone();
        let count_inner = count.clone();
        let sub = cell.subscribe(move |v| {
            count_inner.set(count_inner.get() + 1);
            if *v >= 1 {
                if let Some(sub) = slot_inner.borrow_mut().take() {
                    sub.cancel();
                }
            }
        });
        *slot.borrow_mut() = Some(sub);

        cell.set(1); // observer cancels itself here
        cell.set(2);
        assert_eq!(count.get(), 2, "no notification after self-cancel");
    }

    #[test]
    fn notifications_fire_in_registration_order() {
        let cell = Cell::new(0);
        let order = Rc::new(RefCell::new(Vec::new()));

        for tag in [1, 2, 3] {
            let order = order.clone();
            let _ = cell.subscribe_boxed(Box::new(move |v: &i32| {
                if *v == 9 {
                    order.borrow_mut().push(tag);
                }
            }));
        }

        cell.set(9);
        assert_eq!(*order.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn toggle_flips_boolean() {
        let flag = Cell::new(false);
        flag.toggle();
        assert!(flag.get());
        flag.toggle();
        assert!(!flag.get());
    }
}
