//! MergedView - N sources combined through one function.
//!
//! A merged view has two modes:
//!
//! - **Lazy (pull)** while nobody observes it: `get()` recomputes from the
//!   sources on every call and nothing is cached. No wasted work when the
//!   combination is unobserved.
//! - **Active (push)** while at least one observer is registered: the view
//!   subscribes to every source, caches the last broadcast value, and
//!   forwards equality-suppressed notifications.
//!
//! Every fresh subscriber receives one immediate broadcast of the combined
//! value - forced, never suppressed by equality against an earlier cached
//! value - so downstream code always starts from a defined state.
//!
//! # Example
//!
//! ```ignore
//! use cinder_ui::{Cell, merge, Source};
//!
//! let a = Cell::new(2);
//! let b = Cell::new(4);
//! let sum = merge(&a, &b, |a, b| a + b);
//!
//! assert_eq!(sum.get(), 6);          // pull mode
//! let sub = sum.subscribe(|s| println!("sum = {s}")); // prints 6, now active
//! a.set(3);                          // prints 7
//! sub.cancel();                      // back to pull mode
//! ```

use std::cell::{Cell as StdCell, RefCell};
use std::rc::Rc;

use super::observers::{BoxedObserver, ObserverList, Subscription};
use super::source::{Source, sealed};

/// Erased per-source subscription hook: given a change callback, subscribes
/// it to the underlying source.
type ChangeHook = Box<dyn Fn(Box<dyn FnMut()>) -> Subscription>;

struct MergedInner<T> {
    compute: Box<dyn Fn() -> T>,
    hooks: Vec<ChangeHook>,
    /// Last broadcast value; `Some` only while active.
    cached: RefCell<Option<T>>,
    /// Source subscriptions; non-empty only while active.
    source_subs: RefCell<Vec<Subscription>>,
    observers: ObserverList<T>,
    /// True while source subscriptions are being established; their
    /// immediate first invocations are snapshots, not broadcasts.
    activating: StdCell<bool>,
}

/// Computed view over N sources with lazy/active subscription modes.
/// Cloning shares the same state.
pub struct MergedView<T> {
    inner: Rc<MergedInner<T>>,
}

impl<T> Clone for MergedView<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> MergedView<T> {
    pub(crate) fn from_parts(compute: Box<dyn Fn() -> T>, hooks: Vec<ChangeHook>) -> Self {
        Self {
            inner: Rc::new(MergedInner {
                compute,
                hooks,
                cached: RefCell::new(None),
                source_subs: RefCell::new(Vec::new()),
                observers: ObserverList::new(),
                activating: StdCell::new(false),
            }),
        }
    }

    /// Whether the view currently pushes (has observers and source
    /// subscriptions).
    pub fn is_active(&self) -> bool {
        !self.inner.observers.is_empty()
    }

    /// 0 -> 1 observers: subscribe to every source, then compute and
    /// force-broadcast regardless of any prior value.
    fn activate(inner: &Rc<MergedInner<T>>) {
        inner.activating.set(true);
        for hook in &inner.hooks {
            let weak = Rc::downgrade(inner);
            let sub = hook(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    Self::on_source_change(&inner);
                }
            }));
            inner.source_subs.borrow_mut().push(sub);
        }
        inner.activating.set(false);

        let value = (inner.compute)();
        *inner.cached.borrow_mut() = Some(value.clone());
        inner.observers.notify(&value);
    }

    /// 1 -> 0 observers: cancel source subscriptions, drop cached state.
    fn deactivate(inner: &Rc<MergedInner<T>>) {
        let subs: Vec<Subscription> = inner.source_subs.borrow_mut().drain(..).collect();
        for sub in subs {
            sub.cancel();
        }
        *inner.cached.borrow_mut() = None;
    }

    fn on_source_change(inner: &Rc<MergedInner<T>>) {
        if inner.activating.get() {
            return;
        }
        let next = (inner.compute)();
        if let Some(previous) = &*inner.cached.borrow() {
            if *previous == next {
                return;
            }
        }
        *inner.cached.borrow_mut() = Some(next.clone());
        inner.observers.notify(&next);
    }
}

impl<T> sealed::Sealed for MergedView<T> {}

impl<T: Clone + PartialEq + 'static> Source<T> for MergedView<T> {
    fn get(&self) -> T {
        if let Some(value) = &*self.inner.cached.borrow() {
            return value.clone();
        }
        (self.inner.compute)()
    }

    fn subscribe_boxed(&self, observer: BoxedObserver<T>) -> Subscription {
        let inner = Rc::clone(&self.inner);
        let was_inactive = inner.observers.is_empty();
        let id = inner.observers.add(observer);

        if was_inactive {
            // Force-broadcast reaches the sole observer just added.
            Self::activate(&inner);
        } else {
            // Already active: deliver the cached value to this observer only.
            let value = inner.cached.borrow().clone();
            if let Some(value) = value {
                inner.observers.invoke_one(id, &value);
            }
        }

        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.observers.remove(id);
                if inner.observers.is_empty() {
                    Self::deactivate(&inner);
                }
            }
        })
    }
}

impl<T> std::fmt::Debug for MergedView<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergedView")
            .field("active", &!self.inner.observers.is_empty())
            .field("sources", &self.inner.hooks.len())
            .finish()
    }
}

// =============================================================================
// Constructors
// =============================================================================

/// Combine two sources.
pub fn merge<A, B, T, SA, SB>(
    a: &SA,
    b: &SB,
    combine: impl Fn(&A, &B) -> T + 'static,
) -> MergedView<T>
where
    A: Clone + 'static,
    B: Clone + 'static,
    T: Clone + PartialEq + 'static,
    SA: Source<A> + Clone + 'static,
    SB: Source<B> + Clone + 'static,
{
    let (read_a, read_b) = (a.clone(), b.clone());
    let compute = Box::new(move || combine(&read_a.get(), &read_b.get()));
    let hooks = vec![change_hook(a.clone()), change_hook(b.clone())];
    MergedView::from_parts(compute, hooks)
}

/// Combine three sources.
pub fn merge3<A, B, C, T, SA, SB, SC>(
    a: &SA,
    b: &SB,
    c: &SC,
    combine: impl Fn(&A, &B, &C) -> T + 'static,
) -> MergedView<T>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
    T: Clone + PartialEq + 'static,
    SA: Source<A> + Clone + 'static,
    SB: Source<B> + Clone + 'static,
    SC: Source<C> + Clone + 'static,
{
    let (read_a, read_b, read_c) = (a.clone(), b.clone(), c.clone());
    let compute = Box::new(move || combine(&read_a.get(), &read_b.get(), &read_c.get()));
    let hooks = vec![
        change_hook(a.clone()),
        change_hook(b.clone()),
        change_hook(c.clone()),
    ];
    MergedView::from_parts(compute, hooks)
}

/// Combine any number of same-typed sources; `combine` receives a slice of
/// current values in source order.
pub fn merge_all<S, T, Src>(
    sources: Vec<Src>,
    combine: impl Fn(&[S]) -> T + 'static,
) -> MergedView<T>
where
    S: Clone + 'static,
    T: Clone + PartialEq + 'static,
    Src: Source<S> + Clone + 'static,
{
    let readers = sources.clone();
    let compute = Box::new(move || {
        let values: Vec<S> = readers.iter().map(|source| source.get()).collect();
        combine(&values)
    });
    let hooks = sources.into_iter().map(change_hook).collect();
    MergedView::from_parts(compute, hooks)
}

fn change_hook<S, Src>(source: Src) -> ChangeHook
where
    S: Clone + 'static,
    Src: Source<S> + 'static,
{
    Box::new(move |mut on_change| source.subscribe_boxed(Box::new(move |_| on_change())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::cell::Cell;
    use std::cell::Cell as StdCell;

    #[test]
    fn pull_mode_recomputes_on_every_get() {
        let a = Cell::new(2);
        let b = Cell::new(4);
        let computes = Rc::new(StdCell::new(0));

        let computes_inner = computes.clone();
        let sum = merge(&a, &b, move |a, b| {
            computes_inner.set(computes_inner.get() + 1);
            a + b
        });

        assert_eq!(sum.get(), 6);
        assert_eq!(sum.get(), 6);
        assert_eq!(computes.get(), 2, "no caching while inactive");
        assert!(!sum.is_active());
        assert_eq!(a.observer_count(), 0, "no source subscriptions while lazy");
    }

    #[test]
    fn first_subscriber_gets_forced_immediate_broadcast() {
        let a = Cell::new(2);
        let b = Cell::new(4);
        let sum = merge(&a, &b, |a, b| a + b);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let inner = seen.clone();
        let _sub = sum.subscribe(move |v| inner.borrow_mut().push(*v));

        assert_eq!(*seen.borrow(), vec![6]);
        assert!(sum.is_active());
        assert_eq!(a.observer_count(), 1);
        assert_eq!(b.observer_count(), 1);
    }

    #[test]
    fn active_mode_pushes_equality_suppressed_changes() {
        let a = Cell::new(1);
        let b = Cell::new(1);
        let max = merge(&a, &b, |a, b| (*a).max(*b));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let inner = seen.clone();
        let _sub = max.subscribe(move |v| inner.borrow_mut().push(*v));
        assert_eq!(*seen.borrow(), vec![1]);

        a.set(5);
        assert_eq!(*seen.borrow(), vec![1, 5]);

        // b rises but the combined value is unchanged: suppressed.
        b.set(3);
        assert_eq!(*seen.borrow(), vec![1, 5]);

        assert_eq!(max.get(), 5, "active get() reads the cache");
    }

    #[test]
    fn resubscribe_after_unsubscribe_forces_broadcast_again() {
        let a = Cell::new(2);
        let b = Cell::new(4);
        let sum = merge(&a, &b, |a, b| a + b);

        let first = Rc::new(RefCell::new(Vec::new()));
        let inner = first.clone();
        let sub = sum.subscribe(move |v| inner.borrow_mut().push(*v));
        assert_eq!(*first.borrow(), vec![6]);

        sub.cancel();
        assert!(!sum.is_active());
        assert_eq!(a.observer_count(), 0, "source subscriptions released");

        // Unchanged source values: the fresh subscriber still gets 6,
        // not suppressed by equality against the old cached value.
        let second = Rc::new(RefCell::new(Vec::new()));
        let inner = second.clone();
        let _sub = sum.subscribe(move |v| inner.borrow_mut().push(*v));
        assert_eq!(*second.borrow(), vec![6]);
    }

    #[test]
    fn late_subscriber_gets_cached_value_without_rebroadcast_to_others() {
        let a = Cell::new(1);
        let b = Cell::new(2);
        let sum = merge(&a, &b, |a, b| a + b);

        let first = Rc::new(RefCell::new(Vec::new()));
        let inner = first.clone();
        let _sub_a = sum.subscribe(move |v| inner.borrow_mut().push(*v));

        let second = Rc::new(RefCell::new(Vec::new()));
        let inner = second.clone();
        let _sub_b = sum.subscribe(move |v| inner.borrow_mut().push(*v));

        assert_eq!(*first.borrow(), vec![3], "existing observer not re-notified");
        assert_eq!(*second.borrow(), vec![3], "new observer gets immediate value");
    }

    #[test]
    fn merge3_combines_three_sources() {
        let a = Cell::new(1);
        let b = Cell::new(2);
        let c = Cell::new(3);
        let total = merge3(&a, &b, &c, |a, b, c| a + b + c);

        assert_eq!(total.get(), 6);
        c.set(10);
        assert_eq!(total.get(), 13);
    }

    #[test]
    fn merge_all_combines_a_slice_of_sources() {
        let cells: Vec<Cell<i32>> = (1..=4).map(Cell::new).collect();
        let sum = merge_all(cells.clone(), |values| values.iter().sum::<i32>());

        assert_eq!(sum.get(), 10);
        cells[0].set(100);
        assert_eq!(sum.get(), 109);
    }

    #[test]
    fn merged_views_compose_with_map() {
        let a = Cell::new(2);
        let b = Cell::new(3);
        let label = merge(&a, &b, |a, b| a * b).map(|product| format!("p{product}"));

        assert_eq!(label.get(), "p6");

        let seen = Rc::new(RefCell::new(Vec::new()));
        let inner = seen.clone();
        let _sub = label.subscribe(move |s| inner.borrow_mut().push(s.clone()));

        a.set(4);
        assert_eq!(*seen.borrow(), vec!["p6".to_string(), "p12".to_string()]);
    }
}
