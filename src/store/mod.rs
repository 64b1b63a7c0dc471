//! Named store registry.
//!
//! A [`StoreRegistry`] holds application state modules ("stores") as
//! type-erased, shared exports keyed by name. A store is built once by its
//! setup closure and handed out as `Rc<T>` afterwards; the exports are
//! usually a struct of [`Cell`]s and derived views, so sharing the `Rc` is
//! sharing the live state.
//!
//! Setup closures receive a [`StoreCtx`] and may read stores registered
//! before them, which fixes the initialization order without any global
//! state. Registration order is preserved and observable through
//! [`StoreRegistry::names`].
//!
//! ```ignore
//! struct SessionStore {
//!     user: Cell<Option<String>>,
//! }
//!
//! let registry = StoreRegistry::new();
//! let session = registry.register("session", |_ctx| SessionStore {
//!     user: Cell::new(None),
//! })?;
//!
//! // elsewhere, by name:
//! let session = registry.get::<SessionStore>("session")?;
//! session.user.set(Some("ada".into()));
//! ```
//!
//! [`Cell`]: crate::reactive::Cell

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::error::Error;

/// Registry of named, type-erased store exports.
#[derive(Default)]
pub struct StoreRegistry {
    entries: RefCell<Vec<(String, Rc<dyn Any>)>>,
}

/// Handed to a store's setup closure; grants access to previously
/// registered stores.
pub struct StoreCtx<'a> {
    registry: &'a StoreRegistry,
}

impl StoreRegistry {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Build and register a store under `name`. The setup closure runs
    /// exactly once, before the store becomes visible; it may read earlier
    /// stores through the [`StoreCtx`].
    pub fn register<T: 'static>(
        &self,
        name: impl Into<String>,
        setup: impl FnOnce(&StoreCtx<'_>) -> T,
    ) -> Result<Rc<T>, Error> {
        let name = name.into();
        if self.contains(&name) {
            return Err(Error::DuplicateStore(name));
        }

        // The borrow is not held across setup, so setup can call back into
        // the registry for earlier stores.
        let ctx = StoreCtx { registry: self };
        let exports = Rc::new(setup(&ctx));

        // Re-check: setup may itself have registered under this name.
        if self.contains(&name) {
            return Err(Error::DuplicateStore(name));
        }

        tracing::debug!(store = %name, "store registered");
        self.entries
            .borrow_mut()
            .push((name, exports.clone() as Rc<dyn Any>));
        Ok(exports)
    }

    /// Shared handle to the store registered under `name`, downcast to its
    /// export type.
    pub fn get<T: 'static>(&self, name: &str) -> Result<Rc<T>, Error> {
        let entries = self.entries.borrow();
        let (_, exports) = entries
            .iter()
            .find(|(entry_name, _)| entry_name == name)
            .ok_or_else(|| Error::UnknownStore(name.to_string()))?;
        Rc::clone(exports)
            .downcast::<T>()
            .map_err(|_| Error::StoreTypeMismatch(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|(entry_name, _)| entry_name == name)
    }

    /// Store names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl StoreCtx<'_> {
    /// Read a store registered before the one currently being set up.
    pub fn get<T: 'static>(&self, name: &str) -> Result<Rc<T>, Error> {
        self.registry.get(name)
    }
}

impl std::fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("stores", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Cell, Source};

    #[derive(Debug)]
    struct CounterStore {
        count: Cell<i32>,
    }

    struct DoubledStore {
        doubled: crate::reactive::DerivedView<i32>,
    }

    #[test]
    fn register_then_get_shares_the_same_exports() {
        let registry = StoreRegistry::new();
        let counter = registry
            .register("counter", |_ctx| CounterStore { count: Cell::new(0) })
            .unwrap();

        counter.count.set(5);

        let fetched = registry.get::<CounterStore>("counter").unwrap();
        assert_eq!(fetched.count.get(), 5, "get returns the live store");
        assert!(Rc::ptr_eq(&counter, &fetched));
    }

    #[test]
    fn names_preserve_registration_order() {
        let registry = StoreRegistry::new();
        registry.register("alpha", |_| ()).unwrap();
        registry.register("beta", |_| ()).unwrap();
        registry.register("gamma", |_| ()).unwrap();

        assert_eq!(registry.names(), vec!["alpha", "beta", "gamma"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn duplicate_name_is_rejected_without_clobbering() {
        let registry = StoreRegistry::new();
        let first = registry
            .register("counter", |_| CounterStore { count: Cell::new(1) })
            .unwrap();

        let err = registry
            .register("counter", |_| CounterStore { count: Cell::new(2) })
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateStore(name) if name == "counter"));

        let fetched = registry.get::<CounterStore>("counter").unwrap();
        assert!(Rc::ptr_eq(&first, &fetched), "original store untouched");
    }

    #[test]
    fn unknown_name_and_wrong_type_are_distinct_errors() {
        let registry = StoreRegistry::new();
        registry
            .register("counter", |_| CounterStore { count: Cell::new(0) })
            .unwrap();

        assert!(matches!(
            registry.get::<CounterStore>("missing"),
            Err(Error::UnknownStore(name)) if name == "missing"
        ));
        assert!(matches!(
            registry.get::<String>("counter"),
            Err(Error::StoreTypeMismatch(name)) if name == "counter"
        ));
    }

    #[test]
    fn setup_reads_earlier_stores_through_the_ctx() {
        let registry = StoreRegistry::new();
        let counter = registry
            .register("counter", |_| CounterStore { count: Cell::new(10) })
            .unwrap();

        let doubled = registry
            .register("doubled", |ctx| {
                let counter = ctx.get::<CounterStore>("counter").unwrap();
                DoubledStore {
                    doubled: counter.count.map(|n| n * 2),
                }
            })
            .unwrap();

        assert_eq!(doubled.doubled.get(), 20);
        counter.count.set(21);
        assert_eq!(doubled.doubled.get(), 42, "derived store stays live");
    }

    #[test]
    fn setup_cannot_read_stores_registered_later() {
        let registry = StoreRegistry::new();
        let err = registry
            .register("dependent", |ctx| ctx.get::<CounterStore>("counter"))
            .unwrap();
        assert!(matches!(&*err, Err(Error::UnknownStore(_))));
    }
}
