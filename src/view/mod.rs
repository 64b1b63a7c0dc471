//! Control-flow views: conditional and async branch slots.
//!
//! A [`BranchView`] is a single-node slot in the tree whose occupant is
//! driven by a reactive source. [`conditional`] switches between a then and
//! an optional else branch on a `Source<bool>`; [`async_boundary`] renders
//! the pending/resolved/rejected arms of a `Source<AsyncState<T, E>>`.
//!
//! Branch swaps are immediate (not frame-batched): the previous branch node
//! is destroyed and the new one built and connected in place. Equality
//! suppression comes from the source itself, so an unchanged condition or
//! state never rebuilds the branch.
//!
//! Async operations are the caller's business: drive a
//! `Cell<AsyncState<T, E>>` from whatever executor you use and the boundary
//! follows it.
//!
//! ```ignore
//! let state: Cell<AsyncState<Profile, String>> = Cell::new(AsyncState::Pending);
//!
//! let view = async_boundary(
//!     tree.clone(),
//!     &state,
//!     Some(Box::new(|tree| tree.create_node(NodeSpec::leaf("spinner")))),
//!     |tree, profile| build_profile_card(tree, profile),
//!     Some(Box::new(|tree, err| build_error_banner(tree, err))),
//! );
//! view.connect(parent_resource, None);
//!
//! // later, from the async side:
//! state.set(AsyncState::Resolved(profile));   // spinner out, card in
//! ```

use std::cell::{Cell as StdCell, RefCell};
use std::fmt::Display;
use std::rc::Rc;

use crate::host::ResourceId;
use crate::reactive::{Source, Subscription};
use crate::tree::{NodeKey, Tree};

/// Async state driving an [`async_boundary`].
///
/// This crate never spawns anything. Callers run their async work wherever
/// they like and publish progress by setting a cell to these states.
#[derive(Clone, Debug, PartialEq)]
pub enum AsyncState<T, E> {
    /// Operation in flight.
    Pending,
    /// Operation completed with a value.
    Resolved(T),
    /// Operation failed.
    Rejected(E),
}

impl<T, E> AsyncState<T, E> {
    pub fn is_pending(&self) -> bool {
        matches!(self, AsyncState::Pending)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, AsyncState::Resolved(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, AsyncState::Rejected(_))
    }
}

/// Builds the node for one branch arm.
pub type ViewBuilder = Box<dyn Fn(&Tree) -> NodeKey>;

#[derive(Clone, Copy)]
struct MountPoint {
    parent: ResourceId,
    after: Option<ResourceId>,
}

struct BranchInner {
    tree: Rc<Tree>,
    current: StdCell<Option<NodeKey>>,
    mounted: StdCell<Option<MountPoint>>,
    source_sub: RefCell<Option<Subscription>>,
}

impl BranchInner {
    fn new(tree: Rc<Tree>) -> Rc<Self> {
        Rc::new(Self {
            tree,
            current: StdCell::new(None),
            mounted: StdCell::new(None),
            source_sub: RefCell::new(None),
        })
    }

    /// Replace the slot's occupant. The previous branch is destroyed first,
    /// then the new node (if any) connects at the mount point.
    fn swap(&self, node: Option<NodeKey>) {
        if let Some(previous) = self.current.take() {
            self.tree.destroy(previous);
        }
        self.current.set(node);
        if let (Some(node), Some(mount)) = (node, self.mounted.get()) {
            let _ = self.tree.connect(node, mount.parent, mount.after);
        }
    }
}

/// A reactive single-node slot. Obtained from [`conditional`] or
/// [`async_boundary`]; the slot itself is branch-agnostic.
pub struct BranchView {
    inner: Rc<BranchInner>,
}

impl BranchView {
    /// Mount the slot: the current branch (and every later one) connects
    /// under `parent`, immediately after `after`.
    pub fn connect(&self, parent: ResourceId, after: Option<ResourceId>) {
        self.inner.mounted.set(Some(MountPoint { parent, after }));
        if let Some(node) = self.inner.current.get() {
            let _ = self.inner.tree.connect(node, parent, after);
        }
    }

    /// Unmount the current branch without destroying it. The source keeps
    /// driving the slot; the occupant reconnects on the next [`connect`].
    ///
    /// [`connect`]: BranchView::connect
    pub fn disconnect(&self) {
        self.inner.mounted.set(None);
        if let Some(node) = self.inner.current.get() {
            self.inner.tree.disconnect(node);
        }
    }

    /// Tear the slot down: cancels the source binding and destroys the
    /// current branch node.
    pub fn dispose(self) {
        if let Some(sub) = self.inner.source_sub.borrow_mut().take() {
            sub.cancel();
        }
        self.inner.mounted.set(None);
        if let Some(node) = self.inner.current.take() {
            self.inner.tree.destroy(node);
        }
    }

    /// Node currently occupying the slot, if the active arm renders one.
    pub fn node(&self) -> Option<NodeKey> {
        self.inner.current.get()
    }
}

impl std::fmt::Debug for BranchView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BranchView")
            .field("occupied", &self.inner.current.get().is_some())
            .field("mounted", &self.inner.mounted.get().is_some())
            .finish()
    }
}

/// Conditional rendering: the slot holds the `then` branch while the
/// condition is true, the `else` branch (or nothing) while it is false.
///
/// The source's immediate first invocation builds the initial branch, so the
/// slot is populated before this returns. Later deliveries destroy the old
/// branch and build the new one; an equality-suppressed source means an
/// unchanged condition never reaches the slot at all.
pub fn conditional(
    tree: Rc<Tree>,
    condition: &impl Source<bool>,
    then_builder: impl Fn(&Tree) -> NodeKey + 'static,
    else_builder: Option<ViewBuilder>,
) -> BranchView {
    let inner = BranchInner::new(tree);

    let weak = Rc::downgrade(&inner);
    let sub = condition.subscribe(move |value: &bool| {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let node = if *value {
            Some(then_builder(&inner.tree))
        } else {
            else_builder.as_ref().map(|build| build(&inner.tree))
        };
        inner.swap(node);
    });
    *inner.source_sub.borrow_mut() = Some(sub);

    BranchView { inner }
}

/// Async rendering: the slot follows a `Source<AsyncState<T, E>>` through
/// its pending, resolved and rejected arms.
///
/// A missing `pending` builder leaves the slot empty while in flight. A
/// missing `rejected` builder logs the error at warn level and empties the
/// slot.
pub fn async_boundary<T, E>(
    tree: Rc<Tree>,
    state: &impl Source<AsyncState<T, E>>,
    pending_builder: Option<ViewBuilder>,
    resolved_builder: impl Fn(&Tree, &T) -> NodeKey + 'static,
    rejected_builder: Option<Box<dyn Fn(&Tree, &E) -> NodeKey>>,
) -> BranchView
where
    T: Clone + PartialEq + 'static,
    E: Clone + PartialEq + Display + 'static,
{
    let inner = BranchInner::new(tree);

    let weak = Rc::downgrade(&inner);
    let sub = state.subscribe(move |state: &AsyncState<T, E>| {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let node = match state {
            AsyncState::Pending => pending_builder.as_ref().map(|build| build(&inner.tree)),
            AsyncState::Resolved(value) => Some(resolved_builder(&inner.tree, value)),
            AsyncState::Rejected(error) => match rejected_builder.as_ref() {
                Some(build) => Some(build(&inner.tree, error)),
                None => {
                    tracing::warn!(%error, "unhandled async rejection in boundary");
                    None
                }
            },
        };
        inner.swap(node);
    });
    *inner.source_sub.borrow_mut() = Some(sub);

    BranchView { inner }
}
