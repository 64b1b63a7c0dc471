//! Keyed-list reconciliation.
//!
//! A [`KeyedList`] keeps a run of lifecycle nodes in sync with a source
//! array. Items are tracked by key (from `key_fn`):
//!
//! - New keys: create a node (`make_node`) and connect it in position.
//! - Retained keys with an **equal** value: reuse the node unchanged -
//!   identity-sensitive state (focus, transient per-item state) survives.
//! - Retained keys with a **changed** value: replace - the old node is
//!   destroyed and a fresh one mounts. Replacement keeps the reconciler
//!   ignorant of per-item rendering logic at the cost of a remount.
//! - Removed keys: disconnect and destroy the node.
//! - Same keys in a new order: repositioned only, zero creation or
//!   destruction (idempotent connect moves without remounting).
//!
//! Surface mutations are deferred to the next frame tick. Repeated
//! `update()` calls before the frame fires fold into one pending
//! computation; only the most recent result is committed (last-write-wins
//! per frame). The commit re-verifies node state first - a node torn down
//! by an intervening parent teardown is skipped, never resurrected.
//!
//! Duplicate keys within one update are not an error: the first occurrence
//! claims the reused node, later occurrences are warned and given fresh
//! nodes. When matching against the previous generation, a later duplicate
//! silently shadows an earlier one - a documented consistency risk carried
//! from the source system.
//!
//! # Example
//!
//! ```ignore
//! use cinder_ui::{Cell, KeyedList, NodeSpec, Source};
//!
//! #[derive(Clone, PartialEq)]
//! struct Todo { id: u64, text: String }
//!
//! let todos = Cell::new(vec![Todo { id: 1, text: "first".into() }]);
//! let list = KeyedList::new(
//!     tree.clone(),
//!     |todo: &Todo, _index| todo.id,
//!     |tree, todo| tree.create_node(NodeSpec::leaf("todo-row")),
//! );
//! list.connect(parent_resource, None);
//! list.bind_source(&todos);   // initial update delivered immediately
//! todos.update(|t| t.push(Todo { id: 2, text: "second".into() }));
//! scheduler.run_frame();      // one batched commit
//! ```

use std::cell::{Cell as StdCell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::{Rc, Weak};

use crate::host::ResourceId;
use crate::reactive::{Source, Subscription};
use crate::tree::{NodeKey, Tree};

/// One rendered item: its key, the value it was rendered from, its index in
/// the current order, and its node.
#[derive(Clone)]
pub struct KeyedItem<V, K> {
    pub key: K,
    pub value: V,
    pub index: usize,
    pub node: NodeKey,
}

#[derive(Clone, Copy)]
struct MountPoint {
    parent: ResourceId,
    /// Anchor: the first item connects immediately after this resource.
    after: Option<ResourceId>,
}

struct PendingCommit<V, K> {
    next: Vec<KeyedItem<V, K>>,
    removed: Vec<NodeKey>,
}

struct KeyedInner<V, K> {
    tree: Rc<Tree>,
    key_fn: Box<dyn Fn(&V, usize) -> K>,
    make_node: Box<dyn Fn(&Tree, &V) -> NodeKey>,
    items: RefCell<Vec<KeyedItem<V, K>>>,
    pending: RefCell<Option<PendingCommit<V, K>>>,
    mounted: StdCell<Option<MountPoint>>,
    source_sub: RefCell<Option<Subscription>>,
    frame_scheduled: StdCell<bool>,
}

/// Keyed-list reconciler. Cloning shares the same reconciler state.
pub struct KeyedList<V, K> {
    inner: Rc<KeyedInner<V, K>>,
}

impl<V, K> Clone for KeyedList<V, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V, K> KeyedList<V, K>
where
    V: Clone + PartialEq + 'static,
    K: Clone + Eq + Hash + Debug + 'static,
{
    pub fn new(
        tree: Rc<Tree>,
        key_fn: impl Fn(&V, usize) -> K + 'static,
        make_node: impl Fn(&Tree, &V) -> NodeKey + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(KeyedInner {
                tree,
                key_fn: Box::new(key_fn),
                make_node: Box::new(make_node),
                items: RefCell::new(Vec::new()),
                pending: RefCell::new(None),
                mounted: StdCell::new(None),
                source_sub: RefCell::new(None),
                frame_scheduled: StdCell::new(false),
            }),
        }
    }

    /// Mount the list: items insert under `parent`, the first one
    /// immediately after `after`. Updates received before connecting are
    /// held pending and commit on the next frame.
    pub fn connect(&self, parent: ResourceId, after: Option<ResourceId>) {
        self.inner.mounted.set(Some(MountPoint { parent, after }));
        if self.inner.pending.borrow().is_some() {
            KeyedInner::schedule_commit(&self.inner);
        }
    }

    /// Unmount: destroys every item node (and any superseded pending
    /// nodes). The source binding, if any, stays - later updates rebuild
    /// items for the next connect.
    pub fn disconnect(&self) {
        KeyedInner::clear(&self.inner);
        self.inner.mounted.set(None);
    }

    /// Drive the list from a reactive source. The subscription's immediate
    /// first invocation delivers the initial update. Replaces any previous
    /// binding.
    pub fn bind_source(&self, source: &(impl Source<Vec<V>> + Clone + 'static)) {
        let weak = Rc::downgrade(&self.inner);
        let sub = source.subscribe(move |values: &Vec<V>| {
            if let Some(inner) = weak.upgrade() {
                KeyedInner::apply(&inner, values);
            }
        });
        if let Some(previous) = self.inner.source_sub.borrow_mut().replace(sub) {
            previous.cancel();
        }
    }

    /// Reconcile against a new source array. `None` is the cleared-payload
    /// arm: every item disconnects immediately and the list empties.
    pub fn update(&self, payload: Option<&[V]>) {
        match payload {
            Some(values) => KeyedInner::apply(&self.inner, values),
            None => KeyedInner::clear(&self.inner),
        }
    }

    /// Number of committed items (pending updates not included).
    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items.borrow().is_empty()
    }

    /// Committed keys, in order.
    pub fn keys(&self) -> Vec<K> {
        self.inner
            .items
            .borrow()
            .iter()
            .map(|item| item.key.clone())
            .collect()
    }

    /// Node of the committed item at `index`.
    pub fn node_at(&self, index: usize) -> Option<NodeKey> {
        self.inner.items.borrow().get(index).map(|item| item.node)
    }

    /// Node currently associated with `key`, committed items only.
    pub fn node_for(&self, key: &K) -> Option<NodeKey> {
        self.inner
            .items
            .borrow()
            .iter()
            .find(|item| item.key == *key)
            .map(|item| item.node)
    }
}

impl<V, K> KeyedInner<V, K>
where
    V: Clone + PartialEq + 'static,
    K: Clone + Eq + Hash + Debug + 'static,
{
    /// Diff `values` against the latest generation (pending if present,
    /// committed otherwise) and stage the result for the next frame.
    fn apply(inner: &Rc<Self>, values: &[V]) {
        let (baseline, mut removed) = match inner.pending.borrow_mut().take() {
            Some(pending) => (pending.next, pending.removed),
            None => (inner.items.borrow().clone(), Vec::new()),
        };

        // Later duplicates shadow earlier ones here: the earlier item's
        // node would leak, so it goes straight to the removed set.
        let mut by_key: HashMap<K, KeyedItem<V, K>> = HashMap::with_capacity(baseline.len());
        for item in baseline {
            if let Some(shadowed) = by_key.insert(item.key.clone(), item) {
                removed.push(shadowed.node);
            }
        }

        let mut seen: HashSet<K> = HashSet::with_capacity(values.len());
        let mut next: Vec<KeyedItem<V, K>> = Vec::with_capacity(values.len());

        for (index, value) in values.iter().enumerate() {
            let key = (inner.key_fn)(value, index);

            if !seen.insert(key.clone()) {
                tracing::warn!(
                    key = ?key,
                    "duplicate key in keyed list update; rendering a fresh node"
                );
                let node = (inner.make_node)(&inner.tree, value);
                next.push(KeyedItem {
                    key,
                    value: value.clone(),
                    index,
                    node,
                });
                continue;
            }

            let item = match by_key.remove(&key) {
                // Key retained, value unchanged: reuse the node.
                Some(previous) if previous.value == *value => KeyedItem {
                    key,
                    value: previous.value,
                    index,
                    node: previous.node,
                },
                // Key retained, value changed: replace the node.
                Some(previous) => {
                    removed.push(previous.node);
                    let node = (inner.make_node)(&inner.tree, value);
                    KeyedItem {
                        key,
                        value: value.clone(),
                        index,
                        node,
                    }
                }
                // New key.
                None => {
                    let node = (inner.make_node)(&inner.tree, value);
                    KeyedItem {
                        key,
                        value: value.clone(),
                        index,
                        node,
                    }
                }
            };
            next.push(item);
        }

        removed.extend(by_key.into_values().map(|item| item.node));
        *inner.pending.borrow_mut() = Some(PendingCommit { next, removed });
        Self::schedule_commit(inner);
    }

    fn schedule_commit(inner: &Rc<Self>) {
        if inner.frame_scheduled.get() {
            return;
        }
        inner.frame_scheduled.set(true);
        let weak: Weak<Self> = Rc::downgrade(inner);
        inner.tree.scheduler().schedule(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                Self::commit(&inner);
            }
        }));
    }

    /// Frame-tick commit: one surface mutation pass for everything staged
    /// since the last frame.
    fn commit(inner: &Rc<Self>) {
        inner.frame_scheduled.set(false);

        // Not mounted (yet, or torn down since scheduling): hold the
        // pending generation for the next connect, touch nothing.
        let Some(mount) = inner.mounted.get() else {
            return;
        };
        let Some(PendingCommit { next, removed }) = inner.pending.borrow_mut().take() else {
            return;
        };

        for node in removed {
            inner.tree.destroy(node);
        }

        let mut previous = mount.after;
        for item in &next {
            // Re-verify: a parent teardown may have destroyed the node
            // after this commit was staged.
            if !inner.tree.contains(item.node) {
                continue;
            }
            let _ = inner.tree.connect(item.node, mount.parent, previous);
            if let Some(resource) = inner.tree.resource(item.node) {
                previous = Some(resource);
            }
        }

        *inner.items.borrow_mut() = next;
    }

    /// Immediate teardown of every item (the cleared-payload arm and the
    /// disconnect path).
    fn clear(inner: &Rc<Self>) {
        let items = std::mem::take(&mut *inner.items.borrow_mut());
        let pending = inner.pending.borrow_mut().take();

        let mut doomed: HashSet<NodeKey> = items.iter().map(|item| item.node).collect();
        if let Some(PendingCommit { next, removed }) = pending {
            doomed.extend(next.iter().map(|item| item.node));
            doomed.extend(removed);
        }
        for node in doomed {
            inner.tree.destroy(node);
        }
    }
}

impl<V, K> std::fmt::Debug for KeyedList<V, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedList")
            .field("items", &self.inner.items.borrow().len())
            .field("pending", &self.inner.pending.borrow().is_some())
            .finish_non_exhaustive()
    }
}
