//! Lifecycle node tree.
//!
//! Nodes are mountable units with an idempotent connect/disconnect state
//! machine:
//!
//! ```text
//! Unmounted --connect()--> Mounted --disconnect()--> Unmounted
//! ```
//!
//! - Connecting an unmounted node runs its `before_connect` hook, creates
//!   and inserts its host resource, connects its registered children, then
//!   runs `connected`.
//! - Connecting an already-mounted node only repositions the resource - no
//!   hook replay. This is what lets the keyed-list reconciler reorder
//!   without remounting.
//! - Disconnecting runs `before_disconnect`, tears children down first,
//!   removes the resource, cancels every subscription the node owns, runs
//!   `disconnected`. Disconnecting an unmounted node is a no-op.
//!
//! Nodes live in an arena owned by an explicit [`Tree`] context; handles are
//! generational [`NodeKey`]s, so a stale handle is detected rather than
//! resolving to a recycled node. A node's parent link is lookup-only (used
//! to find insertion points and detect cycles), never an ownership edge -
//! ownership always flows parent-to-child through `children`, and teardown
//! child-to-parent.
//!
//! # Example
//!
//! ```ignore
//! use cinder_ui::tree::{NodeSpec, Tree};
//!
//! let tree = Tree::new(host, scheduler);
//! let panel = tree.create_node(NodeSpec::new("panel"));
//! let label = tree.create_node(NodeSpec::leaf("label").on_connected(|tree, key| {
//!     // post-insertion hook, e.g. capture a reference to the resource
//! }));
//! tree.add_child(panel, label)?;
//! tree.connect(panel, root_resource, None)?;
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use bitflags::bitflags;
use slotmap::{SlotMap, new_key_type};

use crate::error::Error;
use crate::host::{FrameScheduler, HostSurface, ResourceId};
use crate::reactive::Subscription;

new_key_type! {
    /// Generational handle to a node in a [`Tree`] arena.
    pub struct NodeKey;
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct NodeFlags: u8 {
        /// Node is mounted on the host surface.
        const CONNECTED = 1 << 0;
        /// Node refuses children (`set_children`/`add_child` warn + no-op).
        const LEAF = 1 << 1;
    }
}

// =============================================================================
// Node Spec and Hooks
// =============================================================================

type HookFn = Box<dyn FnMut(&Tree, NodeKey)>;

#[derive(Default)]
struct NodeHooks {
    before_connect: Option<HookFn>,
    connected: Option<HookFn>,
    before_disconnect: Option<HookFn>,
    disconnected: Option<HookFn>,
}

#[derive(Clone, Copy)]
enum HookSlot {
    BeforeConnect,
    Connected,
    BeforeDisconnect,
    Disconnected,
}

impl NodeHooks {
    fn take(&mut self, slot: HookSlot) -> Option<HookFn> {
        match slot {
            HookSlot::BeforeConnect => self.before_connect.take(),
            HookSlot::Connected => self.connected.take(),
            HookSlot::BeforeDisconnect => self.before_disconnect.take(),
            HookSlot::Disconnected => self.disconnected.take(),
        }
    }

    fn put_back(&mut self, slot: HookSlot, hook: HookFn) {
        let target = match slot {
            HookSlot::BeforeConnect => &mut self.before_connect,
            HookSlot::Connected => &mut self.connected,
            HookSlot::BeforeDisconnect => &mut self.before_disconnect,
            HookSlot::Disconnected => &mut self.disconnected,
        };
        *target = Some(hook);
    }
}

/// Blueprint for a node: resource tag plus lifecycle hooks. Hooks may run
/// multiple times - once per mount cycle.
pub struct NodeSpec {
    tag: String,
    leaf: bool,
    hooks: NodeHooks,
}

impl NodeSpec {
    /// A container node with the given resource tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            leaf: false,
            hooks: NodeHooks::default(),
        }
    }

    /// A leaf node: attempts to give it children are warned and ignored.
    pub fn leaf(tag: impl Into<String>) -> Self {
        Self {
            leaf: true,
            ..Self::new(tag)
        }
    }

    /// Runs before the resource exists, on every mount. Build or acquire
    /// child nodes and resources here.
    pub fn on_before_connect(mut self, hook: impl FnMut(&Tree, NodeKey) + 'static) -> Self {
        self.hooks.before_connect = Some(Box::new(hook));
        self
    }

    /// Runs after the resource is inserted and children are connected.
    pub fn on_connected(mut self, hook: impl FnMut(&Tree, NodeKey) + 'static) -> Self {
        self.hooks.connected = Some(Box::new(hook));
        self
    }

    /// Runs first on disconnect, while everything is still mounted.
    pub fn on_before_disconnect(mut self, hook: impl FnMut(&Tree, NodeKey) + 'static) -> Self {
        self.hooks.before_disconnect = Some(Box::new(hook));
        self
    }

    /// Runs last on disconnect, after the resource is removed and owned
    /// subscriptions are cancelled.
    pub fn on_disconnected(mut self, hook: impl FnMut(&Tree, NodeKey) + 'static) -> Self {
        self.hooks.disconnected = Some(Box::new(hook));
        self
    }
}

struct NodeData {
    tag: String,
    flags: NodeFlags,
    /// Host resource; `Some` only while mounted (created lazily on connect).
    resource: Option<ResourceId>,
    /// Lookup-only back-reference; never an ownership edge.
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
    /// Subscriptions acquired while mounted; cancelled on disconnect.
    subscriptions: Vec<Subscription>,
    hooks: NodeHooks,
}

// =============================================================================
// Tree
// =============================================================================

/// Explicit context owning the node arena and the host capabilities. All
/// node operations go through the tree; nothing is ambient.
pub struct Tree {
    host: Rc<dyn HostSurface>,
    scheduler: Rc<dyn FrameScheduler>,
    nodes: RefCell<SlotMap<NodeKey, NodeData>>,
}

impl Tree {
    pub fn new(host: Rc<dyn HostSurface>, scheduler: Rc<dyn FrameScheduler>) -> Rc<Self> {
        Rc::new(Self {
            host,
            scheduler,
            nodes: RefCell::new(SlotMap::with_key()),
        })
    }

    pub fn host(&self) -> &Rc<dyn HostSurface> {
        &self.host
    }

    pub fn scheduler(&self) -> &Rc<dyn FrameScheduler> {
        &self.scheduler
    }

    /// Allocate a node from its spec. The node starts unmounted; its host
    /// resource is created lazily on first connect.
    pub fn create_node(&self, spec: NodeSpec) -> NodeKey {
        let mut flags = NodeFlags::empty();
        if spec.leaf {
            flags |= NodeFlags::LEAF;
        }
        self.nodes.borrow_mut().insert(NodeData {
            tag: spec.tag,
            flags,
            resource: None,
            parent: None,
            children: Vec::new(),
            subscriptions: Vec::new(),
            hooks: spec.hooks,
        })
    }

    /// Whether `key` still refers to a live node.
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.borrow().contains_key(key)
    }

    pub fn is_connected(&self, key: NodeKey) -> bool {
        self.nodes
            .borrow()
            .get(key)
            .is_some_and(|node| node.flags.contains(NodeFlags::CONNECTED))
    }

    /// The node's host resource, present only while mounted.
    pub fn resource(&self, key: NodeKey) -> Option<ResourceId> {
        self.nodes.borrow().get(key).and_then(|node| node.resource)
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes.borrow().get(key).and_then(|node| node.parent)
    }

    pub fn children(&self, key: NodeKey) -> Vec<NodeKey> {
        self.nodes
            .borrow()
            .get(key)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    /// Number of live nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    // =========================================================================
    // Children
    // =========================================================================

    /// Register `child` under `parent`. Relocates the child if it already
    /// had a parent. On a leaf parent this warns and is ignored; a cycle is
    /// a genuine lifecycle misuse and fails.
    ///
    /// Registration alone does not mount: children connect when the parent
    /// connects, or explicitly.
    pub fn add_child(&self, parent: NodeKey, child: NodeKey) -> Result<(), Error> {
        {
            let nodes = self.nodes.borrow();
            let parent_node = nodes.get(parent).ok_or(Error::StaleNode)?;
            nodes.get(child).ok_or(Error::StaleNode)?;

            if parent_node.flags.contains(NodeFlags::LEAF) {
                tracing::warn!(tag = %parent_node.tag, "ignoring child on a leaf node");
                return Ok(());
            }

            // Walk the parent chain: `child` must not be an ancestor.
            let mut cursor = Some(parent);
            while let Some(current) = cursor {
                if current == child {
                    return Err(Error::NodeCycle);
                }
                cursor = nodes.get(current).and_then(|node| node.parent);
            }
        }

        let mut nodes = self.nodes.borrow_mut();
        if let Some(old_parent) = nodes[child].parent {
            if let Some(old) = nodes.get_mut(old_parent) {
                old.children.retain(|c| *c != child);
            }
        }
        nodes[child].parent = Some(parent);
        let parent_node = &mut nodes[parent];
        if !parent_node.children.contains(&child) {
            parent_node.children.push(child);
        }
        Ok(())
    }

    /// Replace `parent`'s registered children. Warned and ignored on a leaf
    /// node; previous children are detached but not destroyed.
    pub fn set_children(&self, parent: NodeKey, children: Vec<NodeKey>) -> Result<(), Error> {
        {
            let nodes = self.nodes.borrow();
            let parent_node = nodes.get(parent).ok_or(Error::StaleNode)?;
            if parent_node.flags.contains(NodeFlags::LEAF) {
                tracing::warn!(tag = %parent_node.tag, "ignoring set_children on a leaf node");
                return Ok(());
            }
        }

        let old = {
            let mut nodes = self.nodes.borrow_mut();
            std::mem::take(&mut nodes[parent].children)
        };
        {
            let mut nodes = self.nodes.borrow_mut();
            for child in old {
                if let Some(node) = nodes.get_mut(child) {
                    node.parent = None;
                }
            }
        }
        for child in children {
            self.add_child(parent, child)?;
        }
        Ok(())
    }

    /// Hand a subscription to the node; it is cancelled as part of the
    /// node's disconnect step. A stale key cancels immediately.
    pub fn own_subscription(&self, key: NodeKey, subscription: Subscription) {
        let mut nodes = self.nodes.borrow_mut();
        if let Some(node) = nodes.get_mut(key) {
            node.subscriptions.push(subscription);
        } else {
            drop(nodes);
            tracing::warn!("subscription handed to a stale node; cancelled immediately");
            subscription.cancel();
        }
    }

    // =========================================================================
    // Connect / Disconnect / Destroy
    // =========================================================================

    /// Mount `key` under `parent` on the host surface, positioned after
    /// `after` (or first). Already-mounted nodes are only repositioned -
    /// hooks do not replay.
    pub fn connect(
        &self,
        key: NodeKey,
        parent: ResourceId,
        after: Option<ResourceId>,
    ) -> Result<(), Error> {
        let (mounted, existing) = {
            let nodes = self.nodes.borrow();
            let node = nodes.get(key).ok_or(Error::StaleNode)?;
            (node.flags.contains(NodeFlags::CONNECTED), node.resource)
        };

        if mounted {
            // Reposition without remount.
            if let Some(resource) = existing {
                self.host.insert(parent, resource, after);
            }
            return Ok(());
        }

        self.run_hook(key, HookSlot::BeforeConnect);
        if !self.contains(key) {
            // The hook destroyed the node; nothing to mount.
            return Ok(());
        }

        let tag = self.nodes.borrow()[key].tag.clone();
        let resource = self.host.create(&tag);
        {
            let mut nodes = self.nodes.borrow_mut();
            let node = &mut nodes[key];
            node.resource = Some(resource);
            node.flags.insert(NodeFlags::CONNECTED);
        }
        self.host.insert(parent, resource, after);

        // Children mount in registration order, each after the previous.
        let children = self.children(key);
        let mut previous: Option<ResourceId> = None;
        for child in children {
            self.connect(child, resource, previous)?;
            if let Some(child_resource) = self.resource(child) {
                previous = Some(child_resource);
            }
        }

        self.run_hook(key, HookSlot::Connected);
        Ok(())
    }

    /// Unmount `key`: hooks, children first, resource removal, subscription
    /// release. No-op when already unmounted or stale.
    pub fn disconnect(&self, key: NodeKey) {
        let mounted = {
            let mut nodes = self.nodes.borrow_mut();
            match nodes.get_mut(key) {
                Some(node) if node.flags.contains(NodeFlags::CONNECTED) => {
                    // Clear the flag up front so reentrant disconnects no-op.
                    node.flags.remove(NodeFlags::CONNECTED);
                    true
                }
                _ => false,
            }
        };
        if !mounted {
            return;
        }

        self.run_hook(key, HookSlot::BeforeDisconnect);

        for child in self.children(key) {
            self.disconnect(child);
        }

        let (resource, subscriptions) = {
            let mut nodes = self.nodes.borrow_mut();
            match nodes.get_mut(key) {
                Some(node) => (
                    node.resource.take(),
                    std::mem::take(&mut node.subscriptions),
                ),
                None => (None, Vec::new()),
            }
        };
        if let Some(resource) = resource {
            self.host.remove(resource);
        }
        for subscription in subscriptions {
            subscription.cancel();
        }

        self.run_hook(key, HookSlot::Disconnected);
    }

    /// Disconnect `key` and free its whole subtree from the arena. Safe on
    /// stale keys.
    pub fn destroy(&self, key: NodeKey) {
        if !self.contains(key) {
            return;
        }
        self.disconnect(key);

        // Detach from the parent's child list before freeing.
        let parent = self.parent(key);
        if let Some(parent) = parent {
            if let Some(node) = self.nodes.borrow_mut().get_mut(parent) {
                node.children.retain(|c| *c != key);
            }
        }
        self.free_subtree(key);
    }

    fn free_subtree(&self, key: NodeKey) {
        for child in self.children(key) {
            self.free_subtree(child);
        }
        self.nodes.borrow_mut().remove(key);
    }

    fn run_hook(&self, key: NodeKey, slot: HookSlot) {
        let hook = {
            let mut nodes = self.nodes.borrow_mut();
            nodes.get_mut(key).and_then(|node| node.hooks.take(slot))
        };
        if let Some(mut hook) = hook {
            hook(self, key);
            let mut nodes = self.nodes.borrow_mut();
            if let Some(node) = nodes.get_mut(key) {
                node.hooks.put_back(slot, hook);
            }
        }
    }
}

impl std::fmt::Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("nodes", &self.nodes.borrow().len())
            .finish_non_exhaustive()
    }
}
