//! Test host: records surface mutations and tracks child order.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use super::{HostSurface, ResourceId};

/// One recorded surface mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HostOp {
    Create(ResourceId, String),
    Insert {
        parent: ResourceId,
        resource: ResourceId,
        after: Option<ResourceId>,
    },
    Remove(ResourceId),
}

/// In-memory host surface. Maintains real child ordering so tests can assert
/// the final layout, and a flat op log so tests can assert batching.
#[derive(Default)]
pub(crate) struct RecordingHost {
    next_id: Cell<u64>,
    ops: RefCell<Vec<HostOp>>,
    children: RefCell<HashMap<ResourceId, Vec<ResourceId>>>,
    attached: RefCell<HashMap<ResourceId, ResourceId>>,
}

impl RecordingHost {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// A root resource tests can mount into. Not part of the op log.
    pub(crate) fn root(&self) -> ResourceId {
        ResourceId(0)
    }

    pub(crate) fn ops(&self) -> Vec<HostOp> {
        self.ops.borrow().clone()
    }

    pub(crate) fn clear_ops(&self) {
        self.ops.borrow_mut().clear();
    }

    /// Current child order under `parent`.
    pub(crate) fn children_of(&self, parent: ResourceId) -> Vec<ResourceId> {
        self.children
            .borrow()
            .get(&parent)
            .cloned()
            .unwrap_or_default()
    }

    fn detach(&self, resource: ResourceId) {
        if let Some(parent) = self.attached.borrow_mut().remove(&resource) {
            if let Some(siblings) = self.children.borrow_mut().get_mut(&parent) {
                siblings.retain(|r| *r != resource);
            }
        }
    }
}

impl HostSurface for RecordingHost {
    fn create(&self, tag: &str) -> ResourceId {
        let id = ResourceId(self.next_id.get() + 1);
        self.next_id.set(id.0);
        self.ops.borrow_mut().push(HostOp::Create(id, tag.to_string()));
        id
    }

    fn insert(&self, parent: ResourceId, resource: ResourceId, after: Option<ResourceId>) {
        self.detach(resource);
        {
            let mut children = self.children.borrow_mut();
            let siblings = children.entry(parent).or_default();
            let position = match after {
                Some(prev) => siblings.iter().position(|r| *r == prev).map(|i| i + 1),
                None => Some(0),
            };
            match position {
                Some(i) => siblings.insert(i, resource),
                None => siblings.push(resource),
            }
        }
        self.attached.borrow_mut().insert(resource, parent);
        self.ops.borrow_mut().push(HostOp::Insert {
            parent,
            resource,
            after,
        });
    }

    fn remove(&self, resource: ResourceId) {
        self.detach(resource);
        self.ops.borrow_mut().push(HostOp::Remove(resource));
    }
}
