//! Host surface capability - consumed, never implemented here.
//!
//! The node tree and the keyed-list reconciler mutate a rendering surface
//! they know nothing about: a host that can create opaque resources, insert
//! them under a parent (optionally after a sibling), and remove them again.
//! Batched mutations are deferred through a [`FrameScheduler`], the host's
//! frame-callback facility.
//!
//! Embedders implement both traits for their surface (a DOM, a terminal
//! buffer, a scene graph). The test fixtures in this crate implement them
//! over plain vectors.

use std::cell::RefCell;
use std::rc::Rc;

// =============================================================================
// Resource Handles
// =============================================================================

/// Opaque handle to a host-owned resource.
///
/// The meaning of the value is private to the host; this crate only stores
/// and passes these back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(pub u64);

// =============================================================================
// Capability Traits
// =============================================================================

/// Create/insert/remove capability over the rendering surface.
pub trait HostSurface {
    /// Create a resource for a node with the given tag.
    fn create(&self, tag: &str) -> ResourceId;

    /// Insert `resource` under `parent`, positioned immediately after
    /// `after` (or first when `after` is `None`). Inserting a resource that
    /// is already attached repositions it.
    fn insert(&self, parent: ResourceId, resource: ResourceId, after: Option<ResourceId>);

    /// Remove `resource` from the surface.
    fn remove(&self, resource: ResourceId);
}

/// Frame-callback scheduler: runs a callback on the host's next frame tick.
pub trait FrameScheduler {
    fn schedule(&self, callback: Box<dyn FnOnce()>);
}

/// A scheduler that runs callbacks synchronously, for hosts without a frame
/// loop. Reconciler commits lose their batching but stay correct.
pub struct ImmediateScheduler;

impl FrameScheduler for ImmediateScheduler {
    fn schedule(&self, callback: Box<dyn FnOnce()>) {
        callback();
    }
}

/// A scheduler that queues callbacks until [`ManualScheduler::run_frame`] is
/// called. This is the shape of a real frame loop: everything scheduled
/// before the tick runs in one pass, in order.
#[derive(Default)]
pub struct ManualScheduler {
    queue: RefCell<Vec<Box<dyn FnOnce()>>>,
}

impl ManualScheduler {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Number of callbacks waiting for the next frame.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Run one frame: drains every callback scheduled so far. Callbacks
    /// scheduled *during* the frame wait for the next one.
    pub fn run_frame(&self) {
        let drained: Vec<_> = self.queue.borrow_mut().drain(..).collect();
        for callback in drained {
            callback();
        }
    }
}

impl FrameScheduler for ManualScheduler {
    fn schedule(&self, callback: Box<dyn FnOnce()>) {
        self.queue.borrow_mut().push(callback);
    }
}

#[cfg(test)]
pub(crate) mod fixture;

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn manual_scheduler_batches_until_frame() {
        let scheduler = ManualScheduler::new();
        let ran = Rc::new(Cell::new(0));

        let ran_a = ran.clone();
        scheduler.schedule(Box::new(move || ran_a.set(ran_a.get() + 1)));
        let ran_b = ran.clone();
        scheduler.schedule(Box::new(move || ran_b.set(ran_b.get() + 1)));

        assert_eq!(ran.get(), 0, "nothing runs before the frame");
        assert_eq!(scheduler.pending(), 2);

        scheduler.run_frame();
        assert_eq!(ran.get(), 2);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn callbacks_scheduled_during_frame_wait_for_next() {
        let scheduler = ManualScheduler::new();
        let ran = Rc::new(Cell::new(0));

        let inner_ran = ran.clone();
        let sched = scheduler.clone();
        scheduler.schedule(Box::new(move || {
            let inner = inner_ran.clone();
            sched.schedule(Box::new(move || inner.set(inner.get() + 1)));
        }));

        scheduler.run_frame();
        assert_eq!(ran.get(), 0, "nested schedule targets the next frame");

        scheduler.run_frame();
        assert_eq!(ran.get(), 1);
    }

    #[test]
    fn immediate_scheduler_runs_inline() {
        let ran = Rc::new(Cell::new(false));
        let ran_cb = ran.clone();
        ImmediateScheduler.schedule(Box::new(move || ran_cb.set(true)));
        assert!(ran.get());
    }
}
