//! GPU resource bookkeeping and asset loading.
//!
//! Geometries, materials and textures are plain CPU-side values; the GPU copies
//! are created lazily by the renderer. What ties both sides together is a
//! [`ResourceHandle`] registered with a [`ResourceTracker`]. Calling
//! [`ResourceHandle::dispose`] queues the handle for release; the renderer
//! drains that queue before its next frame and frees the matching buffers and
//! textures. Dropping a handle without disposing it keeps it counted as live,
//! which is how leaks show up in [`ResourceInfo`].

use std::sync::{
    Arc, Weak,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use parking_lot::Mutex;

pub mod texture;

/// What a handle stands for on the GPU side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Geometry,
    Material,
    Texture,
}

impl ResourceKind {
    fn slot(self) -> usize {
        match self {
            ResourceKind::Geometry => 0,
            ResourceKind::Material => 1,
            ResourceKind::Texture => 2,
        }
    }
}

/// Snapshot of what is currently alive in the rendering backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResourceInfo {
    pub geometries: usize,
    pub programs: usize,
    pub textures: usize,
}

#[derive(Debug, Default)]
struct TrackerState {
    live: [usize; 3],
    released: [usize; 3],
    programs: usize,
    pending: Vec<(ResourceKind, u64)>,
}

#[derive(Debug, Default)]
struct TrackerInner {
    next_id: AtomicU64,
    state: Mutex<TrackerState>,
}

impl TrackerInner {
    fn record_release(&self, kind: ResourceKind, id: u64) {
        let mut state = self.state.lock();
        let slot = kind.slot();
        state.live[slot] = state.live[slot].saturating_sub(1);
        state.released[slot] += 1;
        state.pending.push((kind, id));
    }
}

/// Registry of every GPU-backed handle the viewer created.
///
/// Cloning is cheap and all clones share the same counters.
#[derive(Clone, Debug, Default)]
pub struct ResourceTracker {
    inner: Arc<TrackerInner>,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, kind: ResourceKind) -> ResourceHandle {
        // ids start at 1 so 0 can never collide with a real resource
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner.state.lock().live[kind.slot()] += 1;
        ResourceHandle {
            id,
            kind,
            disposed: AtomicBool::new(false),
            tracker: Arc::downgrade(&self.inner),
        }
    }

    /// Current geometry/program/texture counts.
    pub fn info(&self) -> ResourceInfo {
        let state = self.inner.state.lock();
        ResourceInfo {
            geometries: state.live[ResourceKind::Geometry.slot()],
            programs: state.programs,
            textures: state.live[ResourceKind::Texture.slot()],
        }
    }

    /// Number of handles of `kind` that were registered and not yet disposed.
    pub fn live(&self, kind: ResourceKind) -> usize {
        self.inner.state.lock().live[kind.slot()]
    }

    /// Total number of releases of `kind` over the tracker's lifetime.
    pub fn released(&self, kind: ResourceKind) -> usize {
        self.inner.state.lock().released[kind.slot()]
    }

    /// Called by the renderer whenever it compiles or drops pipelines.
    pub fn set_programs(&self, programs: usize) {
        self.inner.state.lock().programs = programs;
    }

    /// Takes every release recorded since the last call.
    pub fn drain_released(&self) -> Vec<(ResourceKind, u64)> {
        std::mem::take(&mut self.inner.state.lock().pending)
    }
}

/// Opaque handle to a GPU-side resource.
#[derive(Debug)]
pub struct ResourceHandle {
    id: u64,
    kind: ResourceKind,
    disposed: AtomicBool,
    tracker: Weak<TrackerInner>,
}

impl ResourceHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Releases the resource. Only the first call has an effect; the return
    /// value tells whether this call was it.
    pub fn dispose(&self) -> bool {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return false;
        }
        match self.tracker.upgrade() {
            Some(tracker) => tracker.record_release(self.kind, self.id),
            None => log::warn!(
                "{:?} {} disposed after its tracker was dropped",
                self.kind,
                self.id
            ),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_dispose_updates_counts() {
        let tracker = ResourceTracker::new();
        let geometry = tracker.register(ResourceKind::Geometry);
        let texture = tracker.register(ResourceKind::Texture);
        let _material = tracker.register(ResourceKind::Material);

        assert_eq!(
            tracker.info(),
            ResourceInfo {
                geometries: 1,
                programs: 0,
                textures: 1
            }
        );

        assert!(geometry.dispose());
        assert!(texture.dispose());
        assert_eq!(tracker.info(), ResourceInfo::default());
        assert_eq!(tracker.live(ResourceKind::Material), 1);
    }

    #[test]
    fn second_dispose_is_a_no_op() {
        let tracker = ResourceTracker::new();
        let handle = tracker.register(ResourceKind::Texture);

        assert!(handle.dispose());
        assert!(!handle.dispose());
        assert!(handle.is_disposed());
        assert_eq!(tracker.released(ResourceKind::Texture), 1);
        assert_eq!(tracker.drain_released(), vec![(ResourceKind::Texture, handle.id())]);
        assert!(tracker.drain_released().is_empty());
    }

    #[test]
    fn ids_are_unique_across_kinds() {
        let tracker = ResourceTracker::new();
        let a = tracker.register(ResourceKind::Geometry);
        let b = tracker.register(ResourceKind::Material);
        let c = tracker.register(ResourceKind::Texture);
        assert_ne!(a.id(), b.id());
        assert_ne!(b.id(), c.id());
        assert_ne!(a.id(), 0);
    }

    #[test]
    fn programs_come_from_the_renderer() {
        let tracker = ResourceTracker::new();
        tracker.set_programs(2);
        assert_eq!(tracker.info().programs, 2);
    }
}
