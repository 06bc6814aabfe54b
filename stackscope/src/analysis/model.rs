//! Working CPU model and the immutable snapshots published from it.
//!
//! The sampler mutates a [`CpuModel`] it owns exclusively. After every tick it
//! builds a fresh [`CpuSnapshot`] containing only threads that produced at
//! least one profiled frame; readers receive that snapshot behind an `Arc` and
//! never see the working model.

use std::collections::{BTreeMap, HashMap};

use super::{CallTreeThread, HotSpotThread, ThreadAggregate};

/// Per-thread roots being accumulated by the sampler.
#[derive(Debug, Default)]
pub struct CpuModel {
    hot_spots: HashMap<String, HotSpotThread>,
    call_trees: HashMap<String, CallTreeThread>,
}

impl CpuModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Both roots of `thread_name`, created empty on first sight.
    pub(crate) fn thread_roots(
        &mut self,
        thread_name: &str,
    ) -> (&mut HotSpotThread, &mut CallTreeThread) {
        let hot_spot = self
            .hot_spots
            .entry(thread_name.to_owned())
            .or_insert_with(|| HotSpotThread::new(thread_name));
        let call_tree = self
            .call_trees
            .entry(thread_name.to_owned())
            .or_insert_with(|| CallTreeThread::new(thread_name));
        (hot_spot, call_tree)
    }

    pub fn clear(&mut self) {
        self.hot_spots.clear();
        self.call_trees.clear();
    }

    /// Copy every non-empty root into a new snapshot.
    #[must_use]
    pub fn snapshot(&self, version: u64) -> CpuSnapshot {
        CpuSnapshot {
            version,
            hot_spots: published(&self.hot_spots),
            call_trees: published(&self.call_trees),
        }
    }
}

fn published<T: ThreadAggregate + Clone>(roots: &HashMap<String, T>) -> BTreeMap<String, T> {
    roots
        .iter()
        .filter(|(_, root)| root.has_children())
        .map(|(name, root)| (name.clone(), root.clone()))
        .collect()
}

/// An immutable, versioned view of the CPU model after one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuSnapshot {
    version: u64,
    hot_spots: BTreeMap<String, HotSpotThread>,
    call_trees: BTreeMap<String, CallTreeThread>,
}

impl CpuSnapshot {
    /// Tick counter of the sampler that produced this snapshot (0 = empty model).
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn hot_spot_thread(&self, thread_name: &str) -> Option<&HotSpotThread> {
        self.hot_spots.get(thread_name)
    }

    #[must_use]
    pub fn call_tree_thread(&self, thread_name: &str) -> Option<&CallTreeThread> {
        self.call_trees.get(thread_name)
    }

    /// Hot-spot roots ordered by thread name.
    pub fn hot_spot_threads(&self) -> impl Iterator<Item = &HotSpotThread> {
        self.hot_spots.values()
    }

    /// Call-tree roots ordered by thread name.
    pub fn call_tree_threads(&self) -> impl Iterator<Item = &CallTreeThread> {
        self.call_trees.values()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hot_spots.is_empty() && self.call_trees.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MethodSignature;
    use std::time::Duration;

    #[test]
    fn test_snapshot_skips_empty_roots() {
        let mut model = CpuModel::new();
        model.thread_roots("idle");
        let (hot_spot, call_tree) = model.thread_roots("busy");
        let sig = MethodSignature::new("com.foo.A", "run");
        hot_spot.method_or_insert(&sig).add_time(Duration::from_millis(5));
        call_tree.child_or_insert(None, &sig);

        let snapshot = model.snapshot(1);
        assert_eq!(snapshot.version(), 1);
        assert!(snapshot.hot_spot_thread("busy").is_some());
        assert!(snapshot.call_tree_thread("busy").is_some());
        assert!(snapshot.hot_spot_thread("idle").is_none());
        assert!(snapshot.call_tree_thread("idle").is_none());
    }

    #[test]
    fn test_snapshot_is_detached_from_model() {
        let mut model = CpuModel::new();
        let sig = MethodSignature::new("com.foo.A", "run");
        model.thread_roots("main").0.method_or_insert(&sig);
        let before = model.snapshot(1);

        model.thread_roots("main").0.method_or_insert(&sig).add_time(Duration::from_millis(5));
        model.clear();

        assert_eq!(before.hot_spot_threads().count(), 1);
        assert!(model.snapshot(2).is_empty());
    }
}
