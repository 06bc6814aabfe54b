//! Aggregation models built from stack samples
//!
//! Two independent views are accumulated from the same samples:
//! - [`hotspot`]: flat per-method totals (`HotSpotThread` → `MethodNode`)
//! - [`call_tree`]: per-path totals (`CallTreeThread` → `CallTreeNode`)
//!
//! They share only the lookup contract below, not a node hierarchy.

pub mod call_tree;
pub mod hotspot;
pub mod model;

use std::time::Duration;

use crate::domain::MethodSignature;

pub use call_tree::{CallTreeNode, CallTreeThread, NodeId};
pub use hotspot::{HotSpotThread, MethodHotspot, MethodNode};
pub use model::{CpuModel, CpuSnapshot};

/// Common read access to a hot-spot or call-tree node.
pub trait AggregateNode {
    fn signature(&self) -> &MethodSignature;

    /// Time sampled while this node was on the stack.
    fn total_time(&self) -> Duration;

    /// Number of distinct invocations observed (not samples).
    fn invocation_count(&self) -> u64;
}

/// A named per-thread root mapping method signatures to nodes.
pub trait ThreadAggregate {
    type Node: AggregateNode;

    fn name(&self) -> &str;

    /// One sampling period per tick in which the thread had a profiled frame.
    fn total_time(&self) -> Duration;

    /// Root-level node for `signature`.
    fn child(&self, signature: &str) -> Option<&Self::Node>;

    fn child_count(&self) -> usize;

    fn has_children(&self) -> bool {
        self.child_count() > 0
    }
}
