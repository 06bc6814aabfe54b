//! Call-tree model: hierarchical time-weighted call graph for one thread.
//!
//! Nodes live in a per-thread arena (`Vec<CallTreeNode>`) and are addressed by
//! [`NodeId`]. Each node owns its children through the arena indices stored in
//! its `children` map; the `parent` link is a plain index used only to walk
//! back up a path and never participates in ownership.
//!
//! The same method reached along two different paths yields two distinct
//! nodes, since siblings are keyed by signature under their own parent.

use std::collections::HashMap;
use std::time::Duration;

use super::{AggregateNode, ThreadAggregate};
use crate::domain::MethodSignature;

/// Index of a node within its thread's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq)]
pub struct CallTreeNode {
    signature: MethodSignature,
    parent: Option<NodeId>,
    depth: usize,
    children: HashMap<MethodSignature, NodeId>,
    total_time: Duration,
    self_time: Duration,
    invocation_count: u64,
}

impl CallTreeNode {
    fn new(signature: MethodSignature, parent: Option<NodeId>, depth: usize) -> Self {
        Self {
            signature,
            parent,
            depth,
            children: HashMap::new(),
            total_time: Duration::ZERO,
            self_time: Duration::ZERO,
            invocation_count: 0,
        }
    }

    /// Time sampled while this frame was the innermost profiled frame.
    #[must_use]
    pub fn self_time(&self) -> Duration {
        self.self_time
    }

    /// Parent node, or `None` for frames directly under the thread root.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Distance from the thread root (root-level frames have depth 0).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub(crate) fn add_total_time(&mut self, elapsed: Duration) {
        self.total_time += elapsed;
    }

    pub(crate) fn add_self_time(&mut self, elapsed: Duration) {
        self.self_time += elapsed;
    }

    pub(crate) fn increment_invocation(&mut self) {
        self.invocation_count += 1;
    }
}

impl AggregateNode for CallTreeNode {
    fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    fn total_time(&self) -> Duration {
        self.total_time
    }

    fn invocation_count(&self) -> u64 {
        self.invocation_count
    }
}

/// Root of one thread's call tree.
#[derive(Debug, Clone, PartialEq)]
pub struct CallTreeThread {
    name: String,
    total_time: Duration,
    nodes: Vec<CallTreeNode>,
    roots: HashMap<MethodSignature, NodeId>,
}

impl CallTreeThread {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), total_time: Duration::ZERO, nodes: Vec::new(), roots: HashMap::new() }
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&CallTreeNode> {
        self.nodes.get(id.0)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut CallTreeNode> {
        self.nodes.get_mut(id.0)
    }

    /// Child of `parent` (or of the thread root when `parent` is `None`).
    #[must_use]
    pub fn child_id(&self, parent: Option<NodeId>, signature: &str) -> Option<NodeId> {
        match parent {
            None => self.roots.get(signature).copied(),
            Some(id) => self.node(id)?.children.get(signature).copied(),
        }
    }

    /// Look up the child of `parent`, creating an empty node on first sight.
    pub(crate) fn child_or_insert(
        &mut self,
        parent: Option<NodeId>,
        signature: &MethodSignature,
    ) -> NodeId {
        if let Some(id) = self.child_id(parent, signature.as_str()) {
            return id;
        }

        let depth = parent.and_then(|p| self.node(p)).map_or(0, |p| p.depth + 1);
        let id = NodeId(self.nodes.len());
        self.nodes.push(CallTreeNode::new(signature.clone(), parent, depth));

        match parent.and_then(|p| self.nodes.get_mut(p.0)) {
            Some(parent_node) => {
                parent_node.children.insert(signature.clone(), id);
            }
            None => {
                self.roots.insert(signature.clone(), id);
            }
        }
        id
    }

    pub(crate) fn add_total_time(&mut self, elapsed: Duration) {
        self.total_time += elapsed;
    }

    /// Root-level nodes, most expensive first.
    #[must_use]
    pub fn root_ids(&self) -> Vec<NodeId> {
        self.sorted(self.roots.values().copied())
    }

    /// Children of `id`, most expensive first.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match self.node(id) {
            Some(node) => self.sorted(node.children.values().copied()),
            None => Vec::new(),
        }
    }

    fn sorted(&self, ids: impl Iterator<Item = NodeId>) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = ids.collect();
        ids.sort_unstable_by(|a, b| {
            let (a, b) = (&self.nodes[a.0], &self.nodes[b.0]);
            b.total_time.cmp(&a.total_time).then_with(|| a.signature.cmp(&b.signature))
        });
        ids
    }

    /// Follow `path` (signatures from the root down) to a node.
    #[must_use]
    pub fn find(&self, path: &[&str]) -> Option<&CallTreeNode> {
        let mut cursor = None;
        for signature in path {
            cursor = Some(self.child_id(cursor, signature)?);
        }
        cursor.and_then(|id| self.node(id))
    }

    /// Signatures from the root down to `id`, recovered through parent links.
    #[must_use]
    pub fn path_of(&self, id: NodeId) -> Vec<&MethodSignature> {
        let mut path = Vec::new();
        let mut cursor = self.node(id);
        while let Some(node) = cursor {
            path.push(&node.signature);
            cursor = node.parent.and_then(|p| self.node(p));
        }
        path.reverse();
        path
    }

    /// Number of nodes in the whole tree.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl ThreadAggregate for CallTreeThread {
    type Node = CallTreeNode;

    fn name(&self) -> &str {
        &self.name
    }

    fn total_time(&self) -> Duration {
        self.total_time
    }

    fn child(&self, signature: &str) -> Option<&CallTreeNode> {
        self.child_id(None, signature).and_then(|id| self.node(id))
    }

    fn child_count(&self) -> usize {
        self.roots.len()
    }
}
