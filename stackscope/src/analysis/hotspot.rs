//! Hot-spot model: flat per-method aggregates for one thread.
//!
//! Every method seen anywhere on a sampled stack gets one [`MethodNode`] under
//! the thread's [`HotSpotThread`], regardless of who called it. This answers
//! "which of my methods was on the stack the longest?" while the call tree
//! answers "along which path?".
//!
//! # Performance
//!
//! - Lookup/insert per frame: O(1) amortized (HashMap keyed by signature)
//! - `ranked()`: O(n log n) where n = distinct methods of the thread

use std::collections::HashMap;
use std::time::Duration;

use super::{AggregateNode, ThreadAggregate};
use crate::domain::MethodSignature;

/// Cumulative time and invocation count for one method of one thread.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodNode {
    signature: MethodSignature,
    thread_name: String,
    total_time: Duration,
    invocation_count: u64,
}

impl MethodNode {
    #[must_use]
    pub fn new(signature: MethodSignature, thread_name: impl Into<String>) -> Self {
        Self { signature, thread_name: thread_name.into(), total_time: Duration::ZERO, invocation_count: 0 }
    }

    /// Name of the thread whose hot-spot table owns this node.
    #[must_use]
    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    pub(crate) fn add_time(&mut self, elapsed: Duration) {
        self.total_time += elapsed;
    }

    pub(crate) fn increment_invocation(&mut self) {
        self.invocation_count += 1;
    }
}

impl AggregateNode for MethodNode {
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

/// A ranked hot-spot entry, ready for display.
///
/// ```text
/// HOT SPOTS  main  (1.50s)
/// ─────────────────────────────────────────────
///   com.example.Codec.encode()     62.0%   930ms  x12
///   com.example.Server.handle()    38.0%   570ms  x3
/// ```
#[derive(Debug, Clone)]
pub struct MethodHotspot {
    pub signature: MethodSignature,
    pub total_time: Duration,
    pub invocation_count: u64,
    /// Share of the thread's total sampled time (0.0 - 100.0)
    pub percentage: f64,
}

/// Root of one thread's hot-spot table.
#[derive(Debug, Clone, PartialEq)]
pub struct HotSpotThread {
    name: String,
    total_time: Duration,
    methods: HashMap<MethodSignature, MethodNode>,
}

impl HotSpotThread {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), total_time: Duration::ZERO, methods: HashMap::new() }
    }

    /// Look up the method node, creating an empty one on first sight.
    pub(crate) fn method_or_insert(&mut self, signature: &MethodSignature) -> &mut MethodNode {
        let thread_name = &self.name;
        self.methods
            .entry(signature.clone())
            .or_insert_with(|| MethodNode::new(signature.clone(), thread_name.as_str()))
    }

    pub(crate) fn add_total_time(&mut self, elapsed: Duration) {
        self.total_time += elapsed;
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodNode> {
        self.methods.values()
    }

    /// Methods sorted by cumulative time, most expensive first.
    ///
    /// Ties are broken by signature so the order is stable between snapshots.
    #[must_use]
    pub fn ranked(&self) -> Vec<MethodHotspot> {
        let total = self.total_time.as_secs_f64();
        let mut hotspots: Vec<MethodHotspot> = self
            .methods
            .values()
            .map(|node| MethodHotspot {
                signature: node.signature.clone(),
                total_time: node.total_time,
                invocation_count: node.invocation_count,
                percentage: if total > 0.0 {
                    (node.total_time.as_secs_f64() / total) * 100.0
                } else {
                    0.0
                },
            })
            .collect();

        hotspots.sort_unstable_by(|a, b| {
            b.total_time.cmp(&a.total_time).then_with(|| a.signature.cmp(&b.signature))
        });
        hotspots
    }
}

impl ThreadAggregate for HotSpotThread {
    type Node = MethodNode;

    fn name(&self) -> &str {
        &self.name
    }

    fn total_time(&self) -> Duration {
        self.total_time
    }

    fn child(&self, signature: &str) -> Option<&MethodNode> {
        self.methods.get(signature)
    }

    fn child_count(&self) -> usize {
        self.methods.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn create_test_thread() -> HotSpotThread {
        let mut thread = HotSpotThread::new("main");
        let a = MethodSignature::new("com.foo.A", "run");
        let b = MethodSignature::new("com.foo.B", "work");

        thread.add_total_time(ms(100));
        let node = thread.method_or_insert(&a);
        node.add_time(ms(100));
        node.increment_invocation();

        let node = thread.method_or_insert(&b);
        node.add_time(ms(25));
        node.increment_invocation();
        node.increment_invocation();
        thread
    }

    #[test]
    fn test_method_or_insert_reuses_node() {
        let thread = create_test_thread();
        assert_eq!(thread.child_count(), 2);
        let a = thread.child("com.foo.A.run()").unwrap();
        assert_eq!(a.total_time(), ms(100));
        assert_eq!(a.invocation_count(), 1);
        assert_eq!(a.thread_name(), "main");
    }

    #[test]
    fn test_ranked_sorts_by_time_descending() {
        let ranked = create_test_thread().ranked();
        assert_eq!(ranked[0].signature.as_str(), "com.foo.A.run()");
        assert_eq!(ranked[1].signature.as_str(), "com.foo.B.work()");
        assert!((ranked[0].percentage - 100.0).abs() < 0.01);
        assert!((ranked[1].percentage - 25.0).abs() < 0.01);
        assert_eq!(ranked[1].invocation_count, 2);
    }

    #[test]
    fn test_empty_thread_has_no_children() {
        let thread = HotSpotThread::new("idle");
        assert!(!thread.has_children());
        assert!(thread.ranked().is_empty());
    }
}
