//! # Sampling Engine
//!
//! Turns one tick's thread dumps into hot-spot and call-tree updates.
//!
//! ## Per-Thread Flow
//!
//! ```text
//! ThreadDump (innermost first)
//!     │ invert_stack
//!     ▼
//! root … leaf
//!     │ profiled_frames (package filter)
//!     ▼
//! filtered root … leaf ──► first_divergence(previous, filtered)
//!     │                          │
//!     ├──► HotSpotThread         │ depth ≥ divergence ⇒ new invocation
//!     └──► CallTreeThread  ◄─────┘
//! ```
//!
//! Each tick attributes the elapsed wall-clock time since the previous tick
//! (the configured period on the very first tick) to every frame of every
//! sampled thread. The filtered stack is then kept as that thread's previous
//! stack for the next comparison.

use log::debug;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use stackscope_common::{StackFrame, ThreadDump};

use super::stack::{first_divergence, invert_stack, profiled_frames};
use crate::analysis::{CpuModel, CpuSnapshot};
use crate::classification::ProfiledPackages;
use crate::config::ProfilerConfig;
use crate::domain::MethodSignature;

/// Sampling state carried from one tick to the next.
#[derive(Debug, Default)]
pub struct Sampler {
    model: CpuModel,
    /// Filtered, inverted stack of each thread at the previous tick
    previous_stacks: HashMap<String, Vec<StackFrame>>,
    previous_sampling_time: Option<Instant>,
    /// Number of snapshots produced so far
    version: u64,
}

impl Sampler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one tick taken at `now`.
    ///
    /// The time attributed is the wall-clock delta since the previous tick, or
    /// the configured sampling period if this is the first tick.
    pub fn sample(&mut self, dumps: &[ThreadDump], config: &ProfilerConfig, now: Instant) -> CpuSnapshot {
        let elapsed = match self.previous_sampling_time {
            Some(previous) => now.saturating_duration_since(previous),
            None => config.sampling_period(),
        };
        let snapshot = self.aggregate(dumps, config, elapsed);
        self.previous_sampling_time = Some(now);
        snapshot
    }

    /// Attribute `elapsed` to every profiled frame of every dump.
    pub fn aggregate(
        &mut self,
        dumps: &[ThreadDump],
        config: &ProfilerConfig,
        elapsed: Duration,
    ) -> CpuSnapshot {
        let mut seen: HashSet<&str> = HashSet::with_capacity(dumps.len());

        for dump in dumps {
            if dump.has_name_prefix(&config.excluded_thread_prefixes) {
                continue;
            }
            seen.insert(dump.thread_name.as_str());
            if dump.frames.is_empty() {
                self.previous_stacks.remove(&dump.thread_name);
                continue;
            }
            self.update_thread(dump, &config.profiled_packages, elapsed);
        }

        // Threads that vanished start over if a thread of that name reappears
        self.previous_stacks.retain(|name, _| seen.contains(name.as_str()));

        self.version += 1;
        debug!("Tick {}: {} threads sampled, {elapsed:?} attributed", self.version, seen.len());
        self.model.snapshot(self.version)
    }

    fn update_thread(&mut self, dump: &ThreadDump, packages: &ProfiledPackages, elapsed: Duration) {
        let frames = profiled_frames(&invert_stack(&dump.frames), packages);
        let thread_name = &dump.thread_name;

        if frames.is_empty() {
            self.previous_stacks.remove(thread_name);
            return;
        }

        let divergence =
            first_divergence(self.previous_stacks.get(thread_name).map(Vec::as_slice), &frames);
        let leaf = frames.len() - 1;
        let (hot_spot, call_tree) = self.model.thread_roots(thread_name);

        // One period per tick at thread level, whatever the stack depth
        hot_spot.add_total_time(elapsed);
        call_tree.add_total_time(elapsed);

        // A recursive method is on the stack once as far as the flat view goes
        let mut timed: HashSet<MethodSignature> = HashSet::new();
        let mut counted: HashSet<MethodSignature> = HashSet::new();
        let mut cursor = None;

        for (depth, frame) in frames.iter().enumerate() {
            let signature = MethodSignature::from(frame);
            let is_new = depth >= divergence;

            let method = hot_spot.method_or_insert(&signature);
            if timed.insert(signature.clone()) {
                method.add_time(elapsed);
            }
            if is_new && counted.insert(signature.clone()) {
                method.increment_invocation();
            }

            let id = call_tree.child_or_insert(cursor, &signature);
            if let Some(node) = call_tree.node_mut(id) {
                node.add_total_time(elapsed);
                if is_new {
                    node.increment_invocation();
                }
                if depth == leaf {
                    node.add_self_time(elapsed);
                }
            }
            cursor = Some(id);
        }

        self.previous_stacks.insert(thread_name.clone(), frames);
    }

    /// Snapshot of the current model without sampling.
    #[must_use]
    pub fn snapshot(&self) -> CpuSnapshot {
        self.model.snapshot(self.version)
    }

    /// Drop all aggregates and previous stacks, keeping the tick timing.
    pub fn clear_model(&mut self) -> CpuSnapshot {
        self.model.clear();
        self.previous_stacks.clear();
        self.version += 1;
        self.model.snapshot(self.version)
    }

    /// Forget everything, including when the last tick happened.
    pub fn reset(&mut self) -> CpuSnapshot {
        self.previous_sampling_time = None;
        self.clear_model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AggregateNode, ThreadAggregate};
    use stackscope_common::ThreadState;

    const PERIOD: Duration = Duration::from_millis(50);

    fn config() -> ProfilerConfig {
        ProfilerConfig {
            profiled_packages: ["app.*"].iter().collect(),
            ..ProfilerConfig::default()
        }
    }

    /// Build a dump from root-first method names (stored innermost first).
    fn dump(thread: &str, root_first: &[&str]) -> ThreadDump {
        ThreadDump {
            thread_id: 1,
            thread_name: thread.to_string(),
            state: ThreadState::Runnable,
            frames: root_first
                .iter()
                .rev()
                .map(|name| {
                    let (class, method) = name.rsplit_once('.').unwrap();
                    StackFrame::new(class, method)
                })
                .collect(),
        }
    }

    #[test]
    fn test_first_tick_uses_configured_period() {
        let mut sampler = Sampler::new();
        let snapshot = sampler.sample(&[dump("main", &["app.A.run"])], &config(), Instant::now());
        let thread = snapshot.hot_spot_thread("main").unwrap();
        assert_eq!(thread.total_time(), PERIOD);
    }

    #[test]
    fn test_later_ticks_use_wall_clock_delta() {
        let mut sampler = Sampler::new();
        let start = Instant::now();
        sampler.sample(&[dump("main", &["app.A.run"])], &config(), start);
        let snapshot = sampler.sample(
            &[dump("main", &["app.A.run"])],
            &config(),
            start + Duration::from_millis(70),
        );
        let thread = snapshot.call_tree_thread("main").unwrap();
        assert_eq!(thread.total_time(), Duration::from_millis(120));
    }

    #[test]
    fn test_unprofiled_frames_do_not_break_alignment() {
        let mut sampler = Sampler::new();
        let cfg = config();
        sampler.aggregate(&[dump("main", &["app.A.run", "java.X.y", "app.B.work"])], &cfg, PERIOD);
        // Library frame changes, profiled frames stay identical
        let snapshot =
            sampler.aggregate(&[dump("main", &["app.A.run", "java.Z.q", "app.B.work"])], &cfg, PERIOD);

        let tree = snapshot.call_tree_thread("main").unwrap();
        let b = tree.find(&["app.A.run()", "app.B.work()"]).unwrap();
        assert_eq!(b.invocation_count(), 1);
        assert_eq!(b.self_time(), PERIOD * 2);
    }

    #[test]
    fn test_recursive_method_counted_once_per_tick() {
        let mut sampler = Sampler::new();
        let snapshot = sampler.aggregate(
            &[dump("main", &["app.A.walk", "app.B.visit", "app.A.walk"])],
            &config(),
            PERIOD,
        );
        let hot = snapshot.hot_spot_thread("main").unwrap();
        let walk = hot.child("app.A.walk()").unwrap();
        assert_eq!(walk.total_time(), PERIOD);
        assert_eq!(walk.invocation_count(), 1);

        let tree = snapshot.call_tree_thread("main").unwrap();
        assert!(tree.find(&["app.A.walk()", "app.B.visit()", "app.A.walk()"]).is_some());
    }

    #[test]
    fn test_threads_without_profiled_frames_not_published() {
        let mut sampler = Sampler::new();
        let snapshot = sampler.aggregate(&[dump("gc", &["java.lang.Ref.run"])], &config(), PERIOD);
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_infrastructure_threads_skipped() {
        let mut sampler = Sampler::new();
        let snapshot =
            sampler.aggregate(&[dump("RMI TCP Connection(3)", &["app.A.run"])], &config(), PERIOD);
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_empty_stack_resets_new_invocation_detection() {
        let mut sampler = Sampler::new();
        let cfg = config();
        sampler.aggregate(&[dump("main", &["app.A.run"])], &cfg, PERIOD);
        sampler.aggregate(&[dump("main", &[])], &cfg, PERIOD);
        let snapshot = sampler.aggregate(&[dump("main", &["app.A.run"])], &cfg, PERIOD);

        let hot = snapshot.hot_spot_thread("main").unwrap();
        assert_eq!(hot.child("app.A.run()").unwrap().invocation_count(), 2);
    }

    #[test]
    fn test_absent_thread_starts_new_invocation() {
        let mut sampler = Sampler::new();
        let cfg = config();
        sampler.aggregate(&[dump("main", &["app.A.run"])], &cfg, PERIOD);
        sampler.aggregate(&[dump("other", &["app.B.work"])], &cfg, PERIOD);
        let snapshot = sampler.aggregate(&[dump("main", &["app.A.run"])], &cfg, PERIOD);

        let hot = snapshot.hot_spot_thread("main").unwrap();
        assert_eq!(hot.child("app.A.run()").unwrap().invocation_count(), 2);
        let tree = snapshot.call_tree_thread("main").unwrap();
        assert_eq!(tree.child("app.A.run()").unwrap().invocation_count(), 2);
    }

    #[test]
    fn test_clear_model_restarts_counts() {
        let mut sampler = Sampler::new();
        let cfg = config();
        sampler.aggregate(&[dump("main", &["app.A.run"])], &cfg, PERIOD);
        assert!(sampler.clear_model().is_empty());

        let snapshot = sampler.aggregate(&[dump("main", &["app.A.run"])], &cfg, PERIOD);
        let node = snapshot.call_tree_thread("main").unwrap().child("app.A.run()").unwrap();
        assert_eq!(node.invocation_count(), 1);
        assert_eq!(node.total_time(), PERIOD);
    }

    #[test]
    fn test_snapshot_versions_increase() {
        let mut sampler = Sampler::new();
        let first = sampler.aggregate(&[], &config(), PERIOD);
        let second = sampler.aggregate(&[], &config(), PERIOD);
        assert!(second.version() > first.version());
        assert_eq!(sampler.snapshot().version(), second.version());
    }
}
