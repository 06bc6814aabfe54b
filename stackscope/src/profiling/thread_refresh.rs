//! Thread-state refresh
//!
//! Runs on its own timer, independent of sampling. Each refresh rebuilds the
//! whole thread view:
//!
//! 1. Dump all threads; skip empty stacks and infrastructure threads
//! 2. Records come out in reverse dump order
//! 3. Mark deadlocked threads
//! 4. CPU usage from the CPU-time delta over the actual refresh interval
//! 5. Annotate dependencies if the process exposes a lock graph

use log::debug;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use super::introspection::ProcessIntrospector;
use crate::config::ProfilerConfig;
use crate::dependency::resolve;
use crate::domain::{IntrospectionError, ThreadId};
use crate::thread_data::{ThreadElement, ThreadSnapshot};

/// Refresh state carried between cycles.
#[derive(Debug, Default)]
pub struct ThreadMonitor {
    previous_cpu_times: HashMap<ThreadId, Duration>,
    previous_refresh: Option<Instant>,
    version: u64,
}

impl ThreadMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh thread view at `now`.
    ///
    /// # Errors
    /// Returns an error if the process is unreachable or thread dumps fail.
    /// Missing deadlock or lock graph telemetry is not an error.
    pub fn refresh(
        &mut self,
        introspector: &dyn ProcessIntrospector,
        config: &ProfilerConfig,
        now: Instant,
    ) -> Result<ThreadSnapshot, IntrospectionError> {
        if !introspector.is_reachable() {
            return Err(IntrospectionError::Unreachable("process did not respond".into()));
        }

        let dumps = introspector.latest_thread_dumps()?;
        let deadlocked: HashSet<ThreadId> = match introspector.deadlocked_threads() {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                debug!("Deadlock detection unavailable: {e}");
                HashSet::new()
            }
        };

        let interval = self.previous_refresh.map(|previous| now.saturating_duration_since(previous));
        let mut seen_names = HashSet::new();
        let mut cpu_times = HashMap::with_capacity(dumps.len());
        let mut threads = Vec::with_capacity(dumps.len());

        for dump in dumps.iter().rev() {
            if dump.frames.is_empty() || dump.has_name_prefix(&config.excluded_thread_prefixes) {
                continue;
            }
            if !seen_names.insert(dump.thread_name.as_str()) {
                continue;
            }

            let mut element = ThreadElement::from_dump(dump);
            element.deadlocked = deadlocked.contains(&element.thread_id);

            match introspector.thread_cpu_time(element.thread_id) {
                Ok(Some(cpu_time)) => {
                    element.cpu_usage = self.cpu_usage(element.thread_id, cpu_time, interval);
                    cpu_times.insert(element.thread_id, cpu_time);
                }
                Ok(None) => {}
                Err(e) => debug!("No CPU time for {}: {e}", element.thread_id),
            }
            threads.push(element);
        }

        match introspector.lock_graph() {
            Ok(Some(graph)) => {
                resolve(&mut threads, &graph);
            }
            Ok(None) => debug!("No lock graph exposed, dependencies not resolved"),
            Err(e) => debug!("Lock graph unavailable: {e}"),
        }

        self.previous_cpu_times = cpu_times;
        self.previous_refresh = Some(now);
        self.version += 1;
        Ok(ThreadSnapshot { version: self.version, threads })
    }

    /// Percentage of `interval` the thread spent on CPU, capped at 100.
    fn cpu_usage(&self, thread_id: ThreadId, cpu_time: Duration, interval: Option<Duration>) -> f64 {
        let (Some(previous), Some(interval)) = (self.previous_cpu_times.get(&thread_id), interval)
        else {
            return 0.0;
        };
        if interval.is_zero() {
            return 0.0;
        }
        let delta = cpu_time.saturating_sub(*previous);
        (delta.as_secs_f64() / interval.as_secs_f64() * 100.0).min(100.0)
    }

    /// Forget CPU times and timing, as after a disconnect. Returns the empty
    /// thread view that replaces the last one.
    pub fn reset(&mut self) -> ThreadSnapshot {
        self.previous_cpu_times.clear();
        self.previous_refresh = None;
        self.version += 1;
        ThreadSnapshot { version: self.version, threads: Vec::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::OwnerResolution;
    use stackscope_common::{LockGraph, StackFrame, ThreadDump, ThreadState};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeProcess {
        dumps: Vec<ThreadDump>,
        cpu: Mutex<HashMap<u64, Duration>>,
        deadlocked: Vec<ThreadId>,
        graph: Option<LockGraph>,
        unreachable: bool,
    }

    impl ProcessIntrospector for FakeProcess {
        fn is_reachable(&self) -> bool {
            !self.unreachable
        }

        fn thread_dumps(&self) -> Result<Vec<ThreadDump>, IntrospectionError> {
            Ok(self.dumps.clone())
        }

        fn thread_cpu_time(&self, thread_id: ThreadId) -> Result<Option<Duration>, IntrospectionError> {
            Ok(self.cpu.lock().unwrap().get(&thread_id.0).copied())
        }

        fn deadlocked_threads(&self) -> Result<Vec<ThreadId>, IntrospectionError> {
            Ok(self.deadlocked.clone())
        }

        fn lock_graph(&self) -> Result<Option<LockGraph>, IntrospectionError> {
            Ok(self.graph.clone())
        }
    }

    fn dump(id: u64, name: &str, depth: usize) -> ThreadDump {
        ThreadDump {
            thread_id: id,
            thread_name: name.to_string(),
            state: ThreadState::Runnable,
            frames: (0..depth).map(|i| StackFrame::new("app.Worker", format!("step{i}"))).collect(),
        }
    }

    #[test]
    fn test_filters_and_reverses() {
        let process = FakeProcess {
            dumps: vec![
                dump(1, "main", 2),
                dump(2, "idle", 0),
                dump(3, "RMI TCP Accept-0", 3),
                dump(4, "worker", 1),
            ],
            ..FakeProcess::default()
        };
        let mut monitor = ThreadMonitor::new();
        let snapshot = monitor.refresh(&process, &ProfilerConfig::default(), Instant::now()).unwrap();

        let names: Vec<&str> = snapshot.threads.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["worker", "main"]);
    }

    #[test]
    fn test_cpu_usage_over_refresh_interval() {
        let process = FakeProcess { dumps: vec![dump(1, "main", 1)], ..FakeProcess::default() };
        process.cpu.lock().unwrap().insert(1, Duration::from_millis(100));

        let mut monitor = ThreadMonitor::new();
        let start = Instant::now();
        let config = ProfilerConfig::default();
        let first = monitor.refresh(&process, &config, start).unwrap();
        assert!(first.get("main").unwrap().cpu_usage.abs() < f64::EPSILON);

        process.cpu.lock().unwrap().insert(1, Duration::from_millis(350));
        let second = monitor.refresh(&process, &config, start + Duration::from_secs(1)).unwrap();
        assert!((second.get("main").unwrap().cpu_usage - 25.0).abs() < 1e-9);

        process.cpu.lock().unwrap().insert(1, Duration::from_secs(10));
        let third = monitor.refresh(&process, &config, start + Duration::from_secs(2)).unwrap();
        assert!((third.get("main").unwrap().cpu_usage - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_deadlock_and_dependencies() {
        let process = FakeProcess {
            dumps: vec![dump(1, "t1", 1), dump(2, "t2", 1)],
            deadlocked: vec![ThreadId(2)],
            graph: Some(LockGraph {
                resource_names: vec!["Rule@1".into()],
                owning_thread_names: vec!["t1".into(), "t2".into()],
                graph: vec![vec![-1], vec![1]],
            }),
            ..FakeProcess::default()
        };
        let mut monitor = ThreadMonitor::new();
        let snapshot = monitor.refresh(&process, &ProfilerConfig::default(), Instant::now()).unwrap();

        assert!(snapshot.get("t2").unwrap().deadlocked);
        assert!(!snapshot.get("t1").unwrap().deadlocked);
        assert_eq!(
            snapshot.get("t1").unwrap().resource_owner,
            Some(OwnerResolution::Resolved("t2".into()))
        );
    }

    #[test]
    fn test_filtered_threads_own_nothing() {
        let process = FakeProcess {
            dumps: vec![dump(1, "waiter", 1), dump(2, "RMI TCP Connection(1)", 2)],
            graph: Some(LockGraph {
                resource_names: vec!["Rule@1".into()],
                owning_thread_names: vec!["waiter".into(), "RMI TCP Connection(1)".into()],
                graph: vec![vec![-1], vec![1]],
            }),
            ..FakeProcess::default()
        };
        let mut monitor = ThreadMonitor::new();
        let snapshot = monitor.refresh(&process, &ProfilerConfig::default(), Instant::now()).unwrap();

        assert_eq!(snapshot.threads.len(), 1);
        assert_eq!(snapshot.get("waiter").unwrap().resource_owner, Some(OwnerResolution::Unknown));
    }

    #[test]
    fn test_reset_publishes_newer_empty_view() {
        let process = FakeProcess { dumps: vec![dump(1, "main", 1)], ..FakeProcess::default() };
        let mut monitor = ThreadMonitor::new();
        let before = monitor.refresh(&process, &ProfilerConfig::default(), Instant::now()).unwrap();

        let after = monitor.reset();
        assert!(after.is_empty());
        assert!(after.version > before.version);
    }

    #[test]
    fn test_unreachable_process_fails() {
        let process = FakeProcess { unreachable: true, ..FakeProcess::default() };
        let mut monitor = ThreadMonitor::new();
        let result = monitor.refresh(&process, &ProfilerConfig::default(), Instant::now());
        assert!(matches!(result, Err(IntrospectionError::Unreachable(_))));
    }
}
