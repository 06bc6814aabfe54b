//! Recorded introspection data, replayed tick by tick
//!
//! A recording is a JSON document:
//!
//! ```json
//! {
//!   "ticks": [
//!     {
//!       "threads": [
//!         { "thread_id": 1, "thread_name": "main", "state": "RUNNABLE",
//!           "frames": [ { "class_name": "app.B", "method_name": "m2" },
//!                       { "class_name": "app.A", "method_name": "m1" } ] }
//!       ],
//!       "deadlocked": [],
//!       "lock_graph": null,
//!       "cpu_times": { "1": 1500000 }
//!     }
//!   ]
//! }
//! ```
//!
//! Only sampling advances through the recording: every call to
//! `thread_dumps` returns the next tick. The thread view, CPU times, deadlocks
//! and the lock graph come from the tick sampled last (the first tick before
//! any sampling). Once all ticks are consumed the "process" is unreachable.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stackscope_common::{LockGraph, ThreadDump};

use crate::domain::{IntrospectionError, ThreadId};
use crate::profiling::ProcessIntrospector;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub ticks: Vec<RecordedTick>,
}

/// Everything the process reported at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordedTick {
    pub threads: Vec<ThreadDump>,
    pub deadlocked: Vec<u64>,
    pub lock_graph: Option<LockGraph>,
    /// Cumulative CPU time per thread id, in nanoseconds
    pub cpu_times: HashMap<u64, u64>,
}

#[derive(Debug)]
pub struct ReplayIntrospector {
    ticks: Vec<RecordedTick>,
    cursor: AtomicUsize,
}

impl ReplayIntrospector {
    #[must_use]
    pub fn new(recording: Recording) -> Self {
        Self { ticks: recording.ticks, cursor: AtomicUsize::new(0) }
    }

    /// Load a recording from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a valid recording
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, IntrospectionError> {
        let content = std::fs::read_to_string(path)?;
        let recording: Recording = serde_json::from_str(&content)?;
        Ok(Self::new(recording))
    }

    /// Number of recorded ticks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Tick sampled last, or the first one if nothing was sampled yet.
    fn current(&self) -> Option<&RecordedTick> {
        let consumed = self.cursor.load(Ordering::SeqCst);
        self.ticks.get(consumed.saturating_sub(1))
    }
}

impl ProcessIntrospector for ReplayIntrospector {
    fn is_reachable(&self) -> bool {
        self.cursor.load(Ordering::SeqCst) < self.ticks.len()
    }

    fn thread_dumps(&self) -> Result<Vec<ThreadDump>, IntrospectionError> {
        let idx = self
            .cursor
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |idx| {
                (idx < self.ticks.len()).then_some(idx + 1)
            })
            .map_err(|_| IntrospectionError::Unreachable("recording exhausted".into()))?;
        Ok(self.ticks[idx].threads.clone())
    }

    fn latest_thread_dumps(&self) -> Result<Vec<ThreadDump>, IntrospectionError> {
        self.current()
            .map(|tick| tick.threads.clone())
            .ok_or_else(|| IntrospectionError::Unreachable("recording is empty".into()))
    }

    fn thread_cpu_time(&self, thread_id: ThreadId) -> Result<Option<Duration>, IntrospectionError> {
        Ok(self
            .current()
            .and_then(|tick| tick.cpu_times.get(&thread_id.0))
            .map(|nanos| Duration::from_nanos(*nanos)))
    }

    fn deadlocked_threads(&self) -> Result<Vec<ThreadId>, IntrospectionError> {
        Ok(self
            .current()
            .map(|tick| tick.deadlocked.iter().copied().map(ThreadId).collect())
            .unwrap_or_default())
    }

    fn lock_graph(&self) -> Result<Option<LockGraph>, IntrospectionError> {
        Ok(self.current().and_then(|tick| tick.lock_graph.clone()))
    }
}
