//! Access to the monitored process
//!
//! The profiler never talks to a process directly. Everything it needs per
//! tick (thread dumps, CPU times, deadlock detection, the scheduling-rule lock
//! graph) goes through [`ProcessIntrospector`], so a live connector and the
//! file-backed replay share the same engine.

use std::time::Duration;

use stackscope_common::{LockGraph, ThreadDump};

use crate::domain::{IntrospectionError, ThreadId};

pub trait ProcessIntrospector: Send + Sync {
    /// Cheap liveness check run before every sampling tick.
    fn is_reachable(&self) -> bool {
        true
    }

    /// Stacks of all live threads, innermost frame first.
    ///
    /// # Errors
    /// Returns an error if the process cannot be queried
    fn thread_dumps(&self) -> Result<Vec<ThreadDump>, IntrospectionError>;

    /// Stacks for the thread view.
    ///
    /// A live process simply dumps again. A source replaying a fixed sequence
    /// returns the instant last handed to the sampler instead of advancing,
    /// so refreshes never take instants away from sampling.
    ///
    /// # Errors
    /// Returns an error if the process cannot be queried
    fn latest_thread_dumps(&self) -> Result<Vec<ThreadDump>, IntrospectionError> {
        self.thread_dumps()
    }

    /// Cumulative CPU time of a thread, `None` if unknown.
    ///
    /// # Errors
    /// Returns an error if the process cannot be queried
    fn thread_cpu_time(&self, thread_id: ThreadId) -> Result<Option<Duration>, IntrospectionError>;

    /// Threads currently part of a deadlock cycle.
    ///
    /// # Errors
    /// Returns an error if deadlock detection is unsupported or fails
    fn deadlocked_threads(&self) -> Result<Vec<ThreadId>, IntrospectionError> {
        Ok(Vec::new())
    }

    /// Scheduling-rule lock graph, `None` if the process exposes none.
    ///
    /// # Errors
    /// Returns an error if the process cannot be queried
    fn lock_graph(&self) -> Result<Option<LockGraph>, IntrospectionError> {
        Ok(None)
    }
}
