//! Thread view data published by the thread-state refresh
//!
//! Unlike the CPU model, the thread view is rebuilt from scratch on every
//! refresh: nothing in a [`ThreadElement`] survives to the next cycle.

use stackscope_common::{StackFrame, ThreadDump, ThreadState};

use crate::dependency::OwnerResolution;
use crate::domain::ThreadId;

/// One live thread with its dependency annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadElement {
    pub name: String,
    pub thread_id: ThreadId,
    pub state: ThreadState,
    /// Innermost frame first, as captured
    pub frames: Vec<StackFrame>,
    pub deadlocked: bool,
    /// CPU usage over the last refresh interval (0.0 - 100.0)
    pub cpu_usage: f64,
    /// Resource this thread is blocked on, if any
    pub waited_resource: Option<String>,
    /// Resources this thread holds, composites already decomposed
    pub held_resources: Vec<String>,
    /// Best-effort owner of `waited_resource`
    pub resource_owner: Option<OwnerResolution>,
}

impl ThreadElement {
    #[must_use]
    pub fn from_dump(dump: &ThreadDump) -> Self {
        Self {
            name: dump.thread_name.clone(),
            thread_id: ThreadId(dump.thread_id),
            state: dump.state,
            frames: dump.frames.clone(),
            deadlocked: false,
            cpu_usage: 0.0,
            waited_resource: None,
            held_resources: Vec::new(),
            resource_owner: None,
        }
    }

    /// Innermost frame, if the stack is not empty.
    #[must_use]
    pub fn top_frame(&self) -> Option<&StackFrame> {
        self.frames.first()
    }
}

/// Immutable, versioned set of thread records from one refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreadSnapshot {
    pub version: u64,
    pub threads: Vec<ThreadElement>,
}

impl ThreadSnapshot {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ThreadElement> {
        self.threads.iter().find(|t| t.name == name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}
