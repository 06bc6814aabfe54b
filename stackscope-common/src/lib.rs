//! # Shared Data Structures (Introspection ↔ Profiler)
//!
//! Defines the plain data exchanged between the process introspection service
//! and the profiler. Everything here is a snapshot value: the introspection side
//! produces it once per tick, the profiler only reads it.
//!
//! ## Key Types
//!
//! - [`StackFrame`] - One frame of a thread stack (class + method, optional source)
//! - [`ThreadDump`] - A thread's name, id, state and frames at one instant
//! - [`LockGraph`] - Thread × resource matrix of held/waited resources
//!
//! With the `serde` feature enabled all types derive `Serialize`/`Deserialize`
//! so recorded samples can be written to and replayed from JSON.

// ============================================================================
// Constants
// ============================================================================

/// Thread name prefixes of the remote-transport housekeeping threads.
///
/// Those threads exist only because the process is being monitored, so they
/// are excluded from both the profile and the thread view.
pub const INFRASTRUCTURE_THREAD_PREFIXES: &[&str] = &["RMI ", "JMX "];

/// Package name assigned to classes that have no package qualifier.
pub const DEFAULT_PACKAGE_NAME: &str = "<default>";

/// Textual header of a composite resource, e.g. `MultiRule[a@1,b@2]`.
pub const COMPOSITE_RESOURCE_HEADER: &str = "MultiRule[";

/// Lock graph cell value: the thread waits on the resource.
pub const LOCK_WAITING: i32 = -1;

/// Lock graph cell value: the thread has no relation to the resource.
/// Any value above this one means the resource is held.
pub const LOCK_NONE: i32 = 0;

// ============================================================================
// Stack Traces
// ============================================================================

/// A single stack frame as reported by the monitored process.
///
/// Two frames are the same frame only if class, method, file and line all match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StackFrame {
    /// Fully qualified class name (e.g. `com.example.Server`)
    pub class_name: String,

    /// Method name without parameter list (e.g. `handle`)
    pub method_name: String,

    /// Source file, when the process reports it
    pub file_name: Option<String>,

    /// Source line, when the process reports it
    pub line_number: Option<u32>,
}

impl StackFrame {
    /// Create a frame without source location.
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            file_name: None,
            line_number: None,
        }
    }

    /// Attach a source location.
    #[must_use]
    pub fn with_location(mut self, file_name: impl Into<String>, line_number: u32) -> Self {
        self.file_name = Some(file_name.into());
        self.line_number = Some(line_number);
        self
    }
}

/// Scheduling state of a thread at dump time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ThreadState {
    New,
    #[default]
    Runnable,
    Blocked,
    Waiting,
    TimedWaiting,
    Terminated,
}

/// One thread's stack at the instant it was captured.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThreadDump {
    /// Identifier used for CPU time queries
    pub thread_id: u64,

    /// Thread name; the profile is keyed by it
    pub thread_name: String,

    /// Scheduling state
    #[cfg_attr(feature = "serde", serde(default))]
    pub state: ThreadState,

    /// Frames with the currently executing (innermost) frame first and the
    /// thread entry point last.
    #[cfg_attr(feature = "serde", serde(default))]
    pub frames: Vec<StackFrame>,
}

impl ThreadDump {
    /// Returns true if the thread name starts with any of `prefixes`.
    ///
    /// Used with [`INFRASTRUCTURE_THREAD_PREFIXES`] (or a configured list) to
    /// skip remote-transport housekeeping threads.
    #[must_use]
    pub fn has_name_prefix<S: AsRef<str>>(&self, prefixes: &[S]) -> bool {
        prefixes.iter().any(|p| self.thread_name.starts_with(p.as_ref()))
    }
}

// ============================================================================
// Lock Wait Graph
// ============================================================================

/// Snapshot of which thread holds or waits on which resource.
///
/// `graph[t][r]` relates the thread `owning_thread_names[t]` to the resource
/// `resource_names[r]`: [`LOCK_WAITING`] means waiting, a value above
/// [`LOCK_NONE`] means held.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LockGraph {
    /// Resource identifiers, one per column
    pub resource_names: Vec<String>,

    /// Thread names, one per row
    pub owning_thread_names: Vec<String>,

    /// Row-major thread × resource matrix
    pub graph: Vec<Vec<i32>>,
}
