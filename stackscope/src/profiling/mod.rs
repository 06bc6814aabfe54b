//! Profiling core modules
//!
//! - Sampling engine and the stack utilities it relies on
//! - Thread-state refresh
//! - Cancellable periodic tasks driving both
//! - The controller tying them to an introspector and publication sinks
//! - Text reports

pub mod controller;
pub mod introspection;
pub mod periodic;
pub mod publish;
pub mod report;
pub mod sampler;
pub mod stack;
pub mod thread_refresh;

// Re-export common types
pub use controller::{Profiler, ProfilerState};
pub use introspection::ProcessIntrospector;
pub use periodic::{PeriodicTask, TaskFault};
pub use publish::{ChannelSink, Publication, PublicationSink, SnapshotStore};
pub use report::{display_statistics, write_call_trees, write_hot_spots, write_threads};
pub use sampler::Sampler;
pub use stack::{first_divergence, invert_stack, profiled_frames};
pub use thread_refresh::ThreadMonitor;
