//! # stackscope - Sampling Profiler Aggregation Engine
//!
//! stackscope periodically samples a monitored process's thread stacks and
//! builds two models from them: a flat **hot-spot** table and a hierarchical
//! **call tree**, both per thread. A second, slower refresh builds a thread
//! view and infers which thread owns the resource another thread waits on.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Monitored Process                           │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ ProcessIntrospector
//!                         │ (thread dumps, CPU times, lock graph)
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    stackscope (This Crate)                      │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │  sampling    │──▶│   Frame      │──▶│  Hot spots   │         │
//! │  │  task        │   │   Filter     │   │  Call trees  │         │
//! │  └──────────────┘   └──────────────┘   └──────┬───────┘         │
//! │                                               │ CpuSnapshot     │
//! │  ┌──────────────┐   ┌──────────────┐          ▼                 │
//! │  │  refresh     │──▶│  Dependency  │──▶  Publication sinks      │
//! │  │  task        │   │  Resolver    │   (ThreadSnapshot)         │
//! │  └──────────────┘   └──────────────┘                            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`classification`]: which frames belong to profiled packages
//! - [`analysis`]: hot-spot and call-tree aggregates, published snapshots
//! - [`profiling`]: sampling engine, thread refresh, periodic tasks, controller
//! - [`dependency`]: resource owner inference from lock graphs
//! - [`config`]: periods and package selection
//! - [`replay`]: introspector replaying a JSON recording
//! - [`thread_data`]: thread view records
//! - [`cli`]: command-line arguments
//! - [`domain`]: newtypes and error types
//!
//! ## Key Concepts
//!
//! - **Inverted stack**: outermost caller first, innermost frame last
//! - **Self time**: time sampled while a node was the leaf
//! - **Total time**: time sampled while a node was anywhere on the stack
//! - **New invocation**: a depth whose frame differs from the previous tick's

pub mod analysis;
pub mod classification;
pub mod cli;
pub mod config;
pub mod dependency;
pub mod domain;
pub mod profiling;
pub mod replay;
pub mod thread_data;
