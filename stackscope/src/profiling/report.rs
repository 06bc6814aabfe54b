//! Plain-text reports of published snapshots

use std::io::{self, Write};
use std::time::Duration;

use crate::analysis::{AggregateNode, CallTreeThread, CpuSnapshot, NodeId, ThreadAggregate};
use crate::classification::FilterDiagnostics;
use crate::thread_data::ThreadSnapshot;

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Hot-spot table per thread, at most `top` methods each (0 = all).
///
/// # Errors
/// Returns an error if writing fails
pub fn write_hot_spots<W: Write>(w: &mut W, snapshot: &CpuSnapshot, top: usize) -> io::Result<()> {
    for thread in snapshot.hot_spot_threads() {
        writeln!(w, "\nHOT SPOTS  {}  ({:.0}ms)", thread.name(), millis(thread.total_time()))?;
        let ranked = thread.ranked();
        let limit = if top == 0 { ranked.len() } else { top.min(ranked.len()) };
        for entry in &ranked[..limit] {
            writeln!(
                w,
                "  {:<48} {:>5.1}%  {:>8.0}ms  x{}",
                entry.signature,
                entry.percentage,
                millis(entry.total_time),
                entry.invocation_count
            )?;
        }
    }
    Ok(())
}

/// Indented call tree per thread.
///
/// ```text
/// CALL TREE  main  (150ms)
///   A.m1()  150ms total, 0ms self, x1
///     B.m2()  100ms total, 100ms self, x1
///     C.m3()  50ms total, 50ms self, x1
/// ```
///
/// # Errors
/// Returns an error if writing fails
pub fn write_call_trees<W: Write>(w: &mut W, snapshot: &CpuSnapshot) -> io::Result<()> {
    for thread in snapshot.call_tree_threads() {
        writeln!(w, "\nCALL TREE  {}  ({:.0}ms)", thread.name(), millis(thread.total_time()))?;
        for id in thread.root_ids() {
            write_subtree(w, thread, id)?;
        }
    }
    Ok(())
}

fn write_subtree<W: Write>(w: &mut W, thread: &CallTreeThread, id: NodeId) -> io::Result<()> {
    let Some(node) = thread.node(id) else {
        return Ok(());
    };
    writeln!(
        w,
        "{:indent$}{}  {:.0}ms total, {:.0}ms self, x{}",
        "",
        node.signature(),
        millis(node.total_time()),
        millis(node.self_time()),
        node.invocation_count(),
        indent = 2 + node.depth() * 2
    )?;
    for child in thread.children(id) {
        write_subtree(w, thread, child)?;
    }
    Ok(())
}

/// Thread list with state, CPU usage and dependency annotations.
///
/// # Errors
/// Returns an error if writing fails
pub fn write_threads<W: Write>(w: &mut W, snapshot: &ThreadSnapshot) -> io::Result<()> {
    writeln!(w, "\nTHREADS ({})", snapshot.threads.len())?;
    for thread in &snapshot.threads {
        let deadlock = if thread.deadlocked { "  DEADLOCKED" } else { "" };
        writeln!(
            w,
            "  {} [{}] {:?} cpu={:.1}%{deadlock}",
            thread.name, thread.thread_id, thread.state, thread.cpu_usage
        )?;
        if let Some(frame) = thread.top_frame() {
            writeln!(w, "    at {}.{}", frame.class_name, frame.method_name)?;
        }
        if !thread.held_resources.is_empty() {
            writeln!(w, "    holds: {}", thread.held_resources.join(", "))?;
        }
        if let Some(waited) = &thread.waited_resource {
            match &thread.resource_owner {
                Some(owner) => writeln!(w, "    waits: {waited} (owner: {owner})")?,
                None => writeln!(w, "    waits: {waited}")?,
            }
        }
    }
    Ok(())
}

/// Display frame filter statistics
pub fn display_statistics(diagnostics: &FilterDiagnostics) {
    eprintln!(
        "stats: frames_kept={} coverage={:.1}%",
        diagnostics.frames_kept(),
        diagnostics.coverage()
    );
}
