//! Stack utilities shared by the sampler and the thread view
//!
//! Stacks arrive innermost frame first. The sampler works on the inverted
//! order (thread entry point first) so that depth `i` means "the i-th caller
//! from the root" and two consecutive samples can be compared prefix-wise.

use stackscope_common::StackFrame;

use crate::classification::{diagnostics, is_profiled, ProfiledPackages};

/// Reverse a stack so the outermost caller comes first.
#[must_use]
pub fn invert_stack<T: Clone>(stack: &[T]) -> Vec<T> {
    stack.iter().rev().cloned().collect()
}

/// Keep only frames of profiled packages, preserving order.
#[must_use]
pub fn profiled_frames(frames: &[StackFrame], packages: &ProfiledPackages) -> Vec<StackFrame> {
    let diagnostics = diagnostics();
    frames
        .iter()
        .filter(|frame| {
            let kept = is_profiled(&frame.class_name, packages);
            diagnostics.record_frame(kept);
            kept
        })
        .cloned()
        .collect()
}

/// First depth at which `current` is a new invocation relative to `previous`.
///
/// Depth `i` is new if there is no previous stack, the previous stack has no
/// frame at `i`, or the frames at `i` differ. Every depth at or below the
/// first new one is new as well. Returns `current.len()` when nothing is new.
#[must_use]
pub fn first_divergence(previous: Option<&[StackFrame]>, current: &[StackFrame]) -> usize {
    let Some(previous) = previous else {
        return 0;
    };
    current
        .iter()
        .zip(previous)
        .position(|(now, before)| now != before)
        .unwrap_or_else(|| current.len().min(previous.len()))
}
