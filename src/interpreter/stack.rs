//! Stack growth for deeply nested evaluation.

/// Keep at least this much stack free before recursing.
const RED_ZONE: usize = 128 * 1024;

/// Size of each freshly allocated stack segment.
const STACK_SEGMENT: usize = 1024 * 1024;

/// Runs `f`, moving onto a new stack segment first when the current one is
/// nearly exhausted.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_SEGMENT, f)
}
