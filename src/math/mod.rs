//! Sequence algebra: value types and their frame-indexed sequence
//! counterparts.
//!
//! Sequences store one `f32` buffer per component, all the same length.
//! Frame numbers are 1-based; reading past the end clamps to the last frame,
//! and binary operations broadcast the shorter operand by repeating its last
//! frame.

pub mod matrix;
pub mod plane;
pub mod quaternion;
pub mod vector;

pub use matrix::{Matrix, MatrixSequence};
pub use plane::{Plane, PlaneSequence};
pub use quaternion::{Quaternion, QuaternionSequence};
pub use vector::{Vector, VectorSequence};

/// Resolve a 1-based frame number against a buffer length, clamping to the
/// last valid frame. Returns a 0-based index.
#[inline]
#[must_use]
pub(crate) fn clamp_frame(frame: usize, len: usize) -> usize {
    debug_assert!(len > 0);
    frame.max(1).min(len) - 1
}

/// Broadcast length of two sequences: the longer one wins, the shorter one
/// repeats its last frame.
#[inline]
#[must_use]
pub(crate) fn broadcast_len(a: usize, b: usize) -> usize {
    a.max(b)
}
