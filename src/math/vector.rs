//! 3D vector value type and its frame-indexed sequence.

use serde::{Deserialize, Serialize};

use super::{broadcast_len, clamp_frame};

/// Plain 3D vector value.
///
/// Mutating operations take an explicit output reference to avoid allocation
/// in per-frame loops; a value may legally be its own output.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector {
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    #[must_use]
    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    #[must_use]
    pub fn dot(&self, other: &Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        let mut out = Self::zero();
        self.add_into(other, &mut out);
        out
    }

    /// `out` may alias either input.
    pub fn add_into(&self, other: &Self, out: &mut Self) {
        out.x = self.x + other.x;
        out.y = self.y + other.y;
        out.z = self.z + other.z;
    }

    #[must_use]
    pub fn subtract(&self, other: &Self) -> Self {
        let mut out = Self::zero();
        self.subtract_into(other, &mut out);
        out
    }

    /// `out` may alias either input.
    pub fn subtract_into(&self, other: &Self, out: &mut Self) {
        out.x = self.x - other.x;
        out.y = self.y - other.y;
        out.z = self.z - other.z;
    }

    #[must_use]
    pub fn scale(&self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    /// `out` may alias the input.
    pub fn scale_into(&self, s: f32, out: &mut Self) {
        out.x = self.x * s;
        out.y = self.y * s;
        out.z = self.z * s;
    }

    #[must_use]
    pub fn cross(&self, other: &Self) -> Self {
        let mut out = Self::zero();
        self.cross_into(other, &mut out);
        out
    }

    /// `out` may alias either input; operands are read before writing.
    pub fn cross_into(&self, other: &Self, out: &mut Self) {
        let (ax, ay, az) = (self.x, self.y, self.z);
        let (bx, by, bz) = (other.x, other.y, other.z);
        out.x = ay * bz - az * by;
        out.y = az * bx - ax * bz;
        out.z = ax * by - ay * bx;
    }

    #[must_use]
    pub fn normalize(&self) -> Self {
        let mut out = Self::zero();
        self.normalize_into(&mut out);
        out
    }

    /// `out` may alias the input. A zero vector normalizes to zero.
    pub fn normalize_into(&self, out: &mut Self) {
        let len = self.length();
        if len < f32::EPSILON {
            out.x = 0.0;
            out.y = 0.0;
            out.z = 0.0;
        } else {
            out.x = self.x / len;
            out.y = self.y / len;
            out.z = self.z / len;
        }
    }

    /// Project this vector onto `onto`.
    #[must_use]
    pub fn project(&self, onto: &Self) -> Self {
        let mut out = Self::zero();
        self.project_into(onto, &mut out);
        out
    }

    /// `out` may alias either input. Projection onto a zero vector is zero.
    pub fn project_into(&self, onto: &Self, out: &mut Self) {
        let denom = onto.dot(onto);
        if denom < f32::EPSILON {
            out.x = 0.0;
            out.y = 0.0;
            out.z = 0.0;
        } else {
            let k = self.dot(onto) / denom;
            out.x = onto.x * k;
            out.y = onto.y * k;
            out.z = onto.z * k;
        }
    }

    #[must_use]
    pub fn is_nan(&self) -> bool {
        self.x.is_nan() || self.y.is_nan() || self.z.is_nan()
    }
}

/// Time-indexed run of vectors, one buffer per component.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VectorSequence {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub z: Vec<f32>,
}

impl VectorSequence {
    /// Component names, in flat-buffer order.
    pub const COMPONENTS: [&'static str; 3] = ["x", "y", "z"];

    /// # Panics
    ///
    /// Panics if the component buffers differ in length.
    #[must_use]
    pub fn new(x: Vec<f32>, y: Vec<f32>, z: Vec<f32>) -> Self {
        assert_eq!(x.len(), y.len());
        assert_eq!(x.len(), z.len());
        Self { x, y, z }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            x: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
            z: Vec::with_capacity(capacity),
        }
    }

    /// Length-1 sequence holding a single vector.
    #[must_use]
    pub fn from_vector(v: Vector) -> Self {
        Self {
            x: vec![v.x],
            y: vec![v.y],
            z: vec![v.z],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn push(&mut self, v: Vector) {
        self.x.push(v.x);
        self.y.push(v.y);
        self.z.push(v.z);
    }

    /// Read the vector at a 1-based frame, clamping past-the-end frames to
    /// the last valid frame.
    #[must_use]
    pub fn vector_at_frame(&self, frame: usize) -> Vector {
        let i = clamp_frame(frame, self.len());
        Vector::new(self.x[i], self.y[i], self.z[i])
    }

    /// Named component buffer, if any.
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&[f32]> {
        match name {
            "x" => Some(&self.x),
            "y" => Some(&self.y),
            "z" => Some(&self.z),
            _ => None,
        }
    }

    /// Frame-wise subtraction with last-frame broadcasting.
    #[must_use]
    pub fn subtract(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| a.subtract(&b))
    }

    /// Frame-wise addition with last-frame broadcasting.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| a.add(&b))
    }

    /// Frame-wise cross product with last-frame broadcasting.
    #[must_use]
    pub fn cross(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| a.cross(&b))
    }

    /// Frame-wise dot product with last-frame broadcasting. Empty operands
    /// yield an empty result.
    #[must_use]
    pub fn dot(&self, other: &Self) -> Vec<f32> {
        if self.is_empty() || other.is_empty() {
            return Vec::new();
        }
        let len = broadcast_len(self.len(), other.len());
        (1..=len)
            .map(|f| self.vector_at_frame(f).dot(&other.vector_at_frame(f)))
            .collect()
    }

    /// Frame-wise scaling.
    #[must_use]
    pub fn scale(&self, s: f32) -> Self {
        Self {
            x: self.x.iter().map(|v| v * s).collect(),
            y: self.y.iter().map(|v| v * s).collect(),
            z: self.z.iter().map(|v| v * s).collect(),
        }
    }

    /// Frame-wise normalization.
    #[must_use]
    pub fn normalize(&self) -> Self {
        let mut out = Self::with_capacity(self.len());
        for f in 1..=self.len() {
            out.push(self.vector_at_frame(f).normalize());
        }
        out
    }

    fn zip_with(&self, other: &Self, op: impl Fn(Vector, Vector) -> Vector) -> Self {
        // An empty operand has no last frame to broadcast.
        if self.is_empty() || other.is_empty() {
            return Self::default();
        }
        let len = broadcast_len(self.len(), other.len());
        let mut out = Self::with_capacity(len);
        for f in 1..=len {
            out.push(op(self.vector_at_frame(f), other.vector_at_frame(f)));
        }
        out
    }
}
