//! 4x4 transform matrix value type and its frame-indexed sequence.
//!
//! Storage is column-major and transforms are post-multiplied: `self ∘
//! other` applies `other` first. Swapping operand order silently changes
//! results, so the order is part of the contract.

use super::quaternion::Quaternion;
use super::vector::Vector;
use super::{broadcast_len, clamp_frame};

/// Column-major 4x4 matrix. Element `(row, col)` lives at `col * 4 + row`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub m: [f32; 16],
}

impl Matrix {
    #[must_use]
    pub const fn identity() -> Self {
        let mut m = [0.0; 16];
        m[0] = 1.0;
        m[5] = 1.0;
        m[10] = 1.0;
        m[15] = 1.0;
        Self { m }
    }

    #[must_use]
    pub const fn from_array(m: [f32; 16]) -> Self {
        Self { m }
    }

    /// Element at `(row, col)`, both 0-based.
    #[inline]
    #[must_use]
    pub const fn get(&self, row: usize, col: usize) -> f32 {
        self.m[col * 4 + row]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.m[col * 4 + row] = value;
    }

    /// Rotation matrix from a quaternion (normalized internally).
    #[must_use]
    pub fn from_quaternion(q: &Quaternion) -> Self {
        let q = q.normalize();
        let (x, y, z, w) = (q.x, q.y, q.z, q.w);
        let mut out = Self::identity();
        out.set(0, 0, 1.0 - 2.0 * (y * y + z * z));
        out.set(0, 1, 2.0 * (x * y - z * w));
        out.set(0, 2, 2.0 * (x * z + y * w));
        out.set(1, 0, 2.0 * (x * y + z * w));
        out.set(1, 1, 1.0 - 2.0 * (x * x + z * z));
        out.set(1, 2, 2.0 * (y * z - x * w));
        out.set(2, 0, 2.0 * (x * z - y * w));
        out.set(2, 1, 2.0 * (y * z + x * w));
        out.set(2, 2, 1.0 - 2.0 * (x * x + y * y));
        out
    }

    /// Rotation matrix whose columns are the given basis vectors.
    #[must_use]
    pub fn from_basis(x: &Vector, y: &Vector, z: &Vector) -> Self {
        let mut out = Self::identity();
        out.set(0, 0, x.x);
        out.set(1, 0, x.y);
        out.set(2, 0, x.z);
        out.set(0, 1, y.x);
        out.set(1, 1, y.y);
        out.set(2, 1, y.z);
        out.set(0, 2, z.x);
        out.set(1, 2, z.y);
        out.set(2, 2, z.z);
        out
    }

    /// Skew-symmetric cross-product matrix of a vector.
    #[must_use]
    pub fn skew(v: &Vector) -> Self {
        let mut out = Self::identity();
        out.set(0, 0, 0.0);
        out.set(1, 1, 0.0);
        out.set(2, 2, 0.0);
        out.set(0, 1, -v.z);
        out.set(0, 2, v.y);
        out.set(1, 0, v.z);
        out.set(1, 2, -v.x);
        out.set(2, 0, -v.y);
        out.set(2, 1, v.x);
        out
    }

    /// Translation column.
    #[must_use]
    pub fn translation(&self) -> Vector {
        Vector::new(self.get(0, 3), self.get(1, 3), self.get(2, 3))
    }

    pub fn set_translation(&mut self, t: &Vector) {
        self.set(0, 3, t.x);
        self.set(1, 3, t.y);
        self.set(2, 3, t.z);
    }

    /// Matrix product `self ∘ other`: `other` applied first.
    #[must_use]
    pub fn multiply(&self, other: &Self) -> Self {
        let mut out = Self::identity();
        self.multiply_into(other, &mut out);
        out
    }

    /// `out` may alias either input; operands are read before writing.
    pub fn multiply_into(&self, other: &Self, out: &mut Self) {
        let a = self.m;
        let b = other.m;
        let mut r = [0.0f32; 16];
        for col in 0..4 {
            for row in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += a[k * 4 + row] * b[col * 4 + k];
                }
                r[col * 4 + row] = sum;
            }
        }
        out.m = r;
    }

    #[must_use]
    pub fn transpose(&self) -> Self {
        let mut out = Self::identity();
        self.transpose_into(&mut out);
        out
    }

    /// `out` may alias the input.
    pub fn transpose_into(&self, out: &mut Self) {
        let a = self.m;
        let mut r = [0.0f32; 16];
        for col in 0..4 {
            for row in 0..4 {
                r[col * 4 + row] = a[row * 4 + col];
            }
        }
        out.m = r;
    }

    /// Transform a point (applies rotation and translation).
    #[must_use]
    pub fn transform_point(&self, p: &Vector) -> Vector {
        Vector::new(
            self.get(0, 0) * p.x + self.get(0, 1) * p.y + self.get(0, 2) * p.z + self.get(0, 3),
            self.get(1, 0) * p.x + self.get(1, 1) * p.y + self.get(1, 2) * p.z + self.get(1, 3),
            self.get(2, 0) * p.x + self.get(2, 1) * p.y + self.get(2, 2) * p.z + self.get(2, 3),
        )
    }

    /// Transform a direction (rotation only).
    #[must_use]
    pub fn transform_direction(&self, v: &Vector) -> Vector {
        Vector::new(
            self.get(0, 0) * v.x + self.get(0, 1) * v.y + self.get(0, 2) * v.z,
            self.get(1, 0) * v.x + self.get(1, 1) * v.y + self.get(1, 2) * v.z,
            self.get(2, 0) * v.x + self.get(2, 1) * v.y + self.get(2, 2) * v.z,
        )
    }

    /// Extract rotation, translation and non-negative scale from a composed
    /// transform.
    ///
    /// The quaternion comes from the standard trace-based extraction with
    /// four cases keyed on which diagonal element dominates. Callers rely on
    /// the sign continuity this exact branch selection produces, so the
    /// branch structure must not be "simplified".
    #[must_use]
    pub fn decompose(&self) -> (Quaternion, Vector, Vector) {
        let translation = self.translation();

        let sx = Vector::new(self.get(0, 0), self.get(1, 0), self.get(2, 0)).length();
        let sy = Vector::new(self.get(0, 1), self.get(1, 1), self.get(2, 1)).length();
        let sz = Vector::new(self.get(0, 2), self.get(1, 2), self.get(2, 2)).length();
        let scale = Vector::new(sx, sy, sz);

        let inv = |s: f32| if s < f32::EPSILON { 0.0 } else { 1.0 / s };
        let (ix, iy, iz) = (inv(sx), inv(sy), inv(sz));

        let m00 = self.get(0, 0) * ix;
        let m01 = self.get(0, 1) * iy;
        let m02 = self.get(0, 2) * iz;
        let m10 = self.get(1, 0) * ix;
        let m11 = self.get(1, 1) * iy;
        let m12 = self.get(1, 2) * iz;
        let m20 = self.get(2, 0) * ix;
        let m21 = self.get(2, 1) * iy;
        let m22 = self.get(2, 2) * iz;

        let trace = m00 + m11 + m22;
        let rotation = if trace > 0.0 {
            let s = 0.5 / (trace + 1.0).sqrt();
            Quaternion::new(
                (m21 - m12) * s,
                (m02 - m20) * s,
                (m10 - m01) * s,
                0.25 / s,
            )
        } else if m00 > m11 && m00 > m22 {
            let s = 2.0 * (1.0 + m00 - m11 - m22).sqrt();
            Quaternion::new(
                0.25 * s,
                (m01 + m10) / s,
                (m02 + m20) / s,
                (m21 - m12) / s,
            )
        } else if m11 > m22 {
            let s = 2.0 * (1.0 + m11 - m00 - m22).sqrt();
            Quaternion::new(
                (m01 + m10) / s,
                0.25 * s,
                (m12 + m21) / s,
                (m02 - m20) / s,
            )
        } else {
            let s = 2.0 * (1.0 + m22 - m00 - m11).sqrt();
            Quaternion::new(
                (m02 + m20) / s,
                (m12 + m21) / s,
                0.25 * s,
                (m10 - m01) / s,
            )
        };

        (rotation, translation, scale)
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

/// Time-indexed run of matrices, one buffer per element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatrixSequence {
    elements: Vec<[f32; 16]>,
}

impl MatrixSequence {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            elements: Vec::with_capacity(capacity),
        }
    }

    /// Length-1 sequence holding a single matrix.
    #[must_use]
    pub fn from_matrix(m: Matrix) -> Self {
        Self {
            elements: vec![m.m],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn push(&mut self, m: Matrix) {
        self.elements.push(m.m);
    }

    /// Read the matrix at a 1-based frame, clamping past-the-end frames.
    #[must_use]
    pub fn matrix_at_frame(&self, frame: usize) -> Matrix {
        let i = clamp_frame(frame, self.len());
        Matrix::from_array(self.elements[i])
    }

    /// Frame-wise product `self ∘ other` with last-frame broadcasting.
    /// Empty operands yield an empty result.
    #[must_use]
    pub fn multiply(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::default();
        }
        let len = broadcast_len(self.len(), other.len());
        let mut out = Self::with_capacity(len);
        for f in 1..=len {
            out.push(self.matrix_at_frame(f).multiply(&other.matrix_at_frame(f)));
        }
        out
    }

    /// Frame-wise transpose.
    #[must_use]
    pub fn transpose(&self) -> Self {
        let mut out = Self::with_capacity(self.len());
        for f in 1..=self.len() {
            out.push(self.matrix_at_frame(f).transpose());
        }
        out
    }
}
