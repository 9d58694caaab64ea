//! Quaternion value type and its frame-indexed sequence.
//!
//! Multiplication order is fixed as `self ∘ other` (apply `other` first,
//! then `self`). Swapping operand order silently changes results, so the
//! order is part of the contract.

use serde::{Deserialize, Serialize};

use super::vector::Vector;
use super::{broadcast_len, clamp_frame};

/// Rotation quaternion with components `(x, y, z, w)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    #[must_use]
    pub const fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    #[must_use]
    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }

    #[must_use]
    pub fn dot(&self, other: &Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    #[must_use]
    pub fn normalize(&self) -> Self {
        let mut out = Self::identity();
        self.normalize_into(&mut out);
        out
    }

    /// `out` may alias the input. A zero quaternion normalizes to identity.
    pub fn normalize_into(&self, out: &mut Self) {
        let len = self.length();
        if len < f32::EPSILON {
            *out = Self::identity();
        } else {
            out.x = self.x / len;
            out.y = self.y / len;
            out.z = self.z / len;
            out.w = self.w / len;
        }
    }

    /// For unit quaternions the conjugate is the inverse rotation.
    #[must_use]
    pub fn conjugate(&self) -> Self {
        Self::new(-self.x, -self.y, -self.z, self.w)
    }

    /// Quaternion product `self ∘ other`: `other` applied first.
    #[must_use]
    pub fn multiply(&self, other: &Self) -> Self {
        let mut out = Self::identity();
        self.multiply_into(other, &mut out);
        out
    }

    /// `out` may alias either input; operands are read before writing.
    pub fn multiply_into(&self, other: &Self, out: &mut Self) {
        let (ax, ay, az, aw) = (self.x, self.y, self.z, self.w);
        let (bx, by, bz, bw) = (other.x, other.y, other.z, other.w);
        out.x = aw * bx + ax * bw + ay * bz - az * by;
        out.y = aw * by - ax * bz + ay * bw + az * bx;
        out.z = aw * bz + ax * by - ay * bx + az * bw;
        out.w = aw * bw - ax * bx - ay * by - az * bz;
    }

    /// Rotate a vector by this (unit) quaternion.
    #[must_use]
    pub fn rotate_vector(&self, v: &Vector) -> Vector {
        // q * (v, 0) * q^-1 expanded to avoid building temporaries.
        let u = Vector::new(self.x, self.y, self.z);
        let uv = u.cross(v);
        let uuv = u.cross(&uv);
        Vector::new(
            v.x + 2.0 * (uv.x * self.w + uuv.x),
            v.y + 2.0 * (uv.y * self.w + uuv.y),
            v.z + 2.0 * (uv.z * self.w + uuv.z),
        )
    }

    /// Flip the sign of every component. Represents the same rotation.
    #[must_use]
    pub fn negate(&self) -> Self {
        Self::new(-self.x, -self.y, -self.z, -self.w)
    }

    #[must_use]
    pub fn is_nan(&self) -> bool {
        self.x.is_nan() || self.y.is_nan() || self.z.is_nan() || self.w.is_nan()
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

/// Time-indexed run of quaternions, one buffer per component.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuaternionSequence {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub z: Vec<f32>,
    pub w: Vec<f32>,
}

impl QuaternionSequence {
    /// Component names, in flat-buffer order.
    pub const COMPONENTS: [&'static str; 4] = ["rx", "ry", "rz", "rw"];

    /// # Panics
    ///
    /// Panics if the component buffers differ in length.
    #[must_use]
    pub fn new(x: Vec<f32>, y: Vec<f32>, z: Vec<f32>, w: Vec<f32>) -> Self {
        assert_eq!(x.len(), y.len());
        assert_eq!(x.len(), z.len());
        assert_eq!(x.len(), w.len());
        Self { x, y, z, w }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            x: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
            z: Vec::with_capacity(capacity),
            w: Vec::with_capacity(capacity),
        }
    }

    /// Length-1 sequence holding a single quaternion.
    #[must_use]
    pub fn from_quaternion(q: Quaternion) -> Self {
        Self {
            x: vec![q.x],
            y: vec![q.y],
            z: vec![q.z],
            w: vec![q.w],
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

    pub fn push(&mut self, q: Quaternion) {
        self.x.push(q.x);
        self.y.push(q.y);
        self.z.push(q.z);
        self.w.push(q.w);
    }

    /// Read the quaternion at a 1-based frame, clamping past-the-end frames.
    #[must_use]
    pub fn quaternion_at_frame(&self, frame: usize) -> Quaternion {
        let i = clamp_frame(frame, self.len());
        Quaternion::new(self.x[i], self.y[i], self.z[i], self.w[i])
    }

    /// Overwrite the quaternion at a 1-based, in-range frame.
    pub fn set_quaternion_at_frame(&mut self, frame: usize, q: Quaternion) {
        let i = clamp_frame(frame, self.len());
        self.x[i] = q.x;
        self.y[i] = q.y;
        self.z[i] = q.z;
        self.w[i] = q.w;
    }

    /// Named component buffer, if any.
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&[f32]> {
        match name {
            "rx" => Some(&self.x),
            "ry" => Some(&self.y),
            "rz" => Some(&self.z),
            "rw" => Some(&self.w),
            _ => None,
        }
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
            out.push(
                self.quaternion_at_frame(f)
                    .multiply(&other.quaternion_at_frame(f)),
            );
        }
        out
    }

    /// Frame-wise conjugate.
    #[must_use]
    pub fn conjugate(&self) -> Self {
        let mut out = Self::with_capacity(self.len());
        for f in 1..=self.len() {
            out.push(self.quaternion_at_frame(f).conjugate());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    fn quat_about_z(angle: f32) -> Quaternion {
        Quaternion::new(0.0, 0.0, (angle / 2.0).sin(), (angle / 2.0).cos())
    }

    #[test]
    fn test_multiply_identity() {
        let q = quat_about_z(1.0);
        let r = q.multiply(&Quaternion::identity());
        assert_relative_eq!(r.z, q.z);
        assert_relative_eq!(r.w, q.w);
    }

    #[test]
    fn test_multiply_order() {
        // 90 deg about z then 90 deg about x is not commutative.
        let qz = quat_about_z(FRAC_PI_2);
        let qx = Quaternion::new((FRAC_PI_2 / 2.0).sin(), 0.0, 0.0, (FRAC_PI_2 / 2.0).cos());
        let ab = qz.multiply(&qx);
        let ba = qx.multiply(&qz);
        assert!((ab.dot(&ba)).abs() < 0.999);
    }

    #[test]
    fn test_rotate_vector() {
        let q = quat_about_z(FRAC_PI_2);
        let v = q.rotate_vector(&Vector::new(1.0, 0.0, 0.0));
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(v.y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_conjugate_inverse() {
        let q = quat_about_z(0.7).normalize();
        let id = q.multiply(&q.conjugate());
        assert_relative_eq!(id.w, 1.0, epsilon = 1e-6);
        assert_relative_eq!(id.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_sequence_clamping() {
        let seq = QuaternionSequence::from_quaternion(quat_about_z(0.5));
        assert_eq!(seq.quaternion_at_frame(1), seq.quaternion_at_frame(50));
    }

    #[test]
    fn test_multiply_into_aliasing() {
        let mut a = quat_about_z(0.3);
        let b = quat_about_z(0.2);
        let expected = a.multiply(&b);
        let a_copy = a;
        a_copy.multiply_into(&b, &mut a);
        assert_relative_eq!(a.z, expected.z);
        assert_relative_eq!(a.w, expected.w);
    }
}
