//! Plane value type (`ax + by + cz + d = 0`) and its frame-indexed sequence.

use super::vector::{Vector, VectorSequence};
use super::{broadcast_len, clamp_frame};

/// Plane in implicit form with unit normal `(a, b, c)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Plane {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
}

impl Plane {
    #[must_use]
    pub const fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self { a, b, c, d }
    }

    /// Plane through three points. Degenerate (collinear) points yield a
    /// plane with a NaN normal, which propagates like any missing sample.
    #[must_use]
    pub fn from_points(p1: &Vector, p2: &Vector, p3: &Vector) -> Self {
        let u = p2.subtract(p1);
        let v = p3.subtract(p1);
        let n = u.cross(&v);
        let len = n.length();
        if len < f32::EPSILON {
            return Self::new(f32::NAN, f32::NAN, f32::NAN, f32::NAN);
        }
        let n = n.scale(1.0 / len);
        Self::new(n.x, n.y, n.z, -n.dot(p1))
    }

    #[must_use]
    pub const fn normal(&self) -> Vector {
        Vector::new(self.a, self.b, self.c)
    }

    /// Signed distance from a point to the plane.
    #[must_use]
    pub fn signed_distance(&self, p: &Vector) -> f32 {
        self.a * p.x + self.b * p.y + self.c * p.z + self.d
    }

    /// Orthogonal projection of a point onto the plane.
    #[must_use]
    pub fn project_point(&self, p: &Vector) -> Vector {
        let dist = self.signed_distance(p);
        Vector::new(
            p.x - dist * self.a,
            p.y - dist * self.b,
            p.z - dist * self.c,
        )
    }

    #[must_use]
    pub fn is_nan(&self) -> bool {
        self.a.is_nan() || self.b.is_nan() || self.c.is_nan() || self.d.is_nan()
    }
}

/// Time-indexed run of planes, one buffer per coefficient.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaneSequence {
    pub a: Vec<f32>,
    pub b: Vec<f32>,
    pub c: Vec<f32>,
    pub d: Vec<f32>,
}

impl PlaneSequence {
    /// Component names, in flat-buffer order.
    pub const COMPONENTS: [&'static str; 4] = ["a", "b", "c", "d"];

    /// # Panics
    ///
    /// Panics if the coefficient buffers differ in length.
    #[must_use]
    pub fn new(a: Vec<f32>, b: Vec<f32>, c: Vec<f32>, d: Vec<f32>) -> Self {
        assert_eq!(a.len(), b.len());
        assert_eq!(a.len(), c.len());
        assert_eq!(a.len(), d.len());
        Self { a, b, c, d }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            a: Vec::with_capacity(capacity),
            b: Vec::with_capacity(capacity),
            c: Vec::with_capacity(capacity),
            d: Vec::with_capacity(capacity),
        }
    }

    /// Plane per frame through three point sequences, with last-frame
    /// broadcasting across the three.
    #[must_use]
    pub fn from_point_sequences(
        p1: &VectorSequence,
        p2: &VectorSequence,
        p3: &VectorSequence,
    ) -> Self {
        if p1.is_empty() || p2.is_empty() || p3.is_empty() {
            return Self::default();
        }
        let len = broadcast_len(broadcast_len(p1.len(), p2.len()), p3.len());
        let mut out = Self::with_capacity(len);
        for f in 1..=len {
            out.push(Plane::from_points(
                &p1.vector_at_frame(f),
                &p2.vector_at_frame(f),
                &p3.vector_at_frame(f),
            ));
        }
        out
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.a.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    pub fn push(&mut self, p: Plane) {
        self.a.push(p.a);
        self.b.push(p.b);
        self.c.push(p.c);
        self.d.push(p.d);
    }

    /// Read the plane at a 1-based frame, clamping past-the-end frames.
    #[must_use]
    pub fn plane_at_frame(&self, frame: usize) -> Plane {
        let i = clamp_frame(frame, self.len());
        Plane::new(self.a[i], self.b[i], self.c[i], self.d[i])
    }

    /// Named coefficient buffer, if any.
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&[f32]> {
        match name {
            "a" => Some(&self.a),
            "b" => Some(&self.b),
            "c" => Some(&self.c),
            "d" => Some(&self.d),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_points_xy_plane() {
        let p = Plane::from_points(
            &Vector::new(0.0, 0.0, 0.0),
            &Vector::new(1.0, 0.0, 0.0),
            &Vector::new(0.0, 1.0, 0.0),
        );
        assert_relative_eq!(p.c.abs(), 1.0);
        assert_relative_eq!(p.d, 0.0);
    }

    #[test]
    fn test_project_point() {
        let p = Plane::from_points(
            &Vector::new(0.0, 0.0, 0.0),
            &Vector::new(1.0, 0.0, 0.0),
            &Vector::new(0.0, 1.0, 0.0),
        );
        let projected = p.project_point(&Vector::new(0.5, 0.5, 3.0));
        assert_relative_eq!(projected.z, 0.0, epsilon = 1e-6);
        assert_relative_eq!(projected.x, 0.5);
    }

    #[test]
    fn test_degenerate_points_give_nan() {
        let p = Plane::from_points(
            &Vector::new(0.0, 0.0, 0.0),
            &Vector::new(1.0, 0.0, 0.0),
            &Vector::new(2.0, 0.0, 0.0),
        );
        assert!(p.is_nan());
    }

    #[test]
    fn test_sequence_broadcast() {
        let fixed = VectorSequence::from_vector(Vector::new(0.0, 0.0, 0.0));
        let moving = VectorSequence::new(vec![1.0, 1.0], vec![0.0, 0.5], vec![0.0, 0.0]);
        let third = VectorSequence::from_vector(Vector::new(0.0, 1.0, 0.0));
        let planes = PlaneSequence::from_point_sequences(&fixed, &moving, &third);
        assert_eq!(planes.len(), 2);
    }
}
