//! Coordinate-space engine: builds custom reference frames and reprojects
//! points and orientations into them.
//!
//! A space is built once at construction and immutable afterward. The world
//! convention is +X forward, +Z up.

use nalgebra::{Matrix4 as NalgebraMatrix4, SymmetricEigen};

use crate::error::{ProcessingError, Result};
use crate::math::{broadcast_len, Matrix, MatrixSequence, Quaternion, Vector, VectorSequence};
use crate::segment::Segment;

/// Which two basis axes the primary and secondary inputs define. The third
/// axis is their cross product; all three are re-orthonormalized with the
/// primary axis kept exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    Xy,
    Yx,
    Zx,
    Xz,
    Yz,
    Zy,
}

impl AxisOrder {
    /// Parse the lowercase two-letter form used in pipeline options.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "xy" => Ok(Self::Xy),
            "yx" => Ok(Self::Yx),
            "zx" => Ok(Self::Zx),
            "xz" => Ok(Self::Xz),
            "yz" => Ok(Self::Yz),
            "zy" => Ok(Self::Zy),
            other => Err(ProcessingError::invalid_option(
                "order",
                format!("unknown axis order '{other}', expected one of xy|yx|zx|xz|yz|zy"),
            )),
        }
    }
}

/// Axis input: either a direction sequence, or a point pair whose
/// difference (end minus start) defines the direction per frame.
#[derive(Debug, Clone)]
pub enum AxisSpec {
    Direction(VectorSequence),
    PointPair {
        start: VectorSequence,
        end: VectorSequence,
    },
}

impl AxisSpec {
    fn resolve(&self) -> VectorSequence {
        match self {
            Self::Direction(seq) => seq.clone(),
            Self::PointPair { start, end } => end.subtract(start),
        }
    }
}

/// A custom 3D reference frame: origin plus rotation, per frame.
#[derive(Debug, Clone)]
pub struct Space {
    pub name: String,
    origin: VectorSequence,
    rotations: MatrixSequence,
    /// Axis inputs the space was built from, kept for introspection when
    /// user-defined. Empty for segment-aligned spaces.
    primary_axis: Option<VectorSequence>,
    secondary_axis: Option<VectorSequence>,
}

impl Space {
    /// Build a space from explicit axis inputs.
    ///
    /// The two inputs name the axes given by `order`; the remaining axis is
    /// their cross product and all three are re-orthonormalized. A missing
    /// origin defaults to the world origin.
    pub fn from_axes(
        name: impl Into<String>,
        primary: &AxisSpec,
        secondary: &AxisSpec,
        order: AxisOrder,
        origin: Option<VectorSequence>,
    ) -> Result<Self> {
        let p = primary.resolve();
        let s = secondary.resolve();
        if p.is_empty() || s.is_empty() {
            return Err(ProcessingError::insufficient_data(1, 0));
        }
        if origin.as_ref().is_some_and(VectorSequence::is_empty) {
            return Err(ProcessingError::invalid_option(
                "origin",
                "origin sequence has no frames",
            ));
        }

        let len = broadcast_len(p.len(), s.len());
        let mut rotations = MatrixSequence::with_capacity(len);
        for f in 1..=len {
            let basis = orthonormal_basis(
                &p.vector_at_frame(f),
                &s.vector_at_frame(f),
                order,
            );
            rotations.push(Matrix::from_basis(&basis.0, &basis.1, &basis.2));
        }

        Ok(Self {
            name: name.into(),
            origin: origin.unwrap_or_else(|| VectorSequence::from_vector(Vector::zero())),
            rotations,
            primary_axis: Some(p),
            secondary_axis: Some(s),
        })
    }

    /// Build a space aligned with a reference segment's average heading.
    ///
    /// The segment's rotation is averaged over all frames, the world forward
    /// axis is rotated by the average and flattened to the horizontal plane,
    /// and the heading snaps to the nearest of the four cardinal world-Z
    /// rotations (0 deg, 90 deg, 180 deg, -90 deg). The snap is intentional:
    /// downstream angles are reported in a cardinal frame, not an arbitrary
    /// heading.
    pub fn from_segment(name: impl Into<String>, segment: &Segment) -> Result<Self> {
        if segment.is_empty() {
            return Err(ProcessingError::insufficient_data(1, 0));
        }

        let average = average_rotation(&segment.rotations)?;
        let forward = average.rotate_vector(&Vector::new(1.0, 0.0, 0.0));
        let flat = Vector::new(forward.x, forward.y, 0.0).normalize();

        // Nearest cardinal direction in the horizontal plane.
        let candidates: [(Vector, f32); 4] = [
            (Vector::new(1.0, 0.0, 0.0), 0.0),
            (Vector::new(0.0, 1.0, 0.0), std::f32::consts::FRAC_PI_2),
            (Vector::new(-1.0, 0.0, 0.0), std::f32::consts::PI),
            (Vector::new(0.0, -1.0, 0.0), -std::f32::consts::FRAC_PI_2),
        ];
        let mut best = candidates[0].1;
        let mut best_dot = f32::NEG_INFINITY;
        for (dir, angle) in candidates {
            let dot = flat.dot(&dir);
            if dot > best_dot {
                best_dot = dot;
                best = angle;
            }
        }

        let (sin, cos) = best.sin_cos();
        let rotation = Matrix::from_basis(
            &Vector::new(cos, sin, 0.0),
            &Vector::new(-sin, cos, 0.0),
            &Vector::new(0.0, 0.0, 1.0),
        );

        Ok(Self {
            name: name.into(),
            origin: VectorSequence::from_vector(Vector::zero()),
            rotations: MatrixSequence::from_matrix(rotation),
            primary_axis: None,
            secondary_axis: None,
        })
    }

    #[must_use]
    pub fn origin(&self) -> &VectorSequence {
        &self.origin
    }

    #[must_use]
    pub fn rotations(&self) -> &MatrixSequence {
        &self.rotations
    }

    #[must_use]
    pub fn primary_axis(&self) -> Option<&VectorSequence> {
        self.primary_axis.as_ref()
    }

    #[must_use]
    pub fn secondary_axis(&self) -> Option<&VectorSequence> {
        self.secondary_axis.as_ref()
    }

    /// Reproject points into this space: subtract the origin (broadcasting
    /// the shorter sequence), then apply the transpose of the rotation.
    /// NaN input positions propagate NaN; an empty input yields an empty
    /// sequence.
    #[must_use]
    pub fn points_in_local_space(&self, points: &VectorSequence) -> VectorSequence {
        if points.is_empty() {
            return VectorSequence::default();
        }
        let len = broadcast_len(points.len(), self.origin.len());
        let mut out = VectorSequence::with_capacity(len);
        for f in 1..=len {
            let p = points
                .vector_at_frame(f)
                .subtract(&self.origin.vector_at_frame(f));
            let rotation = self.rotations.matrix_at_frame(f).transpose();
            out.push(rotation.transform_direction(&p));
        }
        out
    }

    /// Reproject a segment's full 6-DOF pose into this space. Frames with a
    /// NaN input position propagate NaN through both position and rotation
    /// rather than erroring; an empty segment comes back empty with its
    /// identity intact.
    #[must_use]
    pub fn segment_in_local_space(&self, segment: &Segment) -> Segment {
        if segment.is_empty() {
            let mut out = Segment::new(
                segment.name.clone(),
                VectorSequence::default(),
                crate::math::QuaternionSequence::default(),
            );
            out.parent = segment.parent.clone();
            out.parameters = segment.parameters;
            return out;
        }
        let len = broadcast_len(segment.len(), self.origin.len());
        let mut positions = VectorSequence::with_capacity(len);
        let mut rotations = crate::math::QuaternionSequence::with_capacity(len);

        for f in 1..=len {
            let (p, q) = segment.pose_at_frame(f);
            if p.is_nan() {
                positions.push(Vector::new(f32::NAN, f32::NAN, f32::NAN));
                rotations.push(Quaternion::new(f32::NAN, f32::NAN, f32::NAN, f32::NAN));
                continue;
            }

            let local_rotation = self.rotations.matrix_at_frame(f).transpose();
            positions.push(
                local_rotation.transform_direction(&p.subtract(&self.origin.vector_at_frame(f))),
            );
            let (rq, _, _) = local_rotation
                .multiply(&Matrix::from_quaternion(&q))
                .decompose();
            rotations.push(rq);
        }

        let mut out = Segment::new(segment.name.clone(), positions, rotations);
        out.parent = segment.parent.clone();
        out.parameters = segment.parameters;
        out
    }
}

/// Right-handed orthonormal basis from a primary and secondary direction.
/// The primary direction is kept exact.
fn orthonormal_basis(p: &Vector, s: &Vector, order: AxisOrder) -> (Vector, Vector, Vector) {
    let p = p.normalize();
    match order {
        AxisOrder::Xy => {
            let z = p.cross(s).normalize();
            let y = z.cross(&p);
            (p, y, z)
        }
        AxisOrder::Yx => {
            let z = s.cross(&p).normalize();
            let x = p.cross(&z);
            (x, p, z)
        }
        AxisOrder::Zx => {
            let y = p.cross(s).normalize();
            let x = y.cross(&p);
            (x, y, p)
        }
        AxisOrder::Xz => {
            let y = s.cross(&p).normalize();
            let z = p.cross(&y);
            (p, y, z)
        }
        AxisOrder::Yz => {
            let x = p.cross(s).normalize();
            let z = x.cross(&p);
            (x, p, z)
        }
        AxisOrder::Zy => {
            let x = s.cross(&p).normalize();
            let y = p.cross(&x);
            (x, y, p)
        }
    }
}

/// Average a rotation sequence: principal eigenvector of the quaternion
/// accumulator matrix. NaN frames are skipped.
fn average_rotation(rotations: &crate::math::QuaternionSequence) -> Result<Quaternion> {
    let mut acc = NalgebraMatrix4::<f32>::zeros();
    let mut used = 0usize;
    for f in 1..=rotations.len() {
        let q = rotations.quaternion_at_frame(f);
        if q.is_nan() {
            continue;
        }
        let v = nalgebra::Vector4::new(q.x, q.y, q.z, q.w);
        acc += v * v.transpose();
        used += 1;
    }
    if used == 0 {
        return Err(ProcessingError::numerical_instability(
            "cannot average an all-NaN rotation sequence",
        ));
    }

    let eigen = SymmetricEigen::new(acc);
    let mut best = 0;
    for i in 1..4 {
        if eigen.eigenvalues[i] > eigen.eigenvalues[best] {
            best = i;
        }
    }
    let col = eigen.eigenvectors.column(best);
    Ok(Quaternion::new(col[0], col[1], col[2], col[3]).normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::QuaternionSequence;
    use approx::assert_relative_eq;

    fn axis(v: Vector) -> AxisSpec {
        AxisSpec::Direction(VectorSequence::from_vector(v))
    }

    #[test]
    fn test_on_axis_point_round_trip() {
        // A point at unit distance along the primary axis reads (1, 0, 0)
        // in the space's local frame for an xy-ordered space.
        let space = Space::from_axes(
            "tilted",
            &axis(Vector::new(0.0, 1.0, 0.0)),
            &axis(Vector::new(-1.0, 0.0, 0.0)),
            AxisOrder::Xy,
            None,
        )
        .unwrap();

        let local =
            space.points_in_local_space(&VectorSequence::from_vector(Vector::new(0.0, 1.0, 0.0)));
        let p = local.vector_at_frame(1);
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(p.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_basis_right_handed_for_all_orders() {
        let p = Vector::new(0.3, 0.8, 0.1);
        let s = Vector::new(-0.5, 0.2, 0.9);
        for order in [
            AxisOrder::Xy,
            AxisOrder::Yx,
            AxisOrder::Zx,
            AxisOrder::Xz,
            AxisOrder::Yz,
            AxisOrder::Zy,
        ] {
            let (x, y, z) = orthonormal_basis(&p, &s, order);
            assert_relative_eq!(x.dot(&y), 0.0, epsilon = 1e-5);
            assert_relative_eq!(y.dot(&z), 0.0, epsilon = 1e-5);
            assert_relative_eq!(x.cross(&y).dot(&z), 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_origin_pair_difference() {
        let start = VectorSequence::from_vector(Vector::new(1.0, 0.0, 0.0));
        let end = VectorSequence::from_vector(Vector::new(3.0, 0.0, 0.0));
        let spec = AxisSpec::PointPair { start, end };
        let resolved = spec.resolve();
        assert_relative_eq!(resolved.vector_at_frame(1).x, 2.0);
    }

    #[test]
    fn test_segment_space_snaps_to_cardinal() {
        // A segment rotated ~80 deg about Z should snap to the 90 deg frame.
        let angle = 80f32.to_radians();
        let q = Quaternion::new(0.0, 0.0, (angle / 2.0).sin(), (angle / 2.0).cos());
        let n = 5;
        let seg = Segment::new(
            "pelvis",
            VectorSequence::new(vec![0.0; n], vec![0.0; n], vec![0.0; n]),
            QuaternionSequence::new(
                vec![q.x; n],
                vec![q.y; n],
                vec![q.z; n],
                vec![q.w; n],
            ),
        );
        let space = Space::from_segment("body", &seg).unwrap();

        // World +Y maps to local +X in a 90 deg frame.
        let local =
            space.points_in_local_space(&VectorSequence::from_vector(Vector::new(0.0, 1.0, 0.0)));
        let p = local.vector_at_frame(1);
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_nan_position_propagates_through_segment_projection() {
        let space = Space::from_axes(
            "plain",
            &axis(Vector::new(1.0, 0.0, 0.0)),
            &axis(Vector::new(0.0, 1.0, 0.0)),
            AxisOrder::Xy,
            None,
        )
        .unwrap();

        let seg = Segment::new(
            "foot",
            VectorSequence::new(vec![f32::NAN, 1.0], vec![0.0, 0.0], vec![0.0, 0.0]),
            QuaternionSequence::new(vec![0.0; 2], vec![0.0; 2], vec![0.0; 2], vec![1.0; 2]),
        );
        let local = space.segment_in_local_space(&seg);
        assert!(local.positions.x[0].is_nan());
        assert!(local.rotations.w[0].is_nan());
        assert_relative_eq!(local.positions.x[1], 1.0);
        assert_relative_eq!(local.rotations.w[1], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_empty_points_project_to_empty() {
        let space = Space::from_axes(
            "plain",
            &axis(Vector::new(1.0, 0.0, 0.0)),
            &axis(Vector::new(0.0, 1.0, 0.0)),
            AxisOrder::Xy,
            None,
        )
        .unwrap();
        assert!(space
            .points_in_local_space(&VectorSequence::default())
            .is_empty());

        let seg = Segment::new(
            "foot",
            VectorSequence::default(),
            QuaternionSequence::default(),
        )
        .with_parent("shank");
        let local = space.segment_in_local_space(&seg);
        assert!(local.is_empty());
        assert_eq!(local.parent.as_deref(), Some("shank"));
    }

    #[test]
    fn test_empty_origin_rejected() {
        let err = Space::from_axes(
            "plain",
            &axis(Vector::new(1.0, 0.0, 0.0)),
            &axis(Vector::new(0.0, 1.0, 0.0)),
            AxisOrder::Xy,
            Some(VectorSequence::default()),
        )
        .unwrap_err();
        assert_eq!(err.code(), "option-validation");
    }

    #[test]
    fn test_unknown_axis_order_rejected() {
        assert!(AxisOrder::parse("xx").is_err());
        assert!(AxisOrder::parse("yz").is_ok());
    }
}
