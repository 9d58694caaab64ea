//! Orientation engine: Cardan and proper-Euler angle extraction from
//! rotation sequences.
//!
//! Every decomposition has two algebraic solutions. Absolute extraction lets
//! the caller pick; relative extraction picks once, on the first usable
//! frame, by the smaller total angle magnitude, and applies that choice to
//! the whole sequence so the three series never switch branches mid-trial.

use std::f32::consts::{PI, TAU};

use crate::error::{ProcessingError, Result};
use crate::math::{broadcast_len, Matrix, Quaternion, QuaternionSequence};

/// Order of elemental rotations. The first six are Cardan (three distinct
/// axes), the rest are proper Euler (first axis repeated).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOrder {
    Xyz,
    Xzy,
    Yxz,
    Yzx,
    Zxy,
    Zyx,
    Xyx,
    Xzx,
    Yxy,
    Yzy,
    Zxz,
    Zyz,
}

impl RotationOrder {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "xyz" => Ok(Self::Xyz),
            "xzy" => Ok(Self::Xzy),
            "yxz" => Ok(Self::Yxz),
            "yzx" => Ok(Self::Yzx),
            "zxy" => Ok(Self::Zxy),
            "zyx" => Ok(Self::Zyx),
            "xyx" => Ok(Self::Xyx),
            "xzx" => Ok(Self::Xzx),
            "yxy" => Ok(Self::Yxy),
            "yzy" => Ok(Self::Yzy),
            "zxz" => Ok(Self::Zxz),
            "zyz" => Ok(Self::Zyz),
            other => Err(ProcessingError::invalid_option(
                "order",
                format!("unknown rotation order '{other}'"),
            )),
        }
    }

    /// Axis indices (0 = x, 1 = y, 2 = z) in application order, plus the
    /// parity of the permutation: +1 when (i, j, k) is a cyclic permutation
    /// of (0, 1, 2). For proper-Euler orders k is the unused third axis.
    const fn axes(self) -> (usize, usize, usize, f32) {
        match self {
            Self::Xyz => (0, 1, 2, 1.0),
            Self::Xzy => (0, 2, 1, -1.0),
            Self::Yxz => (1, 0, 2, -1.0),
            Self::Yzx => (1, 2, 0, 1.0),
            Self::Zxy => (2, 0, 1, 1.0),
            Self::Zyx => (2, 1, 0, -1.0),
            Self::Xyx => (0, 1, 2, 1.0),
            Self::Xzx => (0, 2, 1, -1.0),
            Self::Yxy => (1, 0, 2, -1.0),
            Self::Yzy => (1, 2, 0, 1.0),
            Self::Zxz => (2, 0, 1, 1.0),
            Self::Zyz => (2, 1, 0, -1.0),
        }
    }

    const fn is_cardan(self) -> bool {
        matches!(
            self,
            Self::Xyz | Self::Xzy | Self::Yxz | Self::Yzx | Self::Zxy | Self::Zyx
        )
    }
}

/// Which of the two algebraic decomposition branches to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EulerSolution {
    #[default]
    First,
    Second,
}

/// Wrap an angle to (-pi, pi].
fn wrap_angle(a: f32) -> f32 {
    let mut a = a % TAU;
    if a <= -PI {
        a += TAU;
    } else if a > PI {
        a -= TAU;
    }
    a
}

/// Extract both decomposition branches from a rotation matrix.
///
/// Indexing is r(row, col) on the rotation submatrix. For a Cardan order
/// (i, j, k) with parity e the middle angle comes from asin(e * r(i, k));
/// for a proper-Euler order it comes from acos(r(i, i)).
fn extract(m: &Matrix, order: RotationOrder) -> ([f32; 3], [f32; 3]) {
    let (i, j, k, e) = order.axes();
    let r = |row: usize, col: usize| m.get(row, col);

    if order.is_cardan() {
        let t2 = (e * r(i, k)).clamp(-1.0, 1.0).asin();
        let t1 = (-e * r(j, k)).atan2(r(k, k));
        let t3 = (-e * r(i, j)).atan2(r(i, i));
        let first = [t1, t2, t3];
        let second = [
            wrap_angle(t1 + PI),
            wrap_angle(PI - t2),
            wrap_angle(t3 + PI),
        ];
        (first, second)
    } else {
        let t2 = r(i, i).clamp(-1.0, 1.0).acos();
        let t1 = r(j, i).atan2(-e * r(k, i));
        let t3 = r(i, j).atan2(e * r(i, k));
        let first = [t1, t2, t3];
        let second = [wrap_angle(t1 + PI), -t2, wrap_angle(t3 + PI)];
        (first, second)
    }
}

/// Extract the angle triplet of a single rotation matrix. Recomposing the
/// returned angles in the same order reproduces the rotation for either
/// solution.
#[must_use]
pub fn euler_from_matrix(m: &Matrix, order: RotationOrder, solution: EulerSolution) -> [f32; 3] {
    let (first, second) = extract(m, order);
    match solution {
        EulerSolution::First => first,
        EulerSolution::Second => second,
    }
}

/// Extract per-frame angles from a rotation sequence. NaN quaternions yield
/// NaN angle triplets.
#[must_use]
pub fn euler_angles(
    rotations: &QuaternionSequence,
    order: RotationOrder,
    solution: EulerSolution,
) -> [Vec<f32>; 3] {
    let len = rotations.len();
    let mut out = [
        Vec::with_capacity(len),
        Vec::with_capacity(len),
        Vec::with_capacity(len),
    ];
    for f in 1..=len {
        let q = rotations.quaternion_at_frame(f);
        let angles = if q.is_nan() {
            [f32::NAN; 3]
        } else {
            euler_from_matrix(&Matrix::from_quaternion(&q.normalize()), order, solution)
        };
        for axis in 0..3 {
            out[axis].push(angles[axis]);
        }
    }
    out
}

/// Extract the per-frame angles of `child` relative to `parent`.
///
/// The relative rotation is conj(parent) * child. The decomposition branch
/// is chosen on the first finite frame by the smaller sum of absolute
/// angles and then held for the rest of the sequence.
pub fn relative_euler_angles(
    parent: &QuaternionSequence,
    child: &QuaternionSequence,
    order: RotationOrder,
) -> Result<[Vec<f32>; 3]> {
    if parent.is_empty() || child.is_empty() {
        return Err(ProcessingError::insufficient_data(1, 0));
    }

    let len = broadcast_len(parent.len(), child.len());
    let mut relative = QuaternionSequence::with_capacity(len);
    for f in 1..=len {
        relative.push(
            parent
                .quaternion_at_frame(f)
                .conjugate()
                .multiply(&child.quaternion_at_frame(f)),
        );
    }
    ensure_continuity(&mut relative);

    let mut solution = EulerSolution::First;
    for f in 1..=len {
        let q = relative.quaternion_at_frame(f);
        if q.is_nan() {
            continue;
        }
        let (first, second) = extract(&Matrix::from_quaternion(&q.normalize()), order);
        let magnitude = |a: &[f32; 3]| a.iter().map(|v| v.abs()).sum::<f32>();
        if magnitude(&second) < magnitude(&first) {
            solution = EulerSolution::Second;
        }
        break;
    }

    Ok(euler_angles(&relative, order, solution))
}

/// Flip quaternion signs in place so consecutive frames stay on the same
/// hemisphere. A frame is flipped when the half-angle to its predecessor
/// exceeds pi/2. Idempotent; NaN frames are left untouched and do not
/// update the reference.
pub fn ensure_continuity(rotations: &mut QuaternionSequence) {
    let len = rotations.len();
    if len < 2 {
        return;
    }
    let mut prev: Option<Quaternion> = None;
    for f in 1..=len {
        let q = rotations.quaternion_at_frame(f);
        if q.is_nan() {
            continue;
        }
        if let Some(p) = prev {
            let rel = p.conjugate().multiply(&q);
            let half = rel.w.clamp(-1.0, 1.0).acos();
            if half > PI / 2.0 {
                let flipped = q.negate();
                rotations.set_quaternion_at_frame(f, flipped);
                prev = Some(flipped);
                continue;
            }
        }
        prev = Some(q);
    }
}

/// Remove artificial jumps from a wrapped angle series.
///
/// Whenever a frame-to-frame delta exceeds `threshold`, an offset of the
/// nearest whole number of `range` periods (at least one) is folded in with
/// the opposite sign. The unwrapped series is then rigidly shifted so the
/// sample at `align_index` keeps its original value.
pub fn unwrap_angles(
    series: &[f32],
    align_index: usize,
    range: f32,
    threshold: f32,
) -> Result<Vec<f32>> {
    if series.is_empty() {
        return Err(ProcessingError::insufficient_data(1, 0));
    }
    if align_index >= series.len() {
        return Err(ProcessingError::invalid_input(format!(
            "align index {align_index} out of range for {} samples",
            series.len()
        )));
    }
    if range <= 0.0 || threshold <= 0.0 {
        return Err(ProcessingError::invalid_option(
            "range",
            "unwrap range and threshold must be positive",
        ));
    }

    let mut out = Vec::with_capacity(series.len());
    let mut offset = 0.0f32;
    out.push(series[0]);
    for t in 1..series.len() {
        let delta = series[t] - series[t - 1];
        if delta.is_finite() && delta.abs() > threshold {
            let periods = (delta.abs() / range).round().max(1.0);
            offset -= delta.signum() * periods * range;
        }
        out.push(series[t] + offset);
    }

    let shift = series[align_index] - out[align_index];
    if shift != 0.0 {
        for v in &mut out {
            *v += shift;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    fn quat_about(axis: usize, angle: f32) -> Quaternion {
        let (s, c) = (angle / 2.0).sin_cos();
        match axis {
            0 => Quaternion::new(s, 0.0, 0.0, c),
            1 => Quaternion::new(0.0, s, 0.0, c),
            _ => Quaternion::new(0.0, 0.0, s, c),
        }
    }

    fn compose(order: RotationOrder, angles: [f32; 3]) -> Quaternion {
        let names: [usize; 3] = match order {
            RotationOrder::Xyz => [0, 1, 2],
            RotationOrder::Xzy => [0, 2, 1],
            RotationOrder::Yxz => [1, 0, 2],
            RotationOrder::Yzx => [1, 2, 0],
            RotationOrder::Zxy => [2, 0, 1],
            RotationOrder::Zyx => [2, 1, 0],
            RotationOrder::Xyx => [0, 1, 0],
            RotationOrder::Xzx => [0, 2, 0],
            RotationOrder::Yxy => [1, 0, 1],
            RotationOrder::Yzy => [1, 2, 1],
            RotationOrder::Zxz => [2, 0, 2],
            RotationOrder::Zyz => [2, 1, 2],
        };
        quat_about(names[0], angles[0])
            .multiply(&quat_about(names[1], angles[1]))
            .multiply(&quat_about(names[2], angles[2]))
    }

    const ALL_ORDERS: [RotationOrder; 12] = [
        RotationOrder::Xyz,
        RotationOrder::Xzy,
        RotationOrder::Yxz,
        RotationOrder::Yzx,
        RotationOrder::Zxy,
        RotationOrder::Zyx,
        RotationOrder::Xyx,
        RotationOrder::Xzx,
        RotationOrder::Yxy,
        RotationOrder::Yzy,
        RotationOrder::Zxz,
        RotationOrder::Zyz,
    ];

    #[test]
    fn test_extract_recovers_composed_angles() {
        let angles = [0.3, 0.5, -0.4];
        for order in ALL_ORDERS {
            let q = compose(order, angles);
            let seq = QuaternionSequence::from_quaternion(q);
            let out = euler_angles(&seq, order, EulerSolution::First);
            for axis in 0..3 {
                assert_relative_eq!(out[axis][0], angles[axis], epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_both_solutions_rebuild_same_rotation() {
        let angles = [0.7, 0.9, -0.2];
        for order in ALL_ORDERS {
            let q = compose(order, angles);
            let seq = QuaternionSequence::from_quaternion(q);
            let a = euler_angles(&seq, order, EulerSolution::First);
            let b = euler_angles(&seq, order, EulerSolution::Second);
            let qa = compose(order, [a[0][0], a[1][0], a[2][0]]);
            let qb = compose(order, [b[0][0], b[1][0], b[2][0]]);
            // Same rotation up to quaternion sign.
            assert_relative_eq!(qa.dot(&qb).abs(), 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_nan_quaternion_yields_nan_angles() {
        let mut seq = QuaternionSequence::from_quaternion(quat_about(2, 0.4));
        seq.push(Quaternion::new(f32::NAN, 0.0, 0.0, 1.0));
        let out = euler_angles(&seq, RotationOrder::Zyx, EulerSolution::First);
        assert!(out[0][0].is_finite());
        assert!(out[0][1].is_nan() && out[1][1].is_nan() && out[2][1].is_nan());
    }

    #[test]
    fn test_relative_angles_identity_parent() {
        let parent = QuaternionSequence::from_quaternion(Quaternion::identity());
        let child = QuaternionSequence::from_quaternion(compose(RotationOrder::Zxy, [0.2, 0.1, 0.3]));
        let out = relative_euler_angles(&parent, &child, RotationOrder::Zxy).unwrap();
        assert_relative_eq!(out[0][0], 0.2, epsilon = 1e-4);
        assert_relative_eq!(out[1][0], 0.1, epsilon = 1e-4);
        assert_relative_eq!(out[2][0], 0.3, epsilon = 1e-4);
    }

    #[test]
    fn test_relative_solution_held_across_frames() {
        // First frame picks a branch; a later frame near the alternate
        // branch must not switch.
        let parent = QuaternionSequence::from_quaternion(Quaternion::identity());
        let mut child = QuaternionSequence::with_capacity(2);
        child.push(compose(RotationOrder::Xyz, [0.1, 0.2, 0.1]));
        child.push(compose(RotationOrder::Xyz, [0.1, 0.25, 0.1]));
        let out = relative_euler_angles(&parent, &child, RotationOrder::Xyz).unwrap();
        assert_relative_eq!(out[1][0], 0.2, epsilon = 1e-4);
        assert_relative_eq!(out[1][1], 0.25, epsilon = 1e-4);
    }

    #[test]
    fn test_continuity_flips_hemisphere_jump() {
        let q = quat_about(2, 0.4);
        let mut seq = QuaternionSequence::from_quaternion(q);
        seq.push(quat_about(2, 0.5).negate());
        ensure_continuity(&mut seq);
        let fixed = seq.quaternion_at_frame(2);
        assert!(fixed.w > 0.0);

        // Running it again changes nothing.
        let before = seq.clone();
        ensure_continuity(&mut seq);
        assert_eq!(before, seq);
    }

    #[test]
    fn test_unwrap_removes_period_jump() {
        let series = [3.0, 3.1, -3.1, -3.0];
        let out = unwrap_angles(&series, 0, TAU, PI).unwrap();
        assert_relative_eq!(out[0], 3.0);
        assert_relative_eq!(out[2], TAU - 3.1, epsilon = 1e-5);
        assert!(out.windows(2).all(|w| (w[1] - w[0]).abs() < 1.0));
    }

    #[test]
    fn test_unwrap_aligns_to_requested_sample() {
        let series = [3.0, 3.1, -3.1, -3.0];
        let out = unwrap_angles(&series, 2, TAU, PI).unwrap();
        assert_relative_eq!(out[2], -3.1);
        assert_relative_eq!(out[0], 3.0 - TAU, epsilon = 1e-5);
    }

    #[test]
    fn test_unwrap_rejects_bad_inputs() {
        assert!(unwrap_angles(&[], 0, TAU, PI).is_err());
        assert!(unwrap_angles(&[1.0], 3, TAU, PI).is_err());
        assert!(unwrap_angles(&[1.0], 0, -1.0, PI).is_err());
    }

    #[test]
    fn test_gimbal_region_middle_angle_clamped() {
        let q = compose(RotationOrder::Xyz, [0.0, FRAC_PI_2, 0.0]);
        let seq = QuaternionSequence::from_quaternion(q);
        let out = euler_angles(&seq, RotationOrder::Xyz, EulerSolution::First);
        assert_relative_eq!(out[1][0], FRAC_PI_2, epsilon = 1e-3);
        assert!(out[0][0].is_finite() && out[2][0].is_finite());
    }
}
