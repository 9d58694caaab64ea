//! End-to-end properties of the computation core.
//!
//! These tests exercise the public surface the way a pipeline does:
//! synthetic gait-like recordings flow through spaces, angle extraction and
//! peak detection, and the documented contracts are checked at the output.

use std::f32::consts::{FRAC_PI_2, PI, TAU};
use std::sync::Arc;

use approx::assert_relative_eq;
use kinemetry::{
    ensure_continuity, euler_angles, find_peaks, relative_euler_angles, unwrap_angles, AxisOrder,
    AxisSpec, CycleSpan, EulerSolution, Matrix, PeakOptions, Quaternion, QuaternionSequence,
    RotationOrder, Segment, Signal, SignalValue, Space, Vector, VectorSequence,
};

// =============================================================================
// GENERATORS
// =============================================================================

/// Quaternion for a rotation about one world axis.
fn quat_about(axis: usize, angle: f32) -> Quaternion {
    let (s, c) = (angle / 2.0).sin_cos();
    match axis {
        0 => Quaternion::new(s, 0.0, 0.0, c),
        1 => Quaternion::new(0.0, s, 0.0, c),
        _ => Quaternion::new(0.0, 0.0, s, c),
    }
}

/// A sinusoidal flexion trace sampled at `rate` Hz for `seconds` seconds,
/// one bump per period.
fn flexion_trace(rate: f32, seconds: f32, period: f32) -> Vec<f32> {
    let n = (rate * seconds) as usize;
    (0..n)
        .map(|i| {
            let t = i as f32 / rate;
            (TAU * t / period).sin().max(0.0)
        })
        .collect()
}

/// A segment swinging about the z axis.
fn swinging_segment(n: usize, amplitude: f32) -> Segment {
    let mut positions = VectorSequence::with_capacity(n);
    let mut rotations = QuaternionSequence::with_capacity(n);
    for i in 0..n {
        let phase = TAU * i as f32 / n as f32;
        positions.push(Vector::new(phase.cos(), phase.sin(), 1.0));
        rotations.push(quat_about(2, amplitude * phase.sin()));
    }
    Segment::new("thigh", positions, rotations)
}

// =============================================================================
// SEQUENCE ALGEBRA
// =============================================================================

#[test]
fn test_frame_reads_past_the_end_clamp() {
    let seq = VectorSequence::new(vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]);
    for frame in [2, 3, 10, 1000] {
        assert_eq!(seq.vector_at_frame(frame), seq.vector_at_frame(2));
    }
}

#[test]
fn test_quaternion_matrix_round_trip_preserves_sign_family() {
    let q = Quaternion::new(1.0, 2.0, 3.0, 4.0).normalize();
    let (recovered, _, _) = Matrix::from_quaternion(&q).decompose();
    // Same or negated quaternion represents the same rotation.
    assert_relative_eq!(recovered.dot(&q).abs(), 1.0, epsilon = 1e-5);
}

#[test]
fn test_broadcasting_repeats_last_frame() {
    let long = VectorSequence::new(vec![1.0, 2.0, 3.0], vec![0.0; 3], vec![0.0; 3]);
    let short = VectorSequence::from_vector(Vector::new(10.0, 0.0, 0.0));
    let sum = long.add(&short);
    assert_eq!(sum.len(), 3);
    assert_relative_eq!(sum.vector_at_frame(3).x, 13.0);
}

// =============================================================================
// ORIENTATION
// =============================================================================

#[test]
fn test_euler_round_trip_reproduces_rotation() {
    let orders = [
        RotationOrder::Xyz,
        RotationOrder::Zyx,
        RotationOrder::Zxy,
        RotationOrder::Zxz,
        RotationOrder::Yzy,
    ];
    let seq = QuaternionSequence::from_quaternion(
        quat_about(2, 0.6).multiply(&quat_about(0, 0.4)).multiply(&quat_about(1, -0.3)),
    );
    for order in orders {
        for solution in [EulerSolution::First, EulerSolution::Second] {
            let angles = euler_angles(&seq, order, solution);
            let rebuilt = recompose(order, [angles[0][0], angles[1][0], angles[2][0]]);
            let original = seq.quaternion_at_frame(1);
            assert_relative_eq!(rebuilt.dot(&original).abs(), 1.0, epsilon = 1e-4);
        }
    }
}

fn recompose(order: RotationOrder, angles: [f32; 3]) -> Quaternion {
    let axes: [usize; 3] = match order {
        RotationOrder::Xyz => [0, 1, 2],
        RotationOrder::Zyx => [2, 1, 0],
        RotationOrder::Zxy => [2, 0, 1],
        RotationOrder::Zxz => [2, 0, 2],
        RotationOrder::Yzy => [1, 2, 1],
        _ => unreachable!(),
    };
    quat_about(axes[0], angles[0])
        .multiply(&quat_about(axes[1], angles[1]))
        .multiply(&quat_about(axes[2], angles[2]))
}

#[test]
fn test_continuity_is_idempotent_and_noop_on_smooth_input() {
    let mut smooth = QuaternionSequence::with_capacity(50);
    for i in 0..50 {
        smooth.push(quat_about(2, 0.02 * i as f32));
    }
    let original = smooth.clone();
    ensure_continuity(&mut smooth);
    assert_eq!(smooth, original);

    // Introduce sign flips and check idempotence.
    let mut flipped = original.clone();
    for f in [10, 11, 30] {
        let q = flipped.quaternion_at_frame(f).negate();
        flipped.set_quaternion_at_frame(f, q);
    }
    ensure_continuity(&mut flipped);
    let once = flipped.clone();
    ensure_continuity(&mut flipped);
    assert_eq!(flipped, once);
    assert_eq!(flipped, original);
}

#[test]
fn test_unwrap_alignment_and_noop() {
    let wrapped: Vec<f32> = (0..100)
        .map(|i| {
            let raw = 0.1 * i as f32;
            (raw + PI).rem_euclid(TAU) - PI
        })
        .collect();
    for align in [0, 17, 99] {
        let unwrapped = unwrap_angles(&wrapped, align, TAU, PI).unwrap();
        assert_relative_eq!(unwrapped[align], wrapped[align], epsilon = 1e-5);
        for pair in unwrapped.windows(2) {
            assert!((pair[1] - pair[0]).abs() < PI);
        }
    }

    let gentle = vec![0.1, 0.2, 0.15, 0.3];
    assert_eq!(unwrap_angles(&gentle, 0, TAU, PI).unwrap(), gentle);
}

#[test]
fn test_relative_angles_of_swinging_limb() {
    let parent = QuaternionSequence::from_quaternion(Quaternion::identity());
    let segment = swinging_segment(40, 0.5);
    let angles = relative_euler_angles(&parent, &segment.rotations, RotationOrder::Zyx).unwrap();
    // Swing is purely about z: the first reported angle carries it.
    for i in 0..40 {
        let phase = TAU * i as f32 / 40.0;
        assert_relative_eq!(angles[0][i], 0.5 * phase.sin(), epsilon = 1e-4);
        assert_relative_eq!(angles[1][i], 0.0, epsilon = 1e-4);
    }
}

// =============================================================================
// SPACE
// =============================================================================

#[test]
fn test_point_on_primary_axis_round_trip() {
    let space = Space::from_axes(
        "oblique",
        &AxisSpec::Direction(VectorSequence::from_vector(Vector::new(1.0, 1.0, 0.0))),
        &AxisSpec::Direction(VectorSequence::from_vector(Vector::new(0.0, 0.0, 1.0))),
        AxisOrder::Xz,
        None,
    )
    .unwrap();

    let unit = Vector::new(1.0, 1.0, 0.0).normalize();
    let local = space.points_in_local_space(&VectorSequence::from_vector(unit));
    let p = local.vector_at_frame(1);
    assert_relative_eq!(p.x, 1.0, epsilon = 1e-5);
    assert_relative_eq!(p.y, 0.0, epsilon = 1e-5);
    assert_relative_eq!(p.z, 0.0, epsilon = 1e-5);
}

#[test]
fn test_segment_aligned_space_through_signal_conversion() {
    // Segment heading near 90 deg snaps to the cardinal 90 deg frame; a
    // signal carrying the pending space resolves it on conversion.
    let q = quat_about(2, FRAC_PI_2 * 0.9);
    let n = 10;
    let segment = Segment::new(
        "pelvis",
        VectorSequence::new(vec![0.0; n], vec![0.0; n], vec![0.0; n]),
        QuaternionSequence::new(vec![q.x; n], vec![q.y; n], vec![q.z; n], vec![q.w; n]),
    );
    let space = Arc::new(Space::from_segment("walking direction", &segment).unwrap());

    let mut signal = Signal::new(
        "marker",
        SignalValue::VectorSequence(VectorSequence::from_vector(Vector::new(0.0, 2.0, 0.0))),
    );
    signal.target_space = Some(space);

    let converted = signal.convert_to_target_space().unwrap();
    assert!(converted.target_space.is_none());
    match converted.value().unwrap() {
        SignalValue::VectorSequence(seq) => {
            let p = seq.vector_at_frame(1);
            assert_relative_eq!(p.x, 2.0, epsilon = 1e-5);
            assert_relative_eq!(p.y, 0.0, epsilon = 1e-5);
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

// =============================================================================
// SIGNAL
// =============================================================================

#[test]
fn test_get_frames_contract() {
    let signal = Signal::new("s", SignalValue::Series(vec![10.0, 20.0, 30.0]));
    let out = signal.get_frames(&[1.0, 1.0, 0.0, -1.0]).unwrap();
    match out.value().unwrap() {
        SignalValue::Series(v) => assert_eq!(v, &vec![10.0, 20.0, 30.0]),
        other => panic!("unexpected payload {other:?}"),
    }
}

#[test]
fn test_cycles_partition_a_gait_trace() {
    let rate = 100.0;
    let trace = flexion_trace(rate, 2.0, 1.0);
    let mut signal = Signal::new("flexion", SignalValue::Series(trace)).with_frame_rate(rate);
    signal
        .set_cycles(vec![
            CycleSpan { start: 0, end: 99 },
            CycleSpan {
                start: 100,
                end: 199,
            },
        ])
        .unwrap();

    let cycles = signal.get_signal_cycles().unwrap().unwrap();
    assert_eq!(cycles.len(), 2);
    for cycle in &cycles {
        assert_eq!(cycle.frame_count(), Some(100));
        assert_relative_eq!(cycle.frame_rate.unwrap(), rate);
    }
}

// =============================================================================
// PEAKS
// =============================================================================

#[test]
fn test_single_bump_returns_midpoint() {
    let n = 101;
    let values: Vec<f32> = (0..n)
        .map(|i| {
            let mid = (n - 1) as f32 / 2.0;
            mid - (i as f32 - mid).abs()
        })
        .collect();
    let peaks = find_peaks(&values, &PeakOptions::default()).unwrap();
    assert_eq!(peaks.len(), 1);
    assert_eq!(peaks[0].frame, 50);
}

#[test]
fn test_gait_peaks_respect_distance_and_order() {
    let trace = flexion_trace(100.0, 4.0, 1.0);
    let options = PeakOptions {
        min_height: Some(0.5),
        distance: Some(50),
        ..PeakOptions::default()
    };
    let peaks = find_peaks(&trace, &options).unwrap();
    assert_eq!(peaks.len(), 4);
    for pair in peaks.windows(2) {
        assert!(pair[0].frame < pair[1].frame);
        assert!(pair[1].frame - pair[0].frame >= 50);
    }
}
