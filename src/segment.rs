//! Composite time-series entities: markers, rigid-body segments, joints and
//! force plates.
//!
//! Each entity exposes a uniform component accessor (`x`, `y`, `z`, `rx`,
//! `fx`, ...) computed from the named sub-sequences. The named fields are
//! the single source of truth; there is no parallel flat-buffer cache to
//! keep in sync.

use crate::math::{Quaternion, QuaternionSequence, Vector, VectorSequence};

/// A labelled point trajectory.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Marker {
    pub name: String,
    pub positions: VectorSequence,
}

impl Marker {
    #[must_use]
    pub fn new(name: impl Into<String>, positions: VectorSequence) -> Self {
        Self {
            name: name.into(),
            positions,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[must_use]
    pub fn component(&self, name: &str) -> Option<&[f32]> {
        self.positions.component(name)
    }
}

/// Body-segment parameters, set after construction by a BSP calculator.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SegmentParameters {
    /// Segment mass in kg.
    pub mass: f32,
    /// Center of mass in the segment's local frame.
    pub center_of_mass: Vector,
    /// Principal moments of inertia.
    pub inertia: Vector,
}

/// A rigid-body segment: a position sequence plus a rotation sequence.
///
/// The parent is referenced by name, not contained; the hierarchy is used to
/// compute segment lengths and chain lookups elsewhere.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Segment {
    pub name: String,
    pub positions: VectorSequence,
    pub rotations: QuaternionSequence,
    pub parent: Option<String>,
    pub parameters: Option<SegmentParameters>,
}

impl Segment {
    /// Component names, in flat-buffer order.
    pub const COMPONENTS: [&'static str; 7] = ["x", "y", "z", "rx", "ry", "rz", "rw"];

    /// # Panics
    ///
    /// Panics if positions and rotations differ in length.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        positions: VectorSequence,
        rotations: QuaternionSequence,
    ) -> Self {
        assert_eq!(positions.len(), rotations.len());
        Self {
            name: name.into(),
            positions,
            rotations,
            parent: None,
            parameters: None,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set body-segment parameters post-construction.
    pub fn set_parameters(&mut self, parameters: SegmentParameters) {
        self.parameters = Some(parameters);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Pose at a 1-based frame, clamping past-the-end frames.
    #[must_use]
    pub fn pose_at_frame(&self, frame: usize) -> (Vector, Quaternion) {
        (
            self.positions.vector_at_frame(frame),
            self.rotations.quaternion_at_frame(frame),
        )
    }

    #[must_use]
    pub fn component(&self, name: &str) -> Option<&[f32]> {
        self.positions
            .component(name)
            .or_else(|| self.rotations.component(name))
    }
}

/// A joint between two segments, carrying derived kinetic sequences.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Joint {
    pub name: String,
    pub positions: VectorSequence,
    pub forces: Option<VectorSequence>,
    pub moments: Option<VectorSequence>,
    pub powers: Option<VectorSequence>,
}

impl Joint {
    #[must_use]
    pub fn new(name: impl Into<String>, positions: VectorSequence) -> Self {
        Self {
            name: name.into(),
            positions,
            forces: None,
            moments: None,
            powers: None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[must_use]
    pub fn component(&self, name: &str) -> Option<&[f32]> {
        match name {
            "x" | "y" | "z" => self.positions.component(name),
            "fx" => self.forces.as_ref().map(|s| s.x.as_slice()),
            "fy" => self.forces.as_ref().map(|s| s.y.as_slice()),
            "fz" => self.forces.as_ref().map(|s| s.z.as_slice()),
            "mx" => self.moments.as_ref().map(|s| s.x.as_slice()),
            "my" => self.moments.as_ref().map(|s| s.y.as_slice()),
            "mz" => self.moments.as_ref().map(|s| s.z.as_slice()),
            "px" => self.powers.as_ref().map(|s| s.x.as_slice()),
            "py" => self.powers.as_ref().map(|s| s.y.as_slice()),
            "pz" => self.powers.as_ref().map(|s| s.z.as_slice()),
            _ => None,
        }
    }
}

/// A force plate: ground-reaction force, moment and center of pressure.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ForcePlate {
    pub name: String,
    pub forces: VectorSequence,
    pub moments: VectorSequence,
    pub center_of_pressure: VectorSequence,
}

impl ForcePlate {
    /// Component names, in flat-buffer order.
    pub const COMPONENTS: [&'static str; 9] =
        ["fx", "fy", "fz", "mx", "my", "mz", "x", "y", "z"];

    #[must_use]
    pub fn new(
        name: impl Into<String>,
        forces: VectorSequence,
        moments: VectorSequence,
        center_of_pressure: VectorSequence,
    ) -> Self {
        Self {
            name: name.into(),
            forces,
            moments,
            center_of_pressure,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.forces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forces.is_empty()
    }

    #[must_use]
    pub fn component(&self, name: &str) -> Option<&[f32]> {
        match name {
            "fx" => Some(&self.forces.x),
            "fy" => Some(&self.forces.y),
            "fz" => Some(&self.forces.z),
            "mx" => Some(&self.moments.x),
            "my" => Some(&self.moments.y),
            "mz" => Some(&self.moments.z),
            "x" => Some(&self.center_of_pressure.x),
            "y" => Some(&self.center_of_pressure.y),
            "z" => Some(&self.center_of_pressure.z),
            _ => None,
        }
    }
}
