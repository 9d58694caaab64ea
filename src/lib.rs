//! Kinemetry
//!
//! Batch computation core for biomechanical time-series data.
//!
//! The crate processes complete, pre-loaded recordings: marker trajectories,
//! rigid-body segments, force-plate readings and derived scalars. Pipelines
//! evaluate named computation steps sequentially, threading typed [`Signal`]
//! values through a shared store.
//!
//! # Features
//!
//! - **Sequence algebra**: vector, quaternion, matrix and plane values with
//!   time-indexed, per-component `f32` buffers, 1-based frame access with
//!   last-frame clamping, and last-frame broadcasting between sequences of
//!   different lengths
//! - **Signals**: one polymorphic payload plus frame rate, cycle spans, an
//!   event flag and a pending coordinate-space conversion
//! - **Spaces**: custom reference frames built from axis vectors or from a
//!   reference segment's average heading, snapped to cardinal directions
//! - **Orientation**: Cardan and proper-Euler angle extraction with explicit
//!   two-solution handling, quaternion continuity and angle unwrapping
//! - **Peak detection**: local maxima with plateau collapsing, height,
//!   distance, prominence and width filters, and label-pattern sequence
//!   classification
//!
//! # Quick Start
//!
//! ```
//! use kinemetry::{find_peaks, PeakOptions, Signal, SignalValue};
//!
//! let signal = Signal::new(
//!     "knee flexion",
//!     SignalValue::Series(vec![0.0, 4.0, 0.0, 9.0, 0.0]),
//! )
//! .with_frame_rate(100.0);
//!
//! let options = PeakOptions {
//!     min_height: Some(5.0),
//!     ..PeakOptions::default()
//! };
//! match signal.value()? {
//!     SignalValue::Series(values) => {
//!         let peaks = find_peaks(values, &options)?;
//!         assert_eq!(peaks[0].frame, 3);
//!     }
//!     _ => unreachable!(),
//! }
//! # Ok::<(), kinemetry::ProcessingError>(())
//! ```
//!
//! # Conventions
//!
//! Frame numbers in the public API are 1-based; cycle spans and peak frames
//! are 0-based. All sample buffers are `f32` except event buffers, which
//! hold `u32` frame indices. `NaN` marks a missing sample and propagates
//! through arithmetic.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod error;
pub mod euler;
pub mod math;
pub mod peaks;
pub mod pipeline;
pub mod segment;
pub mod signal;
pub mod space;
pub mod step;

// Re-exports for convenient access
pub use error::{ProcessingError, Result};
pub use euler::{
    ensure_continuity, euler_angles, euler_from_matrix, relative_euler_angles, unwrap_angles,
    EulerSolution, RotationOrder,
};
pub use math::{
    Matrix, MatrixSequence, Plane, PlaneSequence, Quaternion, QuaternionSequence, Vector,
    VectorSequence,
};
pub use peaks::{find_peaks, LabelBucket, Peak, PeakOptions, SequenceOptions};
pub use pipeline::{Pipeline, PipelineStep, SignalStore};
pub use segment::{ForcePlate, Joint, Marker, Segment, SegmentParameters};
pub use signal::{CycleSpan, ResultType, Signal, SignalType, SignalValue};
pub use space::{AxisOrder, AxisSpec, Space};
pub use step::{
    map_series_components, PropertyValue, Step, StepMeta, StepOptions, StepRegistry,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
