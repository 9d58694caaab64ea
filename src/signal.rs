//! The universal typed value passed between pipeline steps.
//!
//! A [`Signal`] wraps exactly one payload (scalar, numeric buffers, events,
//! or an algebraic sequence) plus metadata: frame rate, cycle spans, event
//! flag and a pending coordinate-space conversion. Steps receive signals by
//! shared reference and return fresh ones; a payload is never mutated in
//! place once a signal has been handed to the store.

use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};

use crate::error::{ProcessingError, Result};
use crate::math::{PlaneSequence, VectorSequence};
use crate::segment::{Marker, Segment};
use crate::space::Space;

/// Payload type tag. Always consistent with the payload itself;
/// [`SignalValue::from_components`] rebuilds a typed payload from the tag
/// plus flat component buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalType {
    Scalar,
    Series,
    Events,
    NestedSeries,
    VectorSequence,
    PlaneSequence,
    Segment,
    Marker,
}

/// Whether a signal's value is a reducible aggregate or a genuine sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResultType {
    Scalar,
    #[default]
    Series,
}

/// An inclusive frame span, 0-based, marking one repetition unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSpan {
    pub start: u32,
    pub end: u32,
}

/// One typed payload.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalValue {
    Scalar(f32),
    Series(Vec<f32>),
    /// Frame-index list, not sampled values.
    Events(Vec<u32>),
    NestedSeries(Vec<Vec<f32>>),
    VectorSequence(VectorSequence),
    PlaneSequence(PlaneSequence),
    Segment(Segment),
    Marker(Marker),
}

impl SignalValue {
    #[must_use]
    pub fn signal_type(&self) -> SignalType {
        match self {
            Self::Scalar(_) => SignalType::Scalar,
            Self::Series(_) => SignalType::Series,
            Self::Events(_) => SignalType::Events,
            Self::NestedSeries(_) => SignalType::NestedSeries,
            Self::VectorSequence(_) => SignalType::VectorSequence,
            Self::PlaneSequence(_) => SignalType::PlaneSequence,
            Self::Segment(_) => SignalType::Segment,
            Self::Marker(_) => SignalType::Marker,
        }
    }

    /// Frame count, or `None` for scalars.
    #[must_use]
    pub fn frame_count(&self) -> Option<usize> {
        match self {
            Self::Scalar(_) => None,
            Self::Series(v) => Some(v.len()),
            Self::Events(v) => Some(v.len()),
            Self::NestedSeries(n) => Some(n.first().map_or(0, Vec::len)),
            Self::VectorSequence(s) => Some(s.len()),
            Self::PlaneSequence(s) => Some(s.len()),
            Self::Segment(s) => Some(s.len()),
            Self::Marker(m) => Some(m.len()),
        }
    }

    /// Rebuild a typed payload from flat component buffers and a type tag.
    ///
    /// The buffer count must match the type's component count exactly and
    /// all buffers must share one length. Events are rebuilt by rounding;
    /// segment and marker payloads come back with an empty name.
    pub fn from_components(ty: SignalType, buffers: Vec<Vec<f32>>) -> Result<Self> {
        let got = buffers.len();
        let expect = move |want: usize| -> Result<()> {
            if got == want {
                Ok(())
            } else {
                Err(ProcessingError::invalid_input(format!(
                    "{ty:?} expects {want} component buffers, got {got}"
                )))
            }
        };
        if let Some(first) = buffers.first() {
            if buffers.iter().any(|b| b.len() != first.len()) {
                return Err(ProcessingError::invalid_input(
                    "component buffers differ in length",
                ));
            }
        }

        let mut it = buffers.into_iter();
        let mut take = || it.next().unwrap_or_default();
        match ty {
            SignalType::Scalar => {
                expect(1)?;
                let b = take();
                match b.as_slice() {
                    [v] => Ok(Self::Scalar(*v)),
                    _ => Err(ProcessingError::invalid_input(
                        "scalar payload requires a single-sample buffer",
                    )),
                }
            }
            SignalType::Series => {
                expect(1)?;
                Ok(Self::Series(take()))
            }
            SignalType::Events => {
                expect(1)?;
                Ok(Self::Events(
                    take().iter().map(|v| v.round() as u32).collect(),
                ))
            }
            SignalType::NestedSeries => Ok(Self::NestedSeries(it.collect())),
            SignalType::VectorSequence => {
                expect(3)?;
                Ok(Self::VectorSequence(VectorSequence::new(
                    take(),
                    take(),
                    take(),
                )))
            }
            SignalType::PlaneSequence => {
                expect(4)?;
                Ok(Self::PlaneSequence(PlaneSequence::new(
                    take(),
                    take(),
                    take(),
                    take(),
                )))
            }
            SignalType::Segment => {
                expect(7)?;
                let positions = VectorSequence::new(take(), take(), take());
                let rotations =
                    crate::math::QuaternionSequence::new(take(), take(), take(), take());
                Ok(Self::Segment(Segment::new("", positions, rotations)))
            }
            SignalType::Marker => {
                expect(3)?;
                Ok(Self::Marker(Marker::new(
                    "",
                    VectorSequence::new(take(), take(), take()),
                )))
            }
        }
    }

    /// Flat component buffers in the order `from_components` consumes them,
    /// or `None` for scalars.
    #[must_use]
    pub fn component_buffers(&self) -> Option<Vec<Vec<f32>>> {
        match self {
            Self::Scalar(_) => None,
            Self::Series(v) => Some(vec![v.clone()]),
            Self::Events(v) => Some(vec![v.iter().map(|&e| e as f32).collect()]),
            Self::NestedSeries(n) => Some(n.clone()),
            Self::VectorSequence(s) => Some(vec![s.x.clone(), s.y.clone(), s.z.clone()]),
            Self::PlaneSequence(s) => {
                Some(vec![s.a.clone(), s.b.clone(), s.c.clone(), s.d.clone()])
            }
            Self::Segment(s) => Some(vec![
                s.positions.x.clone(),
                s.positions.y.clone(),
                s.positions.z.clone(),
                s.rotations.x.clone(),
                s.rotations.y.clone(),
                s.rotations.z.clone(),
                s.rotations.w.clone(),
            ]),
            Self::Marker(m) => Some(vec![
                m.positions.x.clone(),
                m.positions.y.clone(),
                m.positions.z.clone(),
            ]),
        }
    }

    /// Named component buffer, or `None` when the payload has no components.
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&[f32]> {
        match self {
            Self::VectorSequence(s) => s.component(name),
            Self::PlaneSequence(s) => s.component(name),
            Self::Segment(s) => s.component(name),
            Self::Marker(m) => m.component(name),
            _ => None,
        }
    }

    /// New payload of the same type keeping only the given 0-based frame
    /// indices, which must already be deduplicated, sorted and in range.
    fn select_frames(&self, idx: &[usize]) -> Result<Self> {
        let pick = |b: &[f32]| -> Vec<f32> { idx.iter().map(|&i| b[i]).collect() };
        match self {
            Self::Scalar(_) => Err(ProcessingError::invalid_input(
                "cannot take frames from a scalar signal",
            )),
            Self::Series(v) => Ok(Self::Series(pick(v))),
            Self::Events(v) => Ok(Self::Events(idx.iter().map(|&i| v[i]).collect())),
            Self::NestedSeries(n) => Ok(Self::NestedSeries(n.iter().map(|b| pick(b)).collect())),
            Self::VectorSequence(s) => Ok(Self::VectorSequence(VectorSequence::new(
                pick(&s.x),
                pick(&s.y),
                pick(&s.z),
            ))),
            Self::PlaneSequence(s) => Ok(Self::PlaneSequence(PlaneSequence::new(
                pick(&s.a),
                pick(&s.b),
                pick(&s.c),
                pick(&s.d),
            ))),
            Self::Segment(s) => {
                let positions = VectorSequence::new(
                    pick(&s.positions.x),
                    pick(&s.positions.y),
                    pick(&s.positions.z),
                );
                let rotations = crate::math::QuaternionSequence::new(
                    pick(&s.rotations.x),
                    pick(&s.rotations.y),
                    pick(&s.rotations.z),
                    pick(&s.rotations.w),
                );
                let mut out = Segment::new(s.name.clone(), positions, rotations);
                out.parent = s.parent.clone();
                out.parameters = s.parameters;
                Ok(Self::Segment(out))
            }
            Self::Marker(m) => Ok(Self::Marker(Marker::new(
                m.name.clone(),
                VectorSequence::new(
                    pick(&m.positions.x),
                    pick(&m.positions.y),
                    pick(&m.positions.z),
                ),
            ))),
        }
    }
}

/// A named, typed time-series or scalar value plus its processing metadata.
#[derive(Debug, Clone, Default)]
pub struct Signal {
    pub name: String,
    value: Option<SignalValue>,
    pub frame_rate: Option<f32>,
    pub result_type: ResultType,
    cycles: Option<Vec<CycleSpan>>,
    pub is_event: bool,
    /// Space already applied to the payload.
    pub space: Option<Arc<Space>>,
    /// Pending conversion, consumed by [`Signal::convert_to_target_space`].
    pub target_space: Option<Arc<Space>>,
    /// Which named component a derived single-axis buffer came from.
    pub component: Option<String>,
    /// Back-reference to the pre-extraction signal, used only to recover
    /// full-payload context for single-component space conversion.
    pub original: Option<Weak<Signal>>,
}

impl Signal {
    #[must_use]
    pub fn new(name: impl Into<String>, value: SignalValue) -> Self {
        Self {
            name: name.into(),
            value: Some(value),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_frame_rate(mut self, frame_rate: f32) -> Self {
        self.frame_rate = Some(frame_rate);
        self
    }

    #[must_use]
    pub fn with_result_type(mut self, result_type: ResultType) -> Self {
        self.result_type = result_type;
        self
    }

    #[must_use]
    pub fn as_event(mut self) -> Self {
        self.is_event = true;
        self
    }

    /// The payload. Signals built by `clone_metadata` have none until
    /// `with_value` installs one.
    pub fn value(&self) -> Result<&SignalValue> {
        self.value.as_ref().ok_or_else(|| {
            ProcessingError::invalid_input(format!("signal '{}' carries no payload", self.name))
        })
    }

    #[must_use]
    pub fn signal_type(&self) -> Option<SignalType> {
        self.value.as_ref().map(SignalValue::signal_type)
    }

    #[must_use]
    pub fn frame_count(&self) -> Option<usize> {
        self.value.as_ref().and_then(SignalValue::frame_count)
    }

    #[must_use]
    pub fn cycles(&self) -> Option<&[CycleSpan]> {
        self.cycles.as_deref()
    }

    /// Attach cycle spans. Spans must be ascending, non-overlapping and
    /// each end-inclusive bound ordered.
    pub fn set_cycles(&mut self, cycles: Vec<CycleSpan>) -> Result<()> {
        for pair in cycles.windows(2) {
            if pair[1].start <= pair[0].end {
                return Err(ProcessingError::invalid_input(
                    "cycle spans must be ascending and non-overlapping",
                ));
            }
        }
        if cycles.iter().any(|c| c.end < c.start) {
            return Err(ProcessingError::invalid_input(
                "cycle span end precedes its start",
            ));
        }
        self.cycles = Some(cycles);
        Ok(())
    }

    /// Metadata-only copy: every attribute is carried over, the payload is
    /// dropped. Pair with [`Signal::with_value`] to build a derived signal.
    #[must_use]
    pub fn clone_metadata(&self) -> Self {
        Self {
            value: None,
            ..self.clone()
        }
    }

    /// Copy of this signal with a new payload installed.
    #[must_use]
    pub fn with_value(&self, value: SignalValue) -> Self {
        Self {
            value: Some(value),
            ..self.clone()
        }
    }

    /// Named component buffer of the payload, `None` when the payload has
    /// no such component or no components at all.
    #[must_use]
    pub fn get_component(&self, name: &str) -> Option<&[f32]> {
        self.value.as_ref().and_then(|v| v.component(name))
    }

    /// Slice the payload to the given signed 0-based frame offsets.
    ///
    /// Negative offsets count from the end. Offsets are rounded,
    /// deduplicated and sorted ascending; out-of-range offsets are dropped.
    /// The ordering and dedup are contract, not convenience. Errors on a
    /// scalar payload.
    ///
    /// All other metadata carries over, but cycle spans are dropped: they
    /// index the unsliced buffer and would point at the wrong frames in
    /// the result.
    pub fn get_frames(&self, offsets: &[f32]) -> Result<Self> {
        let value = self.value()?;
        let len = value.frame_count().ok_or_else(|| {
            ProcessingError::invalid_input("cannot take frames from a scalar signal")
        })? as i64;

        let mut idx: Vec<usize> = offsets
            .iter()
            .filter_map(|&o| {
                if !o.is_finite() {
                    return None;
                }
                let mut i = o.round() as i64;
                if i < 0 {
                    i += len;
                }
                usize::try_from(i).ok().filter(|&i| (i as i64) < len)
            })
            .collect();
        idx.sort_unstable();
        idx.dedup();

        let mut out = self.clone_metadata();
        out.cycles = None;
        out.value = Some(value.select_frames(&idx)?);
        Ok(out)
    }

    /// Split the payload into one signal per cycle span, or `None` when
    /// no cycles are set.
    pub fn get_signal_cycles(&self) -> Result<Option<Vec<Self>>> {
        let Some(cycles) = self.cycles.clone() else {
            return Ok(None);
        };
        let mut out = Vec::with_capacity(cycles.len());
        for span in cycles {
            let frames: Vec<f32> = (span.start..=span.end).map(|f| f as f32).collect();
            out.push(self.get_frames(&frames)?);
        }
        Ok(Some(out))
    }

    /// Apply the pending space conversion, if any.
    ///
    /// Segments get the full 6-DOF treatment, vector sequences and markers
    /// a point reprojection. A single extracted component re-extracts the
    /// same component from the reprojected original signal. On success the
    /// pending space is cleared and recorded as applied.
    pub fn convert_to_target_space(&self) -> Result<Self> {
        let Some(target) = self.target_space.clone() else {
            return Ok(self.clone());
        };
        let value = self.value()?;

        let converted = match value {
            SignalValue::Segment(seg) => {
                SignalValue::Segment(target.segment_in_local_space(seg))
            }
            SignalValue::VectorSequence(seq) => {
                SignalValue::VectorSequence(target.points_in_local_space(seq))
            }
            SignalValue::Marker(m) => SignalValue::Marker(Marker::new(
                m.name.clone(),
                target.points_in_local_space(&m.positions),
            )),
            SignalValue::Series(_) => {
                let component = self.component.as_deref().ok_or_else(|| {
                    ProcessingError::missing_context(
                        "source component",
                        "space conversion of a single-axis series",
                    )
                })?;
                let original = self
                    .original
                    .as_ref()
                    .and_then(Weak::upgrade)
                    .ok_or_else(|| {
                        ProcessingError::missing_context(
                            "original signal",
                            "space conversion of a single-axis series",
                        )
                    })?;
                let mut full = (*original).clone();
                full.target_space = Some(Arc::clone(&target));
                let projected = full.convert_to_target_space()?;
                let buffer = projected.get_component(component).ok_or_else(|| {
                    ProcessingError::invalid_input(format!(
                        "original signal has no component '{component}'"
                    ))
                })?;
                SignalValue::Series(buffer.to_vec())
            }
            other => {
                return Err(ProcessingError::invalid_input(format!(
                    "cannot space-convert a {:?} payload",
                    other.signal_type()
                )))
            }
        };

        let mut out = self.with_value(converted);
        out.target_space = None;
        out.space = Some(target);
        Ok(out)
    }
}
