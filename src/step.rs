//! Step contract: the boundary between the numeric core and the pipeline.
//!
//! A step receives an ordered list of optional input signals plus a typed
//! option bag, and returns one signal or a processing error. Step types are
//! registered in an explicit, immutable table built at startup.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{ProcessingError, Result};
use crate::signal::{Signal, SignalValue};

/// A step option value. Coercion between kinds is explicit and happens in
/// the accessor the caller picks, never by inspection.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Scalar(f32),
    Text(String),
    Series(Vec<f32>),
    TextList(Vec<String>),
}

/// Named options for one step instance, resolved once at construction.
#[derive(Debug, Clone, Default)]
pub struct StepOptions {
    values: HashMap<String, PropertyValue>,
}

impl StepOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Scalar option. A length-1 series stands in for a scalar here, and
    /// only here.
    pub fn scalar(&self, name: &str) -> Result<Option<f32>> {
        match self.values.get(name) {
            None => Ok(None),
            Some(PropertyValue::Scalar(v)) => Ok(Some(*v)),
            Some(PropertyValue::Series(s)) if s.len() == 1 => Ok(Some(s[0])),
            Some(other) => Err(wrong_type(name, "scalar", other)),
        }
    }

    pub fn scalar_or(&self, name: &str, default: f32) -> Result<f32> {
        Ok(self.scalar(name)?.unwrap_or(default))
    }

    pub fn require_scalar(&self, name: &str) -> Result<f32> {
        self.scalar(name)?
            .ok_or_else(|| ProcessingError::invalid_option(name, "required option is missing"))
    }

    pub fn text(&self, name: &str) -> Result<Option<&str>> {
        match self.values.get(name) {
            None => Ok(None),
            Some(PropertyValue::Text(s)) => Ok(Some(s)),
            Some(other) => Err(wrong_type(name, "text", other)),
        }
    }

    pub fn require_text(&self, name: &str) -> Result<&str> {
        self.text(name)?
            .ok_or_else(|| ProcessingError::invalid_option(name, "required option is missing"))
    }

    pub fn series(&self, name: &str) -> Result<Option<&[f32]>> {
        match self.values.get(name) {
            None => Ok(None),
            Some(PropertyValue::Series(s)) => Ok(Some(s)),
            Some(other) => Err(wrong_type(name, "series", other)),
        }
    }

    pub fn text_list(&self, name: &str) -> Result<Option<&[String]>> {
        match self.values.get(name) {
            None => Ok(None),
            Some(PropertyValue::TextList(l)) => Ok(Some(l)),
            Some(other) => Err(wrong_type(name, "text list", other)),
        }
    }
}

fn wrong_type(name: &str, wanted: &str, got: &PropertyValue) -> ProcessingError {
    let kind = match got {
        PropertyValue::Scalar(_) => "scalar",
        PropertyValue::Text(_) => "text",
        PropertyValue::Series(_) => "series",
        PropertyValue::TextList(_) => "text list",
    };
    ProcessingError::invalid_option(name, format!("expected {wanted}, got {kind}"))
}

/// One computation step. Inputs may be absent and must be checked
/// explicitly; a step never mutates an input's payload.
pub trait Step {
    fn process(&mut self, inputs: &[Option<Signal>]) -> Result<Signal>;

    /// Warnings accumulated by `process` on warn-and-continue paths.
    fn warnings(&self) -> &[String] {
        &[]
    }
}

/// Static description of a registered step type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepMeta {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub arity: usize,
}

type StepFactory = fn(StepOptions) -> Result<Box<dyn Step>>;

struct StepDef {
    meta: StepMeta,
    factory: StepFactory,
}

/// Immutable step table: name (and aliases) to metadata plus factory.
/// Built once at startup; lookups never mutate.
pub struct StepRegistry {
    entries: HashMap<&'static str, Arc<StepDef>>,
}

impl StepRegistry {
    /// Registry pre-loaded with the built-in per-component arithmetic
    /// steps.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            entries: HashMap::new(),
        };
        for op in SERIES_OPS {
            registry.register(
                StepMeta {
                    name: op.name,
                    aliases: op.aliases,
                    arity: 1,
                },
                op.factory,
            );
        }
        registry.register(
            StepMeta {
                name: "power",
                aliases: &["pow"],
                arity: 1,
            },
            PowerStep::factory,
        );
        registry
    }

    fn register(&mut self, meta: StepMeta, factory: StepFactory) {
        let def = Arc::new(StepDef { meta, factory });
        self.entries.insert(meta.name, Arc::clone(&def));
        for alias in meta.aliases {
            self.entries.insert(alias, Arc::clone(&def));
        }
    }

    #[must_use]
    pub fn meta(&self, name: &str) -> Option<StepMeta> {
        self.entries.get(name).map(|def| def.meta)
    }

    /// Instantiate a step by name or alias.
    pub fn create(&self, name: &str, options: StepOptions) -> Result<Box<dyn Step>> {
        let def = self.entries.get(name).ok_or_else(|| {
            ProcessingError::invalid_option("step", format!("unknown step '{name}'"))
        })?;
        (def.factory)(options)
    }
}

/// Apply a per-sample function to every float component of a payload.
///
/// An all-NaN component is left unchanged and reported through `warnings`;
/// NaN samples elsewhere propagate through the function. Segment and marker
/// payloads keep their name, parent and parameters. Event payloads are
/// frame-index lists and cannot be mapped.
pub fn map_series_components(
    value: &SignalValue,
    f: impl Fn(f32) -> f32,
    warnings: &mut Vec<String>,
) -> Result<SignalValue> {
    match value {
        SignalValue::Scalar(v) => Ok(SignalValue::Scalar(f(*v))),
        SignalValue::Events(_) => Err(ProcessingError::invalid_input(
            "cannot apply arithmetic to an event signal",
        )),
        SignalValue::Segment(seg) => {
            let mut buffers = map_buffers(
                vec![
                    seg.positions.x.clone(),
                    seg.positions.y.clone(),
                    seg.positions.z.clone(),
                    seg.rotations.x.clone(),
                    seg.rotations.y.clone(),
                    seg.rotations.z.clone(),
                    seg.rotations.w.clone(),
                ],
                &f,
                warnings,
            )
            .into_iter();
            let mut take = || buffers.next().unwrap_or_default();
            let positions = crate::math::VectorSequence::new(take(), take(), take());
            let rotations = crate::math::QuaternionSequence::new(take(), take(), take(), take());
            let mut out = crate::segment::Segment::new(seg.name.clone(), positions, rotations);
            out.parent = seg.parent.clone();
            out.parameters = seg.parameters;
            Ok(SignalValue::Segment(out))
        }
        SignalValue::Marker(m) => {
            let mut buffers = map_buffers(
                vec![
                    m.positions.x.clone(),
                    m.positions.y.clone(),
                    m.positions.z.clone(),
                ],
                &f,
                warnings,
            )
            .into_iter();
            let mut take = || buffers.next().unwrap_or_default();
            Ok(SignalValue::Marker(crate::segment::Marker::new(
                m.name.clone(),
                crate::math::VectorSequence::new(take(), take(), take()),
            )))
        }
        other => {
            let buffers = other.component_buffers().ok_or_else(|| {
                ProcessingError::invalid_input("payload has no mappable components")
            })?;
            let mapped = map_buffers(buffers, &f, warnings);
            SignalValue::from_components(other.signal_type(), mapped)
        }
    }
}

fn map_buffers(
    buffers: Vec<Vec<f32>>,
    f: &impl Fn(f32) -> f32,
    warnings: &mut Vec<String>,
) -> Vec<Vec<f32>> {
    buffers
        .into_iter()
        .enumerate()
        .map(|(i, buffer)| {
            if !buffer.is_empty() && buffer.iter().all(|v| v.is_nan()) {
                warnings.push(format!("component {i} is all NaN, left unchanged"));
                buffer
            } else {
                buffer.into_iter().map(f).collect()
            }
        })
        .collect()
}

struct SeriesOpDef {
    name: &'static str,
    aliases: &'static [&'static str],
    factory: StepFactory,
}

fn op_abs(v: f32) -> f32 {
    v.abs()
}
fn op_negate(v: f32) -> f32 {
    -v
}
fn op_sqrt(v: f32) -> f32 {
    v.sqrt()
}
fn op_round(v: f32) -> f32 {
    v.round()
}

macro_rules! series_op_factory {
    ($op:expr) => {
        |_options| Ok(Box::new(SeriesStep::new($op)) as Box<dyn Step>)
    };
}

/// Built-in single-input arithmetic steps.
const SERIES_OPS: &[SeriesOpDef] = &[
    SeriesOpDef {
        name: "abs",
        aliases: &["absolute"],
        factory: series_op_factory!(op_abs),
    },
    SeriesOpDef {
        name: "negate",
        aliases: &["neg"],
        factory: series_op_factory!(op_negate),
    },
    SeriesOpDef {
        name: "sqrt",
        aliases: &[],
        factory: series_op_factory!(op_sqrt),
    },
    SeriesOpDef {
        name: "round",
        aliases: &[],
        factory: series_op_factory!(op_round),
    },
];

/// A per-component arithmetic step around one `fn(f32) -> f32`.
pub struct SeriesStep {
    apply: fn(f32) -> f32,
    warnings: Vec<String>,
}

impl SeriesStep {
    #[must_use]
    pub fn new(apply: fn(f32) -> f32) -> Self {
        Self {
            apply,
            warnings: Vec::new(),
        }
    }
}

impl Step for SeriesStep {
    fn process(&mut self, inputs: &[Option<Signal>]) -> Result<Signal> {
        let signal = single_input(inputs)?;
        let value = map_series_components(signal.value()?, self.apply, &mut self.warnings)?;
        Ok(signal.with_value(value))
    }

    fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// Raises every sample to a configured exponent.
pub struct PowerStep {
    exponent: f32,
    warnings: Vec<String>,
}

impl PowerStep {
    fn factory(options: StepOptions) -> Result<Box<dyn Step>> {
        let exponent = options.scalar_or("exponent", 2.0)?;
        Ok(Box::new(Self {
            exponent,
            warnings: Vec::new(),
        }))
    }
}

impl Step for PowerStep {
    fn process(&mut self, inputs: &[Option<Signal>]) -> Result<Signal> {
        let signal = single_input(inputs)?;
        let exponent = self.exponent;
        let value =
            map_series_components(signal.value()?, |v| v.powf(exponent), &mut self.warnings)?;
        Ok(signal.with_value(value))
    }

    fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

fn single_input(inputs: &[Option<Signal>]) -> Result<&Signal> {
    match inputs {
        [Some(signal)] => Ok(signal),
        [None] => Err(ProcessingError::invalid_input("input signal is missing")),
        other => Err(ProcessingError::invalid_input(format!(
            "expected exactly one input, got {}",
            other.len()
        ))),
    }
}
