//! Sequential pipeline evaluation over a shared signal store.
//!
//! Steps run one after another, synchronously. A step error aborts the run;
//! results stored by earlier steps stay valid. Warnings are logged and kept
//! on the step.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::Result;
use crate::signal::Signal;
use crate::step::Step;

/// The shared data store a pipeline threads results through. Signals are
/// reference-counted so steps can hold inputs without copying payloads.
pub type SignalStore = HashMap<String, Arc<Signal>>;

/// One named step instance bound to its input and output signal names.
pub struct PipelineStep {
    pub name: String,
    pub inputs: Vec<String>,
    pub output: String,
    step: Box<dyn Step>,
    warnings: Vec<String>,
}

impl PipelineStep {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        inputs: Vec<String>,
        output: impl Into<String>,
        step: Box<dyn Step>,
    ) -> Self {
        Self {
            name: name.into(),
            inputs,
            output: output.into(),
            step,
            warnings: Vec::new(),
        }
    }

    /// Warnings from the most recent evaluation.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

#[derive(Default)]
pub struct Pipeline {
    steps: Vec<PipelineStep>,
}

impl Pipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: PipelineStep) {
        self.steps.push(step);
    }

    #[must_use]
    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    /// Evaluate every step in order against `store`.
    ///
    /// Missing inputs are passed to the step as `None`; the step decides
    /// whether that is an error. Any pending space conversion on an input
    /// is applied before the step sees it. The first error stops the run.
    pub fn run(&mut self, store: &mut SignalStore) -> Result<()> {
        for step in &mut self.steps {
            debug!(step = %step.name, output = %step.output, "evaluating step");

            let mut inputs = Vec::with_capacity(step.inputs.len());
            for name in &step.inputs {
                let input = match store.get(name) {
                    Some(signal) => Some(signal.convert_to_target_space()?),
                    None => None,
                };
                inputs.push(input);
            }

            let result = step.step.process(&inputs)?;

            step.warnings = step.step.warnings().to_vec();
            for warning in &step.warnings {
                warn!(step = %step.name, "{warning}");
            }

            store.insert(step.output.clone(), Arc::new(result));
        }
        Ok(())
    }
}
