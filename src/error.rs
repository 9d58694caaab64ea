//! Error types for pipeline processing.
//!
//! One error kind is used throughout the core: a processing error carrying a
//! human-readable message and a stable machine code. Errors surface
//! synchronously to the caller and are never retried.

use thiserror::Error;

/// Main error type for signal processing operations.
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// Wrong input arity, missing input, or wrong payload type.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An operation needed metadata the input signal lacks.
    #[error("Missing {what}: {context}")]
    MissingContext { what: String, context: String },

    /// Unrecognized or jointly inconsistent option values.
    #[error("Invalid option '{name}': {reason}")]
    InvalidOption { name: String, reason: String },

    /// Not enough samples for a geometric or statistical computation.
    #[error("Insufficient data: need {required} samples, have {available}")]
    InsufficientData { required: usize, available: usize },

    /// Numerical computation degenerated (NaN/Inf where a value is required).
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),
}

/// Result type alias for processing operations.
pub type Result<T> = std::result::Result<T, ProcessingError>;

impl ProcessingError {
    /// Create an invalid input error.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a missing context error.
    #[must_use]
    pub fn missing_context(what: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingContext {
            what: what.into(),
            context: context.into(),
        }
    }

    /// Create an invalid option error.
    #[must_use]
    pub fn invalid_option(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an insufficient data error.
    #[must_use]
    pub const fn insufficient_data(required: usize, available: usize) -> Self {
        Self::InsufficientData {
            required,
            available,
        }
    }

    /// Create a numerical instability error.
    #[must_use]
    pub fn numerical_instability(msg: impl Into<String>) -> Self {
        Self::NumericalInstability(msg.into())
    }

    /// Stable machine code for programmatic handling.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "input-shape",
            Self::MissingContext { .. } => "missing-context",
            Self::InvalidOption { .. } => "option-validation",
            Self::InsufficientData { .. } => "insufficient-data",
            Self::NumericalInstability(_) => "numerical-instability",
        }
    }
}
