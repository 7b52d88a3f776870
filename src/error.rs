//! Error types for the mix calculator
//!
//! - **MixError**: every recoverable failure of a recompute, parse or save
//! - **Result**: alias for `Result<T, MixError>`

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MixError>;

#[derive(Error, Debug)]
pub enum MixError {
    /// Mass (or volume) fractions handed to a conversion do not add up to one
    #[error("{context}: fractions sum to {sum:.6}, expected 1.0")]
    MassFractionSum { context: String, sum: f64 },

    #[error("{what} must lie in [0, 1], got {value}")]
    FractionOutOfRange { what: String, value: f64 },

    #[error("{0}: no component carries any mass")]
    EmptyComposition(String),

    #[error("specific gravity of {component} must be positive, got {value}")]
    InvalidSpecificGravity { component: String, value: f64 },

    #[error("malformed grading at line {line}: {reason}")]
    MalformedGrading { line: usize, reason: String },

    /// Grading parsed but has no sieve with retained mass
    #[error("grading '{0}' has no sieve with retained mass")]
    EmptyGrading(String),

    #[error("invalid grading '{name}': {reason}")]
    InvalidGrading { name: String, reason: String },

    #[error("malformed phase fraction record at line {line}: {reason}")]
    MalformedPhaseFractions { line: usize, reason: String },

    #[error("a grading named '{0}' already exists")]
    DuplicateGrading(String),

    #[error("degenerate domain geometry: {0}")]
    DegenerateGeometry(String),

    #[error("no active grading to size the domain from")]
    NoActiveGradings,

    /// Catalog has no record for the requested material
    #[error("no {kind} named '{name}' in the material catalog")]
    MissingMaterial { kind: &'static str, name: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MixError {
    pub fn mass_fraction_sum(context: impl Into<String>, sum: f64) -> Self {
        Self::MassFractionSum {
            context: context.into(),
            sum,
        }
    }

    pub fn out_of_range(what: impl Into<String>, value: f64) -> Self {
        Self::FractionOutOfRange {
            what: what.into(),
            value,
        }
    }

    pub fn invalid_sg(component: impl Into<String>, value: f64) -> Self {
        Self::InvalidSpecificGravity {
            component: component.into(),
            value,
        }
    }

    pub fn malformed_grading(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedGrading {
            line,
            reason: reason.into(),
        }
    }

    pub fn invalid_grading(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidGrading {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn missing(kind: &'static str, name: impl Into<String>) -> Self {
        Self::MissingMaterial {
            kind,
            name: name.into(),
        }
    }

    /// True for errors caused by caller input rather than catalog/integration faults
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            Self::InvalidSpecificGravity { .. }
                | Self::MissingMaterial { .. }
                | Self::Io(_)
                | Self::Serialization(_)
        )
    }
}
