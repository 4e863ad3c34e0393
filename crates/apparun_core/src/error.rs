use thiserror::Error;

use crate::expr::ParseError;

/// A dependency cycle between quantities, listed in reference order with the
/// first quantity repeated at the end (`a -> b -> a`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cyclic dependency between quantities: {}", .cycle.join(" -> "))]
pub struct CyclicDependencyError {
    pub cycle: Vec<String>,
}

/// Errors raised while loading a model document.
///
/// Every variant except [`ModelError::Cyclic`] describes a malformed model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("malformed model document: {0}")]
    Syntax(String),

    #[error("duplicate parameter name `{0}`")]
    DuplicateParameter(String),

    #[error("duplicate quantity name `{0}`")]
    DuplicateQuantity(String),

    #[error("symbol `{0}` is declared by more than one parameter or quantity")]
    DuplicateSymbol(String),

    #[error("quantity `{quantity}`: {source}")]
    Expression { quantity: String, source: ParseError },

    #[error("quantity `{quantity}` references undeclared symbol `{symbol}`")]
    UndeclaredSymbol { quantity: String, symbol: String },

    #[error("parameter `{parameter}`: {reason}")]
    InvalidParameter { parameter: String, reason: String },

    #[error(transparent)]
    Cyclic(#[from] CyclicDependencyError),
}

impl ModelError {
    /// Whether this is a structural defect of the document (as opposed to a
    /// dependency cycle between otherwise well-formed quantities).
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        !matches!(self, ModelError::Cyclic(_))
    }
}

/// Errors in a caller-supplied assignment
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssignmentError {
    #[error("unknown parameter `{name}`")]
    UnknownParameter { name: String },

    #[error("parameter `{parameter}` expects {expected}, found {found}")]
    TypeMismatch {
        parameter: String,
        expected: String,
        found: String,
    },

    #[error(
        "batch parameter lists differ in length: `{first}` has {first_len} values, `{other}` has {other_len}"
    )]
    BatchLengthMismatch {
        first: String,
        first_len: usize,
        other: String,
        other_len: usize,
    },
}

/// Numeric-domain failures during reduction
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum NumericError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("logarithm of non-positive value {value}")]
    LogOfNonPositive { value: f64 },

    #[error("square root of negative value {value}")]
    SqrtOfNegative { value: f64 },

    #[error("non-finite result from `{operation}`")]
    NonFinite { operation: &'static str },
}

/// Errors raised by a single evaluation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("quantity `{quantity}`: {source}")]
    Numeric {
        quantity: String,
        source: NumericError,
    },

    #[error("quantity `{quantity}` has unresolved reference `{reference}`")]
    UnresolvedReference { quantity: String, reference: String },

    #[error(transparent)]
    Assignment(#[from] AssignmentError),
}

impl EvalError {
    /// Numeric-domain failures may be dropped by batch runs; everything else
    /// is a defect of the model or the input.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, EvalError::Numeric { .. })
    }
}

/// Errors raised by an uncertainty run
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error(transparent)]
    Assignment(#[from] AssignmentError),

    #[error("sample {index}: {source}")]
    Sample { index: usize, source: EvalError },

    #[error("run cancelled after {completed} samples")]
    Cancelled { completed: usize },

    #[error("all {dropped} samples failed")]
    NoSuccessfulSamples { dropped: usize },

    #[error("timed out before any sample completed")]
    DeadlineExceeded,

    #[error("invalid run configuration: {0}")]
    InvalidConfig(String),
}

/// Errors raised by a sensitivity analysis
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensitivityError {
    #[error(transparent)]
    Assignment(#[from] AssignmentError),

    #[error("sample {index}: {source}")]
    Sample { index: usize, source: EvalError },

    #[error("{method} needs at least {required} samples for {parameters} parameters, got {provided}")]
    InsufficientSamples {
        method: &'static str,
        parameters: usize,
        required: usize,
        provided: usize,
    },

    #[error("unknown output quantity `{0}`")]
    UnknownOutput(String),

    #[error("no stochastic parameter is left free for the analysis")]
    NoFreeParameters,

    #[error("sample design supports {supported} dimensions, {required} required")]
    DesignDimensions { required: usize, supported: usize },

    #[error("analysis cancelled after {completed} evaluations")]
    Cancelled { completed: usize },

    #[error("invalid analysis configuration: {0}")]
    InvalidConfig(String),
}

/// Any error raised through the crate-level entry points
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Assignment(#[from] AssignmentError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Sensitivity(#[from] SensitivityError),
}

pub type Result<T> = std::result::Result<T, Error>;
