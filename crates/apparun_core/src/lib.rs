//! Parametric impact model runner
//!
//! This crate evaluates life-cycle-assessment impact models: named symbolic
//! formulas (quantities) over named parameters, as produced by an upstream
//! model-building tool. It supports:
//! - Point evaluation of every quantity in dependency order
//! - Batch evaluation with broadcast parameter lists
//! - Monte Carlo uncertainty propagation with explicit failure policies
//! - Global sensitivity analysis (Sobol indices, Spearman rank correlation)
//! - An explicit, thread-safe model cache
//!
//! # Example
//!
//! ```ignore
//! use apparun_core::{Assignment, ModelFormat, evaluate, load_model};
//!
//! let model = load_model(
//!     r#"
//! parameters:
//!   - name: x
//!     type: float
//!     default: 2.0
//! quantities:
//!   - name: impact
//!     expr: "x * 3"
//! "#,
//!     ModelFormat::Yaml,
//! )?;
//!
//! let result = evaluate(&model, &Assignment::new())?;
//! assert_eq!(result.get("impact"), Some(6.0));
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod cache;
pub mod error;
pub mod evaluate;
pub mod expr;
pub mod graph;
pub mod load;
pub mod progress;
pub mod registry;
pub mod sensitivity;
pub mod stats;
pub mod uncertainty;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod config;
pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use cache::ModelCache;
pub use config::{
    BootstrapConfig, DesignKind, FailurePolicy, ModelBuilder, SensitivityConfig,
    SensitivityMethod, UncertaintyConfig,
};
pub use error::{
    AssignmentError, CyclicDependencyError, Error, EvalError, ModelError, NumericError, RunError,
    SensitivityError,
};
pub use evaluate::{evaluate, evaluate_batch};
pub use load::{ModelFormat, dump_model, load_model};
pub use model::{
    Assignment, BatchAssignment, BatchValue, DistributionResult, EvaluationResult, Model,
    ParamValue, SensitivityResult,
};
pub use progress::RunProgress;
pub use sensitivity::rank as rank_sensitivity;
pub use uncertainty::run as run_uncertainty;
