//! Integration tests for the model runner
//!
//! Tests are organized by topic:
//! - `scenarios` - End-to-end behaviour of small reference models
//! - `loading` - Document parsing, validation and dumping
//! - `builder_dsl` - Builder DSL for assembling models in code
//! - `evaluation` - Point and batch evaluation
//! - `uncertainty` - Monte Carlo propagation, failure policies, run control
//! - `sensitivity` - Sobol and Spearman rankings

mod builder_dsl;
mod scenarios;
mod uncertainty;
