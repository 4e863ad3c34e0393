//! Command-line front end for the apparun impact model runner.
//!
//! Loads YAML or JSON model files and drives the engine in `apparun_core`:
//! validation, point and batch evaluation, uncertainty propagation and
//! sensitivity ranking. Results are written as JSON or YAML.

pub mod cli;
pub mod commands;
mod logging;
pub mod output;
pub mod util;

#[cfg(test)]
mod tests;

pub use cli::Cli;
pub use logging::init_logging;
