//! End-to-end tests of the command implementations
//!
//! Each test writes a model into a temporary directory, parses a command
//! line, runs it with `--out` and reads the written result back.
