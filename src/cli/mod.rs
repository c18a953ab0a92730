//! Command-line interface module.
//!
//! Provides argument parsing, operator prompting and command handling.

pub mod args;
pub mod commands;
pub mod prompt;
