//! Command-line interface for contact-forge.
//!
//! One subcommand per pipeline stage: extract, prepare, submit, watch,
//! process and view.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};
