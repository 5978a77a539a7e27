//! CLI module - argument parsing and subcommand runners

mod args;
pub mod fit;
pub mod rules;
pub mod transform;

pub use args::*;
