//! CLI module for the al2sql binary

pub mod commands;
pub mod error;
pub mod output;
pub mod progress;

pub use error::CliError;
