//! Export functionality
//!
//! Renders the parsed and flattened model as a MySQL DDL script.

pub mod sql;

pub use sql::{EmitOptions, SqlEmitter, SqlLayout, SqlScript};
