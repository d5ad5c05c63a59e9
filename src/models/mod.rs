//! Models module
//!
//! Plain data records produced by the parsers, rebuilt by the flattener and read by
//! the SQL emitter. Nothing here outlives a single conversion run.

pub mod column;
pub mod table;

pub use column::{Column, ForeignKey};
pub use table::{AlObject, Ownership, Table, TableExtension};
