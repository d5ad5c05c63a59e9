//! Type resolution: AL column metadata to MySQL column types

pub mod mapping;
pub mod resolver;

pub use mapping::{MatchMode, SqlTarget, TypeMappingTable, TypeRule};
pub use resolver::{TypeResolver, TypeToken, UNRESOLVED_SQL_TYPE};
