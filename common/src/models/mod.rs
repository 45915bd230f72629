//! Shared data models.

pub mod chart;
pub mod database;
pub mod table;

// Re-export commonly used types
pub use chart::{PlotKind, PlotRequest};
pub use database::{ConnectionTestResult, DatabaseDescriptor, DatabaseItem, DbType};
pub use table::{Row, RowSet, SampleGroup, SampleGroups, TableColumns, TableData, TableList};
