//! Utility functions and helpers.

pub mod sample_grouping;
pub mod table_validator;

// Re-export commonly used types
pub use sample_grouping::{group_by_sample, sample_key, tables_for_sample};
pub use table_validator::{TableValidator, ValidatedTable};
