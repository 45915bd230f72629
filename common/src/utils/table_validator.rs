//! Table name validator.
//!
//! Table names arrive from request parameters and end up as identifiers in
//! query text, where bound parameters cannot be used. The only accepted names
//! are those the database itself reported during introspection.

use crate::errors::{AppError, AppResult};

/// A table name that was found in the introspected table list.
///
/// Can only be obtained through [`TableValidator::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTable(String);

impl ValidatedTable {
    /// Returns the table name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ValidatedTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validates requested table names against an allow-list.
pub struct TableValidator;

impl TableValidator {
    /// Checks a requested table name against the introspected tables.
    ///
    /// # Errors
    /// Returns `AppError::Validation` for an empty name and
    /// `AppError::UnknownTable` when the name is not in `tables`.
    pub fn validate<S: AsRef<str>>(tables: &[S], name: &str) -> AppResult<ValidatedTable> {
        if name.is_empty() {
            return Err(AppError::Validation("table name must not be empty".into()));
        }
        if tables.iter().any(|table| table.as_ref() == name) {
            Ok(ValidatedTable(name.to_string()))
        } else {
            tracing::warn!(table = %name, "table name rejected, not in introspected list");
            Err(AppError::UnknownTable(name.to_string()))
        }
    }
}
