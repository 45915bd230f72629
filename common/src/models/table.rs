//! Table and row models.
//!
//! A `RowSet` is the in-memory result of fetching every row of one table.
//! Rows are stored positionally against a shared column list, so column order
//! is the order the data source returned and every row carries exactly one
//! value per column.

use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::errors::{AppError, AppResult};

/// All rows of one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct RowSet {
    /// Column names in result order.
    columns: Vec<String>,
    /// Row data, one value per column.
    rows: Vec<Vec<Value>>,
    /// Number of rows returned.
    row_count: usize,
    /// Fetch time in milliseconds.
    execution_time_ms: u64,
}

impl RowSet {
    /// Builds a row set, rejecting any row whose width differs from the
    /// column list.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> AppResult<Self> {
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(AppError::DatabaseQuery(format!(
                "row {} has {} values but the result has {} columns",
                index,
                row.len(),
                columns.len()
            )));
        }
        Ok(Self {
            row_count: rows.len(),
            columns,
            rows,
            execution_time_ms: 0,
        })
    }

    /// A row set with known columns and no rows.
    pub fn empty(columns: Vec<String>) -> Self {
        Self {
            columns,
            ..Default::default()
        }
    }

    /// Sets the fetch duration.
    pub fn with_execution_time(mut self, execution_time_ms: u64) -> Self {
        self.execution_time_ms = execution_time_ms;
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn execution_time_ms(&self) -> u64 {
        self.execution_time_ms
    }

    /// Iterates rows as ordered column/value views.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|values| Row {
            columns: &self.columns,
            values,
        })
    }

    /// Position of a column in the result.
    ///
    /// # Errors
    /// Returns `AppError::ColumnNotFound` if the column is absent.
    pub fn column_index(&self, name: &str) -> AppResult<usize> {
        self.columns
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| AppError::ColumnNotFound(name.to_string()))
    }

    /// Extracts one column's values in row order.
    ///
    /// # Errors
    /// Returns `AppError::ColumnNotFound` if the column is absent.
    pub fn column(&self, name: &str) -> AppResult<Vec<Value>> {
        let index = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| row[index].clone()).collect())
    }
}

/// Borrowed view of one row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> Row<'a> {
    /// Value of a column, if present.
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|index| &self.values[index])
    }

    /// Column/value pairs in result order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

/// Table names of one database.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TableList {
    /// Logical database id.
    pub database: String,
    /// Table names, sorted.
    pub tables: Vec<String>,
}

/// Tables sharing a two-token name prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SampleGroup {
    /// Prefix key, e.g. `projA_run1`.
    pub key: String,
    /// Member tables in introspection order.
    pub tables: Vec<String>,
}

/// Sample grouping of a database's tables.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SampleGroups {
    /// Logical database id.
    pub database: String,
    /// Groups in first-seen order.
    pub groups: Vec<SampleGroup>,
}

/// Table contents for the browse view.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TableData {
    /// Logical database id.
    pub database: String,
    /// Table name.
    pub table: String,
    /// Columns and rows.
    #[serde(flatten)]
    pub data: RowSet,
}

/// Column names of one table.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TableColumns {
    /// Logical database id.
    pub database: String,
    /// Table name.
    pub table: String,
    /// Column names in result order.
    pub columns: Vec<String>,
}
