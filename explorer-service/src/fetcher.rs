//! Generic row fetcher.
//!
//! Reads every row of a table whose schema is only known at runtime. The
//! statement is sent through the text protocol (`raw_sql`), so each backend
//! hands values back as text and they are converted to JSON scalars by the
//! column's reported type.

use std::time::Instant;

use common::errors::{AppError, AppResult};
use common::models::RowSet;
use common::utils::ValidatedTable;
use serde_json::{Number, Value};
use sqlx::{Column, ColumnIndex, Decode, Executor, Row, TypeInfo, ValueRef};

use crate::pool_manager::{classify_error, DatabasePool};

/// Fetches every row and column of a validated table.
///
/// # Errors
/// `AppError::DatabaseQuery` if the statement fails (for example the table
/// was dropped after introspection) or a value cannot be decoded. No partial
/// row set is ever returned.
pub async fn fetch_all(pool: &DatabasePool, table: &ValidatedTable) -> AppResult<RowSet> {
    let sql = format!(
        "SELECT * FROM {}",
        pool.db_type().quote_identifier(table.as_str())
    );
    let start = Instant::now();

    let rows = match pool {
        DatabasePool::MySQL(p) => {
            let rows = sqlx::raw_sql(&sql).fetch_all(p).await.map_err(classify_error)?;
            if rows.is_empty() {
                let described = p.describe(&sql).await.map_err(classify_error)?;
                RowSet::empty(column_names(described.columns()))
            } else {
                decode_rows(&rows)?
            }
        }
        DatabasePool::Postgres(p) => {
            let rows = sqlx::raw_sql(&sql).fetch_all(p).await.map_err(classify_error)?;
            if rows.is_empty() {
                let described = p.describe(&sql).await.map_err(classify_error)?;
                RowSet::empty(column_names(described.columns()))
            } else {
                decode_rows(&rows)?
            }
        }
        DatabasePool::SQLite(p) => {
            let rows = sqlx::raw_sql(&sql).fetch_all(p).await.map_err(classify_error)?;
            if rows.is_empty() {
                let described = p.describe(&sql).await.map_err(classify_error)?;
                RowSet::empty(column_names(described.columns()))
            } else {
                decode_rows(&rows)?
            }
        }
    };

    let elapsed_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        table = %table,
        rows = rows.len(),
        columns = rows.columns().len(),
        elapsed_ms,
        "table fetched"
    );
    Ok(rows.with_execution_time(elapsed_ms))
}

fn column_names<C: Column>(columns: &[C]) -> Vec<String> {
    columns.iter().map(|c| c.name().to_string()).collect()
}

/// Converts driver rows into a row set; column names come from the first row.
fn decode_rows<R>(rows: &[R]) -> AppResult<RowSet>
where
    R: Row,
    usize: ColumnIndex<R>,
    for<'r> String: Decode<'r, R::Database>,
    for<'r> Vec<u8>: Decode<'r, R::Database>,
{
    let columns = rows.first().map(|row| column_names(row.columns())).unwrap_or_default();

    let mut values = Vec::with_capacity(rows.len());
    for row in rows {
        let mut record = Vec::with_capacity(columns.len());
        for (index, name) in columns.iter().enumerate() {
            let value = decode_value(row, index).map_err(|e| {
                AppError::DatabaseQuery(format!("cannot decode column `{}`: {}", name, e))
            })?;
            record.push(value);
        }
        values.push(record);
    }

    RowSet::new(columns, values)
}

/// How a column's text is turned into JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueClass {
    Integer,
    Float,
    Bool,
    Binary,
    Text,
}

fn classify(type_name: &str) -> ValueClass {
    let name = type_name.to_ascii_uppercase();
    if name == "BOOL" || name == "BOOLEAN" {
        ValueClass::Bool
    } else if name.contains("BLOB") || name.contains("BINARY") || name == "BYTEA" {
        ValueClass::Binary
    } else if (name.contains("INT") && !name.contains("INTERVAL") && !name.contains("POINT"))
        || name.contains("SERIAL")
    {
        ValueClass::Integer
    } else if ["FLOAT", "DOUBLE", "REAL", "NUMERIC", "DECIMAL"]
        .iter()
        .any(|t| name.contains(t))
    {
        ValueClass::Float
    } else {
        ValueClass::Text
    }
}

fn decode_value<R>(row: &R, index: usize) -> Result<Value, sqlx::Error>
where
    R: Row,
    usize: ColumnIndex<R>,
    for<'r> String: Decode<'r, R::Database>,
    for<'r> Vec<u8>: Decode<'r, R::Database>,
{
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let class = classify(raw.type_info().name());

    if class == ValueClass::Binary {
        let bytes: Vec<u8> = row.try_get_unchecked(index)?;
        return Ok(Value::String(format!("<{} bytes>", bytes.len())));
    }

    let text: String = row.try_get_unchecked(index)?;
    Ok(text_to_value(class, text))
}

fn text_to_value(class: ValueClass, text: String) -> Value {
    match class {
        ValueClass::Integer => {
            if let Ok(n) = text.trim().parse::<i64>() {
                Value::from(n)
            } else if let Ok(n) = text.trim().parse::<u64>() {
                Value::from(n)
            } else {
                float_or_text(text)
            }
        }
        ValueClass::Float => float_or_text(text),
        ValueClass::Bool => match text.trim().to_ascii_lowercase().as_str() {
            "1" | "t" | "true" => Value::Bool(true),
            "0" | "f" | "false" => Value::Bool(false),
            _ => Value::String(text),
        },
        ValueClass::Binary | ValueClass::Text => Value::String(text),
    }
}

fn float_or_text(text: String) -> Value {
    text.trim()
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::String(text))
}
