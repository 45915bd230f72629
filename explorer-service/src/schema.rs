//! Schema introspection.
//!
//! Lists the base tables visible through a pool. The result is the allow-list
//! every table name in a request is checked against.

use common::errors::AppResult;

use crate::pool_manager::{classify_error, DatabasePool};

const MYSQL_TABLES: &str = "SELECT CAST(TABLE_NAME AS CHAR) AS table_name \
     FROM information_schema.TABLES \
     WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE'";

const POSTGRES_TABLES: &str =
    "SELECT tablename::text FROM pg_catalog.pg_tables WHERE schemaname = current_schema()";

const SQLITE_TABLES: &str =
    "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'";

/// Lists table names, sorted lexicographically.
///
/// A database without tables yields an empty list.
pub async fn list_tables(pool: &DatabasePool) -> AppResult<Vec<String>> {
    let mut tables = match pool {
        DatabasePool::MySQL(p) => sqlx::query_scalar::<_, String>(MYSQL_TABLES).fetch_all(p).await,
        DatabasePool::Postgres(p) => {
            sqlx::query_scalar::<_, String>(POSTGRES_TABLES)
                .fetch_all(p)
                .await
        }
        DatabasePool::SQLite(p) => {
            sqlx::query_scalar::<_, String>(SQLITE_TABLES)
                .fetch_all(p)
                .await
        }
    }
    .map_err(classify_error)?;

    tables.sort();
    tracing::debug!(db_type = %pool.db_type(), count = tables.len(), "tables introspected");
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> sqlx::SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_empty_database_has_no_tables() {
        let pool = DatabasePool::SQLite(memory_pool().await);
        assert!(list_tables(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tables_are_sorted_and_views_excluded() {
        let pool = memory_pool().await;
        for sql in [
            "CREATE TABLE projB_run1_summary (id INTEGER)",
            "CREATE TABLE projA_run1_summary (id INTEGER)",
            "CREATE TABLE projA_run1_detail (id INTEGER)",
            "CREATE VIEW projA_view AS SELECT * FROM projA_run1_detail",
        ] {
            sqlx::query(sql).execute(&pool).await.unwrap();
        }

        let tables = list_tables(&DatabasePool::SQLite(pool)).await.unwrap();
        assert_eq!(
            tables,
            vec!["projA_run1_detail", "projA_run1_summary", "projB_run1_summary"]
        );
    }

    #[tokio::test]
    async fn test_closed_pool_is_connectivity_error() {
        let pool = memory_pool().await;
        pool.close().await;
        let err = list_tables(&DatabasePool::SQLite(pool)).await.unwrap_err();
        assert!(matches!(err, common::errors::AppError::DatabaseConnection(_)));
    }
}
