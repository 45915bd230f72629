//! Database connection pool manager.
//!
//! Keeps one pool per configured logical database id. Pools are created on
//! first use and live for the rest of the process; handlers clone the pool
//! handle (an `Arc` inside sqlx) and check connections out per query.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use common::models::database::{DatabaseDescriptor, DatabaseItem, DbType};
use sqlx::{mysql::MySqlPoolOptions, postgres::PgPoolOptions, sqlite::SqlitePoolOptions};
use sqlx::{MySqlPool, PgPool, SqlitePool};
use tokio::sync::OnceCell;

/// Connection pool wrapper for the supported backends.
#[derive(Clone, Debug)]
pub enum DatabasePool {
    /// MySQL connection pool.
    MySQL(MySqlPool),
    /// PostgreSQL connection pool.
    Postgres(PgPool),
    /// SQLite connection pool.
    SQLite(SqlitePool),
}

impl DatabasePool {
    /// Backend of this pool.
    pub fn db_type(&self) -> DbType {
        match self {
            DatabasePool::MySQL(_) => DbType::MySQL,
            DatabasePool::Postgres(_) => DbType::Postgres,
            DatabasePool::SQLite(_) => DbType::SQLite,
        }
    }

    async fn close(&self) {
        match self {
            DatabasePool::MySQL(p) => p.close().await,
            DatabasePool::Postgres(p) => p.close().await,
            DatabasePool::SQLite(p) => p.close().await,
        }
    }
}

/// A configured database and its pool, once created.
struct PoolSlot {
    descriptor: DatabaseDescriptor,
    pool: OnceCell<DatabasePool>,
}

/// Manages database connection pools.
pub struct PoolManager {
    config: AppConfig,
    /// Fixed at construction; only the cells inside are filled later.
    slots: HashMap<String, PoolSlot>,
}

impl PoolManager {
    /// Creates a pool manager for the configured databases. No connection is
    /// opened until a database is first resolved.
    pub fn new(config: AppConfig) -> Self {
        let slots = config
            .databases
            .iter()
            .map(|descriptor| {
                (
                    descriptor.id.clone(),
                    PoolSlot {
                        descriptor: descriptor.clone(),
                        pool: OnceCell::new(),
                    },
                )
            })
            .collect();
        Self { config, slots }
    }

    /// Resolves a logical database id to its pool, creating it on first use.
    ///
    /// Concurrent first requests for the same id share one creation attempt.
    /// A failed attempt leaves the slot empty so a later request retries.
    ///
    /// # Errors
    /// `AppError::UnknownDatabase` for an id that is not configured,
    /// `AppError::DatabaseConnection` when the pool cannot connect.
    pub async fn resolve(&self, id: &str) -> AppResult<DatabasePool> {
        let slot = self
            .slots
            .get(id)
            .ok_or_else(|| AppError::UnknownDatabase(id.to_string()))?;

        let pool = slot
            .pool
            .get_or_try_init(|| self.try_create_pool(&slot.descriptor))
            .await?;
        Ok(pool.clone())
    }

    /// Attempts to create a database connection pool.
    async fn try_create_pool(&self, descriptor: &DatabaseDescriptor) -> AppResult<DatabasePool> {
        let timeout = Duration::from_secs(self.config.connect_timeout_secs);
        let max_connections = self.config.max_connections;

        let pool = match descriptor.db_type {
            DbType::MySQL => {
                let pool = MySqlPoolOptions::new()
                    .max_connections(max_connections)
                    .acquire_timeout(timeout)
                    .connect(&descriptor.url)
                    .await
                    .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
                DatabasePool::MySQL(pool)
            }
            DbType::Postgres => {
                let pool = PgPoolOptions::new()
                    .max_connections(max_connections)
                    .acquire_timeout(timeout)
                    .connect(&descriptor.url)
                    .await
                    .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
                DatabasePool::Postgres(pool)
            }
            DbType::SQLite => {
                let pool = SqlitePoolOptions::new()
                    .max_connections(1)
                    .acquire_timeout(timeout)
                    .connect(&descriptor.url)
                    .await
                    .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
                DatabasePool::SQLite(pool)
            }
        };

        tracing::info!(
            database = %descriptor.id,
            db_type = %descriptor.db_type,
            "Pool created"
        );
        Ok(pool)
    }

    /// Runs `SELECT 1` against a database and returns the round trip time.
    pub async fn test_connection(&self, id: &str) -> AppResult<Duration> {
        let pool = self.resolve(id).await?;
        let start = Instant::now();

        match &pool {
            DatabasePool::MySQL(pool) => {
                sqlx::query("SELECT 1").execute(pool).await.map_err(classify_error)?;
            }
            DatabasePool::Postgres(pool) => {
                sqlx::query("SELECT 1").execute(pool).await.map_err(classify_error)?;
            }
            DatabasePool::SQLite(pool) => {
                sqlx::query("SELECT 1").execute(pool).await.map_err(classify_error)?;
            }
        }

        Ok(start.elapsed())
    }

    /// Configured databases in declaration order.
    pub fn databases(&self) -> Vec<DatabaseItem> {
        self.config
            .databases
            .iter()
            .map(|descriptor| DatabaseItem {
                id: descriptor.id.clone(),
                db_type: descriptor.db_type,
                is_default: descriptor.id == self.config.default_database,
                connected: self
                    .slots
                    .get(&descriptor.id)
                    .is_some_and(|slot| slot.pool.initialized()),
            })
            .collect()
    }

    /// Number of pools created so far.
    pub fn connected_count(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| slot.pool.initialized())
            .count()
    }

    /// Database used when a request does not name one.
    pub fn default_database(&self) -> &str {
        &self.config.default_database
    }

    /// Closes every open pool.
    pub async fn close_all(&self) {
        for (id, slot) in &self.slots {
            if let Some(pool) = slot.pool.get() {
                pool.close().await;
                tracing::info!(database = %id, "Pool closed");
            }
        }
    }
}

/// Maps a sqlx error onto the connectivity / data access split.
pub(crate) fn classify_error(error: sqlx::Error) -> AppError {
    match error {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => AppError::DatabaseConnection(error.to_string()),
        other => AppError::DatabaseQuery(other.to_string()),
    }
}
