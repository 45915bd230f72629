//! Database entity models.
//!
//! Contains the configured database descriptors and their API views.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Relational backend behind a logical database id.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// MySQL / MariaDB.
    MySQL,
    /// PostgreSQL.
    Postgres,
    /// SQLite file database.
    SQLite,
}

impl DbType {
    /// Infers the backend from a connection string scheme.
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.trim().split(':').next()?.to_lowercase();
        match scheme.as_str() {
            "mysql" | "mariadb" => Some(DbType::MySQL),
            "postgres" | "postgresql" => Some(DbType::Postgres),
            "sqlite" => Some(DbType::SQLite),
            _ => None,
        }
    }

    /// Quotes a table identifier for this dialect.
    ///
    /// Only call this with names that passed allow-list validation; quoting
    /// keeps odd but legitimate names (spaces, dashes) intact.
    pub fn quote_identifier(&self, name: &str) -> String {
        match self {
            DbType::MySQL => format!("`{}`", name.replace('`', "``")),
            DbType::Postgres | DbType::SQLite => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbType::MySQL => write!(f, "mysql"),
            DbType::Postgres => write!(f, "postgres"),
            DbType::SQLite => write!(f, "sqlite"),
        }
    }
}

/// A configured database: logical id plus connection string.
#[derive(Debug, Clone)]
pub struct DatabaseDescriptor {
    /// Logical database id used in requests.
    pub id: String,
    /// Connection string (contains credentials, never serialized).
    pub url: String,
    /// Backend inferred from the URL.
    pub db_type: DbType,
}

/// Database item returned by the listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DatabaseItem {
    /// Logical database id.
    pub id: String,
    /// Backend type.
    #[serde(rename = "type")]
    pub db_type: DbType,
    /// Whether this is the default database.
    pub is_default: bool,
    /// Whether a pool has been created for it.
    pub connected: bool,
}

/// Result of a connection test.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConnectionTestResult {
    /// Logical database id.
    pub id: String,
    /// Whether the test query succeeded.
    pub success: bool,
    /// Round trip latency in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    /// Error message if the test failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
