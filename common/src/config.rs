//! Service configuration.
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file in the working directory. Database connection strings are never
//! hardcoded: each logical database id listed in `EXPLORER_DATABASES` reads its
//! URL from `DATABASE_URL_<ID>`.

use crate::errors::{AppError, AppResult};
use crate::models::database::{DatabaseDescriptor, DbType};

/// Logical database ids used when `EXPLORER_DATABASES` is not set.
pub const DEFAULT_DATABASE_IDS: [&str; 3] = ["vgo_db_1", "vgo_db_2", "vgo_db_DSZ"];

/// Application configuration shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Service name, used in logs and response metadata.
    pub service_name: String,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Maximum connections per database pool.
    pub max_connections: u32,
    /// Timeout for establishing or acquiring a pooled connection.
    pub connect_timeout_secs: u64,
    /// Deadline for introspection and row fetches.
    pub query_timeout_secs: u64,
    /// Deadline for rendering a chart.
    pub render_timeout_secs: u64,
    /// Chart width in pixels.
    pub chart_width: u32,
    /// Chart height in pixels.
    pub chart_height: u32,
    /// Configured databases, in declaration order.
    pub databases: Vec<DatabaseDescriptor>,
    /// Database used when a request does not name one.
    pub default_database: String,
}

impl AppConfig {
    /// Loads configuration from `.env` and the process environment.
    ///
    /// # Errors
    /// Returns `AppError::Config` when no configured database has a
    /// connection string, or when a value cannot be parsed.
    pub fn load_with_service(service_name: &str) -> AppResult<Self> {
        // A missing .env file is fine; the environment may be set directly.
        if let Ok(path) = dotenv::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(service_name, |key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(service_name: &str, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ids: Vec<String> = match lookup("EXPLORER_DATABASES") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(String::from)
                .collect(),
            None => DEFAULT_DATABASE_IDS.iter().map(|id| id.to_string()).collect(),
        };

        let mut databases = Vec::with_capacity(ids.len());
        for id in ids {
            let key = database_url_key(&id);
            let Some(url) = lookup(&key).filter(|url| !url.trim().is_empty()) else {
                tracing::warn!(database = %id, env = %key, "connection string missing, database disabled");
                continue;
            };
            let db_type = DbType::from_url(&url).ok_or_else(|| {
                AppError::Config(format!("{}: unsupported connection string scheme", key))
            })?;
            databases.push(DatabaseDescriptor {
                id,
                url: url.trim().to_string(),
                db_type,
            });
        }

        if databases.is_empty() {
            return Err(AppError::Config(
                "no database connection string configured".into(),
            ));
        }

        let default_database = match lookup("EXPLORER_DEFAULT_DATABASE") {
            Some(id) if databases.iter().any(|db| db.id == id) => id,
            Some(id) => {
                return Err(AppError::Config(format!(
                    "default database `{}` is not configured",
                    id
                )))
            }
            None => databases[0].id.clone(),
        };

        Ok(Self {
            service_name: service_name.to_string(),
            host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "SERVER_PORT", 8090)?,
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            connect_timeout_secs: parse_or(&lookup, "DB_CONNECT_TIMEOUT_SECS", 5)?,
            query_timeout_secs: parse_or(&lookup, "QUERY_TIMEOUT_SECS", 30)?,
            render_timeout_secs: parse_or(&lookup, "RENDER_TIMEOUT_SECS", 30)?,
            chart_width: parse_or(&lookup, "CHART_WIDTH", 1000)?,
            chart_height: parse_or(&lookup, "CHART_HEIGHT", 600)?,
            databases,
            default_database,
        })
    }

    /// Looks up a configured database by id.
    pub fn database(&self, id: &str) -> Option<&DatabaseDescriptor> {
        self.databases.iter().find(|db| db.id == id)
    }
}

/// Environment key holding the connection string for a logical database id.
pub fn database_url_key(id: &str) -> String {
    format!("DATABASE_URL_{}", id.to_uppercase())
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_ids_skip_missing_urls() {
        let config = AppConfig::from_lookup(
            "explorer-service",
            lookup(&[("DATABASE_URL_VGO_DB_2", "mysql://root:pw@db:3306/vgo")]),
        )
        .unwrap();

        assert_eq!(config.databases.len(), 1);
        assert_eq!(config.databases[0].id, "vgo_db_2");
        assert_eq!(config.databases[0].db_type, DbType::MySQL);
        assert_eq!(config.default_database, "vgo_db_2");
        assert_eq!(config.port, 8090);
    }

    #[test]
    fn test_no_connection_strings_is_fatal() {
        let err = AppConfig::from_lookup("explorer-service", lookup(&[])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_explicit_database_list() {
        let config = AppConfig::from_lookup(
            "explorer-service",
            lookup(&[
                ("EXPLORER_DATABASES", "lab, archive"),
                ("DATABASE_URL_LAB", "sqlite:/tmp/lab.db"),
                ("DATABASE_URL_ARCHIVE", "postgres://u:p@pg/archive"),
                ("EXPLORER_DEFAULT_DATABASE", "archive"),
                ("SERVER_PORT", "9802"),
            ]),
        )
        .unwrap();

        let ids: Vec<&str> = config.databases.iter().map(|db| db.id.as_str()).collect();
        assert_eq!(ids, vec!["lab", "archive"]);
        assert_eq!(config.default_database, "archive");
        assert_eq!(config.port, 9802);
        assert_eq!(config.database("lab").unwrap().db_type, DbType::SQLite);
        assert!(config.database("missing").is_none());
    }

    #[test]
    fn test_unknown_default_database_rejected() {
        let err = AppConfig::from_lookup(
            "explorer-service",
            lookup(&[
                ("EXPLORER_DATABASES", "lab"),
                ("DATABASE_URL_LAB", "sqlite:/tmp/lab.db"),
                ("EXPLORER_DEFAULT_DATABASE", "other"),
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_unsupported_scheme_rejected() {
        let err = AppConfig::from_lookup(
            "explorer-service",
            lookup(&[
                ("EXPLORER_DATABASES", "lab"),
                ("DATABASE_URL_LAB", "redis://localhost"),
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_invalid_number_rejected() {
        let err = AppConfig::from_lookup(
            "explorer-service",
            lookup(&[
                ("EXPLORER_DATABASES", "lab"),
                ("DATABASE_URL_LAB", "sqlite:/tmp/lab.db"),
                ("SERVER_PORT", "not-a-port"),
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
