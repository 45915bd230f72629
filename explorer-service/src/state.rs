//! Application state for explorer service.

use std::sync::Arc;

use common::config::AppConfig;

use crate::pool_manager::PoolManager;
use crate::service::ExplorerService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub pool_manager: Arc<PoolManager>,
    pub service: Arc<ExplorerService>,
}

impl AppState {
    /// Creates a new application state. Pools are opened lazily.
    pub fn new(config: AppConfig) -> Self {
        let pool_manager = Arc::new(PoolManager::new(config.clone()));
        let service = Arc::new(ExplorerService::new(pool_manager.clone(), config.clone()));
        Self {
            config,
            pool_manager,
            service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::database::{DatabaseDescriptor, DbType};

    #[test]
    fn test_clones_share_one_service() {
        let state = AppState::new(AppConfig {
            service_name: "explorer-service".into(),
            host: "127.0.0.1".into(),
            port: 0,
            max_connections: 1,
            connect_timeout_secs: 1,
            query_timeout_secs: 1,
            render_timeout_secs: 1,
            chart_width: 100,
            chart_height: 100,
            databases: vec![DatabaseDescriptor {
                id: "lab".into(),
                url: "sqlite::memory:".into(),
                db_type: DbType::SQLite,
            }],
            default_database: "lab".into(),
        });
        let copy = state.clone();
        assert!(Arc::ptr_eq(&state.service, &copy.service));
        assert!(Arc::ptr_eq(&state.pool_manager, &copy.pool_manager));
    }
}
