//! 路由模块

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/databases", get(handlers::list_databases))
        .route("/api/databases/{db}/test", get(handlers::test_connection))
        .route("/api/databases/{db}/tables", get(handlers::list_tables))
        .route("/api/databases/{db}/samples", get(handlers::sample_groups))
        .route("/api/databases/{db}/samples/{sample}", get(handlers::sample_tables))
        .route("/api/databases/{db}/tables/{table}", get(handlers::browse_table))
        .route(
            "/api/databases/{db}/tables/{table}/columns",
            get(handlers::table_columns),
        )
        .route("/api/charts", post(handlers::render_chart))
        .route("/api/health", get(handlers::health_check))
}
