//! 数据表浏览与图表服务
//!
//! 提供以下功能：
//! - 多数据库连接池管理
//! - 表结构探查与样本分组
//! - 整表数据读取
//! - 折线图、柱状图、散点图 PNG 渲染

pub mod chart;
pub mod fetcher;
pub mod handlers;
pub mod pool_manager;
pub mod routes;
pub mod schema;
pub mod service;
pub mod state;

use axum::{middleware, routing::get, Json, Router};
use common::middleware::request_id_middleware;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

pub use state::AppState;

/// Service name used in logs and response metadata.
pub const SERVICE_NAME: &str = "explorer-service";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "数据浏览服务 API",
        version = "0.1.0",
        description = "数据表浏览与图表渲染微服务"
    ),
    paths(
        handlers::list_databases,
        handlers::test_connection,
        handlers::list_tables,
        handlers::sample_groups,
        handlers::sample_tables,
        handlers::browse_table,
        handlers::table_columns,
        handlers::render_chart,
        handlers::health_check,
    ),
    components(schemas(
        common::models::ConnectionTestResult,
        common::models::DatabaseItem,
        common::models::DbType,
        common::models::PlotKind,
        common::models::PlotRequest,
        common::models::RowSet,
        common::models::SampleGroup,
        common::models::SampleGroups,
        common::models::TableColumns,
        common::models::TableData,
        common::models::TableList,
        handlers::HealthResponse,
    )),
    tags(
        (name = "databases", description = "数据库端点"),
        (name = "tables", description = "表浏览端点"),
        (name = "charts", description = "图表渲染端点"),
        (name = "health", description = "健康检查端点")
    )
)]
pub struct ApiDoc;

/// Builds the HTTP router with request id, tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
