//! Handler模块

use std::time::Instant;

use axum::{
    extract::{FromRequest, Path, Request, State},
    http::header,
    response::{IntoResponse, Response},
    Extension, Form, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use common::errors::AppError;
use common::middleware::RequestId;
use common::models::{
    ConnectionTestResult, DatabaseItem, PlotRequest, SampleGroups, TableColumns, TableData,
    TableList,
};
use common::response::ApiResponse;

use crate::service::ExplorerServiceTrait;
use crate::state::AppState;
use crate::SERVICE_NAME;

fn envelope<T: Serialize>(data: T, request_id: &RequestId, started: Instant) -> Json<ApiResponse<T>> {
    Json(
        ApiResponse::ok_with_service(data, SERVICE_NAME)
            .with_request_id(request_id.as_str())
            .with_duration(started.elapsed().as_millis() as u64),
    )
}

/// 列出已配置的数据库
#[utoipa::path(
    get,
    path = "/api/databases",
    tag = "databases",
    responses(
        (status = 200, description = "数据库列表", body = ApiResponse<Vec<DatabaseItem>>)
    )
)]
pub async fn list_databases(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<DatabaseItem>>> {
    let started = Instant::now();
    envelope(state.service.list_databases(), &request_id, started)
}

/// 测试数据库连接
#[utoipa::path(
    get,
    path = "/api/databases/{db}/test",
    tag = "databases",
    params(
        ("db" = String, Path, description = "逻辑数据库 ID")
    ),
    responses(
        (status = 200, description = "连接测试结果", body = ApiResponse<ConnectionTestResult>),
        (status = 404, description = "数据库未配置")
    )
)]
pub async fn test_connection(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(db): Path<String>,
) -> Result<Json<ApiResponse<ConnectionTestResult>>, AppError> {
    let started = Instant::now();
    let result = match state.pool_manager.test_connection(&db).await {
        Ok(latency) => ConnectionTestResult {
            id: db,
            success: true,
            latency_ms: Some(latency.as_millis() as u64),
            error: None,
        },
        Err(e @ AppError::UnknownDatabase(_)) => return Err(e),
        Err(e) => {
            tracing::warn!(database = %db, error = %e, "connection test failed");
            ConnectionTestResult {
                id: db,
                success: false,
                latency_ms: None,
                error: Some(e.to_string()),
            }
        }
    };
    Ok(envelope(result, &request_id, started))
}

/// 列出数据库中的表
#[utoipa::path(
    get,
    path = "/api/databases/{db}/tables",
    tag = "tables",
    params(
        ("db" = String, Path, description = "逻辑数据库 ID")
    ),
    responses(
        (status = 200, description = "表名列表", body = ApiResponse<TableList>),
        (status = 404, description = "数据库未配置"),
        (status = 503, description = "数据库不可达")
    )
)]
pub async fn list_tables(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(db): Path<String>,
) -> Result<Json<ApiResponse<TableList>>, AppError> {
    let started = Instant::now();
    let data = state.service.list_tables(&db).await?;
    Ok(envelope(data, &request_id, started))
}

/// 按样本前缀分组列出表
#[utoipa::path(
    get,
    path = "/api/databases/{db}/samples",
    tag = "tables",
    params(
        ("db" = String, Path, description = "逻辑数据库 ID")
    ),
    responses(
        (status = 200, description = "样本分组", body = ApiResponse<SampleGroups>),
        (status = 404, description = "数据库未配置")
    )
)]
pub async fn sample_groups(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(db): Path<String>,
) -> Result<Json<ApiResponse<SampleGroups>>, AppError> {
    let started = Instant::now();
    let data = state.service.sample_groups(&db).await?;
    Ok(envelope(data, &request_id, started))
}

/// 列出属于某个样本的表
#[utoipa::path(
    get,
    path = "/api/databases/{db}/samples/{sample}",
    tag = "tables",
    params(
        ("db" = String, Path, description = "逻辑数据库 ID"),
        ("sample" = String, Path, description = "样本前缀，如 projA_run1")
    ),
    responses(
        (status = 200, description = "样本下的表", body = ApiResponse<TableList>),
        (status = 404, description = "数据库未配置")
    )
)]
pub async fn sample_tables(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((db, sample)): Path<(String, String)>,
) -> Result<Json<ApiResponse<TableList>>, AppError> {
    let started = Instant::now();
    let data = state.service.sample_tables(&db, &sample).await?;
    Ok(envelope(data, &request_id, started))
}

/// 读取整张表
#[utoipa::path(
    get,
    path = "/api/databases/{db}/tables/{table}",
    tag = "tables",
    params(
        ("db" = String, Path, description = "逻辑数据库 ID"),
        ("table" = String, Path, description = "表名")
    ),
    responses(
        (status = 200, description = "表数据", body = ApiResponse<TableData>),
        (status = 404, description = "数据库未配置或表不存在")
    )
)]
pub async fn browse_table(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((db, table)): Path<(String, String)>,
) -> Result<Json<ApiResponse<TableData>>, AppError> {
    let started = Instant::now();
    let data = state.service.browse_table(&db, &table).await?;
    Ok(envelope(data, &request_id, started))
}

/// 读取表的列名
#[utoipa::path(
    get,
    path = "/api/databases/{db}/tables/{table}/columns",
    tag = "tables",
    params(
        ("db" = String, Path, description = "逻辑数据库 ID"),
        ("table" = String, Path, description = "表名")
    ),
    responses(
        (status = 200, description = "列名", body = ApiResponse<TableColumns>),
        (status = 404, description = "数据库未配置或表不存在")
    )
)]
pub async fn table_columns(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((db, table)): Path<(String, String)>,
) -> Result<Json<ApiResponse<TableColumns>>, AppError> {
    let started = Instant::now();
    let data = state.service.table_columns(&db, &table).await?;
    Ok(envelope(data, &request_id, started))
}

/// 图表请求体，支持 JSON 与表单两种编码
pub struct ChartForm(pub PlotRequest);

impl<S: Send + Sync> FromRequest<S> for ChartForm {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));

        let plot = if is_json {
            Json::<PlotRequest>::from_request(req, state)
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?
                .0
        } else {
            Form::<PlotRequest>::from_request(req, state)
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?
                .0
        };
        Ok(ChartForm(plot))
    }
}

/// 渲染图表
#[utoipa::path(
    post,
    path = "/api/charts",
    tag = "charts",
    request_body(
        content = PlotRequest,
        content_type = "application/x-www-form-urlencoded",
        description = "也接受 application/json"
    ),
    responses(
        (status = 200, description = "PNG 图片", content_type = "image/png", body = Vec<u8>),
        (status = 400, description = "列不存在、图表类型不支持或参数无效"),
        (status = 404, description = "数据库未配置或表不存在"),
        (status = 422, description = "数据无法绘制")
    )
)]
pub async fn render_chart(
    State(state): State<AppState>,
    ChartForm(req): ChartForm,
) -> Result<Response, AppError> {
    req.validate()?;
    let png = state.service.render_chart(req).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "服务运行正常", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        databases: state.config.databases.len(),
        connected: state.pool_manager.connected_count(),
    })
}

/// 健康检查响应
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 服务名称
    pub service: String,
    /// 服务版本
    pub version: String,
    /// 当前时间戳
    pub timestamp: DateTime<Utc>,
    /// 已配置的数据库数
    pub databases: usize,
    /// 已建立连接池的数据库数
    pub connected: usize,
}
