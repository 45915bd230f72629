//! HTTP API tests against a SQLite file database.

use std::collections::HashMap;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use common::config::AppConfig;
use explorer_service::{create_router, AppState};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;
use tower::ServiceExt;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

struct TestApp {
    router: Router,
    url: String,
    _dir: TempDir,
}

async fn setup() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("lab.db").display());

    let seed = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .unwrap();
    for sql in [
        "CREATE TABLE projA_run1_summary (x INTEGER, y INTEGER)",
        "INSERT INTO projA_run1_summary VALUES (1, 10), (2, 20)",
        "CREATE TABLE projA_run1_detail (step TEXT, loss REAL)",
        "INSERT INTO projA_run1_detail VALUES ('warmup', 0.9), ('train', 0.4), ('warmup', 0.7)",
        "CREATE TABLE projB_run1_summary (x INTEGER, y INTEGER)",
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)",
        "INSERT INTO users (name) VALUES ('ada')",
    ] {
        sqlx::query(sql).execute(&seed).await.unwrap();
    }
    seed.close().await;

    let env: HashMap<&str, String> = HashMap::from([
        ("EXPLORER_DATABASES", "lab".to_string()),
        ("DATABASE_URL_LAB", url.clone()),
        ("CHART_WIDTH", "400".to_string()),
        ("CHART_HEIGHT", "300".to_string()),
    ]);
    let config = AppConfig::from_lookup("explorer-service", |key| env.get(key).cloned()).unwrap();

    TestApp {
        router: create_router(AppState::new(config)),
        url,
        _dir: dir,
    }
}

async fn get(app: &TestApp, uri: &str) -> Response {
    app.router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_json(app: &TestApp, uri: &str, body: Value) -> Response {
    app.router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn chart_request(table: &str, x: &str, y: &str, kind: &str) -> Value {
    json!({
        "table_name": table,
        "x_column": x,
        "y_column": y,
        "plot_type": kind,
    })
}

#[tokio::test]
async fn test_list_databases() {
    let app = setup().await;
    let response = get(&app, "/api/databases").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"][0]["id"], "lab");
    assert_eq!(body["data"][0]["type"], "sqlite");
    assert_eq!(body["data"][0]["is_default"], true);
    assert!(body["data"][0].get("url").is_none());
}

#[tokio::test]
async fn test_connection_check() {
    let app = setup().await;
    let body = json_body(get(&app, "/api/databases/lab/test").await).await;
    assert_eq!(body["data"]["success"], true);

    let health = json_body(get(&app, "/api/health").await).await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["connected"], 1);
}

#[tokio::test]
async fn test_tables_and_sample_groups() {
    let app = setup().await;

    let tables = json_body(get(&app, "/api/databases/lab/tables").await).await;
    assert_eq!(
        tables["data"]["tables"],
        json!(["projA_run1_detail", "projA_run1_summary", "projB_run1_summary", "users"])
    );

    let groups = json_body(get(&app, "/api/databases/lab/samples").await).await;
    assert_eq!(
        groups["data"]["groups"],
        json!([
            {"key": "projA_run1", "tables": ["projA_run1_detail", "projA_run1_summary"]},
            {"key": "projB_run1", "tables": ["projB_run1_summary"]},
            {"key": "users", "tables": ["users"]},
        ])
    );

    let sample = json_body(get(&app, "/api/databases/lab/samples/projA_run1").await).await;
    assert_eq!(
        sample["data"]["tables"],
        json!(["projA_run1_detail", "projA_run1_summary"])
    );
}

#[tokio::test]
async fn test_browse_table_and_columns() {
    let app = setup().await;

    let response = get(&app, "/api/databases/lab/tables/projA_run1_summary").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["columns"], json!(["x", "y"]));
    assert_eq!(body["data"]["rows"], json!([[1, 10], [2, 20]]));
    assert_eq!(body["data"]["row_count"], 2);

    let columns = json_body(get(&app, "/api/databases/lab/tables/projA_run1_detail/columns").await).await;
    assert_eq!(columns["data"]["columns"], json!(["step", "loss"]));
}

#[tokio::test]
async fn test_scatter_chart_is_png() {
    let app = setup().await;
    let response = post_json(
        &app,
        "/api/charts",
        chart_request("projA_run1_summary", "x", "y", "scatter"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes[..8], PNG_SIGNATURE);
}

#[tokio::test]
async fn test_form_encoded_bar_chart() {
    let app = setup().await;
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/charts")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(
                    "db_name=lab&table_name=projA_run1_detail&x_column=step&y_column=loss&plot_type=bar",
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes[..8], PNG_SIGNATURE);
}

#[tokio::test]
async fn test_missing_column() {
    let app = setup().await;
    let response = post_json(
        &app,
        "/api/charts",
        chart_request("projA_run1_summary", "x", "z", "line"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "COLUMN_NOT_FOUND");
}

#[tokio::test]
async fn test_injection_is_rejected_without_query() {
    let app = setup().await;
    let response = post_json(
        &app,
        "/api/charts",
        chart_request("orders; DROP TABLE users", "x", "y", "line"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "IDENTIFIER_REJECTED");

    let check = SqlitePoolOptions::new().connect(&app.url).await.unwrap();
    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&check)
        .await
        .unwrap();
    assert_eq!(users, 1);
}

#[tokio::test]
async fn test_unknown_database() {
    let app = setup().await;
    let response = get(&app, "/api/databases/vgo_db_9/tables").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"]["code"], "UNKNOWN_DATABASE");
}

#[tokio::test]
async fn test_unsupported_plot_kind() {
    let app = setup().await;
    let response = post_json(
        &app,
        "/api/charts",
        chart_request("projA_run1_summary", "x", "y", "pie"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "UNSUPPORTED_PLOT_KIND");
}

#[tokio::test]
async fn test_empty_column_name_fails_validation() {
    let app = setup().await;
    let response = post_json(
        &app,
        "/api/charts",
        chart_request("projA_run1_summary", "", "y", "line"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = setup().await;
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/databases")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "req-42");
    assert_eq!(json_body(response).await["meta"]["request_id"], "req-42");
}

#[tokio::test]
async fn test_openapi_document() {
    let app = setup().await;
    let body = json_body(get(&app, "/api-docs/openapi.json").await).await;
    assert!(body["paths"]["/api/charts"]["post"].is_object());
    assert!(body["paths"]["/api/databases/{db}/tables/{table}"]["get"].is_object());
}

#[tokio::test]
async fn test_extreme_values_are_unplottable() {
    let app = setup().await;
    let pool = SqlitePoolOptions::new().connect(&app.url).await.unwrap();
    for sql in [
        "CREATE TABLE projC_run1_extreme (x REAL, y REAL)",
        "INSERT INTO projC_run1_extreme VALUES (-1.0e308, 1.0), (1.0e308, 2.0)",
    ] {
        sqlx::query(sql).execute(&pool).await.unwrap();
    }
    pool.close().await;

    let response = post_json(
        &app,
        "/api/charts",
        chart_request("projC_run1_extreme", "x", "y", "line"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["error"]["code"], "INVALID_PLOT_DATA");
}
