use explorer_service::{create_router, AppState, SERVICE_NAME};

use anyhow::Context;
use common::config::AppConfig;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志追踪
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // 加载配置，没有任何可用数据库时直接退出
    let config = AppConfig::load_with_service(SERVICE_NAME).context("加载配置失败")?;
    info!(
        databases = config.databases.len(),
        default = %config.default_database,
        "配置已加载"
    );

    let state = AppState::new(config.clone());
    let pool_manager = state.pool_manager.clone();
    let app = create_router(state);

    // 启动服务
    let addr = format!("{}:{}", config.host, config.port);
    info!(service = SERVICE_NAME, address = %addr, "启动服务");

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("绑定地址失败: {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("服务运行失败")?;

    pool_manager.close_all().await;
    info!("服务已停止");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "无法监听关闭信号");
        std::future::pending::<()>().await;
    }
}
