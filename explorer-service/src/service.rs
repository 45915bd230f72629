//! 数据浏览服务模块

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use common::models::{
    DatabaseItem, PlotRequest, RowSet, SampleGroups, TableColumns, TableData, TableList,
};
use common::utils::{group_by_sample, tables_for_sample, TableValidator};

use crate::chart::{self, ChartSpec};
use crate::fetcher;
use crate::pool_manager::{DatabasePool, PoolManager};
use crate::schema;

/// 数据浏览服务 Trait
#[async_trait]
pub trait ExplorerServiceTrait: Send + Sync {
    /// 列出已配置的数据库
    fn list_databases(&self) -> Vec<DatabaseItem>;

    /// 列出数据库中的表
    async fn list_tables(&self, database: &str) -> AppResult<TableList>;

    /// 按样本前缀分组
    async fn sample_groups(&self, database: &str) -> AppResult<SampleGroups>;

    /// 列出属于某个样本的表
    async fn sample_tables(&self, database: &str, sample: &str) -> AppResult<TableList>;

    /// 读取整张表
    async fn browse_table(&self, database: &str, table: &str) -> AppResult<TableData>;

    /// 读取表的列名
    async fn table_columns(&self, database: &str, table: &str) -> AppResult<TableColumns>;

    /// 渲染图表，返回 PNG 字节
    async fn render_chart(&self, req: PlotRequest) -> AppResult<Vec<u8>>;
}

/// 数据浏览服务
pub struct ExplorerService {
    pool_manager: Arc<PoolManager>,
    config: AppConfig,
}

impl ExplorerService {
    /// 创建新的服务实例
    pub fn new(pool_manager: Arc<PoolManager>, config: AppConfig) -> Self {
        Self {
            pool_manager,
            config,
        }
    }

    /// Runs `fut` under a deadline of `secs` seconds.
    async fn with_deadline<T, F>(&self, secs: u64, what: &str, fut: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        tokio::time::timeout(Duration::from_secs(secs), fut)
            .await
            .map_err(|_| AppError::Timeout(format!("{} exceeded {}s", what, secs)))?
    }

    /// Runs a database step under the query deadline.
    async fn with_query_timeout<T, F>(&self, what: &str, fut: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        self.with_deadline(self.config.query_timeout_secs, what, fut)
            .await
    }

    async fn introspect(&self, database: &str) -> AppResult<(DatabasePool, Vec<String>)> {
        let pool = self.pool_manager.resolve(database).await?;
        let tables = self
            .with_query_timeout("table introspection", schema::list_tables(&pool))
            .await?;
        Ok((pool, tables))
    }

    /// Introspects, validates the name and fetches the whole table.
    async fn load_table(&self, database: &str, table: &str) -> AppResult<RowSet> {
        let (pool, tables) = self.introspect(database).await?;
        let validated = TableValidator::validate(&tables, table)?;
        self.with_query_timeout("table fetch", fetcher::fetch_all(&pool, &validated))
            .await
    }
}

#[async_trait]
impl ExplorerServiceTrait for ExplorerService {
    fn list_databases(&self) -> Vec<DatabaseItem> {
        self.pool_manager.databases()
    }

    async fn list_tables(&self, database: &str) -> AppResult<TableList> {
        let (_, tables) = self.introspect(database).await?;
        Ok(TableList {
            database: database.to_string(),
            tables,
        })
    }

    async fn sample_groups(&self, database: &str) -> AppResult<SampleGroups> {
        let (_, tables) = self.introspect(database).await?;
        Ok(SampleGroups {
            database: database.to_string(),
            groups: group_by_sample(&tables),
        })
    }

    async fn sample_tables(&self, database: &str, sample: &str) -> AppResult<TableList> {
        let (_, tables) = self.introspect(database).await?;
        Ok(TableList {
            database: database.to_string(),
            tables: tables_for_sample(&tables, sample),
        })
    }

    async fn browse_table(&self, database: &str, table: &str) -> AppResult<TableData> {
        let data = self.load_table(database, table).await?;
        Ok(TableData {
            database: database.to_string(),
            table: table.to_string(),
            data,
        })
    }

    async fn table_columns(&self, database: &str, table: &str) -> AppResult<TableColumns> {
        let data = self.load_table(database, table).await?;
        Ok(TableColumns {
            database: database.to_string(),
            table: table.to_string(),
            columns: data.columns().to_vec(),
        })
    }

    async fn render_chart(&self, req: PlotRequest) -> AppResult<Vec<u8>> {
        let kind = req.kind()?;
        let database = req
            .database
            .clone()
            .filter(|db| !db.is_empty())
            .unwrap_or_else(|| self.pool_manager.default_database().to_string());

        let rows = self.load_table(&database, &req.table_name).await?;
        let x = rows.column(&req.x_column)?;
        let y = rows.column(&req.y_column)?;

        let spec = ChartSpec {
            kind,
            title: req.resolved_title(kind),
            x_label: req.x_column.clone(),
            y_label: req.y_column.clone(),
            width: self.config.chart_width,
            height: self.config.chart_height,
        };

        let task = tokio::task::spawn_blocking(move || chart::render(&x, &y, &spec));
        let png = self
            .with_deadline(self.config.render_timeout_secs, "chart rendering", async {
                task.await.unwrap_or_else(|e| {
                    Err(AppError::Internal(format!("render task failed: {}", e)))
                })
            })
            .await?;

        tracing::info!(
            database = %database,
            table = %req.table_name,
            kind = %kind,
            points = rows.len(),
            bytes = png.len(),
            "chart rendered"
        );
        Ok(png)
    }
}
