//! 数据表浏览服务公共模块
//!
//! 包含配置加载、错误类型、统一响应格式、数据模型、中间件与工具函数。

pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod response;
pub mod utils;
