//! 多租户控制面的 RBAC 权限核心
//! 提供角色/权限模型、通用仓储抽象与 HTTP 服务

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rbac;
pub mod repository;
pub mod routes;
pub mod services;
pub mod telemetry;
