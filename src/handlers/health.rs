//! 健康检查处理器

use crate::db::{self, HealthStatus};
use crate::middleware::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Instant;

static START_TIME: OnceLock<Instant> = OnceLock::new();

/// 记录应用启动时间，进程启动时调用一次
pub fn set_start_time() {
    let _ = START_TIME.set(Instant::now());
}

pub fn get_uptime() -> u64 {
    START_TIME
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub database: String,
}

/// 存活检查：进程在即 OK，不触达任何依赖
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: get_uptime(),
    })
}

/// 就绪检查：探测数据库连通性
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    db::record_pool_metrics(state.db.pool());
    match db::health_check(state.db.pool()).await {
        HealthStatus::Healthy => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready",
                database: "ok".to_string(),
            }),
        ),
        HealthStatus::Unhealthy(reason) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready",
                database: reason,
            }),
        ),
    }
}
