//! 指标处理器
//! 提供 /metrics 端点

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::middleware::AppState;

/// 指标响应
#[derive(Serialize)]
pub struct MetricsResponse {
    pub db_pool_size: u32,
    pub db_pool_idle: u32,
    pub process_uptime_secs: u64,
}

/// 指标暴露端点
/// 简化实现：返回基础指标快照，生产环境应接 Prometheus exporter
pub async fn metrics_export(State(state): State<Arc<AppState>>) -> Json<MetricsResponse> {
    let pool = state.db.pool();
    Json(MetricsResponse {
        db_pool_size: pool.size(),
        db_pool_idle: pool.num_idle() as u32,
        process_uptime_secs: crate::handlers::health::get_uptime(),
    })
}
