//! 日志与指标初始化

use crate::config::AppConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 初始化 tracing 订阅者。
/// RUST_LOG 优先于配置中的日志级别。
pub fn init_telemetry(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    match config.logging.format.to_lowercase().as_str() {
        "pretty" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_current_span(true))
                .init();
        }
    }
}

/// 注册核心指标的描述信息
pub fn init_metrics() {
    metrics::describe_counter!("http_requests_total", "Total HTTP requests handled");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request latency in seconds"
    );
    metrics::describe_counter!(
        "rbac_permission_checks_total",
        "Permission checks evaluated, labelled by outcome"
    );
    metrics::describe_gauge!("db.pool.size", "Database pool size");
    metrics::describe_gauge!("db.pool.idle", "Idle database connections");
}
