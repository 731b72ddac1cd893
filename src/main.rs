//! 服务主入口

use std::sync::Arc;
use strata_manager::{
    config::AppConfig, db, handlers::health, middleware::AppState, routes,
    services::PermissionService, telemetry,
};
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ===== CLI 参数处理 =====
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "--version" => {
                println!("strata-manager {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("未知参数: {}", args[1]);
                print_help();
                std::process::exit(1);
            }
        }
    }

    // 加载 .env 文件（开发环境）
    // 按优先级：.env.local > .env.development > .env
    // 生产环境直接设置环境变量，不依赖 .env 文件
    if let Ok(profile) = std::env::var("STRATA_ENV") {
        dotenv::from_filename(format!(".env.{}", profile)).ok();
    } else {
        dotenv::from_filename(".env.local").ok();
        dotenv::from_filename(".env.development").ok();
        dotenv::dotenv().ok();
    }

    // 设置应用启动时间
    health::set_start_time();

    // 1. 加载配置
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        anyhow::anyhow!("Failed to load configuration: {}", e)
    })?;

    // 2. 初始化日志与指标
    telemetry::init_telemetry(&config);
    telemetry::init_metrics();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Strata manager starting...");

    // 3. 数据库连接池 + 迁移
    let pool = db::create_pool(&config.database).await?;
    db::run_migrations(&pool).await?;
    let database = db::Database::new(pool);

    tracing::info!("Database initialized");

    // 4. 构建应用状态
    let app_state = Arc::new(AppState {
        permission_service: Arc::new(PermissionService::new(database.clone())),
        db: database,
        config: config.clone(),
    });

    // 5. 构建路由
    let app = routes::create_router(app_state);

    // 6. 启动服务器
    let addr = &config.server.addr;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(addr = %addr, "Server listening");

    // 7. 优雅关闭
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.graceful_shutdown_timeout_secs))
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// 优雅关闭信号处理。信号一到立即返回、开始排水，
/// 排水超过时限由看门狗强制退出。
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!("Failed to install signal handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Terminate signal received, starting graceful shutdown");
        },
    }

    spawn_shutdown_deadline(timeout_secs, || {
        tracing::error!("Graceful shutdown timeout reached, forcing exit");
        std::process::exit(1);
    });
}

/// 排水看门狗：到期触发回调。正常排水完成时进程先退出，任务随之消亡。
fn spawn_shutdown_deadline(timeout_secs: u64, on_timeout: impl FnOnce() + Send + 'static) {
    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_secs(timeout_secs)).await;
        on_timeout();
    });
}

/// 打印帮助信息
fn print_help() {
    println!("strata-manager {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("用法: strata-manager [选项]");
    println!();
    println!("选项:");
    println!("  --version     打印版本信息并退出");
    println!("  --help        打印此帮助信息并退出");
    println!();
    println!("环境变量:");
    println!("  所有配置通过 STRATA_ 前缀的环境变量完成");
    println!("  例如: STRATA_DATABASE__URL, STRATA_SERVER__ADDR");
}
