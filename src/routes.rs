//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::{handlers, middleware::AppState};

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开端点（健康检查）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    // 角色管理
    let role_routes = Router::new()
        .route(
            "/api/v1/roles",
            get(handlers::role::list_roles).post(handlers::role::create_role),
        )
        .route(
            "/api/v1/roles/{id}",
            get(handlers::role::get_role)
                .put(handlers::role::update_role)
                .delete(handlers::role::delete_role),
        )
        .route("/api/v1/roles/{id}/purge", post(handlers::role::purge_role))
        .route(
            "/api/v1/roles/{id}/permissions",
            put(handlers::role::update_role_permissions),
        )
        .route("/api/v1/roles/{id}/assign", post(handlers::role::assign_role))
        .route("/api/v1/roles/{id}/revoke", post(handlers::role::revoke_role))
        .route("/api/v1/roles/{id}/users", get(handlers::role::list_role_users))
        .route("/api/v1/users/{id}/roles", get(handlers::role::list_user_roles));

    // 权限判定与范围关联
    let permission_routes = Router::new()
        .route(
            "/api/v1/permissions",
            get(handlers::permission::list_permissions),
        )
        .route(
            "/api/v1/object-permissions",
            get(handlers::permission::list_object_permissions),
        )
        .route(
            "/api/v1/permissions/check-scope",
            post(handlers::permission::check_scope_permission),
        )
        .route(
            "/api/v1/permissions/check-object",
            post(handlers::permission::check_object_permission),
        )
        .route(
            "/api/v1/permissions/check-objects",
            post(handlers::permission::check_objects_permission),
        )
        .route(
            "/api/v1/associations",
            get(handlers::permission::get_entity_scopes)
                .post(handlers::permission::map_entity_to_scope),
        );

    // 指标端点
    let metrics_routes = Router::new().route("/metrics", get(handlers::metrics::metrics_export));

    Router::new()
        .merge(public_routes)
        .merge(role_routes)
        .merge(permission_routes)
        .merge(metrics_routes)
        .layer(axum::middleware::from_fn(
            crate::middleware::request_tracking_middleware,
        ))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::compression::CompressionLayer::new())
        // 请求体上限 1 MiB，批量判定接口也不应超过
        .layer(tower_http::limit::RequestBodyLimitLayer::new(1024 * 1024))
        .with_state(state)
}
