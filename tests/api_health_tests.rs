//! 健康检查与基础 API 行为的集成测试
//! 这些用例不触达数据库，使用惰性连接池构造应用。

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

mod common;

fn test_app() -> axum::Router {
    let state = common::create_app_state(common::lazy_pool());
    strata_manager::routes::create_router(state)
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert!(json["uptime_secs"].is_number());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert!(json["process_uptime_secs"].is_number());
    assert!(json["db_pool_size"].is_number());
}

#[tokio::test]
async fn test_not_found_endpoint() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_purge_requires_actor_header() {
    let app = test_app();

    // 缺少 x-user-id 头在触达数据库之前就被拒绝
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!(
                    "/api/v1/roles/{}/purge",
                    uuid::Uuid::new_v4()
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_check_scope_rejects_malformed_scope() {
    let app = test_app();

    let request_body = serde_json::json!({
        "user_id": uuid::Uuid::new_v4(),
        "scope_id": "not-a-scope",
        "operation": "read",
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/permissions/check-scope")
                .header("content-type", "application/json")
                .body(Body::from(request_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["error"]["code"], 400);
}

#[tokio::test]
async fn test_create_role_rejects_empty_name() {
    let app = test_app();

    let request_body = serde_json::json!({ "name": "" });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/roles")
                .header("content-type", "application/json")
                .body(Body::from(request_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_roles_rejects_mixed_cursor_directions() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/roles?first=10&last=10")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_roles_rejects_mixed_cursors_with_filters_present() {
    let app = test_app();

    // 过滤参数与分页参数同时给出时，分页校验照常生效
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/roles?name_contains=admin&name_equals=admin&scope_id=project:p1&first=10&before=00000000-0000-0000-0000-000000000000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
