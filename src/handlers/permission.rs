//! 权限判定与范围关联的 HTTP 处理器

use crate::{
    error::AppError,
    handlers::role::{clamp_limit, parse_object_id, parse_scope_id},
    middleware::AppState,
    rbac::{EntityType, OperationType, PermissionStatus},
    repository::{
        base::{BatchQuerier, OffsetPagination, Pagination, QueryCondition},
        permission::{ObjectPermissionConditions, PermissionConditions},
        PermissionControllerRepository,
    },
};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CheckScopePermissionRequest {
    pub user_id: Uuid,
    /// 规范形式 "scope_type:scope_id"
    pub scope_id: String,
    pub operation: OperationType,
}

#[derive(Debug, Deserialize)]
pub struct CheckObjectPermissionRequest {
    pub user_id: Uuid,
    /// 规范形式 "entity_type:entity_id"
    pub object_id: String,
    pub operation: OperationType,
}

#[derive(Debug, Deserialize)]
pub struct CheckObjectsPermissionRequest {
    pub user_id: Uuid,
    pub object_ids: Vec<String>,
    pub operation: OperationType,
}

#[derive(Debug, Deserialize)]
pub struct MapEntityRequest {
    pub scope_id: String,
    pub object_id: String,
}

#[derive(Debug, Deserialize)]
pub struct EntityScopesParams {
    pub object_id: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct PermissionListParams {
    pub role_id: Option<Uuid>,
    pub permission_group_id: Option<Uuid>,
    pub entity_type: Option<EntityType>,
    pub operation: Option<OperationType>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ObjectPermissionListParams {
    pub role_id: Option<Uuid>,
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<String>,
    pub operation: Option<OperationType>,
    pub status: Option<PermissionStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// 范围权限判定
pub async fn check_scope_permission(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckScopePermissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let scope = parse_scope_id(&req.scope_id)?;
    let allowed = state
        .permission_service
        .check_scope_permission(req.user_id, &scope, req.operation)
        .await?;
    Ok(Json(json!({ "allowed": allowed })))
}

/// 单实体权限判定
pub async fn check_object_permission(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckObjectPermissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let object = parse_object_id(&req.object_id)?;
    let allowed = state
        .permission_service
        .check_object_permission(req.user_id, &object, req.operation)
        .await?;
    Ok(Json(json!({ "allowed": allowed })))
}

/// 批量实体权限判定。响应按请求的规范标识回填。
pub async fn check_objects_permission(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckObjectsPermissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let objects = req
        .object_ids
        .iter()
        .map(|raw| parse_object_id(raw))
        .collect::<Result<Vec<_>, AppError>>()?;

    let results = state
        .permission_service
        .check_object_permissions_batch(req.user_id, &objects, req.operation)
        .await?;

    let by_canonical: HashMap<String, bool> = results
        .into_iter()
        .map(|(object, allowed)| (object.to_string(), allowed))
        .collect();
    Ok(Json(json!({ "results": by_canonical })))
}

/// 范围权限列表
pub async fn list_permissions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PermissionListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut conditions: Vec<QueryCondition> = Vec::new();
    if let Some(role_id) = params.role_id {
        conditions.push(PermissionConditions::by_role_id(role_id));
    }
    if let Some(group_id) = params.permission_group_id {
        conditions.push(PermissionConditions::by_permission_group_id(group_id));
    }
    if let Some(entity_type) = params.entity_type {
        conditions.push(PermissionConditions::by_entity_types(vec![entity_type]));
    }
    if let Some(operation) = params.operation {
        conditions.push(PermissionConditions::by_operations(vec![operation]));
    }

    let querier = BatchQuerier {
        conditions,
        orders: vec![],
        pagination: Pagination::Offset(OffsetPagination {
            limit: clamp_limit(&state, params.limit),
            offset: params.offset.unwrap_or(0).max(0),
        }),
    };

    let repo = PermissionControllerRepository::new(state.db.clone());
    let result = repo.search_permissions(&querier).await?;
    Ok(Json(json!({
        "permissions": result.items,
        "total_count": result.total_count,
        "has_next_page": result.has_next_page,
        "has_previous_page": result.has_previous_page,
    })))
}

/// 对象权限列表
pub async fn list_object_permissions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ObjectPermissionListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut conditions: Vec<QueryCondition> = Vec::new();
    if let Some(role_id) = params.role_id {
        conditions.push(ObjectPermissionConditions::by_role_id(role_id));
    }
    if let Some(entity_type) = params.entity_type {
        conditions.push(ObjectPermissionConditions::by_entity_types(vec![entity_type]));
    }
    if let Some(entity_id) = params.entity_id {
        conditions.push(ObjectPermissionConditions::by_entity_id(entity_id));
    }
    if let Some(operation) = params.operation {
        conditions.push(ObjectPermissionConditions::by_operations(vec![operation]));
    }
    if let Some(status) = params.status {
        conditions.push(ObjectPermissionConditions::by_statuses(vec![status]));
    }

    let querier = BatchQuerier {
        conditions,
        orders: vec![],
        pagination: Pagination::Offset(OffsetPagination {
            limit: clamp_limit(&state, params.limit),
            offset: params.offset.unwrap_or(0).max(0),
        }),
    };

    let repo = PermissionControllerRepository::new(state.db.clone());
    let result = repo.search_object_permissions(&querier).await?;
    Ok(Json(json!({
        "object_permissions": result.items,
        "total_count": result.total_count,
        "has_next_page": result.has_next_page,
        "has_previous_page": result.has_previous_page,
    })))
}

/// 把实体挂到范围下（幂等）
pub async fn map_entity_to_scope(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MapEntityRequest>,
) -> Result<impl IntoResponse, AppError> {
    let scope = parse_scope_id(&req.scope_id)?;
    let object = parse_object_id(&req.object_id)?;

    let repo = PermissionControllerRepository::new(state.db.clone());
    let association_id = repo.map_entity_to_scope(&scope, &object).await?;
    Ok(Json(json!({ "association_id": association_id })))
}

/// 查询实体归属的范围
pub async fn get_entity_scopes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EntityScopesParams>,
) -> Result<impl IntoResponse, AppError> {
    let object = parse_object_id(&params.object_id)?;

    let repo = PermissionControllerRepository::new(state.db.clone());
    let scopes = repo.get_entity_mapped_scopes(&object).await?;
    let canonical: Vec<String> = scopes.iter().map(|scope| scope.to_string()).collect();
    Ok(Json(json!({ "scopes": canonical })))
}
