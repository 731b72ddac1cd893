//! 角色管理的 HTTP 处理器

use crate::{
    error::AppError,
    middleware::{ActorId, AppState},
    rbac::{
        ObjectId, ObjectPermissionInput, OperationType, PermissionGroupInput, PermissionInput,
        PermissionStatus, RoleCreateInput, RolePermissionsUpdateInput, RoleSource, RoleStatus,
        RoleUpdateInput, ScopeId, ScopedPermissionInput, UserRoleAssignmentInput,
        UserRoleRevocationInput,
    },
    repository::{
        base::{
            BatchQuerier, CursorBackwardPagination, CursorForwardPagination, OffsetPagination,
            Pagination, QueryCondition, QueryOrder,
        },
        permission::{AssignedUserConditions, RoleConditions, RoleOrders, StringMatchSpec},
        PermissionControllerRepository,
    },
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

// ===== 请求 DTO =====

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_source")]
    pub source: RoleSource,
    #[serde(default)]
    pub permission_groups: Vec<PermissionGroupRequest>,
    #[serde(default)]
    pub object_permissions: Vec<ObjectPermissionRequest>,
}

fn default_source() -> RoleSource {
    RoleSource::Custom
}

#[derive(Debug, Deserialize)]
pub struct PermissionGroupRequest {
    /// 规范形式 "scope_type:scope_id"
    pub scope_id: String,
    pub permissions: Vec<PermissionInput>,
}

#[derive(Debug, Deserialize)]
pub struct ObjectPermissionRequest {
    /// 规范形式 "entity_type:entity_id"
    pub object_id: String,
    pub operation: OperationType,
    #[serde(default = "default_permission_status")]
    pub status: PermissionStatus,
}

fn default_permission_status() -> PermissionStatus {
    PermissionStatus::Active
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<RoleStatus>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateRolePermissionsRequest {
    #[serde(default)]
    pub add_scoped_permissions: Vec<ScopedPermissionRequest>,
    #[serde(default)]
    pub remove_scoped_permission_ids: Vec<Uuid>,
    #[serde(default)]
    pub add_object_permissions: Vec<ObjectPermissionRequest>,
    #[serde(default)]
    pub remove_object_permission_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ScopedPermissionRequest {
    pub scope_id: String,
    pub entity_type: crate::rbac::EntityType,
    pub operation: OperationType,
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub user_id: Uuid,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct RevokeRoleRequest {
    pub user_id: Uuid,
}

/// 角色列表的查询参数。偏移与游标分页互斥，游标优先。
#[derive(Debug, Deserialize, Default)]
pub struct RoleListParams {
    pub name_contains: Option<String>,
    pub name_equals: Option<String>,
    #[serde(default)]
    pub case_insensitive: bool,
    pub source: Option<RoleSource>,
    pub status: Option<RoleStatus>,
    pub scope_id: Option<String>,
    pub order_by: Option<String>,
    #[serde(default)]
    pub descending: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub first: Option<i64>,
    pub after: Option<Uuid>,
    pub last: Option<i64>,
    pub before: Option<Uuid>,
}

#[derive(Debug, Deserialize, Default)]
pub struct AssignedUserListParams {
    pub username_contains: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// ===== 角色 CRUD =====

/// 创建角色
pub async fn create_role(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let permission_groups = req
        .permission_groups
        .into_iter()
        .map(|group| {
            Ok(PermissionGroupInput {
                scope_id: parse_scope_id(&group.scope_id)?,
                permissions: group.permissions,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;
    let object_permissions = parse_object_permissions(req.object_permissions)?;

    let repo = PermissionControllerRepository::new(state.db.clone());
    let role = repo
        .create_role(RoleCreateInput {
            name: req.name,
            source: req.source,
            status: RoleStatus::Active,
            description: req.description,
            permission_groups,
            object_permissions,
        })
        .await?;

    Ok(Json(json!({ "role": role })))
}

/// 获取角色详情（含权限明细）
pub async fn get_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let repo = PermissionControllerRepository::new(state.db.clone());
    let role = repo.get_role_with_permissions(id).await?;
    Ok(Json(json!({ "role": role })))
}

/// 角色列表
pub async fn list_roles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RoleListParams>,
) -> Result<impl IntoResponse, AppError> {
    // 过滤字段会被按值取走，整结构借用的分页参数要先读
    let pagination = build_pagination(&state, &params)?;

    let mut conditions: Vec<QueryCondition> = Vec::new();
    if let Some(value) = params.name_contains {
        let mut spec = StringMatchSpec::new(value);
        if params.case_insensitive {
            spec = spec.case_insensitive();
        }
        conditions.push(RoleConditions::by_name_contains(spec));
    }
    if let Some(value) = params.name_equals {
        let mut spec = StringMatchSpec::new(value);
        if params.case_insensitive {
            spec = spec.case_insensitive();
        }
        conditions.push(RoleConditions::by_name_equals(spec));
    }
    if let Some(source) = params.source {
        conditions.push(RoleConditions::by_sources(vec![source]));
    }
    if let Some(status) = params.status {
        conditions.push(RoleConditions::by_statuses(vec![status]));
    }
    if let Some(scope_id) = params.scope_id {
        let scope = parse_scope_id(&scope_id)?;
        conditions.push(RoleConditions::by_scope_type(scope.scope_type));
        conditions.push(RoleConditions::by_scope_id(scope.scope_id));
    }

    let orders = match params.order_by.as_deref() {
        None => vec![],
        Some("name") => vec![RoleOrders::name(!params.descending)],
        Some("created_at") => vec![RoleOrders::created_at(!params.descending)],
        Some("updated_at") => vec![RoleOrders::updated_at(!params.descending)],
        Some(other) => {
            return Err(AppError::BadRequest(format!(
                "unknown order_by field: {}",
                other
            )))
        }
    };

    let querier = BatchQuerier {
        conditions,
        orders,
        pagination,
    };

    let repo = PermissionControllerRepository::new(state.db.clone());
    let result = repo.search_roles(&querier).await?;
    Ok(Json(json!({
        "roles": result.items,
        "total_count": result.total_count,
        "has_next_page": result.has_next_page,
        "has_previous_page": result.has_previous_page,
    })))
}

/// 更新角色字段
pub async fn update_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let repo = PermissionControllerRepository::new(state.db.clone());
    let role = repo
        .update_role(
            id,
            RoleUpdateInput {
                name: req.name,
                description: req.description,
                status: req.status,
            },
        )
        .await?;
    Ok(Json(json!({ "role": role })))
}

/// 软删除角色
pub async fn delete_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let repo = PermissionControllerRepository::new(state.db.clone());
    let role = repo.delete_role(id).await?;
    Ok(Json(json!({ "message": "role deleted", "role": role })))
}

/// 物理删除角色。仅限拥有全局 delete 授权的操作者。
pub async fn purge_role(
    State(state): State<Arc<AppState>>,
    actor: ActorId,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .permission_service
        .require_scope_permission(actor.0, &ScopeId::global(), OperationType::Delete)
        .await?;

    let repo = PermissionControllerRepository::new(state.db.clone());
    let role = repo.purge_role(id).await?;
    Ok(Json(json!({ "message": "role purged", "role": role })))
}

// ===== 权限维护 =====

/// 增量更新角色权限
pub async fn update_role_permissions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRolePermissionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let add_scoped_permissions = req
        .add_scoped_permissions
        .into_iter()
        .map(|add| {
            Ok(ScopedPermissionInput {
                scope_id: parse_scope_id(&add.scope_id)?,
                entity_type: add.entity_type,
                operation: add.operation,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;
    let add_object_permissions = parse_object_permissions(req.add_object_permissions)?;

    let repo = PermissionControllerRepository::new(state.db.clone());
    let role = repo
        .update_role_permissions(
            id,
            RolePermissionsUpdateInput {
                add_scoped_permissions,
                remove_scoped_permission_ids: req.remove_scoped_permission_ids,
                add_object_permissions,
                remove_object_permission_ids: req.remove_object_permission_ids,
            },
        )
        .await?;
    Ok(Json(json!({ "role": role })))
}

// ===== 角色分配 =====

/// 给用户分配角色
pub async fn assign_role(
    State(state): State<Arc<AppState>>,
    actor: ActorId,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let repo = PermissionControllerRepository::new(state.db.clone());
    let assignment = repo
        .assign_role(UserRoleAssignmentInput {
            user_id: req.user_id,
            role_id: id,
            granted_by: Some(actor.0),
            expires_at: req.expires_at,
        })
        .await?;
    Ok(Json(json!({ "assignment": assignment })))
}

/// 撤销用户的角色
pub async fn revoke_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<RevokeRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let repo = PermissionControllerRepository::new(state.db.clone());
    let revoked_id = repo
        .revoke_role(UserRoleRevocationInput {
            user_id: req.user_id,
            role_id: id,
        })
        .await?;
    Ok(Json(json!({ "message": "role revoked", "assignment_id": revoked_id })))
}

/// 列出角色下的用户
pub async fn list_role_users(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(params): Query<AssignedUserListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut conditions = vec![AssignedUserConditions::by_role_id(id)];
    if let Some(value) = params.username_contains {
        conditions.push(AssignedUserConditions::by_username_contains(
            StringMatchSpec::new(value).case_insensitive(),
        ));
    }

    let limit = clamp_limit(&state, params.limit);
    let querier = BatchQuerier {
        conditions,
        orders: vec![crate::repository::permission::AssignedUserOrders::username(true)],
        pagination: Pagination::Offset(OffsetPagination {
            limit,
            offset: params.offset.unwrap_or(0).max(0),
        }),
    };

    let repo = PermissionControllerRepository::new(state.db.clone());
    let result = repo.search_users_assigned_to_role(&querier).await?;
    Ok(Json(json!({
        "users": result.items,
        "total_count": result.total_count,
        "has_next_page": result.has_next_page,
        "has_previous_page": result.has_previous_page,
    })))
}

/// 列出用户持有的角色
pub async fn list_user_roles(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let repo = PermissionControllerRepository::new(state.db.clone());
    let roles = repo.get_user_roles(user_id).await?;
    Ok(Json(json!({ "roles": roles })))
}

// ===== 辅助 =====

pub(crate) fn parse_scope_id(value: &str) -> Result<ScopeId, AppError> {
    value
        .parse::<ScopeId>()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

pub(crate) fn parse_object_id(value: &str) -> Result<ObjectId, AppError> {
    value
        .parse::<ObjectId>()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

fn parse_object_permissions(
    requests: Vec<ObjectPermissionRequest>,
) -> Result<Vec<ObjectPermissionInput>, AppError> {
    requests
        .into_iter()
        .map(|req| {
            Ok(ObjectPermissionInput {
                object_id: parse_object_id(&req.object_id)?,
                operation: req.operation,
                status: req.status,
            })
        })
        .collect()
}

pub(crate) fn clamp_limit(state: &AppState, limit: Option<i64>) -> i64 {
    limit
        .unwrap_or(state.config.query.default_page_size)
        .clamp(1, state.config.query.max_page_size)
}

/// 根据查询参数决定分页方式。显式游标参数优先于偏移分页。
fn build_pagination(state: &AppState, params: &RoleListParams) -> Result<Pagination, AppError> {
    if params.first.is_some() || params.after.is_some() {
        if params.last.is_some() || params.before.is_some() {
            return Err(AppError::BadRequest(
                "forward and backward cursor parameters are mutually exclusive".to_string(),
            ));
        }
        let first = clamp_limit(state, params.first);
        return Ok(Pagination::CursorForward(CursorForwardPagination {
            first,
            cursor_order: QueryOrder::asc("created_at"),
            cursor_condition: params.after.map(RoleConditions::by_cursor_forward),
        }));
    }
    if params.last.is_some() || params.before.is_some() {
        let last = clamp_limit(state, params.last);
        return Ok(Pagination::CursorBackward(CursorBackwardPagination {
            last,
            cursor_order: QueryOrder::desc("created_at"),
            cursor_condition: params.before.map(RoleConditions::by_cursor_backward),
        }));
    }
    Ok(Pagination::Offset(OffsetPagination {
        limit: clamp_limit(state, params.limit),
        offset: params.offset.unwrap_or(0).max(0),
    }))
}
