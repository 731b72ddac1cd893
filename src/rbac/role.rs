//! 角色领域数据与输入类型

use super::permission::{
    ObjectPermissionData, ObjectPermissionInput, PermissionGroupData, PermissionGroupInput,
    ScopedPermissionInput,
};
use super::types::{RoleSource, RoleStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 角色数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleData {
    pub id: Uuid,
    pub name: String,
    pub source: RoleSource,
    pub status: RoleStatus,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// 带完整权限的角色数据（get_role_with_permissions 的返回值）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleDataWithPermissions {
    #[serde(flatten)]
    pub role: RoleData,
    pub permission_groups: Vec<PermissionGroupData>,
    pub object_permissions: Vec<ObjectPermissionData>,
}

/// 创建角色输入（角色 + 嵌套权限组 + 对象权限，在一个事务内创建）
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoleCreateInput {
    pub name: String,
    pub source: RoleSource,
    pub status: RoleStatus,
    pub description: Option<String>,
    pub permission_groups: Vec<PermissionGroupInput>,
    pub object_permissions: Vec<ObjectPermissionInput>,
}

/// 更新角色输入（只更新给出的列）
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RoleUpdateInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<RoleStatus>,
}

/// 角色权限批量更新输入（单事务内的增量增删）
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RolePermissionsUpdateInput {
    #[serde(default)]
    pub add_scoped_permissions: Vec<ScopedPermissionInput>,
    #[serde(default)]
    pub remove_scoped_permission_ids: Vec<Uuid>,
    #[serde(default)]
    pub add_object_permissions: Vec<ObjectPermissionInput>,
    #[serde(default)]
    pub remove_object_permission_ids: Vec<Uuid>,
}

/// 用户角色分配数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRoleData {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub granted_by: Option<Uuid>,
    pub granted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// 角色分配输入
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserRoleAssignmentInput {
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub granted_by: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// 角色撤销输入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct UserRoleRevocationInput {
    pub user_id: Uuid,
    pub role_id: Uuid,
}

/// 已分配用户数据（search_users_assigned_to_role 的行）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignedUserData {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub granted_by: Option<Uuid>,
    pub granted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub username: String,
    pub email: Option<String>,
}

/// 分页查询结果
#[derive(Debug, Clone, Serialize)]
pub struct ListResult<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

pub type RoleListResult = ListResult<RoleData>;
pub type AssignedUserListResult = ListResult<AssignedUserData>;
pub type PermissionListResult = ListResult<super::permission::PermissionData>;
pub type ObjectPermissionListResult = ListResult<ObjectPermissionData>;
