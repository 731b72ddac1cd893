//! 权限领域数据与输入类型

use super::id::{ObjectId, ScopeId};
use super::types::{EntityType, OperationType, PermissionStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 范围权限数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionData {
    pub id: Uuid,
    pub permission_group_id: Uuid,
    pub entity_type: EntityType,
    pub operation: OperationType,
}

/// 权限组数据（角色与单个范围的关联，含其全部子权限）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionGroupData {
    pub id: Uuid,
    pub role_id: Uuid,
    pub scope_id: ScopeId,
    pub permissions: Vec<PermissionData>,
}

/// 对象权限数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectPermissionData {
    pub id: Uuid,
    pub role_id: Uuid,
    pub object_id: ObjectId,
    pub operation: OperationType,
    pub status: PermissionStatus,
}

/// 创建角色时的权限组输入：一个范围 + 该范围下的若干 (entity_type, operation) 授权
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PermissionGroupInput {
    pub scope_id: ScopeId,
    pub permissions: Vec<PermissionInput>,
}

/// 范围内的单条授权输入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PermissionInput {
    pub entity_type: EntityType,
    pub operation: OperationType,
}

/// 增量更新时的范围权限输入（带完整范围标识）
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScopedPermissionInput {
    pub scope_id: ScopeId,
    pub entity_type: EntityType,
    pub operation: OperationType,
}

/// 对象权限输入
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObjectPermissionInput {
    pub object_id: ObjectId,
    pub operation: OperationType,
    pub status: PermissionStatus,
}
