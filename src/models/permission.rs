//! Permission group / permission row models

use crate::rbac::{
    EntityType, OperationType, PermissionData, PermissionGroupData, ScopeId, ScopeType,
};
use crate::repository::base::TableRow;
use uuid::Uuid;

/// permission_groups 表的一行。scope_type/scope_id 在领域层合并为 ScopeId。
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PermissionGroupRow {
    pub id: Uuid,
    pub role_id: Uuid,
    pub scope_type: ScopeType,
    pub scope_id: String,
}

impl TableRow for PermissionGroupRow {
    const TABLE: &'static str = "permission_groups";
}

impl PermissionGroupRow {
    pub fn scope(&self) -> ScopeId {
        ScopeId::new(self.scope_type, self.scope_id.clone())
    }

    pub fn into_data(self, permissions: Vec<PermissionData>) -> PermissionGroupData {
        PermissionGroupData {
            id: self.id,
            role_id: self.role_id,
            scope_id: ScopeId::new(self.scope_type, self.scope_id),
            permissions,
        }
    }
}

/// permissions 表的一行
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PermissionRow {
    pub id: Uuid,
    pub permission_group_id: Uuid,
    pub entity_type: EntityType,
    pub operation: OperationType,
}

impl TableRow for PermissionRow {
    const TABLE: &'static str = "permissions";
}

impl From<PermissionRow> for PermissionData {
    fn from(row: PermissionRow) -> Self {
        PermissionData {
            id: row.id,
            permission_group_id: row.permission_group_id,
            entity_type: row.entity_type,
            operation: row.operation,
        }
    }
}

/// get_role_with_permissions 的 LEFT JOIN 扁平行。
/// 角色可能有没有任何权限的组，permission 列因此可空。
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PermissionGroupJoinRow {
    pub group_id: Uuid,
    pub role_id: Uuid,
    pub scope_type: ScopeType,
    pub scope_id: String,
    pub permission_id: Option<Uuid>,
    pub entity_type: Option<EntityType>,
    pub operation: Option<OperationType>,
}
