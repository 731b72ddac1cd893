//! RBAC 各表的创建/更新规格

use crate::models::{
    AssociationScopesEntitiesRow, ObjectPermissionRow, PermissionGroupRow, PermissionRow,
    RoleRow, UserRoleRow,
};
use crate::rbac::{
    EntityType, ObjectId, OperationType, PermissionStatus, RoleSource, RoleStatus, ScopeId,
};
use crate::repository::base::{CreatorSpec, UpdaterSpec};
use chrono::{DateTime, Utc};
use sqlx::query_builder::Separated;
use sqlx::Postgres;
use uuid::Uuid;

pub struct RoleCreatorSpec {
    pub name: String,
    pub source: RoleSource,
    pub status: RoleStatus,
    pub description: Option<String>,
}

impl CreatorSpec for RoleCreatorSpec {
    type Row = RoleRow;

    fn columns(&self) -> &'static [&'static str] {
        &["name", "source", "status", "description"]
    }

    fn push_values(&self, values: &mut Separated<'_, '_, Postgres, &'static str>) {
        values.push_bind(self.name.clone());
        values.push_bind(self.source);
        values.push_bind(self.status);
        values.push_bind(self.description.clone());
    }
}

pub struct PermissionGroupCreatorSpec {
    pub role_id: Uuid,
    pub scope_id: ScopeId,
}

impl CreatorSpec for PermissionGroupCreatorSpec {
    type Row = PermissionGroupRow;

    fn columns(&self) -> &'static [&'static str] {
        &["role_id", "scope_type", "scope_id"]
    }

    fn push_values(&self, values: &mut Separated<'_, '_, Postgres, &'static str>) {
        values.push_bind(self.role_id);
        values.push_bind(self.scope_id.scope_type);
        values.push_bind(self.scope_id.scope_id.clone());
    }
}

pub struct PermissionCreatorSpec {
    pub permission_group_id: Uuid,
    pub entity_type: EntityType,
    pub operation: OperationType,
}

impl CreatorSpec for PermissionCreatorSpec {
    type Row = PermissionRow;

    fn columns(&self) -> &'static [&'static str] {
        &["permission_group_id", "entity_type", "operation"]
    }

    fn push_values(&self, values: &mut Separated<'_, '_, Postgres, &'static str>) {
        values.push_bind(self.permission_group_id);
        values.push_bind(self.entity_type);
        values.push_bind(self.operation);
    }
}

pub struct ObjectPermissionCreatorSpec {
    pub role_id: Uuid,
    pub object_id: ObjectId,
    pub operation: OperationType,
    pub status: PermissionStatus,
}

impl CreatorSpec for ObjectPermissionCreatorSpec {
    type Row = ObjectPermissionRow;

    fn columns(&self) -> &'static [&'static str] {
        &["role_id", "entity_type", "entity_id", "operation", "status"]
    }

    fn push_values(&self, values: &mut Separated<'_, '_, Postgres, &'static str>) {
        values.push_bind(self.role_id);
        values.push_bind(self.object_id.entity_type);
        values.push_bind(self.object_id.entity_id.clone());
        values.push_bind(self.operation);
        values.push_bind(self.status);
    }
}

pub struct UserRoleCreatorSpec {
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub granted_by: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CreatorSpec for UserRoleCreatorSpec {
    type Row = UserRoleRow;

    fn columns(&self) -> &'static [&'static str] {
        &["user_id", "role_id", "granted_by", "expires_at"]
    }

    fn push_values(&self, values: &mut Separated<'_, '_, Postgres, &'static str>) {
        values.push_bind(self.user_id);
        values.push_bind(self.role_id);
        values.push_bind(self.granted_by);
        values.push_bind(self.expires_at);
    }
}

pub struct AssociationScopesEntitiesCreatorSpec {
    pub scope_id: ScopeId,
    pub object_id: ObjectId,
}

impl CreatorSpec for AssociationScopesEntitiesCreatorSpec {
    type Row = AssociationScopesEntitiesRow;

    fn columns(&self) -> &'static [&'static str] {
        &["scope_type", "scope_id", "entity_type", "entity_id"]
    }

    fn push_values(&self, values: &mut Separated<'_, '_, Postgres, &'static str>) {
        values.push_bind(self.scope_id.scope_type);
        values.push_bind(self.scope_id.scope_id.clone());
        values.push_bind(self.object_id.entity_type);
        values.push_bind(self.object_id.entity_id.clone());
    }
}

/// 角色字段更新规格。None 的列不进入 SET 子句。
pub struct RoleUpdaterSpec {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<RoleStatus>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl UpdaterSpec for RoleUpdaterSpec {
    type Row = RoleRow;

    fn push_set(&self, set: &mut Separated<'_, '_, Postgres, &'static str>) {
        if let Some(name) = &self.name {
            set.push("name = ");
            set.push_bind_unseparated(name.clone());
        }
        if let Some(description) = &self.description {
            set.push("description = ");
            set.push_bind_unseparated(description.clone());
        }
        if let Some(status) = self.status {
            set.push("status = ");
            set.push_bind_unseparated(status);
        }
        set.push("updated_at = ");
        set.push_bind_unseparated(self.updated_at);
        if let Some(deleted_at) = self.deleted_at {
            set.push("deleted_at = ");
            set.push_bind_unseparated(deleted_at);
        }
    }
}

/// 对象权限状态的批量更新规格（软删除角色时使用）。
pub struct ObjectPermissionStatusUpdaterSpec {
    pub status: PermissionStatus,
}

impl UpdaterSpec for ObjectPermissionStatusUpdaterSpec {
    type Row = ObjectPermissionRow;

    fn push_set(&self, set: &mut Separated<'_, '_, Postgres, &'static str>) {
        set.push("status = ");
        set.push_bind_unseparated(self.status);
    }
}
