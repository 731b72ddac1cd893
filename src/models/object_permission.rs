//! Object permission row model

use crate::rbac::{
    EntityType, ObjectId, ObjectPermissionData, OperationType, PermissionStatus,
};
use crate::repository::base::TableRow;
use uuid::Uuid;

/// object_permissions 表的一行。entity_type/entity_id 在领域层合并为 ObjectId。
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ObjectPermissionRow {
    pub id: Uuid,
    pub role_id: Uuid,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub operation: OperationType,
    pub status: PermissionStatus,
}

impl TableRow for ObjectPermissionRow {
    const TABLE: &'static str = "object_permissions";
}

impl From<ObjectPermissionRow> for ObjectPermissionData {
    fn from(row: ObjectPermissionRow) -> Self {
        ObjectPermissionData {
            id: row.id,
            role_id: row.role_id,
            object_id: ObjectId::new(row.entity_type, row.entity_id),
            operation: row.operation,
            status: row.status,
        }
    }
}
