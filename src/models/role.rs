//! Role row model

use crate::rbac::{RoleData, RoleSource, RoleStatus};
use crate::repository::base::TableRow;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// roles 表的一行
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RoleRow {
    pub id: Uuid,
    pub name: String,
    pub source: RoleSource,
    pub status: RoleStatus,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TableRow for RoleRow {
    const TABLE: &'static str = "roles";
}

impl From<RoleRow> for RoleData {
    fn from(row: RoleRow) -> Self {
        RoleData {
            id: row.id,
            name: row.name,
            source: row.source,
            status: row.status,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}
