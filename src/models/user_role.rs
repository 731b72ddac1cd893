//! User-role assignment row models

use crate::rbac::{AssignedUserData, UserRoleData};
use crate::repository::base::TableRow;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// user_roles 表的一行
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRoleRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub granted_by: Option<Uuid>,
    pub granted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TableRow for UserRoleRow {
    const TABLE: &'static str = "user_roles";
}

impl From<UserRoleRow> for UserRoleData {
    fn from(row: UserRoleRow) -> Self {
        UserRoleData {
            id: row.id,
            user_id: row.user_id,
            role_id: row.role_id,
            granted_by: row.granted_by,
            granted_at: row.granted_at,
            expires_at: row.expires_at,
        }
    }
}

/// user_roles JOIN users 的一行，用于列出角色下的用户。
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AssignedUserRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub granted_by: Option<Uuid>,
    pub granted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub username: String,
    pub email: Option<String>,
}

impl From<AssignedUserRow> for AssignedUserData {
    fn from(row: AssignedUserRow) -> Self {
        AssignedUserData {
            id: row.id,
            user_id: row.user_id,
            role_id: row.role_id,
            granted_by: row.granted_by,
            granted_at: row.granted_at,
            expires_at: row.expires_at,
            username: row.username,
            email: row.email,
        }
    }
}
