//! RBAC 枚举类型
//! 所有枚举均为封闭集合，运行时不可扩展；与数据库枚举类型一一对应

use serde::{Deserialize, Serialize};

/// 授权范围类型（层级边界）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "scope_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ScopeType {
    Global,
    Domain,
    Project,
    User,
}

impl ScopeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeType::Global => "global",
            ScopeType::Domain => "domain",
            ScopeType::Project => "project",
            ScopeType::User => "user",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "global" => Some(ScopeType::Global),
            "domain" => Some(ScopeType::Domain),
            "project" => Some(ScopeType::Project),
            "user" => Some(ScopeType::User),
            _ => None,
        }
    }
}

/// 实体类型（可寻址资源）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "entity_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Session,
    Vfolder,
    Image,
    Deployment,
    Artifact,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Session => "session",
            EntityType::Vfolder => "vfolder",
            EntityType::Image => "image",
            EntityType::Deployment => "deployment",
            EntityType::Artifact => "artifact",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "session" => Some(EntityType::Session),
            "vfolder" => Some(EntityType::Vfolder),
            "image" => Some(EntityType::Image),
            "deployment" => Some(EntityType::Deployment),
            "artifact" => Some(EntityType::Artifact),
            _ => None,
        }
    }
}

/// 操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "operation_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Create,
    Read,
    Update,
    Delete,
    Execute,
}

/// 角色来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "role_source", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RoleSource {
    System,
    Custom,
}

/// 角色状态
/// 状态迁移在实践中单向：Active -> Inactive/Deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "role_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RoleStatus {
    Active,
    Inactive,
    Deleted,
}

/// 对象权限状态（允许软撤销，不依赖行删除）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "permission_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Active,
    Inactive,
    Deleted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_type_round_trip() {
        for st in [
            ScopeType::Global,
            ScopeType::Domain,
            ScopeType::Project,
            ScopeType::User,
        ] {
            assert_eq!(ScopeType::parse(st.as_str()), Some(st));
        }
        assert_eq!(ScopeType::parse("cluster"), None);
    }

    #[test]
    fn test_entity_type_round_trip() {
        for et in [
            EntityType::Session,
            EntityType::Vfolder,
            EntityType::Image,
            EntityType::Deployment,
            EntityType::Artifact,
        ] {
            assert_eq!(EntityType::parse(et.as_str()), Some(et));
        }
        assert_eq!(EntityType::parse("unknown"), None);
    }
}
