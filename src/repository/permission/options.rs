//! 角色/用户列表查询的条件与排序工厂
//!
//! 条件内引用的是基础查询的表别名（r = roles, pg = permission_groups,
//! op = object_permissions, u = users, ur = user_roles），
//! 游标条件与排序引用的则是包装子查询的投影列。

use crate::rbac::{
    EntityType, OperationType, PermissionStatus, RoleSource, RoleStatus, ScopeId, ScopeType,
};
use crate::repository::base::{QueryCondition, QueryOrder};
use uuid::Uuid;

/// 字符串匹配规格：匹配方式由调用工厂决定，这里只描述修饰。
#[derive(Debug, Clone)]
pub struct StringMatchSpec {
    pub value: String,
    pub case_insensitive: bool,
    pub negated: bool,
}

impl StringMatchSpec {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            case_insensitive: false,
            negated: false,
        }
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    pub fn negated(mut self) -> Self {
        self.negated = true;
        self
    }
}

/// LIKE 模式元字符转义。用户输入的 % 和 _ 按字面值匹配。
fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn string_match(column: &'static str, spec: StringMatchSpec, pattern: String) -> QueryCondition {
    QueryCondition::new(move |builder| {
        if spec.negated {
            builder.push("NOT (");
        }
        builder.push(column);
        builder.push(if spec.case_insensitive {
            " ILIKE "
        } else {
            " LIKE "
        });
        builder.push_bind(pattern.clone());
        if spec.negated {
            builder.push(")");
        }
    })
}

/// roles 列表查询的条件工厂
pub struct RoleConditions;

impl RoleConditions {
    pub fn by_name_contains(spec: StringMatchSpec) -> QueryCondition {
        let pattern = format!("%{}%", escape_like(&spec.value));
        string_match("r.name", spec, pattern)
    }

    pub fn by_name_starts_with(spec: StringMatchSpec) -> QueryCondition {
        let pattern = format!("{}%", escape_like(&spec.value));
        string_match("r.name", spec, pattern)
    }

    pub fn by_name_ends_with(spec: StringMatchSpec) -> QueryCondition {
        let pattern = format!("%{}", escape_like(&spec.value));
        string_match("r.name", spec, pattern)
    }

    pub fn by_name_equals(spec: StringMatchSpec) -> QueryCondition {
        QueryCondition::new(move |builder| {
            if spec.negated {
                builder.push("NOT (");
            }
            if spec.case_insensitive {
                builder.push("LOWER(r.name) = LOWER(");
                builder.push_bind(spec.value.clone());
                builder.push(")");
            } else {
                builder.push("r.name = ");
                builder.push_bind(spec.value.clone());
            }
            if spec.negated {
                builder.push(")");
            }
        })
    }

    pub fn by_sources(sources: Vec<RoleSource>) -> QueryCondition {
        QueryCondition::new(move |builder| {
            builder.push("r.source = ANY(");
            builder.push_bind(sources.clone());
            builder.push(")");
        })
    }

    pub fn by_statuses(statuses: Vec<RoleStatus>) -> QueryCondition {
        QueryCondition::new(move |builder| {
            builder.push("r.status = ANY(");
            builder.push_bind(statuses.clone());
            builder.push(")");
        })
    }

    pub fn by_scope_type(scope_type: ScopeType) -> QueryCondition {
        QueryCondition::new(move |builder| {
            builder.push("pg.scope_type = ");
            builder.push_bind(scope_type);
        })
    }

    pub fn by_scope_id(scope_id: String) -> QueryCondition {
        QueryCondition::new(move |builder| {
            builder.push("pg.scope_id = ");
            builder.push_bind(scope_id.clone());
        })
    }

    /// 拥有指定实体类型对象权限的角色
    pub fn by_has_permission_for(entity_type: EntityType) -> QueryCondition {
        QueryCondition::new(move |builder| {
            builder.push("op.entity_type = ");
            builder.push_bind(entity_type);
        })
    }

    /// 游标在 created_at 之后。游标条件作用在投影列上，
    /// 游标行本身通过子查询定位，不要求调用方回传时间戳。
    pub fn by_cursor_forward(cursor_role_id: Uuid) -> QueryCondition {
        QueryCondition::new(move |builder| {
            builder.push("created_at > (SELECT r2.created_at FROM roles r2 WHERE r2.id = ");
            builder.push_bind(cursor_role_id);
            builder.push(")");
        })
    }

    pub fn by_cursor_backward(cursor_role_id: Uuid) -> QueryCondition {
        QueryCondition::new(move |builder| {
            builder.push("created_at < (SELECT r2.created_at FROM roles r2 WHERE r2.id = ");
            builder.push_bind(cursor_role_id);
            builder.push(")");
        })
    }
}

/// roles 列表查询的排序工厂。排序作用在投影列上。
pub struct RoleOrders;

impl RoleOrders {
    pub fn name(ascending: bool) -> QueryOrder {
        if ascending {
            QueryOrder::asc("name")
        } else {
            QueryOrder::desc("name")
        }
    }

    pub fn created_at(ascending: bool) -> QueryOrder {
        if ascending {
            QueryOrder::asc("created_at")
        } else {
            QueryOrder::desc("created_at")
        }
    }

    pub fn updated_at(ascending: bool) -> QueryOrder {
        if ascending {
            QueryOrder::asc("updated_at")
        } else {
            QueryOrder::desc("updated_at")
        }
    }
}

/// 角色下用户列表查询的条件工厂
pub struct AssignedUserConditions;

impl AssignedUserConditions {
    pub fn by_role_id(role_id: Uuid) -> QueryCondition {
        QueryCondition::new(move |builder| {
            builder.push("ur.role_id = ");
            builder.push_bind(role_id);
        })
    }

    pub fn by_username_contains(spec: StringMatchSpec) -> QueryCondition {
        let pattern = format!("%{}%", escape_like(&spec.value));
        string_match("u.username", spec, pattern)
    }

    pub fn by_email_contains(spec: StringMatchSpec) -> QueryCondition {
        let pattern = format!("%{}%", escape_like(&spec.value));
        string_match("u.email", spec, pattern)
    }

    pub fn by_granted_by(granted_by: Uuid) -> QueryCondition {
        QueryCondition::new(move |builder| {
            builder.push("ur.granted_by = ");
            builder.push_bind(granted_by);
        })
    }
}

/// 角色下用户列表查询的排序工厂
pub struct AssignedUserOrders;

impl AssignedUserOrders {
    pub fn username(ascending: bool) -> QueryOrder {
        if ascending {
            QueryOrder::asc("username")
        } else {
            QueryOrder::desc("username")
        }
    }

    pub fn email(ascending: bool) -> QueryOrder {
        if ascending {
            QueryOrder::asc("email")
        } else {
            QueryOrder::desc("email")
        }
    }

    pub fn granted_at(ascending: bool) -> QueryOrder {
        if ascending {
            QueryOrder::asc("granted_at")
        } else {
            QueryOrder::desc("granted_at")
        }
    }
}

/// 范围权限列表查询的条件工厂（p = permissions, pg = permission_groups）
pub struct PermissionConditions;

impl PermissionConditions {
    pub fn by_role_id(role_id: Uuid) -> QueryCondition {
        QueryCondition::new(move |builder| {
            builder.push("pg.role_id = ");
            builder.push_bind(role_id);
        })
    }

    pub fn by_permission_group_id(group_id: Uuid) -> QueryCondition {
        QueryCondition::new(move |builder| {
            builder.push("p.permission_group_id = ");
            builder.push_bind(group_id);
        })
    }

    pub fn by_scope(scope: ScopeId) -> QueryCondition {
        QueryCondition::new(move |builder| {
            builder.push("pg.scope_type = ");
            builder.push_bind(scope.scope_type);
            builder.push(" AND pg.scope_id = ");
            builder.push_bind(scope.scope_id.clone());
        })
    }

    pub fn by_entity_types(entity_types: Vec<EntityType>) -> QueryCondition {
        QueryCondition::new(move |builder| {
            builder.push("p.entity_type = ANY(");
            builder.push_bind(entity_types.clone());
            builder.push(")");
        })
    }

    pub fn by_operations(operations: Vec<OperationType>) -> QueryCondition {
        QueryCondition::new(move |builder| {
            builder.push("p.operation = ANY(");
            builder.push_bind(operations.clone());
            builder.push(")");
        })
    }
}

/// 范围权限列表查询的排序工厂
pub struct PermissionOrders;

impl PermissionOrders {
    pub fn entity_type(ascending: bool) -> QueryOrder {
        if ascending {
            QueryOrder::asc("entity_type")
        } else {
            QueryOrder::desc("entity_type")
        }
    }

    pub fn operation(ascending: bool) -> QueryOrder {
        if ascending {
            QueryOrder::asc("operation")
        } else {
            QueryOrder::desc("operation")
        }
    }
}

/// 对象权限列表查询的条件工厂（op = object_permissions）
pub struct ObjectPermissionConditions;

impl ObjectPermissionConditions {
    pub fn by_role_id(role_id: Uuid) -> QueryCondition {
        QueryCondition::new(move |builder| {
            builder.push("op.role_id = ");
            builder.push_bind(role_id);
        })
    }

    pub fn by_entity_types(entity_types: Vec<EntityType>) -> QueryCondition {
        QueryCondition::new(move |builder| {
            builder.push("op.entity_type = ANY(");
            builder.push_bind(entity_types.clone());
            builder.push(")");
        })
    }

    pub fn by_entity_id(entity_id: String) -> QueryCondition {
        QueryCondition::new(move |builder| {
            builder.push("op.entity_id = ");
            builder.push_bind(entity_id.clone());
        })
    }

    pub fn by_operations(operations: Vec<OperationType>) -> QueryCondition {
        QueryCondition::new(move |builder| {
            builder.push("op.operation = ANY(");
            builder.push_bind(operations.clone());
            builder.push(")");
        })
    }

    pub fn by_statuses(statuses: Vec<PermissionStatus>) -> QueryCondition {
        QueryCondition::new(move |builder| {
            builder.push("op.status = ANY(");
            builder.push_bind(statuses.clone());
            builder.push(")");
        })
    }
}

/// 对象权限列表查询的排序工厂
pub struct ObjectPermissionOrders;

impl ObjectPermissionOrders {
    pub fn entity_type(ascending: bool) -> QueryOrder {
        if ascending {
            QueryOrder::asc("entity_type")
        } else {
            QueryOrder::desc("entity_type")
        }
    }

    pub fn entity_id(ascending: bool) -> QueryOrder {
        if ascending {
            QueryOrder::asc("entity_id")
        } else {
            QueryOrder::desc("entity_id")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::{Postgres, QueryBuilder};

    fn render(cond: &QueryCondition) -> String {
        let mut builder = QueryBuilder::<Postgres>::new("");
        cond.apply(&mut builder);
        builder.into_sql()
    }

    #[test]
    fn contains_uses_like_by_default() {
        let cond = RoleConditions::by_name_contains(StringMatchSpec::new("admin"));
        assert_eq!(render(&cond), "r.name LIKE $1");
    }

    #[test]
    fn case_insensitive_uses_ilike() {
        let cond =
            RoleConditions::by_name_contains(StringMatchSpec::new("admin").case_insensitive());
        assert_eq!(render(&cond), "r.name ILIKE $1");
    }

    #[test]
    fn negated_wraps_with_not() {
        let cond = RoleConditions::by_name_equals(StringMatchSpec::new("admin").negated());
        assert_eq!(render(&cond), "NOT (r.name = $1)");
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_a\\b"), "50\\%\\_a\\\\b");
    }

    #[test]
    fn cursor_condition_uses_subquery_lookup() {
        let cond = RoleConditions::by_cursor_forward(Uuid::nil());
        assert_eq!(
            render(&cond),
            "created_at > (SELECT r2.created_at FROM roles r2 WHERE r2.id = $1)"
        );
    }

    #[test]
    fn permission_scope_filter_binds_both_columns() {
        let cond = PermissionConditions::by_scope(ScopeId::new(ScopeType::Project, "proj-1"));
        assert_eq!(render(&cond), "pg.scope_type = $1 AND pg.scope_id = $2");
    }

    #[test]
    fn object_permission_status_filter_uses_any() {
        let cond = ObjectPermissionConditions::by_statuses(vec![PermissionStatus::Active]);
        assert_eq!(render(&cond), "op.status = ANY($1)");
    }

    #[test]
    fn status_filter_uses_any() {
        let cond = RoleConditions::by_statuses(vec![
            crate::rbac::RoleStatus::Active,
            crate::rbac::RoleStatus::Inactive,
        ]);
        assert_eq!(render(&cond), "r.status = ANY($1)");
    }
}
