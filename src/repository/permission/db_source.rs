//! RBAC 数据源：所有权限相关的 SQL 都收敛在这里
//!
//! 每个写操作对应一个事务；事务内任何失败都会在 Drop 时整体回滚。
//! 读操作使用只读事务。

use crate::db::Database;
use crate::error::RbacError;
use crate::models::{
    AssignedUserRow, AssociationScopesEntitiesRow, ObjectPermissionRow, PermissionGroupJoinRow,
    PermissionGroupRow, PermissionRow, RoleRow, UserRoleRow,
};
use crate::rbac::{
    ObjectId, ObjectPermissionInput, OperationType, PermissionStatus, RoleStatus, ScopeId,
    ScopedPermissionInput,
};
use crate::repository::base::{
    execute_batch_purger, execute_batch_querier, execute_batch_updater, execute_creator,
    execute_creator_if_absent, execute_purger, execute_updater, match_integrity_error,
    BatchPurger, BatchQuerier, BatchQueryResult, BatchUpdater, Creator, IntegrityErrorCheck,
    IntegrityKind, Purger, QueryCondition, RepositoryError, Updater,
};
use crate::repository::permission::creators::{
    AssociationScopesEntitiesCreatorSpec, ObjectPermissionCreatorSpec,
    ObjectPermissionStatusUpdaterSpec, PermissionCreatorSpec, PermissionGroupCreatorSpec,
    RoleCreatorSpec, RoleUpdaterSpec,
};
use chrono::Utc;
use sqlx::PgConnection;
use std::collections::HashMap;
use uuid::Uuid;

/// 角色列表的基础查询。条件工厂引用这里的别名（r/pg/op）。
/// DISTINCT 防止多个权限组/对象权限导致的行重复。
const ROLE_SEARCH_BASE: &str = "SELECT DISTINCT r.id, r.name, r.source, r.status, \
     r.description, r.created_at, r.updated_at, r.deleted_at \
     FROM roles r \
     LEFT JOIN permission_groups pg ON pg.role_id = r.id \
     LEFT JOIN object_permissions op ON op.role_id = r.id";

/// 角色下用户列表的基础查询（别名 u/ur）。
const ASSIGNED_USER_SEARCH_BASE: &str = "SELECT ur.id, ur.user_id, ur.role_id, ur.granted_by, \
     ur.granted_at, ur.expires_at, u.username, u.email \
     FROM users u \
     JOIN user_roles ur ON ur.user_id = u.id";

/// 范围权限列表的基础查询（别名 p/pg）。
/// pg 只用于过滤（按角色、按范围），不进投影。
const PERMISSION_SEARCH_BASE: &str = "SELECT p.id, p.permission_group_id, p.entity_type, \
     p.operation \
     FROM permissions p \
     JOIN permission_groups pg ON pg.id = p.permission_group_id";

/// 对象权限列表的基础查询（别名 op）。
const OBJECT_PERMISSION_SEARCH_BASE: &str = "SELECT op.id, op.role_id, op.entity_type, \
     op.entity_id, op.operation, op.status \
     FROM object_permissions op";

/// 创建角色的完整输入：角色行 + 嵌套的权限组与对象权限。
pub struct RoleCreationInput {
    pub creator: Creator<RoleCreatorSpec>,
    pub permission_groups: Vec<crate::rbac::PermissionGroupInput>,
    pub object_permissions: Vec<ObjectPermissionInput>,
}

/// 带权限明细的角色行
pub struct RoleRowWithPermissions {
    pub role: RoleRow,
    pub permission_groups: Vec<(PermissionGroupRow, Vec<PermissionRow>)>,
    pub object_permissions: Vec<ObjectPermissionRow>,
}

pub struct PermissionDbSource {
    db: Database,
}

impl PermissionDbSource {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    // ===== 角色生命周期 =====

    /// 创建角色及其全部嵌套权限。任一插入失败则整体回滚。
    pub async fn create_role(
        &self,
        input: RoleCreationInput,
    ) -> Result<RoleRowWithPermissions, RbacError> {
        let mut tx = self.db.begin_session().await?;

        let role = execute_creator(&mut tx, &input.creator).await?;

        let mut groups = Vec::with_capacity(input.permission_groups.len());
        for group_input in &input.permission_groups {
            let group = execute_creator(
                &mut tx,
                &Creator::new(PermissionGroupCreatorSpec {
                    role_id: role.id,
                    scope_id: group_input.scope_id.clone(),
                }),
            )
            .await?;

            let mut permissions = Vec::with_capacity(group_input.permissions.len());
            for permission in &group_input.permissions {
                let row = execute_creator(
                    &mut tx,
                    &Creator::new(PermissionCreatorSpec {
                        permission_group_id: group.id,
                        entity_type: permission.entity_type,
                        operation: permission.operation,
                    }),
                )
                .await?;
                permissions.push(row);
            }
            groups.push((group, permissions));
        }

        let mut object_permissions = Vec::with_capacity(input.object_permissions.len());
        for object_input in &input.object_permissions {
            let row = execute_creator(
                &mut tx,
                &Creator::new(ObjectPermissionCreatorSpec {
                    role_id: role.id,
                    object_id: object_input.object_id.clone(),
                    operation: object_input.operation,
                    status: object_input.status,
                }),
            )
            .await?;
            object_permissions.push(row);
        }

        tx.commit().await.map_err(RepositoryError::from)?;

        Ok(RoleRowWithPermissions {
            role,
            permission_groups: groups,
            object_permissions,
        })
    }

    /// 更新角色字段。目标不存在时报 RoleNotFound。
    pub async fn update_role(
        &self,
        role_id: Uuid,
        name: Option<String>,
        description: Option<String>,
        status: Option<RoleStatus>,
    ) -> Result<RoleRow, RbacError> {
        let mut tx = self.db.begin_session().await?;

        let updater = Updater::new(
            RoleUpdaterSpec {
                name,
                description,
                status,
                updated_at: Utc::now(),
                deleted_at: None,
            },
            role_id,
        );
        let row = execute_updater(&mut tx, &updater)
            .await?
            .ok_or(RbacError::RoleNotFound(role_id))?;

        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(row)
    }

    /// 软删除角色：标记角色为 deleted 并同步失效其对象权限。
    /// 权限组/范围权限随角色状态一起失效，不需要单独处理。
    pub async fn delete_role(&self, role_id: Uuid) -> Result<RoleRow, RbacError> {
        let mut tx = self.db.begin_session().await?;

        let now = Utc::now();
        let updater = Updater::new(
            RoleUpdaterSpec {
                name: None,
                description: None,
                status: Some(RoleStatus::Deleted),
                updated_at: now,
                deleted_at: Some(now),
            },
            role_id,
        );
        let row = execute_updater(&mut tx, &updater)
            .await?
            .ok_or(RbacError::RoleNotFound(role_id))?;

        let batch = BatchUpdater::new(
            ObjectPermissionStatusUpdaterSpec {
                status: PermissionStatus::Deleted,
            },
            vec![QueryCondition::new(move |b| {
                b.push("role_id = ");
                b.push_bind(role_id);
            })],
        );
        execute_batch_updater(&mut tx, &batch).await?;

        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(row)
    }

    /// 物理删除角色及其全部关联行。
    /// 外键未声明级联，按依赖顺序手工清理。
    pub async fn purge_role(&self, role_id: Uuid) -> Result<RoleRow, RbacError> {
        let mut tx = self.db.begin_session().await?;

        let permissions_purger = BatchPurger::<PermissionRow>::new(vec![QueryCondition::new(
            move |b| {
                b.push(
                    "permission_group_id IN (SELECT id FROM permission_groups WHERE role_id = ",
                );
                b.push_bind(role_id);
                b.push(")");
            },
        )]);
        execute_batch_purger(&mut tx, &permissions_purger).await?;

        let role_scoped = move |b: &mut sqlx::QueryBuilder<'_, sqlx::Postgres>| {
            b.push("role_id = ");
            b.push_bind(role_id);
        };
        execute_batch_purger(
            &mut tx,
            &BatchPurger::<PermissionGroupRow>::new(vec![QueryCondition::new(role_scoped)]),
        )
        .await?;
        execute_batch_purger(
            &mut tx,
            &BatchPurger::<ObjectPermissionRow>::new(vec![QueryCondition::new(role_scoped)]),
        )
        .await?;
        execute_batch_purger(
            &mut tx,
            &BatchPurger::<UserRoleRow>::new(vec![QueryCondition::new(role_scoped)]),
        )
        .await?;

        let row = execute_purger(&mut tx, &Purger::<RoleRow>::new(role_id))
            .await?
            .ok_or(RbacError::RoleNotFound(role_id))?;

        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(row)
    }

    // ===== 权限增量维护 =====

    /// 增量更新角色的范围权限与对象权限，单事务内完成。
    /// 范围对应的权限组不存在时按需创建（find-or-create）。
    pub async fn update_role_permissions(
        &self,
        role_id: Uuid,
        add_scoped_permissions: Vec<ScopedPermissionInput>,
        remove_scoped_permission_ids: Vec<Uuid>,
        add_object_permissions: Vec<ObjectPermissionInput>,
        remove_object_permission_ids: Vec<Uuid>,
    ) -> Result<RoleRowWithPermissions, RbacError> {
        let mut tx = self.db.begin_session().await?;

        let role: Option<RoleRow> = sqlx::query_as("SELECT * FROM roles WHERE id = $1 FOR UPDATE")
            .bind(role_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;
        if role.is_none() {
            return Err(RbacError::ObjectNotFound(format!("roles:{}", role_id)));
        }

        // 新增的范围权限按范围归组，一次查出已有的权限组
        let mut scopes: Vec<ScopeId> = Vec::new();
        for add in &add_scoped_permissions {
            if !scopes.contains(&add.scope_id) {
                scopes.push(add.scope_id.clone());
            }
        }
        let mut groups_by_scope =
            find_permission_groups_by_scopes(&mut tx, role_id, &scopes).await?;
        for scope in &scopes {
            if !groups_by_scope.contains_key(scope) {
                let group = execute_creator(
                    &mut tx,
                    &Creator::new(PermissionGroupCreatorSpec {
                        role_id,
                        scope_id: scope.clone(),
                    }),
                )
                .await?;
                groups_by_scope.insert(scope.clone(), group);
            }
        }

        for add in &add_scoped_permissions {
            let group = &groups_by_scope[&add.scope_id];
            // 已存在的授权视为幂等成功。必须走 ON CONFLICT DO NOTHING：
            // 唯一约束报错会中止整个事务，事后吞错救不回来。
            execute_creator_if_absent(
                &mut tx,
                &Creator::new(PermissionCreatorSpec {
                    permission_group_id: group.id,
                    entity_type: add.entity_type,
                    operation: add.operation,
                }),
            )
            .await?;
        }

        if !remove_scoped_permission_ids.is_empty() {
            let ids = remove_scoped_permission_ids.clone();
            let purger = BatchPurger::<PermissionRow>::new(vec![QueryCondition::new(move |b| {
                b.push("id = ANY(");
                b.push_bind(ids.clone());
                b.push(") AND permission_group_id IN \
                     (SELECT id FROM permission_groups WHERE role_id = ");
                b.push_bind(role_id);
                b.push(")");
            })]);
            execute_batch_purger(&mut tx, &purger).await?;
        }

        for add in &add_object_permissions {
            execute_creator_if_absent(
                &mut tx,
                &Creator::new(ObjectPermissionCreatorSpec {
                    role_id,
                    object_id: add.object_id.clone(),
                    operation: add.operation,
                    status: add.status,
                }),
            )
            .await?;
        }

        if !remove_object_permission_ids.is_empty() {
            let ids = remove_object_permission_ids.clone();
            let purger =
                BatchPurger::<ObjectPermissionRow>::new(vec![QueryCondition::new(move |b| {
                    b.push("id = ANY(");
                    b.push_bind(ids.clone());
                    b.push(") AND role_id = ");
                    b.push_bind(role_id);
                })]);
            execute_batch_purger(&mut tx, &purger).await?;
        }

        let result = fetch_role_with_permissions(&mut tx, role_id).await?;
        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(result)
    }

    // ===== 角色分配 =====

    /// 给用户分配角色。重复分配返回 RoleAlreadyAssigned，
    /// 角色不存在（外键违规）返回 ObjectNotFound。
    pub async fn assign_role(
        &self,
        user_id: Uuid,
        role_id: Uuid,
        granted_by: Option<Uuid>,
        expires_at: Option<chrono::DateTime<Utc>>,
    ) -> Result<UserRoleRow, RbacError> {
        let mut tx = self.db.begin_session().await?;

        let creator = Creator::new(crate::repository::permission::creators::UserRoleCreatorSpec {
            user_id,
            role_id,
            granted_by,
            expires_at,
        });
        let row = match execute_creator(&mut tx, &creator).await {
            Ok(row) => row,
            Err(RepositoryError::Integrity(err)) => {
                let matched = match_integrity_error(
                    err,
                    vec![
                        IntegrityErrorCheck {
                            kind: IntegrityKind::UniqueViolation,
                            constraint: Some("uq_user_roles_user_id_role_id"),
                            error: RbacError::RoleAlreadyAssigned { user_id, role_id },
                        },
                        IntegrityErrorCheck {
                            kind: IntegrityKind::ForeignKeyViolation,
                            constraint: None,
                            error: RbacError::ObjectNotFound(format!("roles:{}", role_id)),
                        },
                    ],
                );
                return Err(match matched {
                    Ok(domain_err) => domain_err,
                    Err(err) => RbacError::Integrity(err),
                });
            }
            Err(err) => return Err(err.into()),
        };

        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(row)
    }

    /// 撤销用户的角色。未分配时返回 RoleNotAssigned。
    pub async fn revoke_role(&self, user_id: Uuid, role_id: Uuid) -> Result<Uuid, RbacError> {
        let mut tx = self.db.begin_session().await?;

        let existing: Option<UserRoleRow> =
            sqlx::query_as("SELECT * FROM user_roles WHERE user_id = $1 AND role_id = $2")
                .bind(user_id)
                .bind(role_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(RepositoryError::from)?;
        let assignment = existing.ok_or(RbacError::RoleNotAssigned { user_id, role_id })?;

        execute_purger(&mut tx, &Purger::<UserRoleRow>::new(assignment.id)).await?;

        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(assignment.id)
    }

    // ===== 角色读取 =====

    pub async fn get_role(&self, role_id: Uuid) -> Result<Option<RoleRow>, RbacError> {
        let mut tx = self.db.begin_readonly_session().await?;
        let row: Option<RoleRow> = sqlx::query_as("SELECT * FROM roles WHERE id = $1")
            .bind(role_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;
        Ok(row)
    }

    pub async fn get_role_with_permissions(
        &self,
        role_id: Uuid,
    ) -> Result<RoleRowWithPermissions, RbacError> {
        let mut tx = self.db.begin_readonly_session().await?;
        fetch_role_with_permissions(&mut tx, role_id).await
    }

    pub async fn search_roles(
        &self,
        querier: &BatchQuerier,
    ) -> Result<BatchQueryResult<RoleRow>, RbacError> {
        let mut tx = self.db.begin_readonly_session().await?;
        let result = execute_batch_querier(&mut tx, ROLE_SEARCH_BASE, querier).await?;
        Ok(result)
    }

    pub async fn search_users_assigned_to_role(
        &self,
        querier: &BatchQuerier,
    ) -> Result<BatchQueryResult<AssignedUserRow>, RbacError> {
        let mut tx = self.db.begin_readonly_session().await?;
        let result = execute_batch_querier(&mut tx, ASSIGNED_USER_SEARCH_BASE, querier).await?;
        Ok(result)
    }

    /// 用户当前持有的全部角色，按创建时间排序。
    pub async fn get_user_roles(&self, user_id: Uuid) -> Result<Vec<RoleRow>, RbacError> {
        let mut tx = self.db.begin_readonly_session().await?;
        let rows: Vec<RoleRow> = sqlx::query_as(
            "SELECT r.* FROM roles r \
             JOIN user_roles ur ON ur.role_id = r.id \
             WHERE ur.user_id = $1 \
             ORDER BY r.created_at",
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(RepositoryError::from)?;
        Ok(rows)
    }

    pub async fn search_permissions(
        &self,
        querier: &BatchQuerier,
    ) -> Result<BatchQueryResult<PermissionRow>, RbacError> {
        let mut tx = self.db.begin_readonly_session().await?;
        let result = execute_batch_querier(&mut tx, PERMISSION_SEARCH_BASE, querier).await?;
        Ok(result)
    }

    pub async fn search_object_permissions(
        &self,
        querier: &BatchQuerier,
    ) -> Result<BatchQueryResult<ObjectPermissionRow>, RbacError> {
        let mut tx = self.db.begin_readonly_session().await?;
        let result =
            execute_batch_querier(&mut tx, OBJECT_PERMISSION_SEARCH_BASE, querier).await?;
        Ok(result)
    }

    // ===== 权限判定 =====

    /// 用户在给定范围内是否拥有某操作的授权。
    /// GLOBAL 范围的权限组匹配任何范围。
    pub async fn check_scope_permission_exist(
        &self,
        user_id: Uuid,
        scope: &ScopeId,
        operation: OperationType,
    ) -> Result<bool, RbacError> {
        let mut tx = self.db.begin_readonly_session().await?;
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS( \
               SELECT 1 \
               FROM user_roles ur \
               JOIN roles r ON r.id = ur.role_id \
               JOIN permission_groups pg ON pg.role_id = r.id \
               JOIN permissions p ON p.permission_group_id = pg.id \
               WHERE r.status = 'active' \
                 AND ur.user_id = $1 \
                 AND (pg.scope_type = 'global' \
                      OR (pg.scope_type = $2 AND pg.scope_id = $3)) \
                 AND p.operation = $4)",
        )
        .bind(user_id)
        .bind(scope.scope_type)
        .bind(&scope.scope_id)
        .bind(operation)
        .fetch_one(&mut *tx)
        .await
        .map_err(RepositoryError::from)?;
        Ok(exists)
    }

    /// 用户对单个实体是否拥有某操作的权限。三路判定取 OR：
    /// GLOBAL 授权、实体所属范围的授权、直接对象权限。
    pub async fn check_object_permission_exist(
        &self,
        user_id: Uuid,
        object: &ObjectId,
        operation: OperationType,
    ) -> Result<bool, RbacError> {
        let mut tx = self.db.begin_readonly_session().await?;
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS( \
               SELECT 1 \
               FROM user_roles ur \
               JOIN roles r ON r.id = ur.role_id \
               JOIN permission_groups pg ON pg.role_id = r.id \
               JOIN permissions p ON p.permission_group_id = pg.id \
               WHERE r.status = 'active' AND ur.user_id = $1 \
                 AND pg.scope_type = 'global' \
                 AND p.entity_type = $2 AND p.operation = $3 \
             UNION ALL \
               SELECT 1 \
               FROM user_roles ur \
               JOIN roles r ON r.id = ur.role_id \
               JOIN permission_groups pg ON pg.role_id = r.id \
               JOIN permissions p ON p.permission_group_id = pg.id \
               JOIN association_scopes_entities ase \
                 ON ase.scope_type = pg.scope_type AND ase.scope_id = pg.scope_id \
               WHERE r.status = 'active' AND ur.user_id = $1 \
                 AND ase.entity_type = $2 AND ase.entity_id = $4 \
                 AND p.entity_type = $2 AND p.operation = $3 \
             UNION ALL \
               SELECT 1 \
               FROM user_roles ur \
               JOIN roles r ON r.id = ur.role_id \
               JOIN object_permissions op ON op.role_id = r.id \
               WHERE r.status = 'active' AND ur.user_id = $1 \
                 AND op.status = 'active' \
                 AND op.entity_type = $2 AND op.entity_id = $4 \
                 AND op.operation = $3)",
        )
        .bind(user_id)
        .bind(object.entity_type)
        .bind(operation)
        .bind(&object.entity_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(RepositoryError::from)?;
        Ok(exists)
    }

    /// 批量版本：一次查询判定一组实体。
    /// 结果对每个请求的实体都有表项；GLOBAL 授权命中时，
    /// 对应实体类型的全部请求实体直接置真。
    pub async fn check_batch_object_permission_exist(
        &self,
        user_id: Uuid,
        objects: &[ObjectId],
        operation: OperationType,
    ) -> Result<HashMap<ObjectId, bool>, RbacError> {
        let mut results: HashMap<ObjectId, bool> =
            objects.iter().map(|o| (o.clone(), false)).collect();
        if objects.is_empty() {
            return Ok(results);
        }

        let entity_types: Vec<crate::rbac::EntityType> = {
            let mut types: Vec<_> = objects.iter().map(|o| o.entity_type).collect();
            types.sort_by_key(|t| t.as_str());
            types.dedup();
            types
        };

        let mut builder = sqlx::QueryBuilder::<sqlx::Postgres>::new(
            "SELECT TRUE AS is_global, p.entity_type AS entity_type, \
                    NULL::varchar AS entity_id \
             FROM user_roles ur \
             JOIN roles r ON r.id = ur.role_id \
             JOIN permission_groups pg ON pg.role_id = r.id \
             JOIN permissions p ON p.permission_group_id = pg.id \
             WHERE r.status = 'active' AND pg.scope_type = 'global' \
               AND ur.user_id = ",
        );
        builder.push_bind(user_id);
        builder.push(" AND p.operation = ");
        builder.push_bind(operation);
        builder.push(" AND p.entity_type = ANY(");
        builder.push_bind(entity_types);
        builder.push(")");

        builder.push(
            " UNION ALL \
             SELECT FALSE, ase.entity_type, ase.entity_id \
             FROM user_roles ur \
             JOIN roles r ON r.id = ur.role_id \
             JOIN permission_groups pg ON pg.role_id = r.id \
             JOIN permissions p ON p.permission_group_id = pg.id \
             JOIN association_scopes_entities ase \
               ON ase.scope_type = pg.scope_type AND ase.scope_id = pg.scope_id \
              AND ase.entity_type = p.entity_type \
             WHERE r.status = 'active' AND ur.user_id = ",
        );
        builder.push_bind(user_id);
        builder.push(" AND p.operation = ");
        builder.push_bind(operation);
        builder.push(" AND (ase.entity_type, ase.entity_id) IN (");
        push_object_tuples(&mut builder, objects);
        builder.push(")");

        builder.push(
            " UNION ALL \
             SELECT FALSE, op.entity_type, op.entity_id \
             FROM user_roles ur \
             JOIN roles r ON r.id = ur.role_id \
             JOIN object_permissions op ON op.role_id = r.id \
             WHERE r.status = 'active' AND op.status = 'active' \
               AND ur.user_id = ",
        );
        builder.push_bind(user_id);
        builder.push(" AND op.operation = ");
        builder.push_bind(operation);
        builder.push(" AND (op.entity_type, op.entity_id) IN (");
        push_object_tuples(&mut builder, objects);
        builder.push(")");

        let mut tx = self.db.begin_readonly_session().await?;
        let rows: Vec<(bool, crate::rbac::EntityType, Option<String>)> = builder
            .build_query_as()
            .fetch_all(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;

        for (is_global, entity_type, entity_id) in rows {
            if is_global {
                for (object, allowed) in results.iter_mut() {
                    if object.entity_type == entity_type {
                        *allowed = true;
                    }
                }
            } else if let Some(entity_id) = entity_id {
                let object = ObjectId::new(entity_type, entity_id);
                if let Some(allowed) = results.get_mut(&object) {
                    *allowed = true;
                }
            }
            if results.values().all(|allowed| *allowed) {
                break;
            }
        }

        Ok(results)
    }

    // ===== 范围-实体关联 =====

    pub async fn get_entity_mapped_scopes(
        &self,
        object: &ObjectId,
    ) -> Result<Vec<ScopeId>, RbacError> {
        let mut tx = self.db.begin_readonly_session().await?;
        let rows: Vec<AssociationScopesEntitiesRow> = sqlx::query_as(
            "SELECT * FROM association_scopes_entities \
             WHERE entity_type = $1 AND entity_id = $2",
        )
        .bind(object.entity_type)
        .bind(&object.entity_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(RepositoryError::from)?;
        Ok(rows.iter().map(|row| row.scope()).collect())
    }

    /// 把实体映射到范围。幂等：已存在的映射直接返回。
    pub async fn map_entity_to_scope(
        &self,
        scope: &ScopeId,
        object: &ObjectId,
    ) -> Result<AssociationScopesEntitiesRow, RbacError> {
        let mut tx = self.db.begin_session().await?;

        if let Some(existing) = find_association(&mut tx, scope, object).await? {
            return Ok(existing);
        }

        let creator = Creator::new(AssociationScopesEntitiesCreatorSpec {
            scope_id: scope.clone(),
            object_id: object.clone(),
        });
        let row = match execute_creator(&mut tx, &creator).await {
            Ok(row) => row,
            // 并发创建时唯一约束兜底，重读既有行
            Err(RepositoryError::Integrity(err))
                if err.kind == IntegrityKind::UniqueViolation =>
            {
                drop(tx);
                let mut retry_tx = self.db.begin_readonly_session().await?;
                return find_association(&mut retry_tx, scope, object)
                    .await?
                    .ok_or(RbacError::Integrity(err));
            }
            Err(err) => return Err(err.into()),
        };

        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(row)
    }
}

fn push_object_tuples(
    builder: &mut sqlx::QueryBuilder<'_, sqlx::Postgres>,
    objects: &[ObjectId],
) {
    for (i, object) in objects.iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        builder.push("(");
        builder.push_bind(object.entity_type);
        builder.push(", ");
        builder.push_bind(object.entity_id.clone());
        builder.push(")");
    }
}

async fn find_association(
    conn: &mut PgConnection,
    scope: &ScopeId,
    object: &ObjectId,
) -> Result<Option<AssociationScopesEntitiesRow>, RbacError> {
    let row = sqlx::query_as(
        "SELECT * FROM association_scopes_entities \
         WHERE scope_type = $1 AND scope_id = $2 AND entity_type = $3 AND entity_id = $4",
    )
    .bind(scope.scope_type)
    .bind(&scope.scope_id)
    .bind(object.entity_type)
    .bind(&object.entity_id)
    .fetch_optional(conn)
    .await
    .map_err(RepositoryError::from)?;
    Ok(row)
}

/// 一次查询取出角色的若干范围对应的权限组。
async fn find_permission_groups_by_scopes(
    conn: &mut PgConnection,
    role_id: Uuid,
    scopes: &[ScopeId],
) -> Result<HashMap<ScopeId, PermissionGroupRow>, RbacError> {
    if scopes.is_empty() {
        return Ok(HashMap::new());
    }

    let mut builder = sqlx::QueryBuilder::<sqlx::Postgres>::new(
        "SELECT * FROM permission_groups WHERE role_id = ",
    );
    builder.push_bind(role_id);
    builder.push(" AND (");
    for (i, scope) in scopes.iter().enumerate() {
        if i > 0 {
            builder.push(" OR ");
        }
        builder.push("(scope_type = ");
        builder.push_bind(scope.scope_type);
        builder.push(" AND scope_id = ");
        builder.push_bind(scope.scope_id.clone());
        builder.push(")");
    }
    builder.push(")");

    let rows: Vec<PermissionGroupRow> = builder
        .build_query_as()
        .fetch_all(conn)
        .await
        .map_err(RepositoryError::from)?;
    Ok(rows.into_iter().map(|row| (row.scope(), row)).collect())
}

/// 取出角色及其权限明细：角色行、按组聚合的范围权限、对象权限。
async fn fetch_role_with_permissions(
    conn: &mut PgConnection,
    role_id: Uuid,
) -> Result<RoleRowWithPermissions, RbacError> {
    let role: RoleRow = sqlx::query_as("SELECT * FROM roles WHERE id = $1")
        .bind(role_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(RepositoryError::from)?
        .ok_or(RbacError::RoleNotFound(role_id))?;

    // 一次 LEFT JOIN 取全部组与权限，再在内存中按组聚合
    let join_rows: Vec<PermissionGroupJoinRow> = sqlx::query_as(
        "SELECT pg.id AS group_id, pg.role_id, pg.scope_type, pg.scope_id, \
                p.id AS permission_id, p.entity_type, p.operation \
         FROM permission_groups pg \
         LEFT JOIN permissions p ON p.permission_group_id = pg.id \
         WHERE pg.role_id = $1 \
         ORDER BY pg.id",
    )
    .bind(role_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(RepositoryError::from)?;

    let mut groups: Vec<(PermissionGroupRow, Vec<PermissionRow>)> = Vec::new();
    for join_row in join_rows {
        if groups
            .last()
            .map(|(group, _)| group.id != join_row.group_id)
            .unwrap_or(true)
        {
            groups.push((
                PermissionGroupRow {
                    id: join_row.group_id,
                    role_id: join_row.role_id,
                    scope_type: join_row.scope_type,
                    scope_id: join_row.scope_id.clone(),
                },
                Vec::new(),
            ));
        }
        if let (Some(permission_id), Some(entity_type), Some(operation)) =
            (join_row.permission_id, join_row.entity_type, join_row.operation)
        {
            if let Some((group, permissions)) = groups.last_mut() {
                permissions.push(PermissionRow {
                    id: permission_id,
                    permission_group_id: group.id,
                    entity_type,
                    operation,
                });
            }
        }
    }

    let object_permissions: Vec<ObjectPermissionRow> = sqlx::query_as(
        "SELECT * FROM object_permissions WHERE role_id = $1 ORDER BY id",
    )
    .bind(role_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(RepositoryError::from)?;

    Ok(RoleRowWithPermissions {
        role,
        permission_groups: groups,
        object_permissions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_search_base_exposes_cursor_columns() {
        // 游标条件与排序依赖这些投影列
        assert!(ROLE_SEARCH_BASE.contains("r.created_at"));
        assert!(ROLE_SEARCH_BASE.contains("DISTINCT"));
    }

    #[test]
    fn permission_base_joins_groups_for_filtering() {
        assert!(PERMISSION_SEARCH_BASE.contains("JOIN permission_groups pg"));
        assert!(!PERMISSION_SEARCH_BASE.contains("pg.scope_type,"));
    }

    #[test]
    fn assigned_user_base_joins_users() {
        assert!(ASSIGNED_USER_SEARCH_BASE.contains("JOIN user_roles ur"));
        assert!(ASSIGNED_USER_SEARCH_BASE.contains("u.username"));
    }

    #[test]
    fn object_tuple_list_renders_pairs() {
        let mut builder = sqlx::QueryBuilder::<sqlx::Postgres>::new("");
        push_object_tuples(
            &mut builder,
            &[
                ObjectId::new(crate::rbac::EntityType::Session, "s1"),
                ObjectId::new(crate::rbac::EntityType::Vfolder, "v1"),
            ],
        );
        assert_eq!(builder.into_sql(), "($1, $2), ($3, $4)");
    }
}
