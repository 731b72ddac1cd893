//! 权限控制仓储：领域类型进出，行类型只在内部流转

use crate::db::Database;
use crate::error::RbacError;
use crate::rbac::{
    AssignedUserListResult, ListResult, ObjectId, ObjectPermissionData,
    ObjectPermissionListResult, OperationType, PermissionData, PermissionGroupData,
    PermissionListResult, RoleCreateInput, RoleData, RoleDataWithPermissions, RoleListResult,
    RolePermissionsUpdateInput, RoleUpdateInput, ScopeId, UserRoleAssignmentInput, UserRoleData,
    UserRoleRevocationInput,
};
use crate::repository::base::{BatchQuerier, BatchQueryResult, Creator};
use crate::repository::permission::creators::RoleCreatorSpec;
use crate::repository::permission::db_source::{
    PermissionDbSource, RoleCreationInput, RoleRowWithPermissions,
};
use std::collections::HashMap;
use uuid::Uuid;

pub struct PermissionControllerRepository {
    source: PermissionDbSource,
}

impl PermissionControllerRepository {
    pub fn new(db: Database) -> Self {
        Self {
            source: PermissionDbSource::new(db),
        }
    }

    /// 创建角色及其嵌套权限，整体原子。
    pub async fn create_role(
        &self,
        input: RoleCreateInput,
    ) -> Result<RoleDataWithPermissions, RbacError> {
        tracing::debug!(name = %input.name, groups = input.permission_groups.len(), "Creating role");

        let creation = RoleCreationInput {
            creator: Creator::new(RoleCreatorSpec {
                name: input.name,
                source: input.source,
                status: input.status,
                description: input.description,
            }),
            permission_groups: input.permission_groups,
            object_permissions: input.object_permissions,
        };
        let result = self.source.create_role(creation).await?;

        tracing::info!(role_id = %result.role.id, "Role created");
        Ok(into_role_with_permissions(result))
    }

    pub async fn get_role(&self, role_id: Uuid) -> Result<RoleData, RbacError> {
        let row = self
            .source
            .get_role(role_id)
            .await?
            .ok_or(RbacError::RoleNotFound(role_id))?;
        Ok(row.into())
    }

    pub async fn get_role_with_permissions(
        &self,
        role_id: Uuid,
    ) -> Result<RoleDataWithPermissions, RbacError> {
        let result = self.source.get_role_with_permissions(role_id).await?;
        Ok(into_role_with_permissions(result))
    }

    pub async fn update_role(
        &self,
        role_id: Uuid,
        input: RoleUpdateInput,
    ) -> Result<RoleData, RbacError> {
        tracing::debug!(role_id = %role_id, "Updating role");
        let row = self
            .source
            .update_role(role_id, input.name, input.description, input.status)
            .await?;
        Ok(row.into())
    }

    /// 软删除：角色进入 deleted 状态，其对象权限随之失效。
    pub async fn delete_role(&self, role_id: Uuid) -> Result<RoleData, RbacError> {
        tracing::info!(role_id = %role_id, "Soft-deleting role");
        let row = self.source.delete_role(role_id).await?;
        Ok(row.into())
    }

    /// 物理删除：角色与其全部关联行一并删除，不可恢复。
    pub async fn purge_role(&self, role_id: Uuid) -> Result<RoleData, RbacError> {
        tracing::warn!(role_id = %role_id, "Purging role");
        let row = self.source.purge_role(role_id).await?;
        Ok(row.into())
    }

    pub async fn update_role_permissions(
        &self,
        role_id: Uuid,
        input: RolePermissionsUpdateInput,
    ) -> Result<RoleDataWithPermissions, RbacError> {
        tracing::debug!(
            role_id = %role_id,
            add_scoped = input.add_scoped_permissions.len(),
            remove_scoped = input.remove_scoped_permission_ids.len(),
            add_object = input.add_object_permissions.len(),
            remove_object = input.remove_object_permission_ids.len(),
            "Updating role permissions"
        );
        let result = self
            .source
            .update_role_permissions(
                role_id,
                input.add_scoped_permissions,
                input.remove_scoped_permission_ids,
                input.add_object_permissions,
                input.remove_object_permission_ids,
            )
            .await?;
        Ok(into_role_with_permissions(result))
    }

    pub async fn assign_role(
        &self,
        input: UserRoleAssignmentInput,
    ) -> Result<UserRoleData, RbacError> {
        tracing::info!(user_id = %input.user_id, role_id = %input.role_id, "Assigning role");
        let row = self
            .source
            .assign_role(input.user_id, input.role_id, input.granted_by, input.expires_at)
            .await?;
        Ok(row.into())
    }

    /// 返回被删除的分配行 id。
    pub async fn revoke_role(&self, input: UserRoleRevocationInput) -> Result<Uuid, RbacError> {
        tracing::info!(user_id = %input.user_id, role_id = %input.role_id, "Revoking role");
        self.source.revoke_role(input.user_id, input.role_id).await
    }

    pub async fn search_roles(&self, querier: &BatchQuerier) -> Result<RoleListResult, RbacError> {
        let result = self.source.search_roles(querier).await?;
        Ok(into_list_result(result))
    }

    pub async fn search_users_assigned_to_role(
        &self,
        querier: &BatchQuerier,
    ) -> Result<AssignedUserListResult, RbacError> {
        let result = self.source.search_users_assigned_to_role(querier).await?;
        Ok(into_list_result(result))
    }

    /// 用户当前持有的全部角色。
    pub async fn get_user_roles(&self, user_id: Uuid) -> Result<Vec<RoleData>, RbacError> {
        let rows = self.source.get_user_roles(user_id).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn search_permissions(
        &self,
        querier: &BatchQuerier,
    ) -> Result<PermissionListResult, RbacError> {
        let result = self.source.search_permissions(querier).await?;
        Ok(into_list_result(result))
    }

    pub async fn search_object_permissions(
        &self,
        querier: &BatchQuerier,
    ) -> Result<ObjectPermissionListResult, RbacError> {
        let result = self.source.search_object_permissions(querier).await?;
        Ok(into_list_result(result))
    }

    pub async fn check_scope_permission_exist(
        &self,
        user_id: Uuid,
        scope: &ScopeId,
        operation: OperationType,
    ) -> Result<bool, RbacError> {
        self.source
            .check_scope_permission_exist(user_id, scope, operation)
            .await
    }

    pub async fn check_object_permission_exist(
        &self,
        user_id: Uuid,
        object: &ObjectId,
        operation: OperationType,
    ) -> Result<bool, RbacError> {
        self.source
            .check_object_permission_exist(user_id, object, operation)
            .await
    }

    pub async fn check_batch_object_permission_exist(
        &self,
        user_id: Uuid,
        objects: &[ObjectId],
        operation: OperationType,
    ) -> Result<HashMap<ObjectId, bool>, RbacError> {
        self.source
            .check_batch_object_permission_exist(user_id, objects, operation)
            .await
    }

    pub async fn get_entity_mapped_scopes(
        &self,
        object: &ObjectId,
    ) -> Result<Vec<ScopeId>, RbacError> {
        self.source.get_entity_mapped_scopes(object).await
    }

    /// 幂等地把实体挂到范围下，返回关联行 id。
    pub async fn map_entity_to_scope(
        &self,
        scope: &ScopeId,
        object: &ObjectId,
    ) -> Result<Uuid, RbacError> {
        tracing::debug!(scope = %scope, object = %object, "Mapping entity to scope");
        let row = self.source.map_entity_to_scope(scope, object).await?;
        Ok(row.id)
    }
}

fn into_role_with_permissions(result: RoleRowWithPermissions) -> RoleDataWithPermissions {
    let permission_groups: Vec<PermissionGroupData> = result
        .permission_groups
        .into_iter()
        .map(|(group, permissions)| {
            let permissions: Vec<PermissionData> =
                permissions.into_iter().map(Into::into).collect();
            group.into_data(permissions)
        })
        .collect();
    let object_permissions: Vec<ObjectPermissionData> = result
        .object_permissions
        .into_iter()
        .map(Into::into)
        .collect();

    RoleDataWithPermissions {
        role: result.role.into(),
        permission_groups,
        object_permissions,
    }
}

fn into_list_result<Row, Data>(result: BatchQueryResult<Row>) -> ListResult<Data>
where
    Data: From<Row>,
{
    ListResult {
        items: result.items.into_iter().map(Into::into).collect(),
        total_count: result.total_count,
        has_next_page: result.page_info.has_next_page,
        has_previous_page: result.page_info.has_previous_page,
    }
}
