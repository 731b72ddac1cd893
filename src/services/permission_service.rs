//! 权限检查服务

use crate::db::Database;
use crate::error::AppError;
use crate::rbac::{ObjectId, OperationType, ScopeId};
use crate::repository::PermissionControllerRepository;
use std::collections::HashMap;
use uuid::Uuid;

pub struct PermissionService {
    repository: PermissionControllerRepository,
}

impl PermissionService {
    pub fn new(db: Database) -> Self {
        Self {
            repository: PermissionControllerRepository::new(db),
        }
    }

    /// 检查用户在某范围内是否拥有操作授权
    pub async fn check_scope_permission(
        &self,
        user_id: Uuid,
        scope: &ScopeId,
        operation: OperationType,
    ) -> Result<bool, AppError> {
        let allowed = self
            .repository
            .check_scope_permission_exist(user_id, scope, operation)
            .await?;
        record_check_outcome(allowed);
        Ok(allowed)
    }

    /// 检查用户对某实体是否拥有操作权限
    pub async fn check_object_permission(
        &self,
        user_id: Uuid,
        object: &ObjectId,
        operation: OperationType,
    ) -> Result<bool, AppError> {
        let allowed = self
            .repository
            .check_object_permission_exist(user_id, object, operation)
            .await?;
        record_check_outcome(allowed);
        Ok(allowed)
    }

    /// 批量检查：所有请求的实体都有结果表项
    pub async fn check_object_permissions_batch(
        &self,
        user_id: Uuid,
        objects: &[ObjectId],
        operation: OperationType,
    ) -> Result<HashMap<ObjectId, bool>, AppError> {
        let results = self
            .repository
            .check_batch_object_permission_exist(user_id, objects, operation)
            .await?;
        for allowed in results.values() {
            record_check_outcome(*allowed);
        }
        Ok(results)
    }

    /// 检查范围权限，无权限时返回 Forbidden
    pub async fn require_scope_permission(
        &self,
        user_id: Uuid,
        scope: &ScopeId,
        operation: OperationType,
    ) -> Result<(), AppError> {
        let allowed = self.check_scope_permission(user_id, scope, operation).await?;
        if !allowed {
            tracing::warn!(
                user_id = %user_id,
                scope = %scope,
                operation = ?operation,
                "Permission denied"
            );
            return Err(AppError::Forbidden);
        }
        Ok(())
    }
}

fn record_check_outcome(allowed: bool) {
    let outcome = if allowed { "allowed" } else { "denied" };
    metrics::counter!("rbac_permission_checks_total", "outcome" => outcome).increment(1);
}
